// Application context: built once at startup and shared as Arc<AppContext>
// across request handlers.

use std::fmt;
use std::sync::Arc;

use safezone_core::db::adapter::Adapter;
use safezone_core::error::Result;
use safezone_core::options::SafezoneOptions;

use crate::crypto::TokenIssuer;
use crate::store::Store;

pub struct AppContext {
    pub options: SafezoneOptions,
    pub issuer: TokenIssuer,
    pub store: Store,
}

impl AppContext {
    /// Build the context from options and a storage backend. Fails when the
    /// token settings are unusable.
    pub fn new(options: SafezoneOptions, adapter: Arc<dyn Adapter>) -> Result<Self> {
        let issuer = TokenIssuer::new(&options.token)?;
        Ok(Self {
            options,
            issuer,
            store: Store::new(adapter),
        })
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `options` redacts the secret itself.
        f.debug_struct("AppContext")
            .field("options", &self.options)
            .field("issuer", &self.issuer)
            .field("store", &self.store)
            .finish()
    }
}
