// `safezone-server serve`: run the HTTP API until Ctrl-C.

use std::sync::Arc;

use clap::Args;

use safezone_axum::Safezone;
use safezone_core::db::adapter::SchemaStatus;
use safezone_core::env::init_logger;
use safezone_core::options::SafezoneOptions;
use safezone_sqlx::SqlxAdapter;

#[derive(Args)]
pub struct ServeArgs {
    /// Interface to bind (defaults to $HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (defaults to $PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Database URL (defaults to $DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

impl ServeArgs {
    fn apply(self, options: &mut SafezoneOptions) {
        if let Some(host) = self.host {
            options.host = host;
        }
        if let Some(port) = self.port {
            options.port = port;
        }
        if let Some(url) = self.database_url {
            options.database_url = url;
        }
    }
}

pub async fn run(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let mut options = SafezoneOptions::from_env()?;
    args.apply(&mut options);
    let addr = options.bind_address();

    let adapter = SqlxAdapter::connect(&options.database_url).await?;
    let app = Safezone::new(options, Arc::new(adapter))?;

    match app.context().store.ensure_schema().await? {
        SchemaStatus::UpToDate => tracing::debug!("schema up to date"),
        SchemaStatus::NeedsMigration { statements } => {
            tracing::info!(count = statements.len(), "schema created")
        }
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "SafeZonePH API listening");

    axum::serve(listener, app.router_with_cors())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
