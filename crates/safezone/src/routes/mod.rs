// Route handlers: framework-independent request handling.
//
// Each handler takes the shared `AppContext` (and the authenticated `User`
// where the endpoint needs one) plus a deserialized request body, and
// returns a serializable response or an `ApiError`.

pub mod auth;
pub mod community_tasks;
pub mod global_alerts;
pub mod help_requests;
pub mod ok;
pub mod points;
pub mod seed;
pub mod tasks;

use serde::Serialize;

/// `{"message": ...}` body used by the simple endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
