// Health route.

use super::MessageResponse;

pub fn handle_root() -> MessageResponse {
    MessageResponse::new("SafeZonePH API is running!")
}
