// Help request routes: post a request, list them, answer one.

use serde::{Deserialize, Serialize};

use safezone_core::db::models::{ledger, status, HelpRequest, NewHelpRequest, User};
use safezone_core::error::{ApiError, ErrorCode};
use safezone_core::rank::HELP_RESPONSE_POINTS;

use crate::context::AppContext;

fn default_responders_needed() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHelpRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub urgency: String,
    #[serde(default = "default_responders_needed")]
    pub responders_needed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RespondResponse {
    pub message: &'static str,
    pub request: HelpRequest,
}

pub async fn handle_list_help_requests(ctx: &AppContext) -> Result<Vec<HelpRequest>, ApiError> {
    Ok(ctx.store.records().list_help_requests().await?)
}

pub async fn handle_create_help_request(
    ctx: &AppContext,
    user: &User,
    body: CreateHelpRequest,
) -> Result<HelpRequest, ApiError> {
    let request = ctx
        .store
        .records()
        .create_help_request(&NewHelpRequest {
            user_id: user.id,
            user_name: user.display_name(),
            kind: body.kind,
            title: body.title,
            description: body.description,
            location: body.location,
            urgency: body.urgency,
            status: status::OPEN.to_string(),
            responders_needed: body.responders_needed,
            responders_count: 0,
        })
        .await?;
    Ok(request)
}

/// Record `user` as a responder and award the response points. The same
/// user may respond more than once.
pub async fn handle_respond(ctx: &AppContext, user: &User, id: i64) -> Result<RespondResponse, ApiError> {
    let tx = ctx.store.begin().await?;
    let result = async {
        let records = tx.records();
        let request = records
            .add_responder(id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::HelpRequestNotFound))?;

        records
            .award_points(
                user.id,
                HELP_RESPONSE_POINTS,
                ledger::HELP_RESPONSE,
                &format!("Responded to help request: {}", request.title),
            )
            .await?;
        Ok::<_, ApiError>(request)
    }
    .await;
    let request = tx.finish(result).await?;

    Ok(RespondResponse {
        message: "Response recorded",
        request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_responders_needed_defaults_to_one() {
        let body: CreateHelpRequest = serde_json::from_value(serde_json::json!({
            "type": "medical",
            "title": "Insulin",
            "description": "Need a ride to the pharmacy",
            "location": "Zone 2",
            "urgency": "high"
        }))
        .unwrap();
        assert_eq!(body.kind, "medical");
        assert_eq!(body.responders_needed, 1);
    }
}
