// Area-wide alert routes.

use serde::{Deserialize, Serialize};

use safezone_core::db::models::{GlobalAlert, NewGlobalAlert, User};
use safezone_core::error::{ApiError, ErrorCode, SafezoneError};

use crate::context::AppContext;

fn default_expires_in() -> Option<String> {
    Some("24".to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGlobalAlertRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    pub affected_areas: Vec<String>,
    /// Hours until the alert lapses. Explicit `null` means no expiry.
    #[serde(default = "default_expires_in")]
    pub expires_in: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertResponse {
    pub message: &'static str,
    pub alert: GlobalAlert,
}

fn expires_at(expires_in: Option<&str>) -> Option<String> {
    expires_in
        .filter(|hours| !hours.is_empty())
        .map(|hours| format!("{hours} hours"))
}

pub async fn handle_list_global_alerts(ctx: &AppContext) -> Result<Vec<GlobalAlert>, ApiError> {
    Ok(ctx.store.records().list_global_alerts().await?)
}

pub async fn handle_create_global_alert(
    ctx: &AppContext,
    user: &User,
    body: CreateGlobalAlertRequest,
) -> Result<GlobalAlert, ApiError> {
    let affected_areas = serde_json::to_string(&body.affected_areas)
        .map_err(|e| SafezoneError::Other(format!("Failed to encode affected areas: {e}")))?;

    let alert = ctx
        .store
        .records()
        .create_global_alert(&NewGlobalAlert {
            user_id: user.id,
            created_by: user.display_name(),
            kind: body.kind,
            priority: body.priority,
            title: body.title,
            message: body.message,
            affected_areas,
            is_active: true,
            acknowledged_count: 0,
            expires_at: expires_at(body.expires_in.as_deref()),
        })
        .await?;

    tracing::info!(alert_id = alert.id, user_id = user.id, priority = %alert.priority, "global alert raised");
    Ok(alert)
}

/// Count one more acknowledgement. Repeat acknowledgements all count.
pub async fn handle_acknowledge(ctx: &AppContext, id: i64) -> Result<AlertResponse, ApiError> {
    let alert = ctx
        .store
        .records()
        .acknowledge_alert(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::AlertNotFound))?;

    Ok(AlertResponse {
        message: "Alert acknowledged",
        alert,
    })
}

/// Flip the alert between active and inactive.
pub async fn handle_toggle(ctx: &AppContext, id: i64) -> Result<AlertResponse, ApiError> {
    let alert = ctx
        .store
        .records()
        .toggle_alert(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::AlertNotFound))?;

    Ok(AlertResponse {
        message: "Alert status toggled",
        alert,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(extra: serde_json::Value) -> CreateGlobalAlertRequest {
        let mut json = serde_json::json!({
            "type": "weather",
            "priority": "high",
            "title": "Typhoon signal no. 2",
            "message": "Secure loose roofing",
            "affected_areas": ["Zone 1", "Zone 2"]
        });
        if let (Some(obj), Some(extra)) = (json.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_expires_in_defaults_to_a_day() {
        let body = body(serde_json::json!({}));
        assert_eq!(expires_at(body.expires_in.as_deref()).as_deref(), Some("24 hours"));
    }

    #[test]
    fn test_expires_in_null_or_empty() {
        let null = body(serde_json::json!({ "expires_in": null }));
        assert_eq!(expires_at(null.expires_in.as_deref()), None);

        let empty = body(serde_json::json!({ "expires_in": "" }));
        assert_eq!(expires_at(empty.expires_in.as_deref()), None);

        let six = body(serde_json::json!({ "expires_in": "6" }));
        assert_eq!(expires_at(six.expires_in.as_deref()).as_deref(), Some("6 hours"));
    }
}
