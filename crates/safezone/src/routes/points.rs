// Points ledger route.

use serde::Serialize;

use safezone_core::db::models::{PointsHistory, User};
use safezone_core::error::ApiError;

use crate::context::AppContext;

/// One ledger line as the dashboard shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsHistoryEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub points: i64,
    pub timestamp: String,
    pub date: String,
}

impl From<PointsHistory> for PointsHistoryEntry {
    fn from(entry: PointsHistory) -> Self {
        Self {
            id: entry.id,
            timestamp: entry.created_at.to_rfc3339(),
            date: entry.created_at.format("%Y-%m-%d").to_string(),
            kind: entry.kind,
            description: entry.description,
            points: entry.points,
        }
    }
}

/// The current user's ledger, newest first.
pub async fn handle_points_history(
    ctx: &AppContext,
    user: &User,
) -> Result<Vec<PointsHistoryEntry>, ApiError> {
    let history = ctx.store.records().points_history(user.id).await?;
    Ok(history.into_iter().map(PointsHistoryEntry::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_entry_dates() {
        let entry = PointsHistoryEntry::from(PointsHistory {
            id: 4,
            user_id: 1,
            kind: "bonus".into(),
            description: "Welcome".into(),
            points: 100,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 23, 30, 0).unwrap(),
        });
        assert_eq!(entry.date, "2025-06-01");
        assert_eq!(entry.timestamp, "2025-06-01T23:30:00+00:00");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "bonus");
        assert!(json.get("kind").is_none());
    }
}
