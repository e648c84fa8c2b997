// Persisted record structs and the insert payloads that create them.
//
// Field names match the column names in `schema.rs`; rows coming back from a
// storage adapter deserialize straight into these structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Status values used by the record lifecycles.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const COMPLETED: &str = "completed";
    pub const OPEN: &str = "open";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const ASSIGNED: &str = "assigned";
}

/// Largest point value a task or community task may carry.
pub const MAX_TASK_POINTS: i64 = 1_000_000;

pub fn points_in_range(points: i64) -> bool {
    (0..=MAX_TASK_POINTS).contains(&points)
}

/// Ledger entry types.
pub mod ledger {
    pub const BONUS: &str = "bonus";
    pub const TASK_COMPLETED: &str = "task_completed";
    pub const HELP_RESPONSE: &str = "help_response";
}

/// Booleans are stored as 0/1 by SQL backends and as JSON booleans by the
/// in-memory backend; accept both.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

// ─── User ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub hashed_password: String,
    pub points: i64,
    pub rank: String,
    #[serde(deserialize_with = "flag")]
    pub is_verified: bool,
    #[serde(deserialize_with = "flag")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// "First Last", used wherever a record stores the author's name.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub hashed_password: String,
    pub points: i64,
    pub rank: String,
    pub is_verified: bool,
    pub is_active: bool,
}

// ─── Task ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub points: i64,
    pub due_date: Option<String>,
    pub assigned_to: Option<String>,
    pub location: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == status::COMPLETED
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub points: i64,
    pub due_date: Option<String>,
    pub assigned_to: Option<String>,
    pub location: Option<String>,
    pub created_by: Option<i64>,
}

/// Partial update of a task. Only the fields that are `Some` change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the provided fields into `task`.
    pub fn apply(&self, task: &mut Task) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        fn set_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *slot = value.clone();
            }
        }

        set(&mut task.status, &self.status);
        set(&mut task.title, &self.title);
        set(&mut task.description, &self.description);
        set(&mut task.category, &self.category);
        set(&mut task.priority, &self.priority);
        set(&mut task.points, &self.points);
        set_opt(&mut task.due_date, &self.due_date);
        set_opt(&mut task.assigned_to, &self.assigned_to);
        set_opt(&mut task.location, &self.location);
    }
}

// ─── Points history ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsHistory {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPointsHistory {
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub points: i64,
}

// ─── Help request ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpRequest {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub urgency: String,
    pub status: String,
    pub responders_needed: i64,
    pub responders_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewHelpRequest {
    pub user_id: i64,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub urgency: String,
    pub status: String,
    pub responders_needed: i64,
    pub responders_count: i64,
}

// ─── Global alert ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAlert {
    pub id: i64,
    pub user_id: i64,
    pub created_by: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    /// JSON-encoded list of area names.
    pub affected_areas: String,
    #[serde(deserialize_with = "flag")]
    pub is_active: bool,
    pub acknowledged_count: i64,
    pub expires_at: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGlobalAlert {
    pub user_id: i64,
    pub created_by: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    pub affected_areas: String,
    pub is_active: bool,
    pub acknowledged_count: i64,
    pub expires_at: Option<String>,
}

// ─── Community task ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityTask {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub urgency: String,
    pub points: i64,
    pub status: String,
    pub volunteer_id: Option<i64>,
    pub volunteer_name: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCommunityTask {
    pub title: String,
    pub description: String,
    pub location: String,
    pub urgency: String,
    pub points: i64,
    pub status: String,
    pub created_by: Option<i64>,
}

/// Priority of the personal task spawned when someone volunteers for a
/// community task with the given urgency.
pub fn priority_for_urgency(urgency: &str) -> &'static str {
    match urgency {
        "high" => "high",
        "medium" => "medium",
        _ => "low",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: 1,
            title: "Sweep the plaza".into(),
            description: "Before the fiesta".into(),
            category: "cleanup".into(),
            priority: "low".into(),
            status: status::PENDING.into(),
            points: 30,
            due_date: None,
            assigned_to: Some("Ana Cruz".into()),
            location: None,
            created_by: Some(7),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_only_touches_provided_fields() {
        let mut task = sample_task();
        let patch = TaskPatch {
            status: Some(status::COMPLETED.into()),
            location: Some("Plaza".into()),
            ..Default::default()
        };
        patch.apply(&mut task);

        assert_eq!(task.status, "completed");
        assert_eq!(task.location.as_deref(), Some("Plaza"));
        assert_eq!(task.title, "Sweep the plaza");
        assert_eq!(task.assigned_to.as_deref(), Some("Ana Cruz"));
        assert_eq!(task.points, 30);
    }

    #[test]
    fn test_empty_patch() {
        assert!(TaskPatch::default().is_empty());
        let patch: TaskPatch = serde_json::from_value(serde_json::json!({ "points": 5 })).unwrap();
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_priority_for_urgency() {
        assert_eq!(priority_for_urgency("high"), "high");
        assert_eq!(priority_for_urgency("medium"), "medium");
        assert_eq!(priority_for_urgency("low"), "low");
        assert_eq!(priority_for_urgency("critical"), "low");
        assert_eq!(priority_for_urgency("HIGH"), "low");
    }

    #[test]
    fn test_flags_accept_integers() {
        let alert: GlobalAlert = serde_json::from_value(serde_json::json!({
            "id": 3,
            "user_id": 1,
            "created_by": "Ana Cruz",
            "type": "weather",
            "priority": "high",
            "title": "Typhoon",
            "message": "Stay indoors",
            "affected_areas": "[\"Zone 1\"]",
            "is_active": 0,
            "acknowledged_count": 2,
            "expires_at": null,
            "created_at": "2025-06-01T08:00:00Z"
        }))
        .unwrap();
        assert!(!alert.is_active);
        assert_eq!(alert.kind, "weather");
    }
}
