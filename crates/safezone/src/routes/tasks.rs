// Personal task routes.

use serde::Deserialize;

use safezone_core::db::models::{ledger, points_in_range, status, NewTask, Task, TaskPatch, User};
use safezone_core::error::{ApiError, ErrorCode};

use crate::context::AppContext;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub points: i64,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

pub async fn handle_list_tasks(ctx: &AppContext) -> Result<Vec<Task>, ApiError> {
    Ok(ctx.store.records().list_tasks().await?)
}

pub async fn handle_create_task(
    ctx: &AppContext,
    user: &User,
    body: CreateTaskRequest,
) -> Result<Task, ApiError> {
    if !points_in_range(body.points) {
        return Err(ApiError::validation(ErrorCode::InvalidPoints));
    }
    let task = ctx
        .store
        .records()
        .create_task(&NewTask {
            title: body.title,
            description: body.description,
            category: body.category,
            priority: body.priority,
            status: status::PENDING.to_string(),
            points: body.points,
            due_date: body.due_date,
            assigned_to: body.assigned_to,
            location: body.location,
            created_by: Some(user.id),
        })
        .await?;
    Ok(task)
}

/// Apply `patch` to a task. The first transition into "completed" awards the
/// task's points to `user`.
pub async fn handle_update_task(
    ctx: &AppContext,
    user: &User,
    id: i64,
    patch: TaskPatch,
) -> Result<Task, ApiError> {
    if patch.points.is_some_and(|points| !points_in_range(points)) {
        return Err(ApiError::validation(ErrorCode::InvalidPoints));
    }

    let tx = ctx.store.begin().await?;
    let result = async {
        let records = tx.records();
        let current = records
            .find_task(id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::TaskNotFound))?;
        if patch.is_empty() {
            return Ok::<_, ApiError>(current);
        }

        let mut merged = current.clone();
        patch.apply(&mut merged);

        if !current.is_completed() && merged.is_completed() {
            // Only the request whose write flips the stored status pays out.
            if let Some(task) = records.save_task_completion(&merged).await? {
                records
                    .award_points(
                        user.id,
                        task.points,
                        ledger::TASK_COMPLETED,
                        &format!("Completed task: {}", task.title),
                    )
                    .await?;
                return Ok(task);
            }
        }

        records
            .save_task(&merged)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::TaskNotFound))
    }
    .await;
    tx.finish(result).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_body_optional_fields() {
        let body: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "title": "Sweep the plaza",
            "description": "Before the fiesta",
            "category": "cleanup",
            "priority": "low",
            "points": 30
        }))
        .unwrap();
        assert_eq!(body.points, 30);
        assert!(body.due_date.is_none());
        assert!(body.location.is_none());
    }

    #[test]
    fn test_points_range() {
        assert!(points_in_range(0));
        assert!(points_in_range(30));
        assert!(!points_in_range(-1));
        assert!(!points_in_range(i64::MAX));
    }

    #[test]
    fn test_create_body_requires_points() {
        let body = serde_json::from_value::<CreateTaskRequest>(serde_json::json!({
            "title": "Sweep the plaza",
            "description": "Before the fiesta",
            "category": "cleanup",
            "priority": "low"
        }));
        assert!(body.is_err());
    }
}
