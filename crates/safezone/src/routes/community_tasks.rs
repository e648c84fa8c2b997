// Community task board: shared tasks that a volunteer can take on, which
// copies them into the volunteer's personal task list.

use serde::{Deserialize, Serialize};

use safezone_core::db::models::{
    points_in_range, priority_for_urgency, status, CommunityTask, NewCommunityTask, NewTask, Task,
    User,
};
use safezone_core::error::{ApiError, ErrorCode};

use crate::context::AppContext;

/// Category of the personal task created by volunteering.
pub const COMMUNITY_EVENT_CATEGORY: &str = "community_event";

fn default_points() -> i64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommunityTaskRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub urgency: String,
    #[serde(default = "default_points")]
    pub points: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolunteerResponse {
    pub message: &'static str,
    pub community_task: CommunityTask,
    pub personal_task: Task,
}

/// Open tasks only, newest first.
pub async fn handle_list_community_tasks(ctx: &AppContext) -> Result<Vec<CommunityTask>, ApiError> {
    Ok(ctx.store.records().list_open_community_tasks().await?)
}

pub async fn handle_create_community_task(
    ctx: &AppContext,
    user: &User,
    body: CreateCommunityTaskRequest,
) -> Result<CommunityTask, ApiError> {
    if !points_in_range(body.points) {
        return Err(ApiError::validation(ErrorCode::InvalidPoints));
    }
    let task = ctx
        .store
        .records()
        .create_community_task(&NewCommunityTask {
            title: body.title,
            description: body.description,
            location: body.location,
            urgency: body.urgency,
            points: body.points,
            status: status::OPEN.to_string(),
            created_by: Some(user.id),
        })
        .await?;
    Ok(task)
}

/// The personal copy of a community task assigned to `volunteer`.
fn personal_task_for(task: &CommunityTask, volunteer: &User) -> NewTask {
    NewTask {
        title: task.title.clone(),
        description: task.description.clone(),
        category: COMMUNITY_EVENT_CATEGORY.to_string(),
        priority: priority_for_urgency(&task.urgency).to_string(),
        status: status::PENDING.to_string(),
        points: task.points,
        due_date: None,
        assigned_to: Some(volunteer.display_name()),
        location: Some(task.location.clone()),
        created_by: Some(volunteer.id),
    }
}

/// Assign an open community task to `user` and create their personal task.
pub async fn handle_volunteer(ctx: &AppContext, user: &User, id: i64) -> Result<VolunteerResponse, ApiError> {
    let tx = ctx.store.begin().await?;
    let result = async {
        let records = tx.records();
        let task = records
            .find_community_task(id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::CommunityTaskNotFound))?;
        let community_task = records
            .assign_community_task(id, user)
            .await?
            .ok_or_else(|| ApiError::conflict(ErrorCode::TaskNoLongerAvailable))?;
        let personal_task = records.create_task(&personal_task_for(&task, user)).await?;
        Ok::<_, ApiError>((community_task, personal_task))
    }
    .await;
    let (community_task, personal_task) = tx.finish(result).await?;

    tracing::info!(
        community_task_id = community_task.id,
        personal_task_id = personal_task.id,
        user_id = user.id,
        "volunteered for community task"
    );
    Ok(VolunteerResponse {
        message: "Successfully volunteered for task",
        community_task,
        personal_task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn volunteer() -> User {
        User {
            id: 9,
            email: "ben@safezone.ph".into(),
            first_name: "Ben".into(),
            last_name: "Santos".into(),
            phone: None,
            barangay: None,
            city: None,
            location: None,
            bio: None,
            hashed_password: "digest:salt".into(),
            points: 100,
            rank: "Newcomer".into(),
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_personal_task_copies_fields() {
        let task = CommunityTask {
            id: 3,
            title: "Elderly Wellness Check".into(),
            description: "Verify medicine stockpile".into(),
            location: "Quezon City, Zone 2".into(),
            urgency: "medium".into(),
            points: 50,
            status: status::OPEN.into(),
            volunteer_id: None,
            volunteer_name: None,
            created_by: None,
            created_at: Utc::now(),
        };

        let personal = personal_task_for(&task, &volunteer());
        assert_eq!(personal.title, "Elderly Wellness Check");
        assert_eq!(personal.category, "community_event");
        assert_eq!(personal.priority, "medium");
        assert_eq!(personal.status, "pending");
        assert_eq!(personal.points, 50);
        assert_eq!(personal.assigned_to.as_deref(), Some("Ben Santos"));
        assert_eq!(personal.location.as_deref(), Some("Quezon City, Zone 2"));
        assert_eq!(personal.created_by, Some(9));
    }

    #[test]
    fn test_points_default() {
        let body: CreateCommunityTaskRequest = serde_json::from_value(serde_json::json!({
            "title": "Sandbagging",
            "description": "Riverbank near the chapel",
            "location": "Zone 4",
            "urgency": "critical"
        }))
        .unwrap();
        assert_eq!(body.points, 50);
    }
}
