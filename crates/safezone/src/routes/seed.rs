// Sample community tasks for a fresh database.

use safezone_core::db::models::{status, NewCommunityTask};
use safezone_core::error::ApiError;

use crate::context::AppContext;
use crate::routes::MessageResponse;

/// (title, description, location, urgency, points)
const SAMPLE_TASKS: [(&str, &str, &str, &str, i64); 3] = [
    (
        "Emergency Supplies for Lola Rosa",
        "Requiring immediate delivery of maintenance medication and drinking water.",
        "Brgy. Malolos, Sector 3",
        "high",
        75,
    ),
    (
        "Elderly Wellness Check",
        "Verify medicine stockpile and secondary power supply for Mrs. Reyes.",
        "Quezon City, Zone 2",
        "medium",
        50,
    ),
    (
        "Community Center Cleanup",
        "Assistance needed to organize the donation intake area for tomorrow's relief drive.",
        "Brgy. Hall Multi-Purpose",
        "low",
        35,
    ),
];

/// Insert the sample tasks unless the board already has any task.
pub async fn handle_seed_community_tasks(ctx: &AppContext) -> Result<MessageResponse, ApiError> {
    let tx = ctx.store.begin().await?;
    let result = async {
        let records = tx.records();
        let existing = records.count_community_tasks().await?;
        if existing > 0 {
            return Ok::<_, ApiError>(format!("Database already has {existing} community tasks"));
        }

        for (title, description, location, urgency, points) in SAMPLE_TASKS {
            records
                .create_community_task(&NewCommunityTask {
                    title: title.to_string(),
                    description: description.to_string(),
                    location: location.to_string(),
                    urgency: urgency.to_string(),
                    points,
                    status: status::OPEN.to_string(),
                    created_by: None,
                })
                .await?;
        }
        tracing::info!(count = SAMPLE_TASKS.len(), "seeded community tasks");
        Ok(format!("Successfully created {} community tasks", SAMPLE_TASKS.len()))
    }
    .await;
    let message = tx.finish(result).await?;

    Ok(MessageResponse::new(message))
}
