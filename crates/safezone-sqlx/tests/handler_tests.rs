// Request handlers running on a file-backed SQLite database.
//
// Several tests fire the same request from many tasks at once; the pool
// hands each one its own connection, so the transactions really overlap.

use std::sync::Arc;

use safezone::routes::{auth, community_tasks, global_alerts, help_requests, points, seed, tasks};
use safezone::{session, AppContext};
use safezone_core::db::models::{status, TaskPatch, User};
use safezone_core::error::{ApiError, ErrorCode, HttpStatus};
use safezone_core::options::SafezoneOptions;
use safezone_sqlx::SqlxAdapter;
use tempfile::TempDir;
use tokio::task::JoinSet;

const CONTENDERS: usize = 8;

struct Fixture {
    ctx: Arc<AppContext>,
    _dir: TempDir,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("safezone.db").display()
    );
    let adapter = SqlxAdapter::connect(&url).await.unwrap();
    let ctx = AppContext::new(
        SafezoneOptions::new("sqlite-handler-secret-0123456789abcdef"),
        Arc::new(adapter),
    )
    .unwrap();
    ctx.store.ensure_schema().await.unwrap();
    Fixture {
        ctx: Arc::new(ctx),
        _dir: dir,
    }
}

fn register_body(email: &str) -> auth::RegisterRequest {
    serde_json::from_value(serde_json::json!({
        "email": email,
        "password": "s3cret-pass",
        "firstName": "Ana",
        "lastName": "Cruz"
    }))
    .unwrap()
}

async fn register(ctx: &AppContext, email: &str) -> User {
    let response = auth::handle_register(ctx, register_body(email)).await.unwrap();
    session::resolve_token(ctx, &response.access_token).await.unwrap()
}

async fn community_task(ctx: &AppContext, owner: &User) -> i64 {
    let body = serde_json::from_value(serde_json::json!({
        "title": "Sandbagging",
        "description": "Riverbank near the chapel",
        "location": "Zone 4",
        "urgency": "critical"
    }))
    .unwrap();
    community_tasks::handle_create_community_task(ctx, owner, body)
        .await
        .unwrap()
        .id
}

fn completed() -> TaskPatch {
    TaskPatch {
        status: Some(status::COMPLETED.into()),
        ..Default::default()
    }
}

async fn join_all<T: 'static>(mut set: JoinSet<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Some(result) = set.join_next().await {
        out.push(result.unwrap());
    }
    out
}

#[tokio::test]
async fn test_sequential_flow() {
    let Fixture { ctx, _dir } = fixture().await;
    let ana = register(&ctx, "ana@safezone.ph").await;

    let body = serde_json::from_value(serde_json::json!({
        "title": "Sweep the plaza",
        "description": "Before the fiesta",
        "category": "cleanup",
        "priority": "low",
        "points": 30
    }))
    .unwrap();
    let task = tasks::handle_create_task(&ctx, &ana, body).await.unwrap();

    let patch = TaskPatch {
        location: Some("Plaza".into()),
        ..Default::default()
    };
    let moved = tasks::handle_update_task(&ctx, &ana, task.id, patch).await.unwrap();
    assert_eq!(moved.location.as_deref(), Some("Plaza"));
    assert_eq!(moved.status, "pending");

    let done = tasks::handle_update_task(&ctx, &ana, task.id, completed()).await.unwrap();
    assert_eq!(done.status, "completed");
    assert_eq!(done.location.as_deref(), Some("Plaza"));

    let seeded = seed::handle_seed_community_tasks(&ctx).await.unwrap();
    assert_eq!(seeded.message, "Successfully created 3 community tasks");
    let open = community_tasks::handle_list_community_tasks(&ctx).await.unwrap();
    community_tasks::handle_volunteer(&ctx, &ana, open[0].id).await.unwrap();

    let err = community_tasks::handle_volunteer(&ctx, &ana, open[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TaskNoLongerAvailable);
    assert_eq!(err.status, HttpStatus::BadRequest);

    let err = community_tasks::handle_volunteer(&ctx, &ana, 999).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CommunityTaskNotFound);

    let history = points::handle_points_history(&ctx, &ana).await.unwrap();
    assert_eq!(history.len(), 2);
    let ana = ctx.store.records().find_user(ana.id).await.unwrap().unwrap();
    assert_eq!(ana.points, 130);
}

#[tokio::test]
async fn test_out_of_range_points_rejected() {
    let Fixture { ctx, _dir } = fixture().await;
    let ana = register(&ctx, "ana@safezone.ph").await;

    let body = serde_json::from_value(serde_json::json!({
        "title": "Sweep the plaza",
        "description": "Before the fiesta",
        "category": "cleanup",
        "priority": "low",
        "points": i64::MAX
    }))
    .unwrap();
    let err = tasks::handle_create_task(&ctx, &ana, body).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPoints);
    assert_eq!(err.status, HttpStatus::UnprocessableEntity);

    let patch = TaskPatch {
        points: Some(i64::MAX),
        ..completed()
    };
    let err = tasks::handle_update_task(&ctx, &ana, 1, patch).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPoints);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_of_distinct_emails() {
    let Fixture { ctx, _dir } = fixture().await;

    let mut set = JoinSet::new();
    for i in 0..CONTENDERS {
        let ctx = ctx.clone();
        set.spawn(async move {
            auth::handle_register(&ctx, register_body(&format!("user{i}@safezone.ph"))).await
        });
    }
    let results = join_all(set).await;
    assert!(results.iter().all(Result::is_ok), "{results:?}");

    for i in 0..CONTENDERS {
        let user = ctx
            .store
            .records()
            .find_user_by_email(&format!("user{i}@safezone.ph"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.points, 100);
        assert_eq!(ctx.store.records().points_history(user.id).await.unwrap().len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_of_one_email() {
    let Fixture { ctx, _dir } = fixture().await;

    let mut set = JoinSet::new();
    for _ in 0..CONTENDERS {
        let ctx = ctx.clone();
        set.spawn(async move { auth::handle_register(&ctx, register_body("ana@safezone.ph")).await });
    }
    let results = join_all(set).await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code, ErrorCode::EmailAlreadyRegistered);
        assert_eq!(err.status, HttpStatus::BadRequest);
    }
    assert!(ctx.store.records().find_user(2).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_volunteers_one_wins() {
    let Fixture { ctx, _dir } = fixture().await;
    let owner = register(&ctx, "owner@safezone.ph").await;
    let mut volunteers = Vec::new();
    for i in 0..CONTENDERS {
        volunteers.push(register(&ctx, &format!("volunteer{i}@safezone.ph")).await);
    }

    for _ in 0..3 {
        let id = community_task(&ctx, &owner).await;

        let mut set = JoinSet::new();
        for volunteer in volunteers.clone() {
            let ctx = ctx.clone();
            set.spawn(async move {
                community_tasks::handle_volunteer(&ctx, &volunteer, id)
                    .await
                    .map(|r| r.community_task.volunteer_id)
            });
        }
        let results = join_all(set).await;

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "{results:?}");
        let losers: Vec<&ApiError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(losers.len(), CONTENDERS - 1);
        for err in losers {
            assert_eq!(err.code, ErrorCode::TaskNoLongerAvailable);
            assert_eq!(err.status, HttpStatus::BadRequest);
        }

        let stored = ctx.store.records().find_community_task(id).await.unwrap().unwrap();
        assert_eq!(stored.status, "assigned");
        assert_eq!(Some(stored.volunteer_id), winners.first().copied().copied());
    }

    // One personal task per community task, nothing more.
    assert_eq!(tasks::handle_list_tasks(&ctx).await.unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_award_once() {
    let Fixture { ctx, _dir } = fixture().await;
    let ana = register(&ctx, "ana@safezone.ph").await;
    let body = serde_json::from_value(serde_json::json!({
        "title": "Sweep the plaza",
        "description": "Before the fiesta",
        "category": "cleanup",
        "priority": "low",
        "points": 30
    }))
    .unwrap();
    let task = tasks::handle_create_task(&ctx, &ana, body).await.unwrap();

    let mut set = JoinSet::new();
    for _ in 0..CONTENDERS {
        let ctx = ctx.clone();
        let ana = ana.clone();
        set.spawn(async move { tasks::handle_update_task(&ctx, &ana, task.id, completed()).await });
    }
    let results = join_all(set).await;
    assert!(results.iter().all(Result::is_ok), "{results:?}");

    let ana = ctx.store.records().find_user(ana.id).await.unwrap().unwrap();
    assert_eq!(ana.points, 130);
    let history = points::handle_points_history(&ctx, &ana).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, "task_completed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_and_acknowledgements() {
    let Fixture { ctx, _dir } = fixture().await;
    let ana = register(&ctx, "ana@safezone.ph").await;
    let body = serde_json::from_value(serde_json::json!({
        "type": "weather",
        "priority": "high",
        "title": "Typhoon signal no. 2",
        "message": "Secure loose roofing",
        "affected_areas": ["Zone 1"]
    }))
    .unwrap();
    let alert = global_alerts::handle_create_global_alert(&ctx, &ana, body)
        .await
        .unwrap();

    let mut set = JoinSet::new();
    for i in 0..CONTENDERS {
        let ctx = ctx.clone();
        set.spawn(async move {
            if i % 2 == 0 {
                global_alerts::handle_toggle(&ctx, alert.id).await
            } else {
                global_alerts::handle_acknowledge(&ctx, alert.id).await
            }
        });
    }
    let results = join_all(set).await;
    assert!(results.iter().all(Result::is_ok), "{results:?}");

    // Four toggles land back on active.
    let stored = ctx.store.records().find_global_alert(alert.id).await.unwrap().unwrap();
    assert!(stored.is_active);
    assert_eq!(stored.acknowledged_count, (CONTENDERS / 2) as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_help_responses() {
    let Fixture { ctx, _dir } = fixture().await;
    let requester = register(&ctx, "ana@safezone.ph").await;
    let body = serde_json::from_value(serde_json::json!({
        "type": "medical",
        "title": "Insulin run",
        "description": "Need a ride to the pharmacy",
        "location": "Zone 2",
        "urgency": "high",
        "responders_needed": 2
    }))
    .unwrap();
    let request = help_requests::handle_create_help_request(&ctx, &requester, body)
        .await
        .unwrap();

    let mut responders = Vec::new();
    for i in 0..CONTENDERS {
        responders.push(register(&ctx, &format!("responder{i}@safezone.ph")).await);
    }

    let mut set = JoinSet::new();
    for responder in responders.clone() {
        let ctx = ctx.clone();
        set.spawn(async move { help_requests::handle_respond(&ctx, &responder, request.id).await });
    }
    let results = join_all(set).await;
    assert!(results.iter().all(Result::is_ok), "{results:?}");

    let stored = ctx.store.records().find_help_request(request.id).await.unwrap().unwrap();
    assert_eq!(stored.responders_count, CONTENDERS as i64);
    assert_eq!(stored.status, "in_progress");
    for responder in responders {
        let user = ctx.store.records().find_user(responder.id).await.unwrap().unwrap();
        assert_eq!(user.points, 125);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_seeding_inserts_once() {
    let Fixture { ctx, _dir } = fixture().await;

    let mut set = JoinSet::new();
    for _ in 0..4 {
        let ctx = ctx.clone();
        set.spawn(async move { seed::handle_seed_community_tasks(&ctx).await });
    }
    let results = join_all(set).await;
    assert!(results.iter().all(Result::is_ok), "{results:?}");

    assert_eq!(ctx.store.records().count_community_tasks().await.unwrap(), 3);
}
