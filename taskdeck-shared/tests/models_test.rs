//! Database-backed model tests
//!
//! Run with `DATABASE_URL=... cargo test -p taskdeck-shared -- --ignored`.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use taskdeck_shared::db::migrations::{ensure_database_exists, run_migrations};
use taskdeck_shared::models::analytics::{self, TrendWindow};
use taskdeck_shared::models::notification::{
    CreateNotification, Notification, NotificationKind, RECENT_LIMIT,
};
use taskdeck_shared::models::task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask};
use taskdeck_shared::models::user::{CreateUser, User};
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set, skipped via #[ignore]");
    ensure_database_exists(&url).await.unwrap();
    let pool = PgPool::connect(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

async fn user(pool: &PgPool) -> User {
    User::create(
        pool,
        CreateUser {
            username: format!("m_{}", &Uuid::new_v4().simple().to_string()[..12]),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .unwrap()
}

async fn task(pool: &PgPool, owner: Uuid, title: &str) -> Task {
    Task::create(
        pool,
        owner,
        CreateTask {
            title: title.to_string(),
            description: "details".to_string(),
            deadline: None,
        },
    )
    .await
    .unwrap()
}

fn update(task: &Task, status: TaskStatus) -> UpdateTask {
    UpdateTask {
        title: task.title.clone(),
        description: task.description.clone(),
        deadline: task.deadline,
        status,
    }
}

#[tokio::test]
#[ignore]
async fn test_completed_at_follows_status() {
    let pool = pool().await;
    let owner = user(&pool).await;
    let created = task(&pool, owner.id, "finish me").await;
    assert_eq!(created.status, TaskStatus::Pending);
    assert!(created.completed_at.is_none());

    let done = Task::update(&pool, created.id, owner.id, update(&created, TaskStatus::Completed))
        .await
        .unwrap()
        .unwrap();
    assert!(done.completed_at.is_some());

    let again = Task::update(&pool, created.id, owner.id, update(&done, TaskStatus::Completed))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.completed_at, done.completed_at);

    let reopened = Task::update(&pool, created.id, owner.id, update(&done, TaskStatus::InProgress))
        .await
        .unwrap()
        .unwrap();
    assert!(reopened.completed_at.is_none());

    User::delete(&pool, owner.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_update_by_non_owner_changes_nothing() {
    let pool = pool().await;
    let owner = user(&pool).await;
    let other = user(&pool).await;
    let created = task(&pool, owner.id, "mine").await;

    let result = Task::update(&pool, created.id, other.id, update(&created, TaskStatus::Completed))
        .await
        .unwrap();
    assert!(result.is_none());

    assert!(Task::delete_owned(&pool, created.id, other.id).await.unwrap().is_none());
    assert!(Task::find_visible(&pool, created.id, other.id).await.unwrap().is_none());

    User::delete(&pool, owner.id).await.unwrap();
    User::delete(&pool, other.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_share_never_duplicates_or_includes_owner() {
    let pool = pool().await;
    let owner = user(&pool).await;
    let friend = user(&pool).await;
    let created = task(&pool, owner.id, "shared").await;

    assert!(Task::share(&pool, created.id, owner.id, friend.id).await.unwrap());
    assert!(!Task::share(&pool, created.id, owner.id, friend.id).await.unwrap());
    assert!(!Task::share(&pool, created.id, owner.id, owner.id).await.unwrap());

    let stored = Task::find_by_id(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(stored.shared_with, vec![friend.id]);

    assert!(Task::find_visible(&pool, created.id, friend.id).await.unwrap().is_some());
    assert!(Task::unshare(&pool, created.id, friend.id).await.unwrap());
    assert!(!Task::unshare(&pool, created.id, friend.id).await.unwrap());

    User::delete(&pool, owner.id).await.unwrap();
    User::delete(&pool, friend.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_search_matches_wildcards_literally() {
    let pool = pool().await;
    let owner = user(&pool).await;
    task(&pool, owner.id, "Reach 100% coverage").await;
    task(&pool, owner.id, "Reach 1000 users").await;

    let filter = TaskFilter {
        search: Some("100%".to_string()),
        ..Default::default()
    };
    let found = Task::list(&pool, owner.id, &filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Reach 100% coverage");

    let filter = TaskFilter {
        search: Some("reach".to_string()),
        ..Default::default()
    };
    assert_eq!(Task::list(&pool, owner.id, &filter).await.unwrap().len(), 2);

    User::delete(&pool, owner.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_deadline_sort_puts_missing_last() {
    let pool = pool().await;
    let owner = user(&pool).await;
    let today = Utc::now().date_naive();

    task(&pool, owner.id, "no deadline").await;
    for (title, offset) in [("later", 5), ("sooner", 1)] {
        Task::create(
            &pool,
            owner.id,
            CreateTask {
                title: title.to_string(),
                description: "d".to_string(),
                deadline: Some(today + Duration::days(offset)),
            },
        )
        .await
        .unwrap();
    }

    let filter = TaskFilter {
        sort_by_deadline: true,
        ..Default::default()
    };
    let titles: Vec<String> = Task::list(&pool, owner.id, &filter)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, ["sooner", "later", "no deadline"]);

    User::delete(&pool, owner.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_mark_all_read_returns_prior_unread() {
    let pool = pool().await;
    let owner = user(&pool).await;

    for i in 0..3 {
        Notification::create(
            &pool,
            CreateNotification::new(owner.id, format!("note {}", i), NotificationKind::Info),
        )
        .await
        .unwrap();
    }

    assert_eq!(Notification::unread_count(&pool, owner.id).await.unwrap(), 3);
    assert_eq!(Notification::mark_all_read(&pool, owner.id).await.unwrap(), 3);
    assert_eq!(Notification::unread_count(&pool, owner.id).await.unwrap(), 0);
    assert_eq!(Notification::mark_all_read(&pool, owner.id).await.unwrap(), 0);

    let listed = Notification::list_recent(&pool, owner.id, RECENT_LIMIT).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|n| n.read));

    User::delete(&pool, owner.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_trends_cover_every_day() {
    let pool = pool().await;
    let owner = user(&pool).await;
    task(&pool, owner.id, "today").await;
    let today = Utc::now().date_naive();

    let points = analytics::trends(&pool, owner.id, TrendWindow::Week, today)
        .await
        .unwrap();

    assert_eq!(points.len(), 7);
    assert_eq!(points[0].date, TrendWindow::Week.start(today));
    assert_eq!(points[6].date, today);
    assert_eq!(points[6].created, 1);

    User::delete(&pool, owner.id).await.unwrap();
}
