#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rusqlite::Connection;
use showcase_core::{
    FeedSettings, Project, ProjectId, ProjectPage, ProjectRepository, ProjectService,
    SqliteProjectRepository, SqliteUserRepository, User, UserId, UserRepository,
};
use uuid::Uuid;

/// Fixed "today" for window defaults: 2026-06-15.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
}

/// Noon UTC of `today()`.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    noon() - Duration::days(days)
}

pub fn service(conn: &Connection) -> ProjectService<SqliteProjectRepository<'_>> {
    ProjectService::new(
        SqliteProjectRepository::try_new(conn).unwrap(),
        FeedSettings::default(),
    )
}

pub fn seed_user(conn: &Connection, email: &str) -> UserId {
    let repo = SqliteUserRepository::try_new(conn).unwrap();
    let mut user = User::new(email, noon());
    user.full_name = Some(email.split('@').next().unwrap_or(email).to_string());
    repo.create_user(&user).unwrap()
}

/// Inserts a project with fully controlled ordering fields.
pub fn seed_project(
    conn: &Connection,
    created_by_id: UserId,
    vote_count: i64,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
) -> ProjectId {
    let repo = SqliteProjectRepository::try_new(conn).unwrap();
    let project = Project {
        id: Uuid::new_v4(),
        created_by_id,
        title: format!("project {vote_count}"),
        description: Some("seeded".to_string()),
        demo_url: Some("https://demo.example.com".to_string()),
        github_url: None,
        video_url: None,
        vote_count,
        is_group_project: false,
        is_published: published_at.is_some(),
        published_at,
        created_at,
        updated_at: created_at,
    };
    repo.insert_draft(&project).unwrap()
}

/// Published project whose `published_at` equals `created_at`.
pub fn seed_published(
    conn: &Connection,
    created_by_id: UserId,
    vote_count: i64,
    created_at: DateTime<Utc>,
) -> ProjectId {
    seed_project(conn, created_by_id, vote_count, created_at, Some(created_at))
}

pub fn ids(page: &ProjectPage) -> Vec<ProjectId> {
    page.items.iter().map(|item| item.project.id).collect()
}
