//! Core domain logic for the project showcase.
//! This crate is the single source of truth for feed ordering, cursor
//! validation and project visibility rules.

pub mod config;
pub mod db;
pub mod feed;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, FeedSettings, ShowcaseConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use feed::{
    build_feed_plan, CursorError, DateWindow, FeedCursor, FeedPlan, FeedQuery, FeedRequest,
    FeedSort, ProjectPage,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::project::{
    MemberRole, NewProject, Project, ProjectId, ProjectMember, ProjectValidationError,
    ProjectWithMembers,
};
pub use model::user::{User, UserId, UserUpdate, UserValidationError};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::project_service::{ProjectService, ProjectServiceError};
pub use service::user_service::{UserService, UserServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
