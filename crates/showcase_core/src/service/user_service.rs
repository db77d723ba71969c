//! User use-case service.

use crate::model::user::{User, UserId, UserUpdate, UserValidationError};
use crate::model::utc_now_millis;
use crate::repo::user_repo::UserRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error(transparent)]
    Validation(#[from] UserValidationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Thin facade over user persistence.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_user(&self, user: &User) -> RepoResult<UserId> {
        self.repo.create_user(user)
    }

    pub fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.repo.get_user(id)
    }

    /// Replaces the caller's profile fields and bumps `updated_at`.
    ///
    /// Returns `Ok(None)` when no user has `id`.
    pub fn update_user(
        &self,
        id: UserId,
        update: UserUpdate,
    ) -> Result<Option<User>, UserServiceError> {
        let update = update.normalized()?;
        let found = self.repo.update_profile(
            id,
            &update.full_name,
            update.profile_picture_url.as_deref(),
            utc_now_millis(),
        )?;
        if !found {
            return Ok(None);
        }

        info!("event=user_update module=service status=ok user_id={}", id);
        Ok(self.repo.get_user(id)?)
    }
}
