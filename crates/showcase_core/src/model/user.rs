//! User model and profile updates.
//!
//! Accounts are owned by the external auth layer; the core only needs
//! identity and the public profile fields shown next to project members,
//! which users may edit themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of a platform user.
pub type UserId = Uuid;

/// Platform user as stored in `users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Platform role, `student` unless provisioned otherwise.
    pub role: String,
    pub full_name: Option<String>,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a student user with a generated id.
    pub fn new(email: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            role: "student".to_string(),
            full_name: None,
            profile_picture_url: None,
            created_at,
            updated_at: created_at,
        }
    }
}

const FULL_NAME_MAX_CHARS: usize = 255;
const PICTURE_URL_MAX_CHARS: usize = 2048;

/// Rejected profile update input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserValidationError {
    #[error("full_name must not be blank")]
    BlankFullName,
    #[error("full_name must be at most 255 characters")]
    FullNameTooLong,
    #[error("profile_picture_url must be at most 2048 characters")]
    PictureUrlTooLong,
}

/// Profile fields a user may change about themselves.
///
/// Both fields are replaced: a missing picture clears the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    pub full_name: String,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

impl UserUpdate {
    /// Trims the name and checks both length limits.
    pub fn normalized(self) -> Result<Self, UserValidationError> {
        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(UserValidationError::BlankFullName);
        }
        if full_name.chars().count() > FULL_NAME_MAX_CHARS {
            return Err(UserValidationError::FullNameTooLong);
        }
        if let Some(url) = &self.profile_picture_url {
            if url.chars().count() > PICTURE_URL_MAX_CHARS {
                return Err(UserValidationError::PictureUrlTooLong);
            }
        }
        Ok(Self {
            full_name,
            profile_picture_url: self.profile_picture_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{UserUpdate, UserValidationError};

    #[test]
    fn full_name_is_trimmed() {
        let update = UserUpdate {
            full_name: "  Ada Lovelace ".to_string(),
            profile_picture_url: None,
        }
        .normalized()
        .unwrap();
        assert_eq!(update.full_name, "Ada Lovelace");
    }

    #[test]
    fn length_limits_are_enforced() {
        let blank = UserUpdate {
            full_name: "   ".to_string(),
            profile_picture_url: None,
        };
        assert_eq!(blank.normalized(), Err(UserValidationError::BlankFullName));

        let long_name = UserUpdate {
            full_name: "a".repeat(256),
            profile_picture_url: None,
        };
        assert_eq!(
            long_name.normalized(),
            Err(UserValidationError::FullNameTooLong)
        );

        let long_url = UserUpdate {
            full_name: "Ada".to_string(),
            profile_picture_url: Some(format!("https://cdn.example.com/{}", "x".repeat(2048))),
        };
        assert_eq!(
            long_url.normalized(),
            Err(UserValidationError::PictureUrlTooLong)
        );

        let edge = UserUpdate {
            full_name: "é".repeat(255),
            profile_picture_url: Some("p".repeat(2048)),
        };
        assert!(edge.normalized().is_ok());
    }
}
