//! Project domain model.
//!
//! # Responsibility
//! - Define the canonical project record and its member projection.
//! - Normalize and validate draft creation input.
//!
//! # Invariants
//! - `id` is stable and never reused for another project.
//! - `is_published == published_at.is_some()`.
//! - `vote_count` is never negative.

use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of a showcase project.
pub type ProjectId = Uuid;

const TITLE_MAX_CHARS: usize = 255;
const DESCRIPTION_MAX_CHARS: usize = 5000;
const URL_MAX_CHARS: usize = 2048;

static HTTP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^\s/?#]+").expect("valid http url regex"));

/// Canonical project record as stored in `projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub created_by_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub demo_url: Option<String>,
    pub github_url: Option<String>,
    pub video_url: Option<String>,
    pub vote_count: i64,
    pub is_group_project: bool,
    pub is_published: bool,
    /// Set exactly when the project is published.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Checks record-level invariants shared by write and read paths.
    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        if self.is_published != self.published_at.is_some() {
            return Err(ProjectValidationError::PublicationStateMismatch);
        }
        if self.vote_count < 0 {
            return Err(ProjectValidationError::NegativeVoteCount(self.vote_count));
        }
        Ok(())
    }
}

/// Role of a user inside one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Creator of the project.
    Owner,
    /// Can edit and publish.
    Maintainer,
    /// Listed on the project, read access to drafts only.
    Contributor,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Maintainer => "maintainer",
            Self::Contributor => "contributor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(Self::Owner),
            "maintainer" => Some(Self::Maintainer),
            "contributor" => Some(Self::Contributor),
            _ => None,
        }
    }

    /// Whether members with this role may edit or publish the project.
    pub fn can_edit(self) -> bool {
        matches!(self, Self::Owner | Self::Maintainer)
    }
}

impl Display for MemberRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Member projection attached to list items and details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub user_id: UserId,
    pub role: MemberRole,
    pub full_name: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// Project plus its members, as returned by detail and feed endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectWithMembers {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
}

/// Validation failures for project input and persisted records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectValidationError {
    #[error("title must not be blank")]
    BlankTitle,
    #[error("title exceeds 255 characters")]
    TitleTooLong,
    #[error("description must not be blank")]
    BlankDescription,
    #[error("description exceeds 5000 characters")]
    DescriptionTooLong,
    #[error("{field} exceeds 2048 characters")]
    UrlTooLong { field: &'static str },
    #[error("{field} must be a valid http(s) URL")]
    InvalidUrl { field: &'static str },
    #[error("provide at least one of demo_url, github_url, or video_url")]
    MissingProjectUrl,
    #[error("is_published must match presence of published_at")]
    PublicationStateMismatch,
    #[error("vote_count must not be negative, got {0}")]
    NegativeVoteCount(i64),
}

/// Draft creation input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewProject {
    /// Trimmed before validation.
    pub title: String,
    /// Trimmed before validation.
    pub description: String,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub is_group_project: bool,
}

impl NewProject {
    /// Validates the input and builds an unpublished project owned by `created_by_id`.
    ///
    /// # Contract
    /// - Title and description are trimmed; blank values are rejected.
    /// - Blank URLs are treated as absent; present URLs must be `http(s)`.
    /// - At least one URL must remain after normalization.
    pub fn into_draft(
        self,
        created_by_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Project, ProjectValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ProjectValidationError::BlankTitle);
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(ProjectValidationError::TitleTooLong);
        }

        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(ProjectValidationError::BlankDescription);
        }
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(ProjectValidationError::DescriptionTooLong);
        }

        let demo_url = normalize_url("demo_url", self.demo_url)?;
        let github_url = normalize_url("github_url", self.github_url)?;
        let video_url = normalize_url("video_url", self.video_url)?;
        if demo_url.is_none() && github_url.is_none() && video_url.is_none() {
            return Err(ProjectValidationError::MissingProjectUrl);
        }

        Ok(Project {
            id: Uuid::new_v4(),
            created_by_id,
            title,
            description: Some(description),
            demo_url,
            github_url,
            video_url,
            vote_count: 0,
            is_group_project: self.is_group_project,
            is_published: false,
            published_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

fn normalize_url(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<String>, ProjectValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > URL_MAX_CHARS {
        return Err(ProjectValidationError::UrlTooLong { field });
    }
    if !HTTP_URL_RE.is_match(trimmed) {
        return Err(ProjectValidationError::InvalidUrl { field });
    }
    Ok(Some(trimmed.to_string()))
}
