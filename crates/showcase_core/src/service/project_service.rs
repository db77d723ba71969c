//! Project use-case service.
//!
//! # Responsibility
//! - Create drafts, publish them and record votes.
//! - Enforce draft visibility and edit rights.
//! - Serve the paginated feed through the query builder and page assembler.
//!
//! # Invariants
//! - Drafts never enter the feed; only published projects are listed.
//! - Anonymous viewers get "not found" for hidden drafts, authenticated
//!   non-members get `Forbidden`.
//! - Feed requests are stateless: everything needed to resume lives in the
//!   cursor handed back to the caller.

use crate::config::FeedSettings;
use crate::feed::cursor::CursorError;
use crate::feed::page::{assemble_page, ProjectPage};
use crate::feed::query::{build_feed_plan, FeedRequest, FeedSort};
use crate::model::project::{
    MemberRole, NewProject, Project, ProjectId, ProjectValidationError, ProjectWithMembers,
};
use crate::model::user::UserId;
use crate::model::utc_now_millis;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use chrono::{NaiveDate, Utc};
use log::{info, warn};
use thiserror::Error;

/// Service error for project use-cases.
#[derive(Debug, Error)]
pub enum ProjectServiceError {
    /// Bad pagination input; maps to a client error.
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error(transparent)]
    Validation(#[from] ProjectValidationError),
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error("Project access forbidden")]
    Forbidden(ProjectId),
    #[error("user already voted for project {0}")]
    AlreadyVoted(ProjectId),
    #[error("user {user_id} is already a member of project {project_id}")]
    AlreadyMember {
        project_id: ProjectId,
        user_id: UserId,
    },
    #[error(transparent)]
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    #[error("inconsistent project state: {0}")]
    InconsistentState(&'static str),
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "project",
                id,
            } => Self::ProjectNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Project service facade over repository implementations.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
    settings: FeedSettings,
}

impl<R: ProjectRepository> ProjectService<R> {
    /// Creates a service using the provided repository and feed settings.
    pub fn new(repo: R, settings: FeedSettings) -> Self {
        Self { repo, settings }
    }

    /// Creates an unpublished project owned by `created_by_id`.
    ///
    /// # Contract
    /// - Input is normalized and validated by `NewProject::into_draft`.
    /// - The creator becomes the `owner` member in the same transaction.
    pub fn create_project(
        &self,
        created_by_id: UserId,
        request: NewProject,
    ) -> Result<ProjectWithMembers, ProjectServiceError> {
        let draft = request.into_draft(created_by_id, utc_now_millis())?;
        let project_id = self.repo.insert_draft(&draft)?;
        info!(
            "event=project_create module=service status=ok project_id={} created_by_id={}",
            project_id, created_by_id
        );

        let project = self
            .repo
            .get_project(project_id)?
            .ok_or(ProjectServiceError::InconsistentState(
                "created project not found in read-back",
            ))?;
        self.with_members(project)
    }

    /// Returns a project with members if `viewer` may see it.
    ///
    /// # Errors
    /// - `Forbidden` when an authenticated viewer cannot see a draft.
    ///   Anonymous viewers get `Ok(None)` instead.
    pub fn get_project_detail(
        &self,
        project_id: ProjectId,
        viewer: Option<UserId>,
    ) -> Result<Option<ProjectWithMembers>, ProjectServiceError> {
        let Some(project) = self.repo.get_project(project_id)? else {
            return Ok(None);
        };

        let role = self.viewer_role(&project, viewer)?;
        if !can_view_project(&project, viewer, role) {
            return match viewer {
                Some(_) => Err(ProjectServiceError::Forbidden(project_id)),
                None => Ok(None),
            };
        }

        self.with_members(project).map(Some)
    }

    /// Publishes a draft on behalf of `actor`.
    ///
    /// Only the creator and `owner`/`maintainer` members may publish.
    /// Publishing an already published project leaves `published_at` as is.
    pub fn publish_project(
        &self,
        project_id: ProjectId,
        actor: UserId,
    ) -> Result<ProjectWithMembers, ProjectServiceError> {
        let project = self
            .repo
            .get_project(project_id)?
            .ok_or(ProjectServiceError::ProjectNotFound(project_id))?;

        let role = self.viewer_role(&project, Some(actor))?;
        if !can_edit_project(&project, Some(actor), role) {
            warn!(
                "event=project_publish module=service status=error project_id={} error_code=forbidden",
                project_id
            );
            return Err(ProjectServiceError::Forbidden(project_id));
        }

        if project.is_published {
            return self.with_members(project);
        }

        self.repo.mark_published(project_id, utc_now_millis())?;
        info!(
            "event=project_publish module=service status=ok project_id={}",
            project_id
        );

        let project = self
            .repo
            .get_project(project_id)?
            .ok_or(ProjectServiceError::InconsistentState(
                "published project not found in read-back",
            ))?;
        self.with_members(project)
    }

    /// Adds `user_id` to the project with `role` on behalf of `actor`.
    ///
    /// # Errors
    /// - `Forbidden` unless `actor` may edit the project.
    /// - `AlreadyMember` when the membership exists.
    pub fn add_member(
        &self,
        project_id: ProjectId,
        actor: UserId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<ProjectWithMembers, ProjectServiceError> {
        let project = self
            .repo
            .get_project(project_id)?
            .ok_or(ProjectServiceError::ProjectNotFound(project_id))?;

        let actor_role = self.viewer_role(&project, Some(actor))?;
        if !can_edit_project(&project, Some(actor), actor_role) {
            return Err(ProjectServiceError::Forbidden(project_id));
        }

        self.repo
            .add_member(project_id, user_id, role, utc_now_millis())
            .map_err(|err| match err {
                RepoError::Conflict(_) => ProjectServiceError::AlreadyMember {
                    project_id,
                    user_id,
                },
                other => other.into(),
            })?;
        info!(
            "event=project_member_add module=service status=ok project_id={} user_id={} role={}",
            project_id, user_id, role
        );
        self.with_members(project)
    }

    /// Records one vote by `voter` and returns the new vote count.
    ///
    /// Drafts are reported as not found.
    pub fn cast_vote(
        &self,
        project_id: ProjectId,
        voter: UserId,
    ) -> Result<i64, ProjectServiceError> {
        let vote_count = self
            .repo
            .record_vote(project_id, voter, utc_now_millis())
            .map_err(|err| match err {
                RepoError::Conflict(_) => ProjectServiceError::AlreadyVoted(project_id),
                other => other.into(),
            })?;
        info!(
            "event=project_vote module=service status=ok project_id={} vote_count={}",
            project_id, vote_count
        );
        Ok(vote_count)
    }

    /// Lists the public feed. Sort defaults to `top`.
    pub fn list_projects(&self, request: &FeedRequest) -> Result<ProjectPage, ProjectServiceError> {
        self.list_projects_at(request, Utc::now().date_naive())
    }

    /// Lists the public feed with an explicit "today" for window defaults.
    pub fn list_projects_at(
        &self,
        request: &FeedRequest,
        today: NaiveDate,
    ) -> Result<ProjectPage, ProjectServiceError> {
        self.list_with_default(request, FeedSort::Top, today)
    }

    /// Lists published projects created by `user_id`. Sort defaults to `new`.
    ///
    /// # Errors
    /// - `UserNotFound` when `users` has no such user.
    pub fn list_user_projects<U: UserRepository + ?Sized>(
        &self,
        users: &U,
        user_id: UserId,
        request: &FeedRequest,
    ) -> Result<ProjectPage, ProjectServiceError> {
        if users.get_user(user_id)?.is_none() {
            return Err(ProjectServiceError::UserNotFound(user_id));
        }

        let scoped = FeedRequest {
            author: Some(user_id),
            ..request.clone()
        };
        self.list_with_default(&scoped, FeedSort::New, Utc::now().date_naive())
    }

    fn list_with_default(
        &self,
        request: &FeedRequest,
        default_sort: FeedSort,
        today: NaiveDate,
    ) -> Result<ProjectPage, ProjectServiceError> {
        let plan = build_feed_plan(
            request,
            default_sort,
            self.settings.default_page_size,
            today,
        )
        .inspect_err(|err| {
            warn!(
                "event=cursor_reject module=service status=error has_cursor={} reason={}",
                request.cursor.is_some(),
                err
            );
        })?;

        let page = assemble_page(&self.repo, &plan)?;
        info!(
            "event=feed_list module=service status=ok sort={} limit={} items={} has_next={}",
            plan.sort,
            plan.limit,
            page.items.len(),
            page.next_cursor.is_some()
        );
        Ok(page)
    }

    fn viewer_role(
        &self,
        project: &Project,
        viewer: Option<UserId>,
    ) -> Result<Option<MemberRole>, ProjectServiceError> {
        match viewer {
            Some(user_id) => Ok(self.repo.get_member_role(project.id, user_id)?),
            None => Ok(None),
        }
    }

    fn with_members(&self, project: Project) -> Result<ProjectWithMembers, ProjectServiceError> {
        let mut members = self.repo.members_for_projects(&[project.id])?;
        Ok(ProjectWithMembers {
            members: members.remove(&project.id).unwrap_or_default(),
            project,
        })
    }
}

/// Published projects are public; drafts are visible to the creator and members.
pub fn can_view_project(
    project: &Project,
    viewer: Option<UserId>,
    role: Option<MemberRole>,
) -> bool {
    if project.is_published {
        return true;
    }
    match viewer {
        None => false,
        Some(user_id) => project.created_by_id == user_id || role.is_some(),
    }
}

/// Only the creator and `owner`/`maintainer` members may edit.
pub fn can_edit_project(
    project: &Project,
    actor: Option<UserId>,
    role: Option<MemberRole>,
) -> bool {
    match actor {
        None => false,
        Some(user_id) => {
            project.created_by_id == user_id || role.is_some_and(MemberRole::can_edit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{can_edit_project, can_view_project};
    use crate::model::project::{MemberRole, Project};
    use chrono::Utc;
    use uuid::Uuid;

    fn project(published: bool) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            created_by_id: Uuid::new_v4(),
            title: "Rover".into(),
            description: None,
            demo_url: None,
            github_url: None,
            video_url: None,
            vote_count: 0,
            is_group_project: false,
            is_published: published,
            published_at: published.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn published_projects_are_visible_to_everyone() {
        let published = project(true);
        assert!(can_view_project(&published, None, None));
        assert!(can_view_project(&published, Some(Uuid::new_v4()), None));
    }

    #[test]
    fn drafts_are_visible_to_creator_and_members_only() {
        let draft = project(false);
        assert!(!can_view_project(&draft, None, None));
        assert!(!can_view_project(&draft, Some(Uuid::new_v4()), None));
        assert!(can_view_project(&draft, Some(draft.created_by_id), None));
        assert!(can_view_project(
            &draft,
            Some(Uuid::new_v4()),
            Some(MemberRole::Contributor)
        ));
    }

    #[test]
    fn edit_requires_creator_or_editing_role() {
        let draft = project(false);
        assert!(!can_edit_project(&draft, None, Some(MemberRole::Owner)));
        assert!(can_edit_project(&draft, Some(draft.created_by_id), None));
        assert!(can_edit_project(&draft, Some(Uuid::new_v4()), Some(MemberRole::Maintainer)));
        assert!(!can_edit_project(
            &draft,
            Some(Uuid::new_v4()),
            Some(MemberRole::Contributor)
        ));
    }
}
