//! Page assembly over an over-fetched feed query.
//!
//! # Invariants
//! - At most `plan.limit` items are returned, in storage order.
//! - Members are loaded with one batched lookup for the trimmed rows.
//! - `next_cursor` is present iff more rows existed past the page.

use crate::feed::query::{FeedCursor, FeedPlan};
use crate::model::project::{Project, ProjectId, ProjectWithMembers};
use crate::repo::project_repo::ProjectRepository;
use crate::service::project_service::ProjectServiceError;
use log::debug;
use serde::Serialize;

/// One feed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectPage {
    pub items: Vec<ProjectWithMembers>,
    /// Opaque continuation token; absent when the feed is exhausted.
    pub next_cursor: Option<String>,
}

/// Runs `plan` against `repo` and builds the caller-visible page.
pub fn assemble_page<R: ProjectRepository + ?Sized>(
    repo: &R,
    plan: &FeedPlan,
) -> Result<ProjectPage, ProjectServiceError> {
    let rows = repo.fetch_feed(&plan.query)?;
    let (projects, has_more) = split_page(rows, plan.limit);

    let next_cursor = match projects.last() {
        Some(last) if has_more => Some(FeedCursor::at(last, plan.sort, plan.window)?.encode()),
        _ => None,
    };

    let ids: Vec<ProjectId> = projects.iter().map(|project| project.id).collect();
    let mut members = repo.members_for_projects(&ids)?;
    let items = projects
        .into_iter()
        .map(|project| ProjectWithMembers {
            members: members.remove(&project.id).unwrap_or_default(),
            project,
        })
        .collect::<Vec<_>>();

    debug!(
        "event=feed_page module=feed status=ok sort={} limit={} items={} has_more={}",
        plan.sort,
        plan.limit,
        items.len(),
        has_more
    );

    Ok(ProjectPage { items, next_cursor })
}

/// Trims the sentinel row and reports whether it was present.
fn split_page(mut rows: Vec<Project>, limit: u32) -> (Vec<Project>, bool) {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    (rows, has_more)
}
