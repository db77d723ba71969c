//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist drafts, publication, membership and votes.
//! - Translate `FeedQuery` values into keyset-paginated SQL.
//! - Load members for many projects in one query.
//!
//! # Invariants
//! - Draft insertion also inserts the creator as `owner` member, atomically.
//! - A vote row and its `vote_count` increment commit together.
//! - Ids are bound as canonical lowercase strings, so SQL text ordering
//!   matches `Uuid` ordering.

use crate::feed::query::{FeedPredicate, FeedQuery, SortKey, SortValue};
use crate::model::project::{MemberRole, Project, ProjectId, ProjectMember};
use crate::model::user::UserId;
use crate::repo::{
    ensure_tables, from_millis, parse_bool, parse_uuid, to_millis, RepoError, RepoResult,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    created_by_id,
    title,
    description,
    demo_url,
    github_url,
    video_url,
    vote_count,
    is_group_project,
    is_published,
    published_at,
    created_at,
    updated_at
FROM projects";

const REQUIRED_TABLES: &[&str] = &["users", "projects", "project_members", "votes"];

/// Storage port for project use-cases.
pub trait ProjectRepository {
    /// Inserts an unpublished project and its owner membership.
    fn insert_draft(&self, project: &Project) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn get_member_role(&self, project_id: ProjectId, user_id: UserId)
        -> RepoResult<Option<MemberRole>>;
    /// Adds one membership; an existing membership is a `Conflict`.
    fn add_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        role: MemberRole,
        added_at: DateTime<Utc>,
    ) -> RepoResult<()>;
    /// Members of every listed project, ordered by `added_at`.
    ///
    /// Every requested id is present in the result, possibly with no members.
    fn members_for_projects(
        &self,
        project_ids: &[ProjectId],
    ) -> RepoResult<HashMap<ProjectId, Vec<ProjectMember>>>;
    /// Executes a feed query, returning at most `query.fetch_limit` rows.
    fn fetch_feed(&self, query: &FeedQuery) -> RepoResult<Vec<Project>>;
    /// Publishes a draft. Returns `false` when it was already published.
    fn mark_published(&self, id: ProjectId, published_at: DateTime<Utc>) -> RepoResult<bool>;
    /// Records one vote and returns the new `vote_count`.
    fn record_vote(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        voted_at: DateTime<Utc>,
    ) -> RepoResult<i64>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn insert_draft(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate().map_err(|err| RepoError::InvalidData(err.to_string()))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO projects (
                id,
                created_by_id,
                title,
                description,
                demo_url,
                github_url,
                video_url,
                vote_count,
                is_group_project,
                is_published,
                published_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                project.id.to_string(),
                project.created_by_id.to_string(),
                project.title.as_str(),
                project.description.as_deref(),
                project.demo_url.as_deref(),
                project.github_url.as_deref(),
                project.video_url.as_deref(),
                project.vote_count,
                project.is_group_project,
                project.is_published,
                project.published_at.map(to_millis),
                to_millis(project.created_at),
                to_millis(project.updated_at),
            ],
        )?;
        insert_member(
            &tx,
            project.id,
            project.created_by_id,
            MemberRole::Owner,
            project.created_at,
        )?;
        tx.commit()?;

        Ok(project.id)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn get_member_role(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> RepoResult<Option<MemberRole>> {
        let role: Option<String> = self
            .conn
            .query_row(
                "SELECT role
                 FROM project_members
                 WHERE project_id = ?1 AND user_id = ?2;",
                params![project_id.to_string(), user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        role.map(|value| parse_role(&value)).transpose()
    }

    fn add_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        role: MemberRole,
        added_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM project_members
                WHERE project_id = ?1 AND user_id = ?2
            );",
            params![project_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 1 {
            return Err(RepoError::Conflict("user is already a project member"));
        }
        insert_member(&tx, project_id, user_id, role, added_at)?;
        tx.commit()?;
        Ok(())
    }

    fn members_for_projects(
        &self,
        project_ids: &[ProjectId],
    ) -> RepoResult<HashMap<ProjectId, Vec<ProjectMember>>> {
        let mut members: HashMap<ProjectId, Vec<ProjectMember>> =
            project_ids.iter().map(|id| (*id, Vec::new())).collect();
        if project_ids.is_empty() {
            return Ok(members);
        }

        let placeholders = vec!["?"; project_ids.len()].join(", ");
        let sql = format!(
            "SELECT
                pm.project_id,
                pm.user_id,
                pm.role,
                u.full_name,
                u.profile_picture_url
             FROM project_members pm
             INNER JOIN users u ON u.id = pm.user_id
             WHERE pm.project_id IN ({placeholders})
             ORDER BY pm.project_id ASC, pm.added_at ASC, pm.rowid ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(
            project_ids.iter().map(|id| id.to_string()),
        ))?;

        while let Some(row) = rows.next()? {
            let project_text: String = row.get("project_id")?;
            let project_id = parse_uuid("project_members.project_id", &project_text)?;
            let user_text: String = row.get("user_id")?;
            let role_text: String = row.get("role")?;
            let member = ProjectMember {
                user_id: parse_uuid("project_members.user_id", &user_text)?,
                role: parse_role(&role_text)?,
                full_name: row.get("full_name")?,
                profile_picture_url: row.get("profile_picture_url")?,
            };
            members.entry(project_id).or_default().push(member);
        }

        Ok(members)
    }

    fn fetch_feed(&self, query: &FeedQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        for predicate in &query.predicates {
            push_predicate(&mut sql, &mut bind_values, predicate);
        }

        if !query.order.is_empty() {
            let order = query
                .order
                .iter()
                .map(|key| format!("{} DESC", sort_column(*key)))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(query.fetch_limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }

        Ok(projects)
    }

    fn mark_published(&self, id: ProjectId, published_at: DateTime<Utc>) -> RepoResult<bool> {
        let millis = to_millis(published_at);
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                is_published = 1,
                published_at = ?1,
                updated_at = ?1
             WHERE id = ?2
               AND is_published = 0;",
            params![millis, id.to_string()],
        )?;

        if changed == 0 && self.get_project(id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "project",
                id,
            });
        }

        Ok(changed == 1)
    }

    fn record_vote(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        voted_at: DateTime<Utc>,
    ) -> RepoResult<i64> {
        let project_text = project_id.to_string();
        let user_text = user_id.to_string();
        let tx = self.conn.unchecked_transaction()?;

        let published: Option<i64> = tx
            .query_row(
                "SELECT is_published FROM projects WHERE id = ?1;",
                [project_text.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if published != Some(1) {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project_id,
            });
        }

        let already_voted: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM votes
                WHERE user_id = ?1 AND project_id = ?2
            );",
            params![user_text.as_str(), project_text.as_str()],
            |row| row.get(0),
        )?;
        if already_voted == 1 {
            return Err(RepoError::Conflict("user already voted for this project"));
        }

        tx.execute(
            "INSERT INTO votes (id, user_id, project_id, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                Uuid::new_v4().to_string(),
                user_text.as_str(),
                project_text.as_str(),
                to_millis(voted_at),
            ],
        )?;
        tx.execute(
            "UPDATE projects
             SET vote_count = vote_count + 1
             WHERE id = ?1;",
            [project_text.as_str()],
        )?;
        let vote_count: i64 = tx.query_row(
            "SELECT vote_count FROM projects WHERE id = ?1;",
            [project_text.as_str()],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(vote_count)
    }
}

fn insert_member(
    conn: &Connection,
    project_id: ProjectId,
    user_id: UserId,
    role: MemberRole,
    added_at: DateTime<Utc>,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO project_members (id, project_id, user_id, role, added_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            Uuid::new_v4().to_string(),
            project_id.to_string(),
            user_id.to_string(),
            role.as_str(),
            to_millis(added_at),
        ],
    )?;
    Ok(())
}

fn push_predicate(sql: &mut String, bind_values: &mut Vec<Value>, predicate: &FeedPredicate) {
    match predicate {
        FeedPredicate::Published => sql.push_str(" AND is_published = 1"),
        FeedPredicate::CreatedBy(user_id) => {
            sql.push_str(" AND created_by_id = ?");
            bind_values.push(Value::Text(user_id.to_string()));
        }
        FeedPredicate::PublishedWithin {
            start,
            end_exclusive,
        } => {
            sql.push_str(" AND published_at IS NOT NULL");
            sql.push_str(" AND published_at >= ? AND published_at < ?");
            bind_values.push(Value::Integer(to_millis(*start)));
            bind_values.push(Value::Integer(to_millis(*end_exclusive)));
        }
        FeedPredicate::KeysetAfter(boundary) => {
            if boundary.is_empty() {
                return;
            }
            // (k0 < v0) OR (k0 = v0 AND k1 < v1) OR ... for a descending order.
            let mut branches = Vec::with_capacity(boundary.len());
            for (depth, (key, value)) in boundary.iter().enumerate() {
                let mut terms = Vec::with_capacity(depth + 1);
                for (prefix_key, prefix_value) in &boundary[..depth] {
                    terms.push(format!("{} = ?", sort_column(*prefix_key)));
                    bind_values.push(sort_value(prefix_value));
                }
                terms.push(format!("{} < ?", sort_column(*key)));
                bind_values.push(sort_value(value));
                branches.push(format!("({})", terms.join(" AND ")));
            }
            sql.push_str(" AND (");
            sql.push_str(&branches.join(" OR "));
            sql.push(')');
        }
    }
}

fn sort_column(key: SortKey) -> &'static str {
    match key {
        SortKey::VoteCount => "vote_count",
        SortKey::CreatedAt => "created_at",
        SortKey::Id => "id",
    }
}

fn sort_value(value: &SortValue) -> Value {
    match value {
        SortValue::Count(count) => Value::Integer(*count),
        SortValue::Timestamp(at) => Value::Integer(to_millis(*at)),
        SortValue::Id(id) => Value::Text(id.to_string()),
    }
}

fn parse_role(value: &str) -> RepoResult<MemberRole> {
    MemberRole::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid member role `{value}` in project_members.role"))
    })
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id_text: String = row.get("id")?;
    let creator_text: String = row.get("created_by_id")?;
    let published_at = match row.get::<_, Option<i64>>("published_at")? {
        Some(value) => Some(from_millis("projects.published_at", value)?),
        None => None,
    };

    let project = Project {
        id: parse_uuid("projects.id", &id_text)?,
        created_by_id: parse_uuid("projects.created_by_id", &creator_text)?,
        title: row.get("title")?,
        description: row.get("description")?,
        demo_url: row.get("demo_url")?,
        github_url: row.get("github_url")?,
        video_url: row.get("video_url")?,
        vote_count: row.get("vote_count")?,
        is_group_project: parse_bool("projects.is_group_project", row.get("is_group_project")?)?,
        is_published: parse_bool("projects.is_published", row.get("is_published")?)?,
        published_at,
        created_at: from_millis("projects.created_at", row.get("created_at")?)?,
        updated_at: from_millis("projects.updated_at", row.get("updated_at")?)?,
    };
    project
        .validate()
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    Ok(project)
}
