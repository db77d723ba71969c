//! Feed query builder.
//!
//! # Responsibility
//! - Clamp page size, resolve the `top` date window and validate cursors
//!   against the request they are replayed with.
//! - Produce a storage-agnostic `FeedQuery` (predicates, order, fetch size).
//!
//! # Invariants
//! - The fetch size is always `limit + 1`; the extra row only signals
//!   continuation and is never returned to callers.
//! - A cursor is accepted only if its sort, key set, field types and (for
//!   `top`) embedded window all match the current request.

use crate::feed::cursor::{decode_cursor, encode_cursor, CursorError, CursorPayload};
use crate::feed::window::DateWindow;
use crate::model::project::{Project, ProjectId};
use crate::model::user::UserId;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Smallest page size accepted after clamping.
pub const MIN_PAGE_SIZE: u32 = 1;
/// Largest page size accepted after clamping.
pub const MAX_PAGE_SIZE: u32 = 100;

const NEW_CURSOR_KEYS: &[&str] = &["sort", "id", "created_at"];
const TOP_CURSOR_KEYS: &[&str] = &[
    "sort",
    "id",
    "vote_count",
    "created_at",
    "published_from",
    "published_to",
];

const NEW_ORDER: &[SortKey] = &[SortKey::CreatedAt, SortKey::Id];
const TOP_ORDER: &[SortKey] = &[SortKey::VoteCount, SortKey::CreatedAt, SortKey::Id];

/// Feed ordering mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedSort {
    /// Vote-ranked within a publication date window.
    #[default]
    Top,
    /// Reverse-chronological by creation time.
    New,
}

impl FeedSort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::New => "new",
        }
    }

    /// Sort keys in priority order, all descending.
    pub fn sort_keys(self) -> &'static [SortKey] {
        match self {
            Self::Top => TOP_ORDER,
            Self::New => NEW_ORDER,
        }
    }

    fn cursor_keys(self) -> &'static [&'static str] {
        match self {
            Self::Top => TOP_CURSOR_KEYS,
            Self::New => NEW_CURSOR_KEYS,
        }
    }
}

impl Display for FeedSort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project column participating in feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    VoteCount,
    CreatedAt,
    /// Final tie-break; ids compare by canonical byte/string order.
    Id,
}

/// Boundary value for one `SortKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortValue {
    Count(i64),
    Timestamp(DateTime<Utc>),
    Id(Uuid),
}

/// Filter understood by the project storage port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedPredicate {
    /// `is_published = true`.
    Published,
    /// Restricts to one creator.
    CreatedBy(UserId),
    /// `start <= published_at < end_exclusive`.
    PublishedWithin {
        start: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    },
    /// Rows strictly after the boundary in lexicographic descending order
    /// over the listed keys.
    KeysetAfter(Vec<(SortKey, SortValue)>),
}

/// Explicit storage request produced by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Conjunction of filters.
    pub predicates: Vec<FeedPredicate>,
    /// Descending compound order.
    pub order: &'static [SortKey],
    /// Maximum rows to fetch, page size plus the continuation sentinel.
    pub fetch_limit: u32,
}

/// Caller-facing list parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedRequest {
    /// `None` uses the endpoint default.
    pub sort: Option<FeedSort>,
    /// `None` uses the configured page size; other values are clamped.
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    /// Only used for `top`.
    pub published_from: Option<NaiveDate>,
    /// Only used for `top`.
    pub published_to: Option<NaiveDate>,
    pub author: Option<UserId>,
}

/// Resolved request, ready for storage and page assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPlan {
    pub sort: FeedSort,
    /// Page size returned to the caller.
    pub limit: u32,
    /// Active window, present only for `top`.
    pub window: Option<DateWindow>,
    pub query: FeedQuery,
}

/// Validated page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCursor {
    New {
        id: ProjectId,
        created_at: DateTime<Utc>,
    },
    Top {
        id: ProjectId,
        vote_count: i64,
        created_at: DateTime<Utc>,
        window: DateWindow,
    },
}

impl FeedCursor {
    /// Boundary positioned at `project` for the given sort.
    ///
    /// # Errors
    /// - `top` requires the active window; without it the cursor is invalid.
    pub fn at(
        project: &Project,
        sort: FeedSort,
        window: Option<DateWindow>,
    ) -> Result<Self, CursorError> {
        match sort {
            FeedSort::New => Ok(Self::New {
                id: project.id,
                created_at: project.created_at,
            }),
            FeedSort::Top => {
                let window = window.ok_or_else(CursorError::invalid_cursor)?;
                Ok(Self::Top {
                    id: project.id,
                    vote_count: project.vote_count,
                    created_at: project.created_at,
                    window,
                })
            }
        }
    }

    pub fn sort(&self) -> FeedSort {
        match self {
            Self::New { .. } => FeedSort::New,
            Self::Top { .. } => FeedSort::Top,
        }
    }

    /// Boundary value for `key`, if that key belongs to this cursor's order.
    pub fn value(&self, key: SortKey) -> Option<SortValue> {
        match (self, key) {
            (Self::New { id, .. } | Self::Top { id, .. }, SortKey::Id) => Some(SortValue::Id(*id)),
            (
                Self::New { created_at, .. } | Self::Top { created_at, .. },
                SortKey::CreatedAt,
            ) => Some(SortValue::Timestamp(*created_at)),
            (Self::Top { vote_count, .. }, SortKey::VoteCount) => {
                Some(SortValue::Count(*vote_count))
            }
            (Self::New { .. }, SortKey::VoteCount) => None,
        }
    }

    pub fn to_payload(&self) -> CursorPayload {
        let mut payload = CursorPayload::new();
        payload.insert("sort".into(), Value::from(self.sort().as_str()));
        match self {
            Self::New { id, created_at } => {
                payload.insert("id".into(), Value::from(id.to_string()));
                payload.insert("created_at".into(), Value::from(format_timestamp(created_at)));
            }
            Self::Top {
                id,
                vote_count,
                created_at,
                window,
            } => {
                payload.insert("id".into(), Value::from(id.to_string()));
                payload.insert("vote_count".into(), Value::from(*vote_count));
                payload.insert("created_at".into(), Value::from(format_timestamp(created_at)));
                payload.insert(
                    "published_from".into(),
                    Value::from(window.from().to_string()),
                );
                payload.insert("published_to".into(), Value::from(window.to().to_string()));
            }
        }
        payload
    }

    /// Opaque token for clients.
    pub fn encode(&self) -> String {
        encode_cursor(&self.to_payload())
    }

    /// Validates a decoded payload against the current request.
    ///
    /// # Errors
    /// - `sort_mismatch` when the payload was issued for another sort.
    /// - `invalid_cursor` for a wrong key set, unparsable fields, or a `top`
    ///   window different from `window`.
    pub fn from_payload(
        payload: &CursorPayload,
        sort: FeedSort,
        window: Option<DateWindow>,
    ) -> Result<Self, CursorError> {
        match payload.get("sort") {
            Some(Value::String(value)) if value == sort.as_str() => {}
            Some(Value::String(_)) => return Err(CursorError::sort_mismatch()),
            _ => return Err(CursorError::invalid_cursor()),
        }

        let expected = sort.cursor_keys();
        if payload.len() != expected.len() || !expected.iter().all(|key| payload.contains_key(*key))
        {
            return Err(CursorError::invalid_cursor());
        }

        let id = str_field(payload, "id")
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or_else(CursorError::invalid_cursor)?;
        let created_at = str_field(payload, "created_at")
            .and_then(parse_timestamp)
            .ok_or_else(CursorError::invalid_cursor)?;

        match sort {
            FeedSort::New => Ok(Self::New { id, created_at }),
            FeedSort::Top => {
                let vote_count = payload
                    .get("vote_count")
                    .and_then(Value::as_i64)
                    .ok_or_else(CursorError::invalid_cursor)?;
                let embedded = embedded_window(payload).ok_or_else(CursorError::invalid_cursor)?;
                if window != Some(embedded) {
                    return Err(CursorError::invalid_cursor());
                }
                Ok(Self::Top {
                    id,
                    vote_count,
                    created_at,
                    window: embedded,
                })
            }
        }
    }
}

/// Clamps a requested page size into `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`.
pub fn clamp_limit(limit: i64) -> u32 {
    let clamped = limit.clamp(i64::from(MIN_PAGE_SIZE), i64::from(MAX_PAGE_SIZE));
    u32::try_from(clamped).unwrap_or(MAX_PAGE_SIZE)
}

/// Resolves `request` into a storage query.
///
/// # Contract
/// - `new` ignores `published_from`/`published_to`.
/// - `top` without explicit dates resumes with the window embedded in the
///   cursor when one can be read, otherwise defaults relative to `today`.
///
/// # Errors
/// - Any `CursorError` from window resolution or cursor validation.
pub fn build_feed_plan(
    request: &FeedRequest,
    default_sort: FeedSort,
    default_limit: u32,
    today: NaiveDate,
) -> Result<FeedPlan, CursorError> {
    let sort = request.sort.unwrap_or(default_sort);
    let limit = clamp_limit(request.limit.unwrap_or(i64::from(default_limit)));

    let window = match sort {
        FeedSort::New => None,
        FeedSort::Top => {
            let resumed = match (
                request.cursor.as_deref(),
                request.published_from,
                request.published_to,
            ) {
                (Some(cursor), None, None) => window_from_cursor(cursor),
                _ => None,
            };
            match resumed {
                Some(window) => Some(window),
                None => Some(DateWindow::resolve(
                    request.published_from,
                    request.published_to,
                    today,
                )?),
            }
        }
    };

    let boundary = match request.cursor.as_deref() {
        Some(cursor) => Some(FeedCursor::from_payload(
            &decode_cursor(cursor)?,
            sort,
            window,
        )?),
        None => None,
    };

    let mut predicates = vec![FeedPredicate::Published];
    if let Some(author) = request.author {
        predicates.push(FeedPredicate::CreatedBy(author));
    }
    if let Some(window) = window {
        let (start, end_exclusive) = window.bounds();
        predicates.push(FeedPredicate::PublishedWithin {
            start,
            end_exclusive,
        });
    }
    if let Some(boundary) = boundary {
        let values = sort
            .sort_keys()
            .iter()
            .filter_map(|key| boundary.value(*key).map(|value| (*key, value)))
            .collect();
        predicates.push(FeedPredicate::KeysetAfter(values));
    }

    Ok(FeedPlan {
        sort,
        limit,
        window,
        query: FeedQuery {
            predicates,
            order: sort.sort_keys(),
            fetch_limit: limit + 1,
        },
    })
}

fn window_from_cursor(cursor: &str) -> Option<DateWindow> {
    decode_cursor(cursor)
        .ok()
        .and_then(|payload| embedded_window(&payload))
}

fn embedded_window(payload: &CursorPayload) -> Option<DateWindow> {
    let from = str_field(payload, "published_from")?.parse::<NaiveDate>().ok()?;
    let to = str_field(payload, "published_to")?.parse::<NaiveDate>().ok()?;
    DateWindow::new(from, to).ok()
}

fn str_field<'a>(payload: &'a CursorPayload, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
