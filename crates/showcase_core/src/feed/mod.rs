//! Feed pagination engine.
//!
//! # Responsibility
//! - Resolve sort mode, date window and cursor into an explicit `FeedQuery`.
//! - Encode/decode opaque page-boundary cursors.
//! - Assemble pages from an over-fetched storage result.
//!
//! # Invariants
//! - Ordering is total: `new` is `created_at, id` and `top` is
//!   `vote_count, created_at, id`, all descending.
//! - A `top` pagination session keeps the date window it started with; the
//!   window travels inside every cursor of that session.
//! - Every pagination input failure surfaces as `CursorError`.
//! - Cursors are obscured, not signed. They are always re-validated.

pub mod cursor;
pub mod page;
pub mod query;
pub mod window;

pub use cursor::{decode_cursor, encode_cursor, CursorError, CursorPayload};
pub use page::{assemble_page, ProjectPage};
pub use query::{
    build_feed_plan, clamp_limit, FeedCursor, FeedPlan, FeedPredicate, FeedQuery, FeedRequest,
    FeedSort, SortKey, SortValue,
};
pub use window::DateWindow;
