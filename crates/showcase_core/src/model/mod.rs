//! Domain model for showcase projects, members and users.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own input normalization for project drafts.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - A project is published iff it carries a `published_at` timestamp.
//! - Timestamps are UTC with millisecond precision.

use chrono::{DateTime, Utc};

pub mod project;
pub mod user;

/// Current UTC time truncated to the millisecond precision used in storage.
pub fn utc_now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
