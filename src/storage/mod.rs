//! Storage of finished tasks is organized through [task_log::FileTaskLog].
//! The basic idea is:
//!   - There is a single append-only file inside of the storage directory.
//!   - Every finished task becomes one `start;end;title;remarks` row.
//!   - Timestamps are RFC 3339 in UTC, so the file reads the same in every locale.

pub mod row;
pub mod task_log;
