use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::tracker::{task::Task, TrackerError};

pub const FIELD_SEPARATOR: char = ';';

/// Reasons a single log row can't be turned back into a task.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid timestamp `{value}`: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },
    #[error("row is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error(transparent)]
    Task(#[from] TrackerError),
}

/// Serializes a closed task into `start;end;title;remarks\n`. Returns [None] for open tasks.
///
/// Separators inside the title or remarks aren't escaped, such rows won't parse back.
pub fn encode_row(task: &Task) -> Option<String> {
    let end_time = task.end_time()?;
    let remarks = task.remarks().unwrap_or_default();
    Some(format!(
        "{start}{sep}{end}{sep}{title}{sep}{remarks}\n",
        start = format_timestamp(task.start_time()),
        end = format_timestamp(end_time),
        title = task.title(),
        sep = FIELD_SEPARATOR,
    ))
}

/// Parses one row without its trailing newline.
pub fn parse_row(line: &str) -> Result<Task, RowError> {
    let fields = line.split(FIELD_SEPARATOR).collect::<Vec<_>>();
    let &[start, end, title, remarks] = fields.as_slice() else {
        return Err(RowError::FieldCount(fields.len()));
    };
    Ok(Task::closed(
        parse_timestamp(start)?,
        title,
        parse_timestamp(end)?,
        remarks,
    )?)
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RowError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|v| v.with_timezone(&Utc))
        .map_err(|source| RowError::Timestamp {
            value: value.to_string(),
            source,
        })
}
