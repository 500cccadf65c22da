use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use super::TrackerError;

/// The moment a task was finished together with the remarks given at that moment. Both are
/// recorded at once, so a task can't be half closed.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Completion {
    pub end_time: DateTime<Utc>,
    pub remarks: Arc<str>,
}

/// A single tracked interval of work. A task is open until [Task::close] is called and is
/// immutable afterwards.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Task {
    start_time: DateTime<Utc>,
    title: Arc<str>,
    completion: Option<Completion>,
}

impl Task {
    pub fn new(start_time: DateTime<Utc>, title: impl Into<Arc<str>>) -> Result<Self, TrackerError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TrackerError::EmptyTitle);
        }
        Ok(Self {
            start_time,
            title,
            completion: None,
        })
    }

    /// Builds an already closed task. Used when reading rows back from the log.
    pub fn closed(
        start_time: DateTime<Utc>,
        title: impl Into<Arc<str>>,
        end_time: DateTime<Utc>,
        remarks: impl Into<Arc<str>>,
    ) -> Result<Self, TrackerError> {
        let mut task = Self::new(start_time, title)?;
        task.close(end_time, remarks)?;
        Ok(task)
    }

    /// Moves the task from open to closed. Closing twice is a logic error and leaves the first
    /// completion in place.
    pub fn close(
        &mut self,
        end_time: DateTime<Utc>,
        remarks: impl Into<Arc<str>>,
    ) -> Result<(), TrackerError> {
        if self.completion.is_some() {
            return Err(TrackerError::AlreadyClosed {
                title: self.title.clone(),
            });
        }
        self.completion = Some(Completion {
            end_time,
            remarks: remarks.into(),
        });
        Ok(())
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn title(&self) -> &Arc<str> {
        &self.title
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.completion.as_ref().map(|v| v.end_time)
    }

    pub fn remarks(&self) -> Option<&str> {
        self.completion.as_ref().map(|v| &*v.remarks)
    }

    pub fn is_closed(&self) -> bool {
        self.completion.is_some()
    }

    /// Time spent on a closed task. Corrupt timestamps may make it negative.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time().map(|end| end - self.start_time)
    }

    /// Text shown while the task is running, e.g. `Design since 09:15:00`.
    pub fn describe(&self) -> String {
        self.describe_in(&Local)
    }

    pub fn describe_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{} since {}",
            self.title,
            self.start_time.with_timezone(tz).format("%H:%M:%S")
        )
    }
}
