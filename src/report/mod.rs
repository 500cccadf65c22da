//! Aggregation of the task log into time spent per task title and per calendar day.

pub mod format;

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    storage::task_log::{LogEntries, LogError, TaskLog},
    tracker::task::Task,
};

#[derive(Debug, PartialEq, Eq, Serialize, Clone)]
pub struct TaskUsage {
    pub title: Arc<str>,
    #[serde(with = "duration_ser")]
    pub duration: Duration,
}

#[derive(Debug, PartialEq, Eq, Serialize, Clone)]
pub struct DayUsage {
    pub day: NaiveDate,
    #[serde(with = "duration_ser")]
    pub duration: Duration,
}

/// Result of aggregating the log. Titles keep the order they first appear in, days are sorted.
/// Rendered as text through [Display](std::fmt::Display).
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub per_task: Vec<TaskUsage>,
    pub per_day: Vec<DayUsage>,
    /// Malformed log rows plus tasks that ended before they started.
    pub skipped: usize,
}

/// Restricts a report to tasks started in `[since, until)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ReportRange {
    fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.since.map_or(true, |since| since <= moment)
            && self.until.map_or(true, |until| moment < until)
    }
}

pub struct ReportGenerator<L, Tz> {
    log: L,
    timezone: Tz,
    range: ReportRange,
}

impl<L: TaskLog, Tz: TimeZone> ReportGenerator<L, Tz> {
    /// Days are the calendar dates of task starts in `timezone`.
    pub fn new(log: L, timezone: Tz) -> Self {
        Self {
            log,
            timezone,
            range: ReportRange::default(),
        }
    }

    pub fn with_range(self, range: ReportRange) -> Self {
        Self { range, ..self }
    }

    #[instrument(skip(self))]
    pub async fn generate(&self) -> Result<Report, LogError> {
        let LogEntries { tasks, malformed } = self.log.read_all().await?;
        debug!("Aggregating {} tasks", tasks.len());
        Ok(self.aggregate(tasks, malformed))
    }

    fn aggregate(&self, tasks: impl IntoIterator<Item = Task>, malformed: usize) -> Report {
        let mut per_task = Vec::<TaskUsage>::new();
        let mut title_index = HashMap::<Arc<str>, usize>::new();
        let mut per_day = BTreeMap::<NaiveDate, Duration>::new();
        let mut skipped = malformed;

        for task in tasks {
            let Some(duration) = task.duration() else {
                continue;
            };
            if !self.range.contains(task.start_time()) {
                continue;
            }
            if duration < Duration::zero() {
                warn!(
                    "Skipping `{}` started at {}, it ends before it starts",
                    task.title(),
                    task.start_time()
                );
                skipped += 1;
                continue;
            }

            let index = *title_index.entry(task.title().clone()).or_insert_with(|| {
                per_task.push(TaskUsage {
                    title: task.title().clone(),
                    duration: Duration::zero(),
                });
                per_task.len() - 1
            });
            per_task[index].duration += duration;

            let day = task.start_time().with_timezone(&self.timezone).date_naive();
            *per_day.entry(day).or_insert_with(Duration::zero) += duration;
        }

        Report {
            per_task,
            per_day: per_day
                .into_iter()
                .map(|(day, duration)| DayUsage { day, duration })
                .collect(),
            skipped,
        }
    }
}

mod duration_ser {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }
}
