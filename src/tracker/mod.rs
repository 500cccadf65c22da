//! The tracker owns the single task that is currently being worked on. [TaskTracker] moves
//! between [TrackerState::Idle] and [TrackerState::Active] and hands finished tasks over to a
//! [TaskLog].

use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Utc};
use task::Task;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    storage::task_log::{LogError, TaskLog},
    utils::clock::Clock,
};

pub mod task;

/// Remark written for a task that was still running when a new one got started.
pub const INTERRUPTED_REMARK: &str = "interrupted by new task";
/// Remark written for a task that was still running when the process went down.
pub const EXIT_REMARK: &str = "process exited";

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("task title must not be empty")]
    EmptyTitle,
    #[error("task `{title}` is already closed")]
    AlreadyClosed { title: Arc<str> },
    #[error(transparent)]
    Log(#[from] LogError),
}

#[derive(Debug, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    Active(Task),
}

/// What the host shows in its status indicator.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Status {
    Idle,
    Active(String),
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Idle => write!(f, "Idle"),
            Status::Active(description) => write!(f, "{description}"),
        }
    }
}

pub struct TaskTracker<L> {
    state: TrackerState,
    log: L,
    clock: Box<dyn Clock>,
}

impl<L: TaskLog> TaskTracker<L> {
    pub fn new(log: L, clock: Box<dyn Clock>) -> Self {
        Self {
            state: TrackerState::Idle,
            log,
            clock,
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn active_task(&self) -> Option<&Task> {
        match &self.state {
            TrackerState::Idle => None,
            TrackerState::Active(task) => Some(task),
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Starts tracking a new task. A task that is already running gets closed with
    /// [INTERRUPTED_REMARK] and persisted first, it is returned in that case.
    ///
    /// If the running task can't be persisted nothing changes.
    #[instrument(skip(self))]
    pub async fn start(&mut self, title: &str) -> Result<Option<Task>, TrackerError> {
        let now = self.clock.time();
        let task = Task::new(now, title)?;

        let previous = match self.active_task().map(|v| v.title().clone()) {
            Some(current) => {
                info!("Closing `{current}` before starting a new task");
                self.stop_at(now, INTERRUPTED_REMARK).await?
            }
            None => None,
        };

        info!("Started `{}`", task.title());
        self.state = TrackerState::Active(task);
        Ok(previous)
    }

    /// Closes the running task with the current time and appends it to the log. Returns [None]
    /// when there is nothing to stop.
    ///
    /// On a persistence failure the task stays active, so the stop can be retried.
    #[instrument(skip(self))]
    pub async fn stop(&mut self, remarks: &str) -> Result<Option<Task>, TrackerError> {
        if self.active_task().is_none() {
            warn!("Stop requested while idle, ignoring");
            return Ok(None);
        }
        let now = self.clock.time();
        self.stop_at(now, remarks).await
    }

    /// Makes sure the running task gets persisted before the process goes away.
    pub async fn shutdown(&mut self) -> Result<Option<Task>, TrackerError> {
        if self.active_task().is_none() {
            return Ok(None);
        }
        info!("Stopping active task on shutdown");
        self.stop(EXIT_REMARK).await
    }

    pub fn current_status(&self) -> Status {
        match &self.state {
            TrackerState::Idle => Status::Idle,
            TrackerState::Active(task) => Status::Active(task.describe()),
        }
    }

    async fn stop_at(
        &mut self,
        now: DateTime<Utc>,
        remarks: &str,
    ) -> Result<Option<Task>, TrackerError> {
        let TrackerState::Active(current) = &self.state else {
            return Ok(None);
        };

        let mut closed = current.clone();
        closed.close(now, remarks)?;
        self.log.append(&closed).await?;

        info!("Stopped `{}`", closed.title());
        self.state = TrackerState::Idle;
        Ok(Some(closed))
    }
}
