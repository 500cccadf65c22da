use std::{
    future::Future,
    io::{self, ErrorKind},
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use fs4::tokio::AsyncFileExt;
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncWrite, AsyncWriteExt},
};
use tracing::{debug, instrument, warn};

use crate::{fs::operations::ends_with_newline, tracker::task::Task};

use super::row::{encode_row, parse_row, RowError};

pub const LOG_FILE_NAME: &str = "tasks.csv";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("task `{title}` is still open and can't be written to the log")]
    OpenTask { title: Arc<str> },
    #[error("failed to access task log at {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Everything that could be recovered from the log, in the order rows were written.
#[derive(Debug, Default)]
pub struct LogEntries {
    pub tasks: Vec<Task>,
    /// Rows that were present but couldn't be parsed.
    pub malformed: usize,
}

/// Interface for abstracting the durable record of finished tasks.
pub trait TaskLog {
    /// Appends a closed task. Either the whole row lands or an error is returned.
    fn append(&self, task: &Task) -> impl Future<Output = Result<(), LogError>>;

    /// Reads back every task that was ever appended. A log that doesn't exist yet is empty.
    fn read_all(&self) -> impl Future<Output = Result<LogEntries, LogError>>;
}

impl<T: Deref> TaskLog for T
where
    T::Target: TaskLog,
{
    fn append(&self, task: &Task) -> impl Future<Output = Result<(), LogError>> {
        self.deref().append(task)
    }

    fn read_all(&self) -> impl Future<Output = Result<LogEntries, LogError>> {
        self.deref().read_all()
    }
}

/// The main realization of [TaskLog]. Tasks are kept in a single semicolon separated file inside
/// of the storage directory, one row per task.
pub struct FileTaskLog {
    dir: PathBuf,
    path: PathBuf,
}

impl FileTaskLog {
    /// The directory isn't touched until the first append.
    pub fn new(dir: PathBuf) -> Self {
        let path = dir.join(LOG_FILE_NAME);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(path: &Path) -> impl FnOnce(io::Error) -> LogError + '_ {
        move |source| LogError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    async fn append_with_file(
        file: &mut (impl AsyncSeek + AsyncRead + AsyncWrite + Unpin),
        row: &str,
    ) -> Result<(), io::Error> {
        let mut buffer = String::with_capacity(row.len() + 1);
        if !ends_with_newline(file).await? {
            // Keeps an unfinished row from an earlier crash on its own line.
            warn!("Task log doesn't end with a new line, previous write was probably cut off");
            buffer.push('\n');
        }
        buffer.push_str(row);

        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_inner(&self) -> Result<LogEntries, io::Error> {
        debug!("Reading {:?}", self.path);
        let mut file = File::open(&self.path).await?;
        file.lock_shared()?;
        let mut contents = Vec::new();
        let read = file.read_to_end(&mut contents).await;
        file.unlock_async().await?;
        read?;

        Ok(parse_entries(&self.path, &contents))
    }
}

impl TaskLog for FileTaskLog {
    #[instrument(skip_all, fields(title = %task.title()))]
    async fn append(&self, task: &Task) -> Result<(), LogError> {
        let row = encode_row(task).ok_or_else(|| LogError::OpenTask {
            title: task.title().clone(),
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(Self::io_error(&self.dir))?;

        let mut file = File::options()
            .append(true)
            .create(true)
            .read(true)
            .open(&self.path)
            .await
            .map_err(Self::io_error(&self.path))?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive().map_err(Self::io_error(&self.path))?;
        let mut result = Self::append_with_file(&mut file, &row).await;
        if result.is_ok() {
            result = file.sync_data().await;
        }
        let unlocked = file.unlock_async().await;
        result.and(unlocked).map_err(Self::io_error(&self.path))?;

        debug!("Appended row to {:?}", self.path);
        Ok(())
    }

    async fn read_all(&self) -> Result<LogEntries, LogError> {
        match self.read_inner().await {
            Ok(entries) => Ok(entries),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LogEntries::default()),
            Err(e) => Err(Self::io_error(&self.path)(e)),
        }
    }
}

fn parse_entries(path: &Path, contents: &[u8]) -> LogEntries {
    let mut entries = LogEntries::default();
    for (index, line) in contents.split_inclusive(|b| *b == b'\n').enumerate() {
        let Some(line) = line.strip_suffix(b"\n") else {
            debug!(
                "Ignoring unterminated last line {:?}, an append might be in progress",
                String::from_utf8_lossy(line)
            );
            continue;
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.trim_ascii().is_empty() {
            continue;
        }
        let parsed = std::str::from_utf8(line)
            .map_err(RowError::from)
            .and_then(parse_row);
        match parsed {
            Ok(task) => entries.tasks.push(task),
            Err(e) => {
                warn!(
                    "Skipping malformed row {} in {:?} {:?}: {e}",
                    index + 1,
                    path,
                    String::from_utf8_lossy(line)
                );
                entries.malformed += 1;
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        storage::task_log::{FileTaskLog, LogError, TaskLog, LOG_FILE_NAME},
        tracker::task::Task,
        utils::logging::TEST_LOGGING,
    };

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveTime::MIN);

    fn test_tasks() -> Vec<Task> {
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        vec![
            Task::closed(
                start + Duration::hours(9),
                "Design",
                start + Duration::hours(9) + Duration::minutes(30),
                "ok",
            )
            .unwrap(),
            Task::closed(
                start + Duration::hours(10),
                "Review",
                start + Duration::hours(11),
                "",
            )
            .unwrap(),
            Task::closed(
                start + Duration::hours(12),
                "Design",
                start + Duration::hours(12) + Duration::seconds(1),
                "short one",
            )
            .unwrap(),
        ]
    }

    fn write_raw(log: &FileTaskLog, contents: impl AsRef<[u8]>) -> Result<()> {
        let mut file = std::fs::File::create(log.path())?;
        file.write_all(contents.as_ref())?;
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_round_trip() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let log = FileTaskLog::new(dir.path().to_owned());

        for task in test_tasks() {
            log.append(&task).await?;
        }

        let entries = log.read_all().await?;

        assert_eq!(entries.tasks, test_tasks());
        assert_eq!(entries.malformed, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let log = FileTaskLog::new(dir.path().join("never created"));

        let entries = log.read_all().await?;

        assert!(entries.tasks.is_empty());
        assert_eq!(entries.malformed, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_creates_directory() -> Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("state").join("tasktally");
        let log = FileTaskLog::new(nested.clone());

        log.append(&test_tasks()[0]).await?;

        assert!(nested.join(LOG_FILE_NAME).exists());
        let contents = std::fs::read_to_string(log.path())?;
        assert_eq!(
            contents,
            "2024-01-01T09:00:00Z;2024-01-01T09:30:00Z;Design;ok\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_rejects_open_task() -> Result<()> {
        let dir = tempdir()?;
        let log = FileTaskLog::new(dir.path().to_owned());
        let task = Task::new(Utc.from_utc_datetime(&TEST_START_DATE), "Design")?;

        let result = log.append(&task).await;

        assert!(matches!(result, Err(LogError::OpenTask { .. })));
        assert!(!log.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_skips_malformed_rows() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let log = FileTaskLog::new(dir.path().to_owned());
        write_raw(
            &log,
            "2024-01-01T09:00:00Z;2024-01-01T09:30:00Z;Design;ok\n\
             2024-01-01T09:30:00Z;2024-01-01T10:00:00Z;Broken\n\
             \n\
             not a date;2024-01-01T10:00:00Z;Broken;bad\n\
             2024-01-01T10:00:00Z;2024-01-01T11:00:00Z;Design;ok2\r\n",
        )?;

        let entries = log.read_all().await?;

        assert_eq!(entries.tasks.len(), 2);
        assert_eq!(entries.malformed, 2);
        assert_eq!(entries.tasks[0].remarks(), Some("ok"));
        assert_eq!(entries.tasks[1].remarks(), Some("ok2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_ignores_unterminated_tail() -> Result<()> {
        let dir = tempdir()?;
        let log = FileTaskLog::new(dir.path().to_owned());
        write_raw(
            &log,
            "2024-01-01T09:00:00Z;2024-01-01T09:30:00Z;Design;ok\n\
             2024-01-01T10:00:00Z;2024-01-01T11:00:00Z;Design;o",
        )?;

        let entries = log.read_all().await?;

        assert_eq!(entries.tasks.len(), 1);
        assert_eq!(entries.malformed, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_counts_invalid_utf8_row_as_malformed() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let log = FileTaskLog::new(dir.path().to_owned());
        write_raw(
            &log,
            b"2024-01-01T09:00:00Z;2024-01-01T09:30:00Z;Design;ok\n\
              2024-01-01T10:00:00Z;2024-01-01T11:00:00Z;Re\xffview;ok\n",
        )?;

        let entries = log.read_all().await?;

        assert_eq!(entries.tasks.len(), 1);
        assert_eq!(&**entries.tasks[0].title(), "Design");
        assert_eq!(entries.malformed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_append_after_torn_write() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let log = FileTaskLog::new(dir.path().to_owned());
        write_raw(&log, "2024-01-01T09:00:00Z;2024-01-01T09:3")?;

        log.append(&test_tasks()[1]).await?;

        let contents = std::fs::read_to_string(log.path())?;
        assert_eq!(contents.lines().count(), 2);

        let entries = log.read_all().await?;
        assert_eq!(entries.tasks, vec![test_tasks()[1].clone()]);
        assert_eq!(entries.malformed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_task_log_through_shared_reference() -> Result<()> {
        let dir = tempdir()?;
        let log = std::sync::Arc::new(FileTaskLog::new(dir.path().to_owned()));
        let shared = log.clone();

        shared.append(&test_tasks()[0]).await?;

        assert_eq!(log.read_all().await?.tasks.len(), 1);
        Ok(())
    }
}
