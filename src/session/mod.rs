//! Interactive host for the tracker. Every line of input is one trigger: `start`, `stop` or
//! `list`. The status line is refreshed after each transition, and whatever is still running
//! gets persisted when the session ends.

pub mod command;
pub mod shutdown;

use std::sync::Arc;

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{Local, TimeZone};
use command::{SessionCommand, HELP};
use futures::StreamExt;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    report::ReportGenerator,
    storage::task_log::{FileTaskLog, TaskLog},
    tracker::{Status, TaskTracker},
    utils::clock::DefaultClock,
};

/// Represents the starting point for an interactive session on stdin/stdout.
pub async fn start_session(log: Arc<FileTaskLog>, colors: bool) -> Result<()> {
    info!("Starting session with log {:?}", log.path());
    let shutdown_token = CancellationToken::new();

    let session = Session::new(
        TaskTracker::new(log.clone(), Box::new(DefaultClock)),
        ReportGenerator::new(log, Local),
        colors,
    );

    let (_, session_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        session.run(
            BufReader::new(io::stdin()),
            io::stdout(),
            shutdown_token.clone()
        ),
    );

    session_result.inspect_err(|e| error!("Session ended with an error {e:?}"))
}

pub struct Session<L, Tz> {
    tracker: TaskTracker<L>,
    reporter: ReportGenerator<L, Tz>,
    colors: bool,
}

impl<L: TaskLog, Tz: TimeZone> Session<L, Tz> {
    pub fn new(tracker: TaskTracker<L>, reporter: ReportGenerator<L, Tz>, colors: bool) -> Self {
        Self {
            tracker,
            reporter,
            colors,
        }
    }

    /// Executes the session loop until the input ends, `quit` is entered or `shutdown` gets
    /// cancelled. The running task is stopped on the way out, even when reading input or writing
    /// output failed, after that `shutdown` is cancelled so companions like
    /// [shutdown::detect_shutdown] finish as well.
    pub async fn run(
        mut self,
        input: impl AsyncBufRead + Unpin,
        mut output: impl AsyncWrite + Unpin,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let outcome = self.process_input(input, &mut output, &shutdown).await;

        let stopped = self
            .tracker
            .shutdown()
            .await
            .inspect_err(|e| error!("Failed to save task on exit {e:?}"));
        shutdown.cancel();

        outcome?;
        if let Some(task) = stopped? {
            write_line(&mut output, &format!("Saved `{}` on exit", task.title())).await?;
        }
        output.flush().await?;
        Ok(())
    }

    async fn process_input(
        &mut self,
        input: impl AsyncBufRead + Unpin,
        output: &mut (impl AsyncWrite + Unpin),
        shutdown: &CancellationToken,
    ) -> Result<(), io::Error> {
        let mut lines = LinesStream::new(input.lines());
        self.write_status(output).await?;

        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Session interrupted");
                    return Ok(());
                }
                line = lines.next() => line,
            };
            let Some(line) = line.transpose()? else {
                info!("Input closed");
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<SessionCommand>() {
                Ok(SessionCommand::Quit) => return Ok(()),
                Ok(command) => self.execute(command, output).await?,
                Err(e) => write_line(output, &e.to_string()).await?,
            }
        }
    }

    async fn execute(
        &mut self,
        command: SessionCommand,
        output: &mut (impl AsyncWrite + Unpin),
    ) -> Result<(), io::Error> {
        match command {
            SessionCommand::Start(title) => {
                match self.tracker.start(&title).await {
                    Ok(Some(previous)) => {
                        write_line(output, &format!("Saved `{}`", previous.title())).await?
                    }
                    Ok(None) => (),
                    Err(e) => {
                        warn!("Failed to start `{title}` {e:?}");
                        write_line(output, &format!("Couldn't start task: {e}")).await?
                    }
                }
                self.write_status(output).await?;
            }
            SessionCommand::Stop(remarks) => {
                match self.tracker.stop(&remarks).await {
                    Ok(Some(task)) => {
                        write_line(output, &format!("Saved `{}`", task.title())).await?
                    }
                    Ok(None) => write_line(output, "No task is running").await?,
                    Err(e) => {
                        error!("Failed to stop task {e:?}");
                        write_line(output, &format!("Couldn't save task, try again: {e}")).await?
                    }
                }
                self.write_status(output).await?;
            }
            SessionCommand::List => match self.reporter.generate().await {
                Ok(report) => output.write_all(report.to_string().as_bytes()).await?,
                Err(e) => {
                    error!("Failed to generate report {e:?}");
                    write_line(output, &format!("Couldn't read task log: {e}")).await?
                }
            },
            SessionCommand::Status => self.write_status(output).await?,
            SessionCommand::Help => write_line(output, HELP).await?,
            SessionCommand::Quit => (),
        }
        output.flush().await
    }

    fn render_status(&self) -> String {
        let status = self.tracker.current_status();
        let text = format!("Status: {status}");
        if !self.colors {
            return text;
        }
        match status {
            Status::Idle => Style::new().dimmed().paint(text).to_string(),
            Status::Active(_) => Colour::Green.bold().paint(text).to_string(),
        }
    }

    async fn write_status(&self, output: &mut (impl AsyncWrite + Unpin)) -> Result<(), io::Error> {
        write_line(output, &self.render_status()).await
    }
}

async fn write_line(output: &mut (impl AsyncWrite + Unpin), text: &str) -> Result<(), io::Error> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
