use std::str::FromStr;

use thiserror::Error;

pub const HELP: &str = "\
Commands:
  start <title>    start tracking a task, a running task gets stopped first
  stop [remarks]   stop the running task and save it
  list             show time spent per task and per day
  status           show the running task
  quit             stop the running task and exit";

/// One line of input from the user.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SessionCommand {
    Start(String),
    Stop(String),
    List,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("start needs a task title, e.g. `start Code review`")]
    MissingTitle,
    #[error("unknown command `{0}`, type `help` to see available commands")]
    Unknown(String),
}

impl FromStr for SessionCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (word, rest) = s
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((s, ""));

        match word.to_lowercase().as_str() {
            "start" if rest.is_empty() => Err(CommandError::MissingTitle),
            "start" => Ok(Self::Start(rest.to_string())),
            "stop" => Ok(Self::Stop(rest.to_string())),
            "list" | "report" => Ok(Self::List),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}
