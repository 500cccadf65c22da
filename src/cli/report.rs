use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;
use tracing::info;

use crate::{
    report::{ReportGenerator, ReportRange},
    storage::task_log::TaskLog,
    utils::time::next_day_start,
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long,
        short,
        help = "Only count tasks started at or after this moment. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    since: Option<String>,
    #[arg(
        long,
        short,
        help = "Only count tasks started before this moment. Examples are \"today\", \"15/03/2025\""
    )]
    until: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if since and until are both 15/03/2025 this option covers the whole day"
    )]
    treat_as_days: bool,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
    #[arg(short, long, help = "Write the report into a file instead of stdout")]
    output: Option<PathBuf>,
}

/// Command to process `report` command. Aggregates the whole log, optionally restricted to tasks
/// started between `since` and `until`.
pub async fn process_report_command(
    log: impl TaskLog,
    ReportCommand {
        since,
        until,
        date_style,
        treat_as_days,
        json,
        output,
    }: ReportCommand,
) -> Result<()> {
    let range = parse_range(since, until, date_style, treat_as_days, Local::now())?;

    let report = ReportGenerator::new(log, Local)
        .with_range(range)
        .generate()
        .await?;

    let text = if json {
        serde_json::to_string_pretty(&report)? + "\n"
    } else {
        report.to_string()
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, text).await?;
            info!("Report written to {path:?}");
            println!("Report written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn parse_range(
    since: Option<String>,
    until: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
    now: DateTime<Local>,
) -> Result<ReportRange> {
    let dialect: chrono_english::Dialect = date_style.into();
    let mut since = since
        .map(|s| parse_date(&s, "since", now, dialect))
        .transpose()?;
    let mut until = until
        .map(|s| parse_date(&s, "until", now, dialect))
        .transpose()?;

    if treat_as_days {
        since = since.map(|v| v.beginning_of_day());
        until = until.map(next_day_start);
    }

    Ok(ReportRange {
        since: since.map(|v| v.with_timezone(&Utc)),
        until: until.map(|v| v.with_timezone(&Utc)),
    })
}

fn parse_date(
    value: &str,
    name: &str,
    now: DateTime<Local>,
    dialect: chrono_english::Dialect,
) -> Result<DateTime<Local>> {
    match parse_date_string(value, now, dialect) {
        Ok(v) => Ok(v.with_timezone(&Local)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()),
    }
}
