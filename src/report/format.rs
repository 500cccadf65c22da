use std::fmt::{self, Display, Write};

use chrono::Duration;

use crate::utils::time::date_to_day_key;

use super::Report;

pub const NO_TIME: &str = "No time";

const SECONDS_IN_HOUR: i64 = 60 * 60;

/// Renders a duration as hours rounded half up to two decimals, without trailing zeros: `1.5`,
/// `2`, `0.25`. Exactly zero renders as [NO_TIME].
pub fn format_hours(duration: Duration) -> String {
    if duration.is_zero() {
        return NO_TIME.to_string();
    }
    let hundredths = (duration.num_seconds() * 100 + SECONDS_IN_HOUR / 2) / SECONDS_IN_HOUR;
    let (whole, fraction) = (hundredths / 100, hundredths % 100);

    let mut text = whole.to_string();
    match fraction {
        0 => {}
        v if v % 10 == 0 => {
            let _ = write!(text, ".{}", v / 10);
        }
        v => {
            let _ = write!(text, ".{v:02}");
        }
    }
    text
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Per task")?;
        writeln!(f, "========")?;
        for usage in &self.per_task {
            writeln!(f, "{} {}", usage.title, format_hours(usage.duration))?;
        }

        writeln!(f)?;
        writeln!(f, "Per day")?;
        writeln!(f, "=======")?;
        for usage in &self.per_day {
            writeln!(
                f,
                "{} {}",
                date_to_day_key(usage.day),
                format_hours(usage.duration)
            )?;
        }

        if self.skipped > 0 {
            writeln!(f)?;
            writeln!(f, "Skipped {} malformed entries", self.skipped)?;
        }
        Ok(())
    }
}
