use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing dates across application. Tracker transitions
/// read the time through it, so tests can pin start and stop moments.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
