//! Time-of-day recurrence and next-run computation

use crate::{Result, SchedulerError};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How often a job repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
}

impl Recurrence {
    pub fn period(&self) -> Duration {
        match self {
            Recurrence::Daily => Duration::from_secs(24 * 60 * 60),
            Recurrence::Weekly => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    fn chrono_period(&self) -> ChronoDuration {
        match self {
            Recurrence::Daily => ChronoDuration::days(1),
            Recurrence::Weekly => ChronoDuration::weeks(1),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
        }
    }
}

/// UTC time of day a job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAt {
    hour: u32,
    minute: u32,
}

impl RunAt {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(SchedulerError::InvalidTime { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    fn as_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for RunAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02} UTC", self.hour, self.minute)
    }
}

/// Today's occurrence of `at` if it has not passed yet, otherwise one period later
pub fn next_run(now: DateTime<Utc>, at: RunAt, recurrence: Recurrence) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at.as_time()).and_utc();
    if now > today {
        today + recurrence.chrono_period()
    } else {
        today
    }
}

/// Advance `run_at` by whole periods until it is after `now`. Returns the new
/// time and the number of occurrences skipped.
pub fn rearm(run_at: DateTime<Utc>, now: DateTime<Utc>, recurrence: Recurrence) -> (DateTime<Utc>, u32) {
    let period = recurrence.chrono_period();
    let mut next = run_at + period;
    let mut skipped = 0;
    while next <= now {
        next += period;
        skipped += 1;
    }
    (next, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, h, m, s).unwrap()
    }

    #[test]
    fn test_run_at_validation() {
        assert!(RunAt::new(23, 59).is_ok());
        assert_eq!(RunAt::new(24, 0), Err(SchedulerError::InvalidTime { hour: 24, minute: 0 }));
        assert_eq!(RunAt::new(2, 60), Err(SchedulerError::InvalidTime { hour: 2, minute: 60 }));
    }

    #[test]
    fn test_next_run_later_today() {
        let run_at = RunAt::new(2, 0).unwrap();
        assert_eq!(next_run(at(1, 0, 0), run_at, Recurrence::Daily), at(2, 0, 0));
        assert_eq!(next_run(at(1, 0, 0), run_at, Recurrence::Weekly), at(2, 0, 0));
    }

    #[test]
    fn test_next_run_on_the_boundary() {
        let run_at = RunAt::new(2, 0).unwrap();
        assert_eq!(next_run(at(2, 0, 0), run_at, Recurrence::Daily), at(2, 0, 0));
    }

    #[test]
    fn test_next_run_already_passed() {
        let run_at = RunAt::new(2, 0).unwrap();
        assert_eq!(
            next_run(at(2, 0, 1), run_at, Recurrence::Daily),
            at(2, 0, 0) + ChronoDuration::days(1)
        );
        assert_eq!(
            next_run(at(3, 0, 0), run_at, Recurrence::Weekly),
            at(2, 0, 0) + ChronoDuration::days(7)
        );
    }

    #[test]
    fn test_rearm_skips_missed_occurrences() {
        let first = at(2, 0, 0);
        assert_eq!(rearm(first, at(2, 30, 0), Recurrence::Daily), (first + ChronoDuration::days(1), 0));

        let late = first + ChronoDuration::days(2) + ChronoDuration::hours(1);
        assert_eq!(rearm(first, late, Recurrence::Daily), (first + ChronoDuration::days(3), 2));
    }
}
