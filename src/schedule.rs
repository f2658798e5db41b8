/// Daily standby schedule
/// A schedule is a single hour:minute trigger evaluated in local wall-clock time

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Offset, TimeZone};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const MAX_HOUR: u32 = 23;
pub const MAX_MINUTE: u32 = 59;

/// Which half of the literal an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Hour,
    Minute,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Hour => f.write_str("hour"),
            Field::Minute => f.write_str("minute"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid schedule format: expected 'hour min', got {0:?}")]
    Format(String),
    #[error("invalid {field}: {source}")]
    InvalidNumber {
        field: Field,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid {field}: {value} (must be 0-{max})")]
    Range { field: Field, value: i64, max: u32 },
}

/// A daily trigger at `hour:minute`, both always in range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Schedule {
    hour: u32,
    minute: u32,
}

impl Schedule {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        check_range(Field::Hour, i64::from(hour), MAX_HOUR)?;
        check_range(Field::Minute, i64::from(minute), MAX_MINUTE)?;
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Next firing strictly after `now`, in `now`'s time zone.
    ///
    /// A candidate equal to `now` counts as already elapsed. Rolling over
    /// adds a fixed 24 hours, so a DST change between now and the firing
    /// shifts the wall-clock result by the DST delta.
    pub fn next<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        // hour and minute are range-checked at construction
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN);
        let naive = now.date_naive().and_time(time);

        let candidate = match tz.from_local_datetime(&naive).earliest() {
            Some(dt) => dt,
            None => {
                // Wall-clock time skipped by a DST gap: map it with now's offset
                let offset = ChronoDuration::seconds(i64::from(now.offset().fix().local_minus_utc()));
                tz.from_utc_datetime(&(naive - offset))
            }
        };

        if candidate > *now {
            candidate
        } else {
            candidate + ChronoDuration::hours(24)
        }
    }

    /// Time left until the next firing, zero if `next` is not ahead of `now`
    pub fn until<Tz: TimeZone>(next: &DateTime<Tz>, now: &DateTime<Tz>) -> Duration {
        next.clone()
            .signed_duration_since(now.clone())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

fn check_range(field: Field, value: i64, max: u32) -> Result<(), ScheduleError> {
    if value < 0 || value > i64::from(max) {
        return Err(ScheduleError::Range { field, value, max });
    }
    Ok(())
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let [hour, minute] = parts.as_slice() else {
            return Err(ScheduleError::Format(expr.to_string()));
        };

        let hour: i64 = hour
            .parse()
            .map_err(|source| ScheduleError::InvalidNumber { field: Field::Hour, source })?;
        let minute: i64 = minute
            .parse()
            .map_err(|source| ScheduleError::InvalidNumber { field: Field::Minute, source })?;

        check_range(Field::Hour, hour, MAX_HOUR)?;
        check_range(Field::Minute, minute, MAX_MINUTE)?;

        // Both values are within 0..=59 here
        Ok(Self {
            hour: hour as u32,
            minute: minute as u32,
        })
    }
}

/// Same "hour min" form the parser accepts
impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.hour, self.minute)
    }
}

/// Human-readable wait for log lines, e.g. "7h 12m" or "4m 30s"
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (hours, mins, rest) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    match (hours, mins) {
        (0, 0) => format!("{}s", rest),
        (0, _) => format!("{}m {}s", mins, rest),
        _ => format!("{}h {}m", hours, mins),
    }
}



/// Kani formal verification proofs
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    #[kani::proof]
    fn new_accepts_exactly_valid_range() {
        let hour: u32 = kani::any();
        let minute: u32 = kani::any();

        let result = Schedule::new(hour, minute);
        let expected = hour <= MAX_HOUR && minute <= MAX_MINUTE;
        kani::assert(result.is_ok() == expected, "schedule range check must be exact");
    }
}
