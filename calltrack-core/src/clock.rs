//! Time source for expiry checks.
//!
//! Expiry depends on "today". Passing the date in through a [`Clock`] keeps
//! the calculation a pure function and lets tests pin the calendar.

use chrono::NaiveDate;

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    /// Current date according to this clock.
    fn today(&self) -> NaiveDate;

    /// Clock name for logs.
    fn name(&self) -> &str {
        "Clock"
    }
}

/// Wall-clock date in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}

/// Clock pinned to a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }

    fn name(&self) -> &str {
        "FixedClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_moves() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let clock = FixedClock(date);
        assert_eq!(clock.today(), date);
        assert_eq!(clock.today(), date);
        assert_eq!(clock.name(), "FixedClock");
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.today() > NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }
}
