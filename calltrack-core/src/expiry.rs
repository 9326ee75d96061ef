//! Expiry calculator — turns a free-text time frame into a cutoff date.
//!
//! Every integer in the time frame is a candidate day offset. For ranges
//! like "5-10 Days" the largest one wins: a call is not expired until the
//! latest end of the window it advertised. A time frame with no integer
//! yields no cutoff, and such a signal never expires.

use std::sync::OnceLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{AnalyzedSignal, Signal};

/// Derived validity fields for one signal on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    pub cutoff_date: Option<NaiveDate>,
    pub is_expired: bool,
    pub days_expired: u32,
}

impl Expiry {
    /// The state of a signal that has no parseable time frame.
    pub const OPEN_ENDED: Expiry = Expiry {
        cutoff_date: None,
        is_expired: false,
        days_expired: 0,
    };
}

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("integer pattern is valid"))
}

/// Largest integer literal in `time_frame`, used as the day offset.
///
/// Literals too large to be a day count are ignored.
pub fn day_offset(time_frame: &str) -> Option<u32> {
    integer_pattern()
        .find_iter(time_frame)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .max()
}

/// `listing_date + max(integers in time_frame)` days.
///
/// `None` when the time frame is absent, carries no integer, or the sum
/// falls outside the calendar.
pub fn cutoff_date(listing_date: NaiveDate, time_frame: Option<&str>) -> Option<NaiveDate> {
    let offset = day_offset(time_frame?)?;
    listing_date.checked_add_days(Days::new(u64::from(offset)))
}

/// Expiry state of a known cutoff on `today`. Strict: a signal whose cutoff
/// is today is still live.
pub fn status_on(cutoff: Option<NaiveDate>, today: NaiveDate) -> Expiry {
    let Some(cutoff) = cutoff else {
        return Expiry::OPEN_ENDED;
    };
    let overdue = (today - cutoff).num_days();
    if overdue > 0 {
        Expiry {
            cutoff_date: Some(cutoff),
            is_expired: true,
            days_expired: u32::try_from(overdue).unwrap_or(u32::MAX),
        }
    } else {
        Expiry {
            cutoff_date: Some(cutoff),
            is_expired: false,
            days_expired: 0,
        }
    }
}

/// Pure expiry computation over `(listing_date, time_frame, today)`.
pub fn compute(listing_date: NaiveDate, time_frame: Option<&str>, today: NaiveDate) -> Expiry {
    status_on(cutoff_date(listing_date, time_frame), today)
}

/// Attach expiry fields to a signal.
pub fn analyze(signal: Signal, today: NaiveDate) -> AnalyzedSignal {
    let expiry = compute(signal.listing_date, signal.time_frame.as_deref(), today);
    AnalyzedSignal {
        signal,
        cutoff_date: expiry.cutoff_date,
        is_expired: expiry.is_expired,
        days_expired: expiry.days_expired,
    }
}
