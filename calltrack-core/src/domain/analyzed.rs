//! AnalyzedSignal — a signal with its validity window resolved.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::signal::Signal;

/// A [`Signal`] plus the fields derived from its time frame.
///
/// Built by [`crate::expiry::analyze`]; `cutoff_date` is never user supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedSignal {
    #[serde(flatten)]
    pub signal: Signal,
    pub cutoff_date: Option<NaiveDate>,
    pub is_expired: bool,
    pub days_expired: u32,
}

impl AnalyzedSignal {
    pub fn stock(&self) -> &str {
        &self.signal.stock
    }

    pub fn listing_date(&self) -> NaiveDate {
        self.signal.listing_date
    }

    /// Evaluation window `[listing_date, cutoff_date]`, if the signal has one.
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.cutoff_date.map(|cutoff| (self.signal.listing_date, cutoff))
    }
}

impl AsRef<Signal> for AnalyzedSignal {
    fn as_ref(&self) -> &Signal {
        &self.signal
    }
}
