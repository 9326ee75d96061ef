//! Domain types for calltrack

pub mod analyzed;
pub mod outcome;
pub mod price;
pub mod signal;

pub use analyzed::AnalyzedSignal;
pub use outcome::{Outcome, PerformanceResult};
pub use price::{daily_closes, DataSource, PricePoint};
pub use signal::{Action, Signal, SignalRecord, UnknownAction, MAX_TARGETS};
