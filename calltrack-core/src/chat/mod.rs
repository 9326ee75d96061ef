//! Chat-export ingestion: line parser and summary statistics

pub mod parser;
pub mod stats;

pub use parser::{ChatParser, ParseError, DATE_FORMATS};
pub use stats::{DateRange, SignalStatistics};
