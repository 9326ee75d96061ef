//! Signal loading from parser output files.
//!
//! Accepts a JSON array of signal objects or a CSV file with the parser's
//! column set. `date` and `listing_date` are both accepted as the date column;
//! empty CSV cells become `None`. Extra columns (such as those of an analysis
//! export) are ignored.

use std::path::{Path, PathBuf};

use thiserror::Error;

use calltrack_core::domain::Signal;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid signal JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signal CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported signal file '{0}' (expected .json or .csv)")]
    UnsupportedFormat(PathBuf),
}

/// Input formats understood by [`load_signals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFormat {
    Json,
    Csv,
}

impl SignalFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(SignalFormat::Json),
            "csv" => Some(SignalFormat::Csv),
            _ => None,
        }
    }
}

/// Load signals from `path`, choosing the format by file extension.
pub fn load_signals(path: &Path) -> Result<Vec<Signal>, LoadError> {
    let format = SignalFormat::from_path(path)
        .ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let signals = match format {
        SignalFormat::Json => load_json_str(&content)?,
        SignalFormat::Csv => load_csv_str(&content)?,
    };
    log::info!("loaded {} signals from {}", signals.len(), path.display());
    Ok(signals)
}

pub fn load_json_str(content: &str) -> Result<Vec<Signal>, LoadError> {
    Ok(serde_json::from_str(content)?)
}

pub fn load_csv_str(content: &str) -> Result<Vec<Signal>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut signals = Vec::new();
    for row in reader.deserialize() {
        signals.push(row?);
    }
    Ok(signals)
}
