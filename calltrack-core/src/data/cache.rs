//! Parquet cache of fetched price windows.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{start}_{end}.parquet`, one file per
//! requested window, each with a `{start}_{end}.meta.json` sidecar (point
//! count, BLAKE3 hash, original source, timestamp).
//!
//! - Writes are atomic (write to `.tmp`, rename into place).
//! - Loads validate the schema and row count.
//! - Corrupt files are renamed to `*.quarantined` and treated as a miss.
//! - Generated (synthetic) series are never written.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::provider::{check_range, PriceError, PriceSeries, PriceSource};
use crate::domain::{DataSource, PricePoint};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Metadata sidecar for one cached window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub point_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

pub struct PriceCache {
    cache_dir: PathBuf,
}

impl PriceCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/symbol={SYMBOL}/`
    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn window_stem(start: NaiveDate, end: NaiveDate) -> String {
        format!("{start}_{end}")
    }

    pub fn window_path(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.symbol_dir(symbol)
            .join(format!("{}.parquet", Self::window_stem(start, end)))
    }

    fn meta_path(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.symbol_dir(symbol)
            .join(format!("{}.meta.json", Self::window_stem(start, end)))
    }

    /// Write a fetched series for the window `[start, end]`.
    pub fn write(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        series: &PriceSeries,
    ) -> Result<CacheMeta, PriceError> {
        if series.is_empty() {
            return Err(PriceError::CacheError("no prices to cache".into()));
        }
        if series.source == DataSource::Synthetic {
            return Err(PriceError::CacheError(
                "synthetic series are not cacheable".into(),
            ));
        }

        let sym_dir = self.symbol_dir(&series.symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| PriceError::CacheError(format!("failed to create dir: {e}")))?;

        let df = points_to_dataframe(&series.points)?;
        let path = self.window_path(&series.symbol, start, end);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            PriceError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: series.symbol.clone(),
            start_date: start,
            end_date: end,
            point_count: series.len(),
            data_hash: hash_points(&series.points)?,
            source: series.source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| PriceError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(&series.symbol, start, end), meta_json)
            .map_err(|e| PriceError::CacheError(format!("meta write: {e}")))?;

        log::debug!(
            "cached {} points for {} ({start}..{end})",
            meta.point_count,
            meta.symbol
        );
        Ok(meta)
    }

    /// Load a cached window. A corrupt file is quarantined and reported as a miss.
    pub fn load(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, PriceError> {
        let path = self.window_path(symbol, start, end);
        if !path.exists() {
            return Err(PriceError::NoCachedData {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }

        match load_and_validate_parquet(&path) {
            Ok(points) => Ok(points),
            Err(e) => {
                log::warn!("quarantining corrupt cache file {}: {e}", path.display());
                let _ = fs::rename(&path, path.with_extension("parquet.quarantined"));
                let _ = fs::remove_file(self.meta_path(symbol, start, end));
                Err(PriceError::NoCachedData {
                    symbol: symbol.to_string(),
                    start,
                    end,
                })
            }
        }
    }

    pub fn get_meta(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol, start, end)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Every cached window, grouped by symbol and sorted.
    pub fn status(&self) -> Result<Vec<CacheStatus>, PriceError> {
        let mut statuses = Vec::new();
        if !self.cache_dir.exists() {
            return Ok(statuses);
        }

        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| PriceError::CacheError(format!("read dir: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| PriceError::CacheError(format!("dir entry: {e}")))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(symbol) = name.strip_prefix("symbol=") else {
                continue;
            };
            statuses.push(self.symbol_status(symbol, &entry.path())?);
        }

        statuses.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(statuses)
    }

    fn symbol_status(&self, symbol: &str, dir: &Path) -> Result<CacheStatus, PriceError> {
        let mut windows = Vec::new();
        let mut quarantined = 0;

        let entries =
            fs::read_dir(dir).map_err(|e| PriceError::CacheError(format!("read dir: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| PriceError::CacheError(format!("dir entry: {e}")))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.ends_with(".quarantined") {
                quarantined += 1;
            } else if file_name.ends_with(".meta.json") {
                if let Some(meta) = fs::read_to_string(entry.path())
                    .ok()
                    .and_then(|c| serde_json::from_str::<CacheMeta>(&c).ok())
                {
                    windows.push(meta);
                }
            }
        }

        windows.sort_by_key(|m| (m.start_date, m.end_date));
        Ok(CacheStatus {
            symbol: symbol.to_string(),
            windows,
            quarantined,
        })
    }
}

/// Cache contents for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub windows: Vec<CacheMeta>,
    pub quarantined: usize,
}

impl CacheStatus {
    pub fn total_points(&self) -> usize {
        self.windows.iter().map(|w| w.point_count).sum()
    }

    pub fn earliest(&self) -> Option<NaiveDate> {
        self.windows.iter().map(|w| w.start_date).min()
    }

    pub fn latest(&self) -> Option<NaiveDate> {
        self.windows.iter().map(|w| w.end_date).max()
    }
}

/// A source wrapped with the Parquet cache.
///
/// Cache hits are tagged [`DataSource::Cache`]. Without an inner source the
/// wrapper serves only what is already cached (offline mode).
///
/// The wrapper is always available: cached windows stay readable while the
/// inner source is down. A miss then fails with [`PriceError::Unavailable`].
pub struct CachedSource {
    cache: PriceCache,
    inner: Option<Box<dyn PriceSource>>,
}

impl CachedSource {
    pub fn new(cache: PriceCache, inner: Box<dyn PriceSource>) -> Self {
        Self {
            cache,
            inner: Some(inner),
        }
    }

    pub fn offline(cache: PriceCache) -> Self {
        Self { cache, inner: None }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }
}

impl PriceSource for CachedSource {
    fn name(&self) -> &str {
        "cache"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError> {
        check_range(start, end)?;

        match self.cache.load(symbol, start, end) {
            Ok(points) => {
                log::debug!("cache hit: {symbol} ({start}..{end})");
                return Ok(PriceSeries::new(symbol, points, DataSource::Cache));
            }
            Err(PriceError::NoCachedData { .. }) => {}
            Err(e) => return Err(e),
        }

        let Some(inner) = &self.inner else {
            return Err(PriceError::NoCachedData {
                symbol: symbol.to_string(),
                start,
                end,
            });
        };
        if !inner.is_available() {
            return Err(PriceError::Unavailable(inner.name().to_string()));
        }

        let series = inner.fetch(symbol, start, end)?;
        if series.source != DataSource::Synthetic {
            if let Err(e) = self.cache.write(start, end, &series) {
                log::warn!("failed to cache {symbol}: {e}");
            }
        }
        Ok(series)
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn hash_points(points: &[PricePoint]) -> Result<String, PriceError> {
    let bytes = serde_json::to_vec(points)
        .map_err(|e| PriceError::CacheError(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn points_to_dataframe(points: &[PricePoint]) -> Result<DataFrame, PriceError> {
    let dates: Vec<i32> = points
        .iter()
        .map(|p| p.date.num_days_from_ce() - UNIX_EPOCH_FROM_CE)
        .collect();
    let opens: Vec<Option<f64>> = points.iter().map(|p| p.open).collect();
    let highs: Vec<Option<f64>> = points.iter().map(|p| p.high).collect();
    let lows: Vec<Option<f64>> = points.iter().map(|p| p.low).collect();
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let volumes: Vec<Option<u64>> = points.iter().map(|p| p.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| PriceError::ParquetError(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| PriceError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), PriceError> {
    let file = fs::File::create(path)
        .map_err(|e| PriceError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| PriceError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<PricePoint>, PriceError> {
    let file =
        fs::File::open(path).map_err(|e| PriceError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| PriceError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(PriceError::ParquetError("empty parquet file".into()));
    }
    for col_name in COLUMNS {
        if df.column(col_name).is_err() {
            return Err(PriceError::ParquetError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_points(&df)
}

fn dataframe_to_points(df: &DataFrame) -> Result<Vec<PricePoint>, PriceError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| PriceError::ParquetError(format!("column read: {e}")))
    };
    let typed = |name: &str, e: PolarsError| {
        PriceError::ParquetError(format!("{name} column type: {e}"))
    };

    let date_ca = col("date")?.date().map_err(|e| typed("date", e))?;
    let open_ca = col("open")?.f64().map_err(|e| typed("open", e))?;
    let high_ca = col("high")?.f64().map_err(|e| typed("high", e))?;
    let low_ca = col("low")?.f64().map_err(|e| typed("low", e))?;
    let close_ca = col("close")?.f64().map_err(|e| typed("close", e))?;
    let vol_ca = col("volume")?.u64().map_err(|e| typed("volume", e))?;

    let n = df.height();
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let days = date_ca
            .get(i)
            .ok_or_else(|| PriceError::ParquetError(format!("null date at row {i}")))?;
        let date = NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_FROM_CE)
            .ok_or_else(|| PriceError::ParquetError(format!("date out of range at row {i}")))?;
        let close = close_ca
            .get(i)
            .ok_or_else(|| PriceError::ParquetError(format!("null close at row {i}")))?;

        points.push(PricePoint {
            date,
            open: open_ca.get(i),
            high: high_ca.get(i),
            low: low_ca.get(i),
            close,
            volume: vol_ca.get(i),
        });
    }

    Ok(points)
}
