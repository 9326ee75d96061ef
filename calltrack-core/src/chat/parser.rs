//! Chat-export line parser.
//!
//! Recognizes exported chat lines of the form
//! `M/D/YY, H:MM - Sender: message` and, inside the message, calls such as
//! `BUY TCS @ 3450,3460 SL 3380 TGT 3520,3580,3650 Time Frame: 5-10 Days`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::domain::{Action, Signal, MAX_TARGETS};

/// Date layouts tried in order. Month-first wins when a date is ambiguous.
pub const DATE_FORMATS: [&str; 4] = ["%m/%d/%y", "%m/%d/%Y", "%d/%m/%y", "%d/%m/%Y"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read chat export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Extracts [`Signal`]s from chat-export text.
#[derive(Debug, Clone)]
pub struct ChatParser {
    line: Regex,
    call: Regex,
    time_frame: Regex,
    day_span: Regex,
}

impl Default for ChatParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatParser {
    pub fn new() -> Self {
        Self {
            line: Regex::new(
                r"^(\d{1,2}/\d{1,2}/\d{2,4}),?\s*\d{1,2}:\d{2}(?:\s*[AaPp][Mm])?\s*-\s*(.+?):\s*(.+)",
            )
            .expect("line pattern is valid"),
            call: Regex::new(
                r"(?i)\b(BUY|SELL|HOLD)\s+([A-Z][A-Z0-9&-]*)\s*@\s*(\d[\d.,]*)\s+SL\s+(\d[\d.,]*)\s+(?:TGT|TARGET)\s+(\d[\d.,]*)",
            )
            .expect("call pattern is valid"),
            time_frame: Regex::new(r"(?i)Time\s*Frame\s*:?\s*([^;\n]+)")
                .expect("time frame pattern is valid"),
            day_span: Regex::new(r"(?i)(\d+(?:\s*-\s*\d+)?\s*Days?)")
                .expect("day span pattern is valid"),
        }
    }

    /// Read and parse a chat export. Non-UTF-8 files are decoded as Latin-1.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<Signal>, ParseError> {
        log::info!("parsing chat export {}", path.display());
        let bytes = fs::read(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("{} is not UTF-8; decoding as Latin-1", path.display());
                e.into_bytes().iter().map(|&b| char::from(b)).collect()
            }
        };
        Ok(self.parse_str(&text))
    }

    /// Parse every line of `text`, keeping the ones that carry a call.
    pub fn parse_str(&self, text: &str) -> Vec<Signal> {
        let mut lines = 0usize;
        let signals: Vec<Signal> = text
            .lines()
            .inspect(|_| lines += 1)
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| self.parse_line(l))
            .collect();
        log::info!("extracted {} signals from {lines} lines", signals.len());
        signals
    }

    /// Parse one exported line. `None` for chatter, deleted messages and
    /// lines whose date cannot be read.
    pub fn parse_line(&self, line: &str) -> Option<Signal> {
        let caps = self.line.captures(line.trim_end_matches('\r'))?;
        let (date_str, sender, message) = (&caps[1], &caps[2], &caps[3]);

        if message.to_lowercase().contains("deleted this message") {
            return None;
        }

        let Some(listing_date) = parse_date(date_str) else {
            log::warn!("could not parse date: {date_str}");
            return None;
        };

        let call = self.call.captures(message)?;
        let action: Action = call[1].parse().ok()?;

        let mut buy_prices = call[3].split(',').map(clean_price);
        let buy_price_primary = buy_prices.next().flatten();
        let buy_price_secondary = buy_prices.next().flatten();

        let mut targets = [None; MAX_TARGETS];
        for (slot, level) in targets.iter_mut().zip(parse_targets(&call[5])) {
            *slot = Some(level);
        }

        Some(Signal {
            listing_date,
            sender: sender.trim().to_string(),
            action,
            stock: call[2].to_ascii_uppercase(),
            buy_price_primary,
            buy_price_secondary,
            stop_loss: clean_price(&call[4]),
            targets,
            time_frame: self.extract_time_frame(message),
            raw_message: message.trim().to_string(),
        })
    }

    /// Text after `Time Frame:`; narrowed to the `N[-M] Days` fragment when
    /// there is one.
    pub fn extract_time_frame(&self, message: &str) -> Option<String> {
        let text = self.time_frame.captures(message)?.get(1)?.as_str().trim();
        if text.is_empty() {
            return None;
        }
        match self.day_span.find(text) {
            Some(span) => Some(span.as_str().trim().to_string()),
            None => Some(text.to_string()),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// First comma-separated piece of a price field, as a number.
fn clean_price(raw: &str) -> Option<f64> {
    let first = raw.split(',').next()?.trim().trim_end_matches('.');
    first.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Comma-separated levels in order; empty, zero and unparseable pieces dropped.
fn parse_targets(raw: &str) -> Vec<f64> {
    raw.split(',')
        .filter_map(clean_price)
        .filter(|p| *p != 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_full_call() {
        let parser = ChatParser::new();
        let line = "1/15/24, 9:30 - Market Desk: BUY tcs @ 3450,3460 SL 3380 TGT 3520,3580,3650 Time Frame: 5-10 Days; hold tight";
        let s = parser.parse_line(line).unwrap();
        assert_eq!(s.listing_date, date(2024, 1, 15));
        assert_eq!(s.sender, "Market Desk");
        assert_eq!(s.action, Action::Buy);
        assert_eq!(s.stock, "TCS");
        assert_eq!(s.buy_price_primary, Some(3450.0));
        assert_eq!(s.buy_price_secondary, Some(3460.0));
        assert_eq!(s.stop_loss, Some(3380.0));
        assert_eq!(s.targets, [Some(3520.0), Some(3580.0), Some(3650.0)]);
        assert_eq!(s.time_frame.as_deref(), Some("5-10 Days"));
        assert!(s.raw_message.starts_with("BUY tcs"));
    }

    #[test]
    fn target_keyword_and_single_price() {
        let parser = ChatParser::new();
        let s = parser
            .parse_line("3/5/2024, 14:05 - A: sell INFY @ 1500 SL 1550 TARGET 1400")
            .unwrap();
        assert_eq!(s.action, Action::Sell);
        assert_eq!(s.listing_date, date(2024, 3, 5));
        assert_eq!(s.buy_price_secondary, None);
        assert_eq!(s.targets, [Some(1400.0), None, None]);
        assert_eq!(s.time_frame, None);
    }

    #[test]
    fn day_first_dates_fall_through() {
        let parser = ChatParser::new();
        let s = parser
            .parse_line("25/12/23, 10:00 - A: BUY ABC @ 10 SL 9 TGT 11")
            .unwrap();
        assert_eq!(s.listing_date, date(2023, 12, 25));
    }

    #[test]
    fn skips_chatter_and_deleted_messages() {
        let parser = ChatParser::new();
        assert!(parser.parse_line("1/15/24, 9:30 - A: good morning all").is_none());
        assert!(parser
            .parse_line("1/15/24, 9:30 - A: You deleted this message BUY X @ 1 SL 1 TGT 2")
            .is_none());
        assert!(parser.parse_line("BUY X @ 1 SL 1 TGT 2").is_none());
    }

    #[test]
    fn unreadable_date_is_skipped() {
        let parser = ChatParser::new();
        assert!(parser
            .parse_line("13/13/24, 9:30 - A: BUY ABC @ 10 SL 9 TGT 11")
            .is_none());
    }

    #[test]
    fn free_text_time_frame_is_kept_whole() {
        let parser = ChatParser::new();
        assert_eq!(
            parser.extract_time_frame("Time Frame : Short term\nmore").as_deref(),
            Some("Short term")
        );
        assert_eq!(
            parser.extract_time_frame("time frame 30 days or so").as_deref(),
            Some("30 days")
        );
        assert_eq!(parser.extract_time_frame("no window"), None);
    }

    #[test]
    fn zero_and_empty_targets_are_dropped() {
        assert_eq!(parse_targets("0,510,,520."), vec![510.0, 520.0]);
        assert_eq!(clean_price("12,5"), Some(12.0));
        assert_eq!(clean_price("abc"), None);
    }

    #[test]
    fn parse_str_collects_calls_only() {
        let text = "1/15/24, 9:30 - A: hello\r\n\
                    1/15/24, 9:31 - A: BUY ABC @ 10 SL 9 TGT 11\r\n\
                    \r\n\
                    1/16/24, 9:31 - B: HOLD XYZ @ 20 SL 18 TGT 22,24 Time Frame: 30 Days\n";
        let signals = ChatParser::new().parse_str(text);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[1].action, Action::Hold);
        assert_eq!(signals[1].time_frame.as_deref(), Some("30 Days"));
    }
}
