//! Signal — one trading call as it was posted to the chat.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of target levels a call can carry.
pub const MAX_TARGETS: usize = 3;

/// Direction of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action '{0}' (expected BUY, SELL or HOLD)")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            "HOLD" => Ok(Action::Hold),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = UnknownAction;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A normalized trading call.
///
/// Immutable once parsed. Price levels that were missing or unparseable in
/// the source message are `None`; the evaluator treats them as "no such
/// level" rather than as errors.
///
/// The serialized form is the flat record written by the chat parser
/// (`date`, `buy_price_1`, `target_1`, ...), so exported signal files can be
/// fed straight back into the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SignalRecord", into = "SignalRecord")]
pub struct Signal {
    pub listing_date: NaiveDate,
    pub sender: String,
    pub action: Action,
    pub stock: String,
    pub buy_price_primary: Option<f64>,
    pub buy_price_secondary: Option<f64>,
    pub stop_loss: Option<f64>,
    /// Up to three levels, ascending by convention (not enforced).
    pub targets: [Option<f64>; MAX_TARGETS],
    pub time_frame: Option<String>,
    pub raw_message: String,
}

impl Signal {
    /// Stop-loss level, if one is usable.
    pub fn stop_level(&self) -> Option<f64> {
        usable_level(self.stop_loss)
    }

    /// Target level `index` (0-based), if one is usable.
    pub fn target_level(&self, index: usize) -> Option<f64> {
        self.targets.get(index).copied().and_then(usable_level)
    }

    /// Primary entry price, if it can anchor a profit/loss comparison.
    pub fn entry_price(&self) -> Option<f64> {
        usable_level(self.buy_price_primary)
    }

    /// Number of targets present on the call.
    pub fn target_count(&self) -> usize {
        (0..MAX_TARGETS)
            .filter(|&i| self.target_level(i).is_some())
            .count()
    }
}

impl AsRef<Signal> for Signal {
    fn as_ref(&self) -> &Signal {
        self
    }
}

/// Zero, negative and non-finite prices never come from a real call; they are
/// what a failed price parse leaves behind, so they count as absent.
fn usable_level(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Flat on-disk shape of a [`Signal`] (JSON objects and CSV rows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    #[serde(alias = "listing_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub sender: String,
    pub action: Action,
    pub stock: String,
    #[serde(default)]
    pub buy_price_1: Option<f64>,
    #[serde(default)]
    pub buy_price_2: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub target_1: Option<f64>,
    #[serde(default)]
    pub target_2: Option<f64>,
    #[serde(default)]
    pub target_3: Option<f64>,
    #[serde(default)]
    pub time_frame: Option<String>,
    #[serde(default)]
    pub raw_message: String,
}

impl From<SignalRecord> for Signal {
    fn from(r: SignalRecord) -> Self {
        Signal {
            listing_date: r.date,
            sender: r.sender,
            action: r.action,
            stock: r.stock.trim().to_ascii_uppercase(),
            buy_price_primary: r.buy_price_1,
            buy_price_secondary: r.buy_price_2,
            stop_loss: r.stop_loss,
            targets: [r.target_1, r.target_2, r.target_3],
            time_frame: r.time_frame.filter(|tf| !tf.trim().is_empty()),
            raw_message: r.raw_message,
        }
    }
}

impl From<Signal> for SignalRecord {
    fn from(s: Signal) -> Self {
        let [target_1, target_2, target_3] = s.targets;
        SignalRecord {
            date: s.listing_date,
            sender: s.sender,
            action: s.action,
            stock: s.stock,
            buy_price_1: s.buy_price_primary,
            buy_price_2: s.buy_price_secondary,
            stop_loss: s.stop_loss,
            target_1,
            target_2,
            target_3,
            time_frame: s.time_frame,
            raw_message: s.raw_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Signal {
        Signal {
            listing_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            sender: "Analyst".into(),
            action: Action::Buy,
            stock: "TCS".into(),
            buy_price_primary: Some(100.0),
            buy_price_secondary: None,
            stop_loss: Some(90.0),
            targets: [Some(110.0), Some(120.0), None],
            time_frame: Some("5-10 Days".into()),
            raw_message: "BUY TCS @ 100 SL 90 TGT 110,120".into(),
        }
    }

    #[test]
    fn action_parses_case_insensitively() {
        assert_eq!("buy".parse::<Action>().unwrap(), Action::Buy);
        assert_eq!(" Sell ".parse::<Action>().unwrap(), Action::Sell);
        assert!("short".parse::<Action>().is_err());
    }

    #[test]
    fn json_uses_flat_record_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["buy_price_1"], 100.0);
        assert_eq!(json["target_2"], 120.0);
        assert!(json["target_3"].is_null());
        assert_eq!(json["action"], "BUY");
    }

    #[test]
    fn accepts_listing_date_alias_and_lowercase_action() {
        let json = r#"{"listing_date":"2024-03-05","action":"sell","stock":"infy",
                       "buy_price_1":1500.0,"stop_loss":1550.0,"target_1":1400.0}"#;
        let signal: Signal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.listing_date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(signal.action, Action::Sell);
        assert_eq!(signal.stock, "INFY");
        assert_eq!(signal.time_frame, None);
        assert_eq!(signal.target_count(), 1);
    }

    #[test]
    fn non_positive_levels_are_unusable() {
        let mut signal = sample();
        signal.stop_loss = Some(0.0);
        signal.targets[0] = Some(f64::NAN);
        assert_eq!(signal.stop_level(), None);
        assert_eq!(signal.target_level(0), None);
        assert_eq!(signal.target_level(1), Some(120.0));
        assert_eq!(signal.target_level(7), None);
    }
}
