//! Performance evaluator — walks a daily close series against a signal's
//! stop-loss and targets.
//!
//! Rules:
//! - One pass in ascending date order.
//! - On each day the stop-loss is checked first. `close <= stop_loss` marks
//!   the stop hit, fixes `final_price` at that close and ends the walk.
//! - Otherwise every target not yet reached is checked with `close >= target`.
//!   Reaching a target does not end the walk.
//! - `first_hit_*` records the earliest touch of any level.
//! - Terminal outcome precedence: STOP_LOSS_HIT > TARGET_3 > TARGET_2 >
//!   TARGET_1 > PROFIT > LOSS > BREAKEVEN, where PROFIT/LOSS compare the
//!   final price with the primary entry price.
//!
//! Only closing prices are consulted.

use std::borrow::Cow;

use chrono::NaiveDate;

use crate::domain::{Outcome, PerformanceResult, PricePoint, Signal, MAX_TARGETS};

/// Evaluate `signal` against `series`.
///
/// The series is expected in ascending date order; an out-of-order series is
/// sorted (stably) before the walk. An empty series, or one with no finite
/// close, gives [`PerformanceResult::no_data`].
pub fn evaluate(signal: &Signal, series: &[PricePoint]) -> PerformanceResult {
    let ordered = in_date_order(series);

    let Some(last_close) = ordered.iter().rev().find(|p| p.has_close()).map(|p| p.close) else {
        return PerformanceResult::no_data();
    };

    let mut walk = Walk::new(signal, last_close);
    for point in ordered.iter() {
        if walk.step(point) == Step::Stop {
            break;
        }
    }
    walk.finish(signal.entry_price())
}

fn in_date_order(series: &[PricePoint]) -> Cow<'_, [PricePoint]> {
    if series.windows(2).all(|w| w[0].date <= w[1].date) {
        Cow::Borrowed(series)
    } else {
        let mut sorted = series.to_vec();
        sorted.sort_by_key(|p| p.date);
        Cow::Owned(sorted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Stop,
}

/// Mutable state of a single walk.
struct Walk {
    stop: Option<f64>,
    targets: [Option<f64>; MAX_TARGETS],
    stop_loss_hit: bool,
    target_hits: [bool; MAX_TARGETS],
    first_hit: Option<(NaiveDate, f64)>,
    final_price: f64,
    highest: Option<f64>,
    lowest: Option<f64>,
    data_points: usize,
}

impl Walk {
    fn new(signal: &Signal, last_close: f64) -> Self {
        let mut targets = [None; MAX_TARGETS];
        for (i, slot) in targets.iter_mut().enumerate() {
            *slot = signal.target_level(i);
        }
        Self {
            stop: signal.stop_level(),
            targets,
            stop_loss_hit: false,
            target_hits: [false; MAX_TARGETS],
            first_hit: None,
            final_price: last_close,
            highest: None,
            lowest: None,
            data_points: 0,
        }
    }

    fn step(&mut self, point: &PricePoint) -> Step {
        self.data_points += 1;
        if !point.has_close() {
            return Step::Continue;
        }
        let close = point.close;
        self.highest = Some(self.highest.map_or(close, |h| h.max(close)));
        self.lowest = Some(self.lowest.map_or(close, |l| l.min(close)));

        if let Some(stop) = self.stop {
            if close <= stop {
                self.stop_loss_hit = true;
                self.final_price = close;
                self.touch(point.date, close);
                return Step::Stop;
            }
        }

        for i in 0..MAX_TARGETS {
            if self.target_hits[i] {
                continue;
            }
            if let Some(target) = self.targets[i] {
                if close >= target {
                    self.target_hits[i] = true;
                    self.touch(point.date, close);
                }
            }
        }
        Step::Continue
    }

    fn touch(&mut self, date: NaiveDate, close: f64) {
        if self.first_hit.is_none() {
            self.first_hit = Some((date, close));
        }
    }

    fn finish(self, entry: Option<f64>) -> PerformanceResult {
        let outcome = classify(
            self.stop_loss_hit,
            &self.target_hits,
            self.final_price,
            entry,
        );

        PerformanceResult {
            outcome,
            final_price: Some(self.final_price),
            first_hit_date: self.first_hit.map(|(d, _)| d),
            first_hit_price: self.first_hit.map(|(_, p)| p),
            stop_loss_hit: self.stop_loss_hit,
            target_hits: self.target_hits,
            highest_close: self.highest,
            lowest_close: self.lowest,
            data_points: self.data_points,
            data_source: None,
        }
    }
}

/// Apply the outcome precedence rule.
///
/// Without a usable entry price there is nothing to compare against, so an
/// otherwise unresolved walk is BREAKEVEN.
pub fn classify(
    stop_loss_hit: bool,
    target_hits: &[bool; MAX_TARGETS],
    final_price: f64,
    entry: Option<f64>,
) -> Outcome {
    if stop_loss_hit {
        return Outcome::StopLossHit;
    }
    if let Some(highest) = (0..MAX_TARGETS).rev().find(|&i| target_hits[i]) {
        if let Some(outcome) = Outcome::for_target(highest) {
            return outcome;
        }
    }
    match entry {
        Some(entry) if final_price > entry => Outcome::Profit,
        Some(entry) if final_price < entry => Outcome::Loss,
        _ => Outcome::Breakeven,
    }
}
