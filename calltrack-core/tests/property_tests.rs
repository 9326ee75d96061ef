//! Property tests for expiry and evaluator invariants.
//!
//! Uses proptest to verify:
//! 1. Cutoff = listing date + largest integer in the time frame
//! 2. Expiry is strict and monotonic in "today"
//! 3. Evaluation is idempotent
//! 4. A stop-loss breach is terminal
//! 5. The highest target reached decides the outcome
//! 6. NO_HIT never escapes the evaluator

use calltrack_core::domain::{daily_closes, Action, Outcome, PricePoint, Signal};
use calltrack_core::evaluate;
use calltrack_core::expiry;
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + Days::new(offset)
    })
}

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_level() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(arb_price())
}

fn arb_signal() -> impl Strategy<Value = Signal> {
    (
        arb_date(),
        arb_level(),
        arb_level(),
        [arb_level(), arb_level(), arb_level()],
    )
        .prop_map(|(listing_date, buy, stop, targets)| Signal {
            listing_date,
            sender: "prop".into(),
            action: Action::Buy,
            stock: "PROP".into(),
            buy_price_primary: buy,
            buy_price_secondary: None,
            stop_loss: stop,
            targets,
            time_frame: None,
            raw_message: String::new(),
        })
}

fn arb_series() -> impl Strategy<Value = Vec<PricePoint>> {
    prop::collection::vec(arb_price(), 0..60).prop_map(|closes| {
        daily_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &closes)
    })
}

// ── 1-2. Expiry ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn cutoff_uses_largest_integer(
        listing in arb_date(),
        nums in prop::collection::vec(0u32..400, 1..4),
        filler in "[a-zA-Z ]{0,6}",
    ) {
        let text = nums
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(&format!(" {filler}-"));
        let max = *nums.iter().max().unwrap();
        prop_assert_eq!(
            expiry::cutoff_date(listing, Some(&text)),
            Some(listing + Days::new(u64::from(max)))
        );
    }

    #[test]
    fn no_integers_means_no_cutoff(listing in arb_date(), text in "[a-zA-Z ;:-]{0,20}") {
        prop_assert_eq!(expiry::cutoff_date(listing, Some(&text)), None);
        let e = expiry::compute(listing, Some(&text), listing + Days::new(10_000));
        prop_assert!(!e.is_expired);
    }

    #[test]
    fn expiry_is_strict_comparison(cutoff in arb_date(), today in arb_date()) {
        let e = expiry::status_on(Some(cutoff), today);
        prop_assert_eq!(e.is_expired, today > cutoff);
        if e.is_expired {
            prop_assert_eq!(i64::from(e.days_expired), (today - cutoff).num_days());
        } else {
            prop_assert_eq!(e.days_expired, 0);
        }
    }

    #[test]
    fn expiry_is_monotonic(cutoff in arb_date(), today in arb_date(), later in 0u64..500) {
        let earlier = expiry::status_on(Some(cutoff), today);
        let after = expiry::status_on(Some(cutoff), today + Days::new(later));
        prop_assert!(!earlier.is_expired || after.is_expired);
        prop_assert!(after.days_expired >= earlier.days_expired);
    }
}

// ── 3-6. Evaluator ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn evaluation_is_idempotent(signal in arb_signal(), series in arb_series()) {
        prop_assert_eq!(evaluate(&signal, &series), evaluate(&signal, &series));
    }

    #[test]
    fn stop_loss_is_terminal(
        signal in arb_signal(),
        series in arb_series(),
        tail in prop::collection::vec(arb_price(), 1..10),
    ) {
        let r = evaluate(&signal, &series);
        prop_assume!(r.stop_loss_hit);

        // Anything appended after the breach must not change the result.
        let mut extended = series.clone();
        let start = series.last().unwrap().date + Days::new(1);
        extended.extend(daily_closes(start, &tail));
        prop_assert_eq!(evaluate(&signal, &extended), r.clone());
        prop_assert!(r.data_points <= series.len());
    }

    #[test]
    fn highest_target_decides(signal in arb_signal(), series in arb_series()) {
        let r = evaluate(&signal, &series);
        if !r.stop_loss_hit {
            let expected = match r.target_hits {
                [_, _, true] => Some(Outcome::Target3Hit),
                [_, true, false] => Some(Outcome::Target2Hit),
                [true, false, false] => Some(Outcome::Target1Hit),
                _ => None,
            };
            if let Some(expected) = expected {
                prop_assert_eq!(r.outcome, expected);
            }
        } else {
            prop_assert_eq!(r.outcome, Outcome::StopLossHit);
        }
    }

    #[test]
    fn no_hit_never_escapes(signal in arb_signal(), series in arb_series()) {
        let r = evaluate(&signal, &series);
        prop_assert_ne!(r.outcome, Outcome::NoHit);
        prop_assert_eq!(r.outcome == Outcome::NoData, series.is_empty());
        prop_assert!(r.data_points <= series.len());
    }

    #[test]
    fn first_hit_is_some_iff_a_level_was_touched(signal in arb_signal(), series in arb_series()) {
        let r = evaluate(&signal, &series);
        let touched = r.stop_loss_hit || r.target_hits.iter().any(|&h| h);
        prop_assert_eq!(r.first_hit_date.is_some(), touched);
        prop_assert_eq!(r.first_hit_price.is_some(), touched);
    }
}
