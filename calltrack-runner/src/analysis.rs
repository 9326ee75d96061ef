//! Expiry analysis over a batch of signals.

use calltrack_core::domain::{AnalyzedSignal, Signal};
use calltrack_core::{expiry, Clock};

/// Resolve every signal's window against the clock's "today", in input order.
pub fn analyze_signals(signals: Vec<Signal>, clock: &dyn Clock) -> Vec<AnalyzedSignal> {
    let today = clock.today();
    log::info!(
        "analyzing {} signals as of {} (clock: {})",
        signals.len(),
        today,
        clock.name()
    );
    signals
        .into_iter()
        .map(|signal| expiry::analyze(signal, today))
        .collect()
}

pub fn expired(analyzed: &[AnalyzedSignal]) -> Vec<AnalyzedSignal> {
    analyzed.iter().filter(|a| a.is_expired).cloned().collect()
}

pub fn active(analyzed: &[AnalyzedSignal]) -> Vec<AnalyzedSignal> {
    analyzed.iter().filter(|a| !a.is_expired).cloned().collect()
}
