//! LLM cost tracking for the activity runner.
//!
//! Provides a thread-safe [`CostTracker`] that records token usage per
//! LLM call and computes estimated costs using configurable
//! per-million-token rates.
//!
//! All monetary calculations use [`rust_decimal::Decimal`] for financial
//! precision -- no floating-point arithmetic.

use std::sync::Mutex;

use rust_decimal::Decimal;

use crate::llm::TokenUsage;

/// One million, used as the denominator for per-million-token pricing.
const ONE_MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Thread-safe LLM cost tracker.
///
/// Holds per-million-token pricing and accumulates token counts and
/// estimated costs across all recorded calls. Safe to share via
/// `Arc<CostTracker>`.
pub struct CostTracker {
    /// Price per million input tokens, in dollars.
    input_rate: Decimal,
    /// Price per million output tokens, in dollars.
    output_rate: Decimal,
    /// Mutable interior state protected by a mutex.
    inner: Mutex<CostTrackerInner>,
}

/// Mutable accumulation state held inside the mutex.
#[derive(Debug, Default)]
struct CostTrackerInner {
    /// Total number of LLM calls recorded.
    total_calls: u64,
    /// Total input tokens across all calls.
    total_input_tokens: u64,
    /// Total output tokens across all calls.
    total_output_tokens: u64,
    /// Running estimated cost in dollars.
    total_estimated_cost: Decimal,
}

/// Snapshot of cost tracking state returned by [`CostTracker::summary`].
#[derive(Debug, Clone)]
pub struct CostSummary {
    /// Total number of LLM calls recorded.
    pub total_calls: u64,
    /// Total input tokens across all calls.
    pub total_input_tokens: u64,
    /// Total output tokens across all calls.
    pub total_output_tokens: u64,
    /// Running estimated cost in dollars.
    pub total_estimated_cost: Decimal,
}

impl CostTracker {
    /// Create a new cost tracker with per-million-token pricing.
    ///
    /// Rates are in dollars per million tokens. For example,
    /// `Decimal::new(30, 2)` represents $0.30 per million tokens.
    pub const fn new(input_rate: Decimal, output_rate: Decimal) -> Self {
        Self {
            input_rate,
            output_rate,
            inner: Mutex::new(CostTrackerInner {
                total_calls: 0,
                total_input_tokens: 0,
                total_output_tokens: 0,
                total_estimated_cost: Decimal::ZERO,
            }),
        }
    }

    /// Record a completed LLM call with token usage.
    ///
    /// Token counts that would overflow the running totals are clamped
    /// via saturating addition.
    pub fn record_call(&self, usage: TokenUsage) {
        let input_dec = Decimal::from(usage.input_tokens);
        let output_dec = Decimal::from(usage.output_tokens);

        // cost = (input_tokens / 1_000_000) * input_rate
        //      + (output_tokens / 1_000_000) * output_rate
        let input_cost = input_dec
            .checked_div(ONE_MILLION)
            .unwrap_or(Decimal::ZERO)
            .checked_mul(self.input_rate)
            .unwrap_or(Decimal::ZERO);
        let output_cost = output_dec
            .checked_div(ONE_MILLION)
            .unwrap_or(Decimal::ZERO)
            .checked_mul(self.output_rate)
            .unwrap_or(Decimal::ZERO);
        let call_cost = input_cost.checked_add(output_cost).unwrap_or(Decimal::ZERO);

        // If the mutex is poisoned we skip the update rather than panic.
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        inner.total_calls = inner.total_calls.saturating_add(1);
        inner.total_input_tokens = inner.total_input_tokens.saturating_add(usage.input_tokens);
        inner.total_output_tokens = inner
            .total_output_tokens
            .saturating_add(usage.output_tokens);
        inner.total_estimated_cost = inner
            .total_estimated_cost
            .checked_add(call_cost)
            .unwrap_or(inner.total_estimated_cost);
    }

    /// Return a snapshot of the current cost tracking state.
    ///
    /// Returns a zeroed summary if the mutex is poisoned.
    pub fn summary(&self) -> CostSummary {
        let Ok(inner) = self.inner.lock() else {
            return CostSummary {
                total_calls: 0,
                total_input_tokens: 0,
                total_output_tokens: 0,
                total_estimated_cost: Decimal::ZERO,
            };
        };

        CostSummary {
            total_calls: inner.total_calls,
            total_input_tokens: inner.total_input_tokens,
            total_output_tokens: inner.total_output_tokens,
            total_estimated_cost: inner.total_estimated_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn costs_accumulate_across_calls() {
        // $0.30 per 1M input, $0.88 per 1M output.
        let tracker = CostTracker::new(Decimal::new(30, 2), Decimal::new(88, 2));

        tracker.record_call(TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 0,
        });
        tracker.record_call(TokenUsage {
            input_tokens: 0,
            output_tokens: 1_000_000,
        });

        let summary = tracker.summary();
        assert_eq!(summary.total_calls, 2);
        assert_eq!(summary.total_input_tokens, 1_000_000);
        assert_eq!(summary.total_output_tokens, 1_000_000);
        // 0.30 + 0.88 = 1.18 exactly, no float rounding.
        assert_eq!(summary.total_estimated_cost, Decimal::new(118, 2));
    }

    #[test]
    fn zero_usage_records_a_free_call() {
        let tracker = CostTracker::new(Decimal::new(30, 2), Decimal::new(88, 2));
        tracker.record_call(TokenUsage::default());

        let summary = tracker.summary();
        assert_eq!(summary.total_calls, 1);
        assert_eq!(summary.total_estimated_cost, Decimal::ZERO);
    }
}
