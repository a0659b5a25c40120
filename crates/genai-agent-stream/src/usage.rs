//! Token usage accounting and cost reporting for one streamed response.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trace::UsageSummary;

/// Per-thousand-token rates in USD.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Pricing {
    /// Claude Haiku 4.5 list pricing.
    pub const CLAUDE_HAIKU_4_5: Pricing = Pricing {
        input_per_1k: 0.0011,
        output_per_1k: 0.0055,
    };

    pub fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::CLAUDE_HAIKU_4_5
    }
}

/// Running token totals across every turn of a response.
///
/// Counters only grow. A caller can hand the transform a `&mut` to an
/// accumulator it owns to read totals afterwards or to aggregate several
/// sequential responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageAccumulator {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one turn's usage. Absent counts count as zero.
    pub fn record(&mut self, usage: &UsageSummary) {
        self.total_input_tokens = self
            .total_input_tokens
            .saturating_add(usage.input_tokens.unwrap_or(0));
        self.total_output_tokens = self
            .total_output_tokens
            .saturating_add(usage.output_tokens.unwrap_or(0));
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens
            .saturating_add(self.total_output_tokens)
    }
}

/// Token totals and their cost for one finished response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub session_id: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl CostSummary {
    pub fn compute(session_id: &str, usage: &UsageAccumulator, pricing: Pricing) -> Self {
        let input_cost = (usage.total_input_tokens as f64 / 1000.0) * pricing.input_per_1k;
        let output_cost = (usage.total_output_tokens as f64 / 1000.0) * pricing.output_per_1k;
        Self {
            session_id: session_id.to_string(),
            input_tokens: usage.total_input_tokens,
            output_tokens: usage.total_output_tokens,
            total_tokens: usage.total_tokens(),
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
        }
    }
}

impl fmt::Display for CostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Token Usage] Session: {} | Input: {} tokens (${:.6}) | Output: {} tokens (${:.6}) | Total: {} tokens (${:.6})",
            self.session_id,
            self.input_tokens,
            self.input_cost,
            self.output_tokens,
            self.output_cost,
            self.total_tokens,
            self.total_cost,
        )
    }
}
