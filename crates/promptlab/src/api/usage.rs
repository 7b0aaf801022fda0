//! Cumulative token accounting for a run.
//!
//! Every experiment and every chat session makes a handful of API calls;
//! [`UsageTally`] adds up what they cost in tokens and prints one line at
//! the end.

use crate::UsageInfo;

/// Cumulative token tally across the LLM calls of one run.
#[derive(Debug, Default, Clone)]
pub struct UsageTally {
    pub calls: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl UsageTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record usage from one completed call. Calls whose usage the server
    /// omitted still count toward `calls`.
    pub fn record(&mut self, usage: &UsageInfo) {
        self.calls += 1;
        self.prompt_tokens += u64::from(usage.prompt_tokens.unwrap_or(0));
        self.completion_tokens += u64::from(usage.completion_tokens.unwrap_or(0));
    }

    /// Total tokens consumed.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Format as a short summary string.
    pub fn summary(&self) -> String {
        format!(
            "{} call(s), tokens: {} prompt + {} completion = {} total",
            self.calls,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens(),
        )
    }
}
