//! Experiment plans: what to vary and how to label the variants.
//!
//! These are the pure parts of each experiment — combination enumeration,
//! sweep parsing, strategy prompts, anonymization — kept out of `main.rs`
//! so they can be tested without an API endpoint.

use crate::{ChatRequest, ResponseFormat};

// ── Parameter grid ─────────────────────────────────────────────────

/// One on/off combination of the three optional request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCombo {
    pub use_format: bool,
    pub use_max_tokens: bool,
    pub use_stop: bool,
}

impl GridCombo {
    /// All 2^3 combinations, from "no constraints" to "all three".
    pub fn all() -> Vec<GridCombo> {
        (0..8)
            .map(|i| GridCombo {
                use_format: i & 4 != 0,
                use_max_tokens: i & 2 != 0,
                use_stop: i & 1 != 0,
            })
            .collect()
    }

    /// Human-readable label for report rows and console headers.
    pub fn label(&self, max_tokens: u32, stop: &str) -> String {
        let mut parts = Vec::new();
        if self.use_format {
            parts.push("format=json".to_string());
        }
        if self.use_max_tokens {
            parts.push(format!("max_tokens={max_tokens}"));
        }
        if self.use_stop {
            parts.push(format!("stop={stop:?}"));
        }
        if parts.is_empty() {
            "no constraints".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// The system-prompt instructions matching the enabled parameters, so
    /// the model is told about the constraints it is being held to.
    pub fn system_instructions(&self, max_tokens: u32, stop: &str) -> Option<String> {
        let mut instructions = Vec::new();
        if self.use_format {
            instructions.push("Respond with a single JSON object.".to_string());
        }
        if self.use_max_tokens {
            instructions.push(format!("Keep the response under {max_tokens} tokens."));
        }
        if self.use_stop {
            instructions.push(format!("Finish the response before the sequence: {stop:?}"));
        }
        if instructions.is_empty() {
            None
        } else {
            Some(instructions.join(" "))
        }
    }

    /// Apply the enabled parameters to a request body.
    pub fn apply(&self, body: &mut ChatRequest, max_tokens: u32, stop: &str) {
        if self.use_format {
            body.response_format = Some(ResponseFormat::json_object());
        }
        if self.use_max_tokens {
            body.max_tokens = Some(max_tokens);
        }
        if self.use_stop {
            body.stop = Some(vec![stop.to_string()]);
        }
    }
}

// ── Temperature sweep ──────────────────────────────────────────────

/// Default sweep when no `--temperatures` flag is given.
pub const DEFAULT_SWEEP: [f32; 5] = [0.0, 0.3, 0.7, 1.0, 1.3];

/// Parse a comma-separated temperature list, e.g. `"0.0,0.5,1.0"`.
pub fn parse_temperatures(spec: &str) -> Result<Vec<f32>, String> {
    let temps: Result<Vec<f32>, String> = spec
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| format!("invalid temperature '{s}'"))
        })
        .collect();
    let temps = temps?;
    if temps.is_empty() {
        return Err("temperature list is empty".to_string());
    }
    if let Some(bad) = temps.iter().find(|t| !(0.0..=2.0).contains(*t)) {
        return Err(format!("temperature {bad} out of range 0.0..=2.0"));
    }
    Ok(temps)
}

// ── Prompting strategies ───────────────────────────────────────────

/// A prompting strategy to compare on the same question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ZeroShot,
    FewShot,
    ChainOfThought,
}

impl Strategy {
    pub fn all() -> [Strategy; 3] {
        [Strategy::ZeroShot, Strategy::FewShot, Strategy::ChainOfThought]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::ZeroShot => "zero-shot",
            Strategy::FewShot => "few-shot",
            Strategy::ChainOfThought => "chain-of-thought",
        }
    }

    /// The system prompt that realizes this strategy.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Strategy::ZeroShot => "Answer the user's question directly and concisely.",
            Strategy::FewShot => {
                "Answer the user's question in the style of these examples.\n\n\
                 Q: What causes tides?\n\
                 A: The gravitational pull of the Moon (and, less so, the Sun) on Earth's oceans.\n\n\
                 Q: Why is the sky blue?\n\
                 A: Air molecules scatter short blue wavelengths of sunlight more than long red ones.\n\n\
                 Now answer in the same short factual style."
            }
            Strategy::ChainOfThought => {
                "Think through the problem step by step, numbering each step, \
                 then give the final answer on a separate line starting with 'Answer:'."
            }
        }
    }
}

// ── Anonymized model comparison ────────────────────────────────────

/// Blind labels for a model comparison: "Model A", "Model B", ...
pub fn anonymous_labels(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let letter = (b'A' + (i % 26) as u8) as char;
            if i < 26 {
                format!("Model {letter}")
            } else {
                format!("Model {letter}{}", i / 26)
            }
        })
        .collect()
}

/// A seeded Fisher-Yates permutation of `0..n`, so the presentation order
/// of anonymized results doesn't leak the input order. An LCG keeps this
/// dependency-free; determinism under a fixed seed makes it testable.
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    for i in (1..n).rev() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let j = (state >> 33) as usize % (i + 1);
        indices.swap(i, j);
    }
    indices
}
