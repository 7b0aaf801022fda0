//! Sliding-window summarization for chat transcripts.
//!
//! Keeps the last `recent_window` turns verbatim and maintains a running
//! summary of everything older — never re-summarizes the whole history.
//! When enough un-summarized turns have accumulated, the old batch is
//! folded into the summary with a single cheap LLM call and the transcript
//! is trimmed down to the window.

use tracing::info;

use crate::context::summary::SummaryState;
use crate::transcript::{Transcript, Turn};
use crate::{ChatCapability, Message, UsageInfo};

/// The prompt used for summarization. Instructs the model to produce a
/// concise, factual digest suitable for injecting into a later context.
const SUMMARIZATION_PROMPT: &str = "\
Summarize the following conversation turns concisely. Focus on:
- Topics discussed and questions the user asked
- Facts, names, and preferences the user stated about themselves
- Conclusions reached and advice already given

Rules:
- Only include facts explicitly stated in the turns. Do not infer or extrapolate.
- Be concise — every token must earn its place.
- If there is an existing summary, merge the new information into it to produce a single \
  cohesive summary. Do not simply append — integrate, deduplicate, and update. The result \
  must be a standalone summary that replaces the existing one entirely.";

/// Default minimum count of un-summarized, non-recent turns required before
/// compression triggers.
pub const DEFAULT_BATCH_THRESHOLD: usize = 20;

/// Decides when a transcript must be compressed and performs the fold.
///
/// The transcript is trimmed to the window immediately after every
/// successful fold, so the live transcript holds exactly the turns the
/// summary does not cover. That makes the trigger arithmetic exact: no
/// cursor drift, no dependence on how the thresholds were configured in
/// earlier runs.
#[derive(Debug, Clone)]
pub struct SummaryWindow {
    /// Newest turns always kept verbatim, never summarized.
    pub recent_window: usize,
    /// Un-summarized non-recent turns required before a fold.
    pub batch_threshold: usize,
}

impl Default for SummaryWindow {
    fn default() -> Self {
        Self {
            recent_window: 3,
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
        }
    }
}

impl SummaryWindow {
    pub fn new(recent_window: usize, batch_threshold: usize) -> Self {
        Self {
            recent_window,
            batch_threshold,
        }
    }

    /// Whether `total_turns` uncovered turns warrant a compression cycle.
    /// Pure; `total_turns` is the live (post-trim) transcript length.
    pub fn needs_compression(&self, total_turns: usize) -> bool {
        total_turns.saturating_sub(self.recent_window) >= self.batch_threshold
    }

    /// The slice of turns a fold would absorb: everything except the last
    /// `recent_window`.
    pub fn fold_span<'a>(&self, turns: &'a [Turn]) -> &'a [Turn] {
        let fold_len = turns.len().saturating_sub(self.recent_window);
        &turns[..fold_len]
    }

    /// Build the one-shot summarization request for a span of turns,
    /// merging with the existing summary when there is one.
    pub fn build_summary_request(&self, existing: Option<&str>, span: &[Turn]) -> Vec<Message> {
        let mut content = String::new();

        if let Some(existing) = existing {
            content.push_str("=== EXISTING SUMMARY ===\n");
            content.push_str(existing);
            content.push_str("\n\n=== NEW TURNS TO SUMMARIZE ===\n");
        }

        for turn in span {
            content.push_str(&format!("[{}]: {}\n\n", turn.role, turn.content));
        }

        vec![Message::system(SUMMARIZATION_PROMPT), Message::user(content)]
    }

    /// Fold the non-recent turns into a new summary with one LLM call.
    ///
    /// Returns the replacement summary text and the token usage of that
    /// call. Pure with respect to session state: the caller commits the
    /// result, so a failed call leaves everything as it was.
    pub async fn compress(
        &self,
        turns: &[Turn],
        existing: Option<&str>,
        llm: &dyn ChatCapability,
    ) -> Result<(String, UsageInfo), String> {
        if turns.is_empty() {
            return Err("compress called on an empty transcript".to_string());
        }
        let span = self.fold_span(turns);
        if span.is_empty() {
            return Err(format!(
                "nothing to fold: {} turn(s), window {}",
                turns.len(),
                self.recent_window
            ));
        }

        info!(
            "folding {} turn(s) into the summary (merge={})",
            span.len(),
            existing.is_some()
        );
        let request = self.build_summary_request(existing, span);
        llm.send_message(request).await
    }

    /// Run one full compression cycle: fold, replace the summary state,
    /// trim the transcript to the window.
    ///
    /// No state is touched until the LLM call has succeeded; on error both
    /// `transcript` and `state` are exactly as before.
    pub async fn compact(
        &self,
        transcript: &mut Transcript,
        state: &mut Option<SummaryState>,
        llm: &dyn ChatCapability,
    ) -> Result<UsageInfo, String> {
        let existing = state.as_ref().map(|s| s.summary.as_str());
        let (summary, usage) = self.compress(transcript.turns(), existing, llm).await?;

        let folded = self.fold_span(transcript.turns()).len();
        let covered = state.as_ref().map_or(0, |s| s.original_message_count) + folded;
        *state = Some(SummaryState::new(summary, covered));
        transcript.trim_to_recent(self.recent_window);

        info!(
            "summary now covers {covered} turn(s); {} kept verbatim",
            transcript.len()
        );
        Ok(usage)
    }

    /// Assemble the message list for the next reply: one synthetic system
    /// message (persona, with the summary folded into it when present)
    /// followed by the recent window — or the whole transcript while no
    /// summary exists. Pure; the result is never persisted.
    pub fn build_context(
        &self,
        persona: &str,
        turns: &[Turn],
        summary: Option<&str>,
    ) -> Vec<Message> {
        let system = match summary {
            Some(summary) => {
                format!("{persona}\n\nSummary of the conversation so far:\n{summary}")
            }
            None => persona.to_string(),
        };

        let raw: &[Turn] = match summary {
            Some(_) => {
                let start = turns.len().saturating_sub(self.recent_window);
                &turns[start..]
            }
            None => turns,
        };

        let mut messages = Vec::with_capacity(raw.len() + 1);
        messages.push(Message::system(system));
        messages.extend(raw.iter().map(Turn::message));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageRole, SendFuture};
    use std::sync::Mutex;

    /// Canned summarizer: returns a fixed reply and records what it was sent.
    struct CannedSummarizer {
        reply: String,
        requests: Mutex<Vec<Vec<Message>>>,
    }

    impl CannedSummarizer {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_user_content(&self) -> String {
            let requests = self.requests.lock().unwrap();
            requests.last().unwrap().last().unwrap().content.clone()
        }
    }

    impl ChatCapability for CannedSummarizer {
        fn send_message(&self, turns: Vec<Message>) -> SendFuture<'_> {
            self.requests.lock().unwrap().push(turns);
            let reply = self.reply.clone();
            Box::pin(async move {
                Ok((
                    reply,
                    UsageInfo {
                        prompt_tokens: Some(100),
                        completion_tokens: Some(40),
                        total_tokens: Some(140),
                    },
                ))
            })
        }
    }

    /// Summarizer that always fails, for the no-commit-on-error path.
    struct FailingSummarizer;

    impl ChatCapability for FailingSummarizer {
        fn send_message(&self, _turns: Vec<Message>) -> SendFuture<'_> {
            Box::pin(async { Err("chat API HTTP 503: overloaded".to_string()) })
        }
    }

    fn transcript_of(n: usize) -> Transcript {
        let mut t = Transcript::new();
        for i in 0..n {
            t.push(Turn::user(format!("turn {i}")));
        }
        t
    }

    #[test]
    fn below_threshold_no_compression() {
        let window = SummaryWindow::new(3, 20);
        assert!(!window.needs_compression(0));
        assert!(!window.needs_compression(3));
        assert!(!window.needs_compression(22));
    }

    #[test]
    fn at_threshold_compression_fires() {
        let window = SummaryWindow::new(3, 20);
        assert!(window.needs_compression(23));
        assert!(window.needs_compression(50));
    }

    #[test]
    fn zero_window_counts_every_turn() {
        let window = SummaryWindow::new(0, 20);
        assert!(!window.needs_compression(19));
        assert!(window.needs_compression(20));
    }

    #[test]
    fn fold_span_excludes_recent_window() {
        let window = SummaryWindow::new(3, 20);
        let t = transcript_of(23);
        let span = window.fold_span(t.turns());
        assert_eq!(span.len(), 20);
        assert_eq!(span[0].content, "turn 0");
        assert_eq!(span[19].content, "turn 19");
    }

    #[test]
    fn summary_request_without_existing_summary() {
        let window = SummaryWindow::new(3, 20);
        let t = transcript_of(2);
        let msgs = window.build_summary_request(None, t.turns());

        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].content.contains("Summarize"));
        assert!(msgs[1].content.contains("turn 0"));
        assert!(!msgs[1].content.contains("EXISTING SUMMARY"));
    }

    #[test]
    fn summary_request_with_existing_summary() {
        let window = SummaryWindow::new(3, 20);
        let t = transcript_of(2);
        let msgs = window.build_summary_request(Some("Previously: greetings."), t.turns());

        assert!(msgs[1].content.contains("EXISTING SUMMARY"));
        assert!(msgs[1].content.contains("Previously: greetings."));
        assert!(msgs[1].content.contains("NEW TURNS TO SUMMARIZE"));
    }

    #[tokio::test]
    async fn first_compaction_folds_all_but_window() {
        let window = SummaryWindow::new(3, 20);
        let mut transcript = transcript_of(23);
        let mut state: Option<SummaryState> = None;
        let llm = CannedSummarizer::new("Summary of the first twenty turns.");

        assert!(window.needs_compression(transcript.len()));
        let usage = window.compact(&mut transcript, &mut state, &llm).await.unwrap();

        let state = state.unwrap();
        assert_eq!(state.summary, "Summary of the first twenty turns.");
        assert_eq!(state.original_message_count, 20);
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.turns()[0].content, "turn 20");
        assert_eq!(usage.total_tokens, Some(140));

        // The fold saw turns 0..=19 and not the recent window.
        let sent = llm.last_user_content();
        assert!(sent.contains("turn 0"));
        assert!(sent.contains("turn 19"));
        assert!(!sent.contains("turn 20"));

        // Immediately after a cycle the trigger is quiet again.
        assert!(!window.needs_compression(transcript.len()));
    }

    #[tokio::test]
    async fn second_compaction_merges_and_advances_cursor() {
        let window = SummaryWindow::new(3, 20);
        let mut transcript = transcript_of(23);
        let mut state: Option<SummaryState> = None;

        let llm = CannedSummarizer::new("First summary.");
        window.compact(&mut transcript, &mut state, &llm).await.unwrap();

        // Twenty more non-recent turns accumulate before the next fold.
        for i in 23..43 {
            transcript.push(Turn::user(format!("turn {i}")));
        }
        assert!(window.needs_compression(transcript.len()));

        let llm = CannedSummarizer::new("Merged summary.");
        window.compact(&mut transcript, &mut state, &llm).await.unwrap();

        let state = state.unwrap();
        assert_eq!(state.summary, "Merged summary.");
        // 20 from the first fold + 20 from the second.
        assert_eq!(state.original_message_count, 40);
        assert_eq!(transcript.len(), 3);

        // The merge request carried the prior summary.
        assert!(llm.last_user_content().contains("First summary."));
        // Invariant: covered + live == logical total (43 turns ever).
        assert_eq!(state.original_message_count + transcript.len(), 43);
    }

    #[tokio::test]
    async fn failed_call_commits_nothing() {
        let window = SummaryWindow::new(3, 20);
        let mut transcript = transcript_of(23);
        let mut state = Some(SummaryState::new("Prior summary.", 20));

        let err = window
            .compact(&mut transcript, &mut state, &FailingSummarizer)
            .await
            .unwrap_err();
        assert!(err.contains("503"));

        // Prior durable state untouched.
        assert_eq!(transcript.len(), 23);
        assert_eq!(state.unwrap().summary, "Prior summary.");
    }

    #[tokio::test]
    async fn compress_on_empty_transcript_is_an_error() {
        let window = SummaryWindow::new(3, 20);
        let llm = CannedSummarizer::new("unused");
        let err = window.compress(&[], None, &llm).await.unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn context_without_summary_carries_all_turns() {
        let window = SummaryWindow::new(3, 20);
        let t = transcript_of(5);
        let msgs = window.build_context("You are helpful.", t.turns(), None);

        assert_eq!(msgs.len(), 6);
        assert_eq!(msgs[0].role, MessageRole::System);
        assert_eq!(msgs[0].content, "You are helpful.");
        assert_eq!(msgs[5].content, "turn 4");
    }

    #[test]
    fn context_with_summary_carries_window_only() {
        let window = SummaryWindow::new(3, 20);
        let t = transcript_of(5);
        let msgs = window.build_context("You are helpful.", t.turns(), Some("Earlier: intro."));

        // system + last 3 turns
        assert_eq!(msgs.len(), 4);
        assert!(msgs[0].content.starts_with("You are helpful."));
        assert!(msgs[0].content.contains("Earlier: intro."));
        assert_eq!(msgs[1].content, "turn 2");
        assert_eq!(msgs[3].content, "turn 4");
    }

    #[test]
    fn build_context_is_pure() {
        let window = SummaryWindow::new(3, 20);
        let t = transcript_of(5);
        let a = window.build_context("persona", t.turns(), Some("s"));
        let b = window.build_context("persona", t.turns(), Some("s"));
        assert_eq!(a, b);
    }
}
