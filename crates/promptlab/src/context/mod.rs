//! Transcript compression: a running summary plus a recent window.
//!
//! Chat sessions grow without bound, but the model context shouldn't. This
//! module keeps the context bounded with two cooperating pieces:
//!
//! 1. **[`summary`]** — [`SummaryState`], the durable running summary that
//!    stands in for turns trimmed from the transcript.
//! 2. **[`window`]** — [`SummaryWindow`], which decides when enough
//!    un-summarized turns have piled up, folds them into the summary with
//!    one LLM call, and trims the transcript down to the recent window.
//!
//! Each session is in one of two states: no summary yet (every turn still
//! raw) or summarized (summary + exactly the recent window of raw turns).
//! [`SummaryWindow::compact`] performs the transition either way; a failed
//! LLM call leaves both the transcript and the summary untouched.

pub mod summary;
pub mod window;

pub use summary::SummaryState;
pub use window::SummaryWindow;
