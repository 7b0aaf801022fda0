//! Interactive chat CLI built on the promptlab library.
//!
//! `promptlab-chat` keeps a persistent conversation on disk: every turn is
//! appended to a transcript file, and once enough old turns pile up they
//! are folded into a running summary so the model context stays bounded.
//!
//! # Library usage
//!
//! ```ignore
//! use promptlab::config::Settings;
//! use promptlab_chat::{ChatConfig, chat_system_prompt};
//!
//! let settings = Settings::default();
//! let config = ChatConfig::from_settings(&settings);
//! let window = config.window();
//! ```
//!
//! # Binary
//!
//! ```sh
//! promptlab-chat                      # resume (or start) the session
//! promptlab-chat --settings lab.json  # custom settings file
//! ```
//!
//! Inside the session, `/stats` shows the transcript and summary state and
//! `exit` (or `quit`, or end-of-input) leaves.

pub mod config;
pub mod prompt;

pub use config::ChatConfig;
pub use prompt::chat_system_prompt;
