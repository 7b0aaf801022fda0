//! Persona system prompt for the chat session.

/// Returns the assistant persona for chat sessions.
///
/// Kept short on purpose: the context builder appends the running summary
/// of earlier conversation into this same system message, so anything here
/// is repeated on every request.
pub fn chat_system_prompt() -> String {
    "\
You are a friendly, concise assistant in an ongoing conversation. \
Remember what the user has told you — including facts carried in the \
conversation summary, if one is present — and do not ask for information \
they have already given."
        .to_string()
}
