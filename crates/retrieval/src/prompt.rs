//! Generation request assembly.
//!
//! The packed context goes into the system message, never the user turn,
//! so the question is passed to the model exactly as the user wrote it.

use ragpack_core::{ContextResult, Message};

const CONTEXT_HEADER: &str = "Use the following document excerpts to answer. \
Each excerpt starts with its source in square brackets. \
If the excerpts do not contain the answer, say so.";

const NO_CONTEXT_NOTE: &str = "No uploaded documents matched this question. \
Answer from general knowledge and mention that no document was used.";

/// Build the system message for one request.
pub fn system_message(system_prompt: &str, context: &ContextResult) -> Message {
    let base = system_prompt.trim();
    let body = if context.is_empty() {
        format!("{base}\n\n{NO_CONTEXT_NOTE}")
    } else {
        format!(
            "{base}\n\n{CONTEXT_HEADER}\n\n--- DOCUMENTS ---\n{}\n--- END DOCUMENTS ---",
            context.context
        )
    };
    Message::system(body.trim_start())
}

/// System message followed by the user's question.
pub fn assemble_messages(system_prompt: &str, context: &ContextResult, query: &str) -> Vec<Message> {
    vec![system_message(system_prompt, context), Message::user(query)]
}
