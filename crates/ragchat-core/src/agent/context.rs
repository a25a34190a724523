use std::fmt::Write as _;

use ragchat_llm::Message;
use ragchat_memory::{RetrievedChunk, StoredMessage};

pub(crate) const REFERENCES_HEADER: &str = "Use the following references from the knowledge base if it helps:";

/// Instructions followed by a block of retrieved references, if any.
pub(crate) fn build_system_prompt(instructions: &str, references: &[RetrievedChunk]) -> String {
    let mut prompt = instructions.trim().to_owned();
    if references.is_empty() {
        return prompt;
    }

    if !prompt.is_empty() {
        prompt.push_str("\n\n");
    }
    prompt.push_str(REFERENCES_HEADER);
    prompt.push_str("\n<references>\n");
    for (i, chunk) in references.iter().enumerate() {
        let _ = write!(prompt, "[{}] {}", i + 1, chunk.reference());
        if let Some(page) = chunk.page {
            let _ = write!(prompt, " (page {page})");
        }
        prompt.push('\n');
        prompt.push_str(chunk.content.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str("</references>");
    prompt
}

/// System prompt, then stored history oldest first, then the new query.
pub(crate) fn assemble_messages(
    system_prompt: String,
    history: Vec<StoredMessage>,
    query: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if !system_prompt.is_empty() {
        messages.push(Message::system(system_prompt));
    }
    messages.extend(history.into_iter().map(|m| m.message));
    messages.push(Message::user(query));
    messages
}
