//! Prompt construction.

use crate::memory::MemoryEntry;
use std::fmt::Write;

const CLOSING_INSTRUCTION: &str = "Please respond in a friendly and contextual manner, \
referencing past conversations when relevant. Keep responses concise and natural.";

/// Build the generation prompt for `message` from `username`.
#[must_use]
pub fn build_prompt(username: &str, message: &str, memories: &[MemoryEntry]) -> String {
    let mut prompt = format!("You are a helpful AI assistant talking to {username}.\n");

    if !memories.is_empty() {
        prompt.push_str("Here's some relevant conversation history:\n");
        for memory in memories {
            // Writing to a String cannot fail
            let _ = writeln!(
                prompt,
                "- User said: '{}', You responded: '{}'",
                memory.user_message, memory.assistant_response
            );
        }
    }

    let _ = writeln!(prompt, "\nCurrent message from {username}: {message}");
    prompt.push_str(CLOSING_INSTRUCTION);
    prompt
}
