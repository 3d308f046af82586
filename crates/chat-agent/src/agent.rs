//! The conversational core: memory plus prompt plus generator.

use crate::generator::ResponseGenerator;
use crate::memory::{MemoryStore, DEFAULT_RECALL_LIMIT};
use crate::prompt::build_prompt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

/// Generates contextual replies and remembers each exchange.
pub struct ChatAgent {
    generator: Arc<dyn ResponseGenerator>,
    memory: Mutex<MemoryStore>,
}

impl ChatAgent {
    #[must_use]
    pub fn new(generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            generator,
            memory: Mutex::new(MemoryStore::new()),
        }
    }

    /// Reply to `message` from `username`.
    ///
    /// Never fails: a generation error becomes the reply text
    /// `"Sorry, I encountered an error: <e>"`. The exchange is stored in
    /// memory either way.
    #[instrument(skip_all, name = "agent.generate_response")]
    pub async fn generate_response(&self, username: &str, message: &str) -> String {
        let memories = self
            .memory
            .lock()
            .await
            .recent(username, DEFAULT_RECALL_LIMIT);
        let prompt = build_prompt(username, message, &memories);

        info!(
            target: "agent.chat",
            history = memories.len(),
            message_chars = message.chars().count(),
            "Generating response"
        );

        let response = match self.generator.generate(&prompt).await {
            Ok(text) => {
                info!(target: "agent.chat", "Response generated");
                text
            }
            Err(e) => {
                error!(target: "agent.chat", error = %e, "Error generating response");
                format!("Sorry, I encountered an error: {e}")
            }
        };

        self.memory.lock().await.add(username, message, &response);
        response
    }

    /// Number of exchanges remembered for `username`.
    pub async fn memory_len(&self, username: &str) -> usize {
        self.memory.lock().await.len_for(username)
    }
}
