//! Per-user conversation memory.
//!
//! Keeps the most recent exchanges with each user so prompts can refer back
//! to them. Memory lives only as long as the process.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Exchanges kept per user; older ones are dropped.
pub const MAX_MEMORIES_PER_USER: usize = 10;

/// Exchanges recalled into a prompt by default.
pub const DEFAULT_RECALL_LIMIT: usize = 3;

/// One user message and the reply it received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub assistant_response: String,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    memories: HashMap<String, VecDeque<MemoryEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an exchange with `username`.
    pub fn add(&mut self, username: &str, message: &str, response: &str) {
        let entries = self.memories.entry(username.to_string()).or_default();
        entries.push_back(MemoryEntry {
            timestamp: Utc::now(),
            user_message: message.to_string(),
            assistant_response: response.to_string(),
        });
        while entries.len() > MAX_MEMORIES_PER_USER {
            entries.pop_front();
        }

        debug!(target: "agent.memory", stored = entries.len(), "Added memory");
    }

    /// The last `limit` exchanges with `username`, oldest first.
    #[must_use]
    pub fn recent(&self, username: &str, limit: usize) -> Vec<MemoryEntry> {
        self.memories
            .get(username)
            .map(|entries| {
                let skip = entries.len().saturating_sub(limit);
                entries.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Number of exchanges stored for `username`.
    #[must_use]
    pub fn len_for(&self, username: &str) -> usize {
        self.memories.get(username).map_or(0, VecDeque::len)
    }
}
