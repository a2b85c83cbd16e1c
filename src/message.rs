//! Advisory message collector.
//!
//! The executor posts informational notices (e.g. the scatter-to-heatmap
//! escalation) to a shared, priority-ordered log owned by the data source.
//! Messages are advisory, never errors.

use serde::{Deserialize, Serialize};

/// One advisory message with a display priority (higher shows first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub priority: u8,
}

/// Priority-ordered collection of advisory messages.
///
/// Duplicate texts are collapsed: posting the same text twice keeps the
/// first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message unless one with identical text is already present.
    pub fn add_unique(&mut self, text: impl Into<String>, priority: u8) {
        let text = text.into();
        if self.messages.iter().any(|m| m.text == text) {
            return;
        }
        self.messages.push(Message { text, priority });
        // Highest priority first; stable, so equal priorities keep post order.
        self.messages.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Messages in priority order (highest first).
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_unique_dedupes() {
        let mut log = MessageLog::new();
        log.add_unique("binning to heatmap", 98);
        log.add_unique("binning to heatmap", 98);
        assert_eq!(log.messages().len(), 1);
    }

    #[test]
    fn test_priority_order() {
        let mut log = MessageLog::new();
        log.add_unique("low", 10);
        log.add_unique("high", 98);
        log.add_unique("mid", 50);
        let texts: Vec<&str> = log.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_empty_and_clear() {
        let mut log = MessageLog::new();
        assert!(log.is_empty());
        log.add_unique("note", 1);
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }
}
