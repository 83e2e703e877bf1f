//! Observability sinks.
//!
//! External collaborators (chat notifier, data-stream broadcaster) implement
//! [`Sink`]; the orchestrator taps every ingress frame past the sink's
//! filter. The engine itself ships no concrete sink.

use async_trait::async_trait;

use vladiator_core::Message;

/// Which frames a sink wants to see. Empty fields match everything.
#[derive(Clone, Debug, Default)]
pub struct SinkFilter {
    pub author: Option<String>,
    pub source: Option<u64>,
    pub sender: Option<String>,
}

impl SinkFilter {
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(author) = &self.author {
            if *author != message.author {
                return false;
            }
        }

        if let Some(source) = self.source {
            if source != message.source {
                return false;
            }
        }

        if let Some(sender) = &self.sender {
            let matched = message
                .values
                .as_ref()
                .is_some_and(|values| values.sender.eq_ignore_ascii_case(sender));

            if !matched {
                return false;
            }
        }

        true
    }
}

#[async_trait]
pub trait Sink: Send + Sync {
    fn filter(&self) -> &SinkFilter;

    async fn send(&self, message: Message);

    /// Raw payloads outside the frame taxonomy (data-stream consumers only).
    async fn send_raw(&self, _payload: serde_json::Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    use vladiator_core::{Topic, TransferValues};

    fn frame(author: &str, source: u64, sender: Option<&str>) -> Message {
        Message {
            values: sender.map(|sender| TransferValues {
                tx_id: "1".to_string(),
                sender: sender.to_string(),
                recipient: "0x2222222222222222222222222222222222222222".to_string(),
                chain: "56".to_string(),
                express: false,
                encoded_data: "0x".to_string(),
                confirmations: 1,
            }),
            ..Message::new(Topic::MessageSigned, author, source)
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = SinkFilter::default();
        assert!(filter.matches(&frame("a", 1, None)));
        assert!(filter.matches(&frame("b", 2, Some("0xabc"))));
    }

    #[test]
    fn filters_by_author_and_source() {
        let filter = SinkFilter {
            author: Some("a".to_string()),
            source: Some(1),
            sender: None,
        };

        assert!(filter.matches(&frame("a", 1, None)));
        assert!(!filter.matches(&frame("b", 1, None)));
        assert!(!filter.matches(&frame("a", 2, None)));
    }

    #[test]
    fn sender_filter_is_case_insensitive_and_requires_values() {
        let filter = SinkFilter {
            author: None,
            source: None,
            sender: Some("0xAbC".to_string()),
        };

        assert!(filter.matches(&frame("a", 1, Some("0xabc"))));
        assert!(!filter.matches(&frame("a", 1, Some("0xdef"))));
        assert!(!filter.matches(&frame("a", 1, None)));
    }
}
