use std::collections::VecDeque;
use std::time::{Duration, Instant};

use vladiator_core::{Message, Topic, GOSSIP_DEDUP_WINDOW};

struct SeenFrame {
    topic: Topic,
    author: String,
    transaction_hash: String,
    at: Instant,
}

/// Sliding window suppressing duplicate `MESSAGE:REQUEST` and
/// `MESSAGE:SIGNED` frames.
///
/// A frame is a duplicate when another with the same
/// `(type, author, transactionHash)` was observed inside the window; a
/// `MESSAGE:REQUEST` is additionally a duplicate of any same-author,
/// same-hash frame regardless of type. Entries older than the window are
/// discarded on every ingress.
pub struct RecentGossip {
    window: Duration,
    seen: VecDeque<SeenFrame>,
}

impl RecentGossip {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: VecDeque::new(),
        }
    }

    /// Whether the frame should be dropped as a duplicate. Non-duplicate
    /// frames are recorded in the window.
    pub fn should_drop(&mut self, msg: &Message) -> bool {
        self.should_drop_at(msg, Instant::now())
    }

    pub fn should_drop_at(&mut self, msg: &Message, now: Instant) -> bool {
        self.evict(now);

        if !matches!(msg.topic, Topic::MessageRequest | Topic::MessageSigned) {
            return false;
        }

        let Some(hash) = msg.transaction_hash.as_deref() else {
            return false;
        };

        let duplicate = self.seen.iter().any(|seen| {
            seen.author == msg.author
                && seen.transaction_hash == hash
                && (seen.topic == msg.topic || msg.topic == Topic::MessageRequest)
        });

        if !duplicate {
            self.seen.push_back(SeenFrame {
                topic: msg.topic,
                author: msg.author.clone(),
                transaction_hash: hash.to_string(),
                at: now,
            });
        }

        duplicate
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.seen.front() {
            if now.duration_since(front.at) > self.window {
                self.seen.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for RecentGossip {
    fn default() -> Self {
        Self::new(GOSSIP_DEDUP_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(author: &str, hash: &str) -> Message {
        Message {
            transaction_hash: Some(hash.to_string()),
            ..Message::new(Topic::MessageRequest, author, 1)
        }
    }

    fn signed(author: &str, hash: &str) -> Message {
        Message {
            transaction_hash: Some(hash.to_string()),
            ..Message::new(Topic::MessageSigned, author, 1)
        }
    }

    #[test]
    fn duplicate_request_inside_window_is_dropped() {
        let mut window = RecentGossip::default();
        let t0 = Instant::now();

        assert!(!window.should_drop_at(&request("a", "0x1"), t0));
        assert!(window.should_drop_at(&request("a", "0x1"), t0 + Duration::from_secs(4)));
    }

    #[test]
    fn request_outside_window_is_accepted_again() {
        let mut window = RecentGossip::default();
        let t0 = Instant::now();

        assert!(!window.should_drop_at(&request("a", "0x1"), t0));
        assert!(!window.should_drop_at(&request("a", "0x1"), t0 + Duration::from_secs(6)));
    }

    #[test]
    fn distinct_authors_and_hashes_pass() {
        let mut window = RecentGossip::default();
        let t0 = Instant::now();

        assert!(!window.should_drop_at(&request("a", "0x1"), t0));
        assert!(!window.should_drop_at(&request("b", "0x1"), t0));
        assert!(!window.should_drop_at(&request("a", "0x2"), t0));
    }

    #[test]
    fn signed_only_collides_with_signed() {
        let mut window = RecentGossip::default();
        let t0 = Instant::now();

        assert!(!window.should_drop_at(&signed("a", "0x1"), t0));
        assert!(window.should_drop_at(&signed("a", "0x1"), t0));

        // a REQUEST also collides with the recorded SIGNED for the same
        // author and hash
        assert!(window.should_drop_at(&request("a", "0x1"), t0));
    }

    #[test]
    fn other_topics_are_never_dropped() {
        let mut window = RecentGossip::default();
        let t0 = Instant::now();

        let invalid = Message {
            transaction_hash: Some("0x1".to_string()),
            ..Message::new(Topic::MessageInvalid, "a", 1)
        };

        assert!(!window.should_drop_at(&invalid, t0));
        assert!(!window.should_drop_at(&invalid, t0));
    }

    #[test]
    fn old_entries_are_evicted_on_ingress() {
        let mut window = RecentGossip::default();
        let t0 = Instant::now();

        assert!(!window.should_drop_at(&request("a", "0x1"), t0));
        assert!(!window.should_drop_at(&request("b", "0x2"), t0));
        assert_eq!(window.len(), 2);

        assert!(!window.should_drop_at(&request("c", "0x3"), t0 + Duration::from_secs(10)));
        assert_eq!(window.len(), 1);
    }
}
