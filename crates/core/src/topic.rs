use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of gossip topics exchanged between validators.
///
/// Each variant doubles as the gossipsub topic name and as the `type` label
/// carried inside every wire frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
    #[serde(rename = "MESSAGE:REQUEST")]
    MessageRequest,
    #[serde(rename = "MESSAGE:SIGNED")]
    MessageSigned,
    #[serde(rename = "MESSAGE:QUEUED")]
    MessageQueued,
    #[serde(rename = "MESSAGE:EXECUTION")]
    MessageExecution,
    #[serde(rename = "MESSAGE:EXISTS")]
    MessageExists,
    #[serde(rename = "MESSAGE:INVALID")]
    MessageInvalid,
    #[serde(rename = "MESSAGE:RESET")]
    MessageReset,
    #[serde(rename = "FEATURE:START")]
    FeatureStart,
    #[serde(rename = "FEATURE:FAILED")]
    FeatureFailed,
    #[serde(rename = "FEATURE:COMPLETED")]
    FeatureCompleted,
    #[serde(rename = "PENALTY:CHAINMISS")]
    PenaltyChainmiss,
    #[serde(rename = "PENALTY:TATTLE")]
    PenaltyTattle,
    #[serde(rename = "PENALTY:SIGNED")]
    PenaltySigned,
    #[serde(rename = "PENALTY:EXECUTION")]
    PenaltyExecution,
}

impl Topic {
    /// Every topic a node subscribes to.
    pub const ALL: [Topic; 15] = [
        Topic::Heartbeat,
        Topic::MessageRequest,
        Topic::MessageSigned,
        Topic::MessageQueued,
        Topic::MessageExecution,
        Topic::MessageExists,
        Topic::MessageInvalid,
        Topic::MessageReset,
        Topic::FeatureStart,
        Topic::FeatureFailed,
        Topic::FeatureCompleted,
        Topic::PenaltyChainmiss,
        Topic::PenaltyTattle,
        Topic::PenaltySigned,
        Topic::PenaltyExecution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Heartbeat => "HEARTBEAT",
            Topic::MessageRequest => "MESSAGE:REQUEST",
            Topic::MessageSigned => "MESSAGE:SIGNED",
            Topic::MessageQueued => "MESSAGE:QUEUED",
            Topic::MessageExecution => "MESSAGE:EXECUTION",
            Topic::MessageExists => "MESSAGE:EXISTS",
            Topic::MessageInvalid => "MESSAGE:INVALID",
            Topic::MessageReset => "MESSAGE:RESET",
            Topic::FeatureStart => "FEATURE:START",
            Topic::FeatureFailed => "FEATURE:FAILED",
            Topic::FeatureCompleted => "FEATURE:COMPLETED",
            Topic::PenaltyChainmiss => "PENALTY:CHAINMISS",
            Topic::PenaltyTattle => "PENALTY:TATTLE",
            Topic::PenaltySigned => "PENALTY:SIGNED",
            Topic::PenaltyExecution => "PENALTY:EXECUTION",
        }
    }

    /// Whether this is one of the `PENALTY:*` topics.
    pub fn is_penalty(&self) -> bool {
        matches!(
            self,
            Topic::PenaltyChainmiss
                | Topic::PenaltyTattle
                | Topic::PenaltySigned
                | Topic::PenaltyExecution
        )
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .find(|topic| topic.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// A topic label outside the closed set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownTopic(pub String);

impl fmt::Display for UnknownTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown gossip topic: {}", self.0)
    }
}

impl std::error::Error for UnknownTopic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn serde_uses_wire_labels() {
        let json = serde_json::to_string(&Topic::MessageRequest).unwrap();
        assert_eq!(json, "\"MESSAGE:REQUEST\"");

        let topic: Topic = serde_json::from_str("\"PENALTY:CHAINMISS\"").unwrap();
        assert_eq!(topic, Topic::PenaltyChainmiss);
    }

    #[test]
    fn penalty_topics() {
        assert!(Topic::PenaltyChainmiss.is_penalty());
        assert!(Topic::PenaltyTattle.is_penalty());
        assert!(!Topic::MessageRequest.is_penalty());
        assert!(!Topic::FeatureFailed.is_penalty());
        assert!(!Topic::Heartbeat.is_penalty());
    }
}
