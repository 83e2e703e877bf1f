//! Core wire types shared by every component of the validator:
//! the self-describing [`Message`] frame, the closed [`Topic`] taxonomy,
//! and the node configuration model.

use core::time::Duration;

mod config;
mod message;
mod topic;

pub use config::{Config, DriverKind, NetworkConfig};
pub use message::{Message, TransferValues};
pub use topic::Topic;

/// Magic `source` value carried by heartbeat frames.
///
/// Preserved on the wire for interoperability with existing networks.
pub const HEARTBEAT_SOURCE: u64 = 1_010_101_010;

/// How often a node announces itself on the `HEARTBEAT` topic.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(120);

/// Sliding window within which duplicate `MESSAGE:REQUEST` and
/// `MESSAGE:SIGNED` frames are suppressed.
pub const GOSSIP_DEDUP_WINDOW: Duration = Duration::from_secs(5);

/// Maximum number of times a single `txId` is accepted for processing.
/// Requests beyond this budget are dropped without emission.
pub const MAX_REQUEST_RETRIES: u32 = 3;
