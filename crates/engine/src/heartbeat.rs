use std::time::Instant;

use tokio::task::JoinHandle;

use vladiator_core::{Message, HEARTBEAT_INTERVAL};

use crate::util::ticker;
use crate::{bus, BusRef, NodeIdentity};

/// Spawn the liveness ticker: every two minutes the node announces itself on
/// the `HEARTBEAT` topic with the sentinel source.
pub fn spawn(bus: BusRef, identity: NodeIdentity) -> JoinHandle<()> {
    let started = Instant::now();

    tokio::spawn(ticker(HEARTBEAT_INTERVAL, bus, move || {
        let status = format!(
            "vladiator {} up {}s",
            env!("CARGO_PKG_VERSION"),
            started.elapsed().as_secs()
        );

        bus::Msg::Publish(Message::heartbeat(&identity.public_key, status))
    }))
}
