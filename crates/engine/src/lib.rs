//! The validator engine: gossip bus ingress, per-chain request
//! coordination, feature dispatch and orchestration.
//!
//! Components are actors supervised by [`node::Node`]; the per-request
//! pipeline runs as plain tokio tasks that report cache transitions back to
//! their coordinator, keeping every cache single-writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use vladiator_driver::Driver;

pub mod bus;
pub mod coordinator;
pub mod features;
pub mod heartbeat;
pub mod metrics;
pub mod node;
pub mod sinks;
pub mod util;
pub mod vladiator;

pub use bus::{Bus, BusEvent, BusRef};
pub use coordinator::{Coordinator, CoordinatorRef};
pub use features::{Feature, FeatureError, FeatureRegistry};
pub use metrics::Metrics;
pub use node::Node;
pub use sinks::{Sink, SinkFilter};
pub use vladiator::{Vladiator, VladiatorRef};

/// This node's identity as seen by its peers: the gossip author key and the
/// address its transfer signatures recover to.
#[derive(Clone, Debug)]
pub struct NodeIdentity {
    pub public_key: String,
    pub signer_address: String,
}

/// Narrow lookup capability over the drivers loaded on this node.
///
/// Coordinators receive this instead of a reference back to the
/// orchestrator, so drivers and the orchestrator never form a cycle.
#[derive(Clone)]
pub struct DriverTable {
    drivers: Arc<BTreeMap<u64, Arc<dyn Driver>>>,
}

impl DriverTable {
    pub fn new(drivers: impl IntoIterator<Item = Arc<dyn Driver>>) -> Self {
        Self {
            drivers: Arc::new(
                drivers
                    .into_iter()
                    .map(|driver| (driver.chain_id(), driver))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, chain_id: u64) -> Option<Arc<dyn Driver>> {
        self.drivers.get(&chain_id).cloned()
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.drivers.contains_key(&chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Arc<dyn Driver>)> {
        self.drivers.iter().map(|(chain_id, driver)| (*chain_id, driver))
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
