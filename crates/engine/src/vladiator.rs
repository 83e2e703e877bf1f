//! The orchestrator.
//!
//! Owns the driver table, the feature registry and the observability sinks;
//! subscribes to the bus and, for every ingress frame: taps the sinks, routes
//! `MESSAGE:REQUEST` frames to the source chain's coordinator, and flags
//! transfers referencing chains this node does not serve.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ractor::{Actor, ActorCell, ActorProcessingErr, ActorRef};
use tracing::{debug, info, warn};

use vladiator_core::{Message, Topic};

use crate::bus::Msg as BusMsg;
use crate::coordinator::{Coordinator, CoordinatorRef, Msg as CoordinatorMsg};
use crate::util::forward;
use crate::{BusEvent, BusRef, DriverTable, FeatureRegistry, Metrics, NodeIdentity, Sink};

pub type VladiatorRef = ActorRef<Msg>;

pub struct Vladiator {
    identity: NodeIdentity,
    drivers: DriverTable,
    features: Arc<FeatureRegistry>,
    sinks: Vec<Arc<dyn Sink>>,
    bus: BusRef,
    metrics: Metrics,
}

impl Vladiator {
    pub fn new(
        identity: NodeIdentity,
        drivers: DriverTable,
        features: Arc<FeatureRegistry>,
        sinks: Vec<Arc<dyn Sink>>,
        bus: BusRef,
        metrics: Metrics,
    ) -> Self {
        Self {
            identity,
            drivers,
            features,
            sinks,
            bus,
            metrics,
        }
    }

    pub async fn spawn(
        self,
        supervisor: Option<ActorCell>,
    ) -> Result<VladiatorRef, ractor::SpawnErr> {
        let (actor_ref, _) = if let Some(supervisor) = supervisor {
            Actor::spawn_linked(None, self, (), supervisor).await?
        } else {
            Actor::spawn(None, self, ()).await?
        };

        Ok(actor_ref)
    }
}

pub enum Msg {
    /// An event fanned out by the bus
    BusEvent(Arc<BusEvent>),
}

pub struct State {
    coordinators: BTreeMap<u64, CoordinatorRef>,
}

#[async_trait]
impl Actor for Vladiator {
    type Msg = Msg;
    type State = State;
    type Arguments = ();

    async fn pre_start(
        &self,
        myself: ActorRef<Msg>,
        _args: (),
    ) -> Result<Self::State, ActorProcessingErr> {
        let mut coordinators = BTreeMap::new();

        for (chain_id, driver) in self.drivers.iter() {
            let coordinator = Coordinator::new(
                self.identity.clone(),
                Arc::clone(driver),
                self.drivers.clone(),
                Arc::clone(&self.features),
                self.bus.clone(),
                self.metrics.clone(),
            )
            .spawn(Some(myself.get_cell()))
            .await?;

            coordinators.insert(chain_id, coordinator);
        }

        // Receive bus events through a forwarding actor so the bus sees a
        // plain event subscriber.
        let subscriber = forward(myself.clone(), Msg::BusEvent, myself.get_cell()).await?;
        self.bus.cast(BusMsg::Subscribe(subscriber))?;

        info!(
            chains = coordinators.len(),
            features = self.features.len(),
            "Orchestrator started"
        );

        Ok(State { coordinators })
    }

    #[tracing::instrument(name = "vladiator", skip_all)]
    async fn handle(
        &self,
        _myself: ActorRef<Msg>,
        msg: Msg,
        state: &mut State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            Msg::BusEvent(event) => match event.as_ref() {
                BusEvent::Frame(from, message) => {
                    debug!(%from, topic = %message.topic, "Ingress frame");
                    self.tap_sinks(message);
                    self.route(message, state);
                }

                BusEvent::Listening(addr) => {
                    info!(%addr, "Gossip listening");
                }

                BusEvent::PeerConnected(peer_id) => {
                    info!(%peer_id, "Peer connected");
                }

                BusEvent::PeerDisconnected(peer_id) => {
                    info!(%peer_id, "Peer disconnected");
                }
            },
        }

        Ok(())
    }
}

impl Vladiator {
    fn tap_sinks(&self, message: &Message) {
        for sink in &self.sinks {
            if sink.filter().matches(message) {
                let sink = Arc::clone(sink);
                let message = message.clone();
                tokio::spawn(async move { sink.send(message).await });
            }
        }
    }

    fn route(&self, message: &Message, state: &State) {
        // Heartbeats bypass driver routing entirely.
        if message.is_heartbeat() {
            return;
        }

        // Any frame for a chain we do not serve: let the network know the
        // driver is absent here. Penalty topics are exempt, otherwise every
        // CHAINMISS about an unserved chain would breed another one.
        if !message.topic.is_penalty() && !self.drivers.contains(message.source) {
            warn!(source = message.source, "No driver for source chain");
            self.metrics.penalties.inc();

            let penalty = Message {
                transaction_hash: message.transaction_hash.clone(),
                ..Message::new(
                    Topic::PenaltyChainmiss,
                    &self.identity.public_key,
                    message.source,
                )
            };

            if let Err(e) = self.bus.cast(BusMsg::Publish(penalty)) {
                warn!("Failed to hand penalty to the bus: {e}");
            }

            return;
        }

        // Only requests enter the coordinator.
        if message.topic == Topic::MessageRequest {
            if let Some(coordinator) = state.coordinators.get(&message.source) {
                if let Err(e) = coordinator.cast(CoordinatorMsg::Request(message.clone())) {
                    warn!(source = message.source, "Failed to route request: {e}");
                }
            }
        }
    }
}
