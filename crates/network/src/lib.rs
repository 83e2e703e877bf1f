//! Gossip pub/sub transport for the validator network.
//!
//! A thin layer over a libp2p swarm (gossipsub + identify + ping): one
//! gossipsub topic per [`Topic`] label, bootstrap peers dialed at startup,
//! and a [`Handle`] split into receiving and control halves so the engine
//! can drain events from one task and publish from another.

use std::collections::HashMap;
use std::error::Error;
use std::ops::ControlFlow;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use libp2p::swarm::{self, SwarmEvent};
use libp2p::{gossipsub, identify, noise, tcp, yamux, SwarmBuilder};
use tokio::sync::mpsc;
use tracing::{debug, error, error_span, warn, Instrument};

use vladiator_core::Topic;
use vladiator_metrics::SharedRegistry;

pub use libp2p::identity::Keypair;
pub use libp2p::{multiaddr, Multiaddr, PeerId};

pub mod behaviour;
pub mod dedup;
pub mod handle;

pub use behaviour::Behaviour;
pub use dedup::RecentGossip;
pub use handle::{CtrlHandle, Handle, RecvHandle};

use behaviour::BehaviourEvent;

pub const PROTOCOL_VERSION: &str = "vladiator/v1";

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Clone, Debug)]
pub struct Config {
    /// Address the swarm listens on. Use a port of 0 for an ephemeral port.
    pub listen_addr: Multiaddr,

    /// Well-known peers dialed at startup for initial discovery.
    pub bootstrap_peers: Vec<Multiaddr>,

    pub idle_connection_timeout: Duration,
}

impl Config {
    pub fn new(listen_addr: Multiaddr) -> Self {
        Self {
            listen_addr,
            bootstrap_peers: Vec::new(),
            idle_connection_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_bootstrap_peers(mut self, peers: Vec<Multiaddr>) -> Self {
        self.bootstrap_peers = peers;
        self
    }

    fn apply(&self, cfg: swarm::Config) -> swarm::Config {
        cfg.with_idle_connection_timeout(self.idle_connection_timeout)
    }
}

#[derive(Clone, Debug)]
pub enum Event {
    Listening(Multiaddr),
    Message(PeerId, Topic, Bytes),
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
}

#[derive(Debug)]
pub enum CtrlMsg {
    Publish(Topic, Bytes),
    Shutdown,
}

pub async fn spawn(
    keypair: Keypair,
    config: Config,
    registry: &SharedRegistry,
) -> Result<Handle, BoxError> {
    let behaviour =
        registry.with_prefix("gossip", |reg| Behaviour::new_with_metrics(&keypair, reg))?;

    let mut swarm = SwarmBuilder::with_existing_identity(keypair)
        .with_tokio()
        .with_tcp(
            tcp::Config::default().nodelay(true),
            noise::Config::new,
            yamux::Config::default,
        )?
        .with_dns()?
        .with_behaviour(move |_| behaviour)?
        .with_swarm_config(|cfg| config.apply(cfg))
        .build();

    let mut topics = HashMap::new();
    for topic in Topic::ALL {
        let ident = gossipsub::IdentTopic::new(topic.as_str());
        swarm.behaviour_mut().gossipsub.subscribe(&ident)?;
        topics.insert(ident.hash(), topic);
    }

    swarm.listen_on(config.listen_addr.clone())?;

    for peer in &config.bootstrap_peers {
        if let Err(e) = swarm.dial(peer.clone()) {
            warn!(%peer, "Failed to dial bootstrap peer: {e}");
        }
    }

    let (tx_event, rx_event) = mpsc::channel(256);
    let (tx_ctrl, rx_ctrl) = mpsc::channel(256);

    let peer_id = *swarm.local_peer_id();
    let span = error_span!("gossip", peer = %peer_id);
    let task_handle = tokio::task::spawn(run(swarm, topics, rx_ctrl, tx_event).instrument(span));

    Ok(Handle::new(tx_ctrl, rx_event, task_handle))
}

async fn run(
    mut swarm: swarm::Swarm<Behaviour>,
    topics: HashMap<gossipsub::TopicHash, Topic>,
    mut rx_ctrl: mpsc::Receiver<CtrlMsg>,
    tx_event: mpsc::Sender<Event>,
) {
    loop {
        let result = tokio::select! {
            event = swarm.select_next_some() => {
                handle_swarm_event(event, &topics, &tx_event).await
            }

            Some(ctrl) = rx_ctrl.recv() => {
                handle_ctrl_msg(ctrl, &mut swarm)
            }
        };

        match result {
            ControlFlow::Continue(()) => continue,
            ControlFlow::Break(()) => break,
        }
    }
}

fn handle_ctrl_msg(msg: CtrlMsg, swarm: &mut swarm::Swarm<Behaviour>) -> ControlFlow<()> {
    match msg {
        CtrlMsg::Publish(topic, data) => {
            let ident = gossipsub::IdentTopic::new(topic.as_str());

            match swarm.behaviour_mut().gossipsub.publish(ident, data) {
                Ok(message_id) => {
                    debug!(%topic, "Published message {message_id}");
                }
                Err(gossipsub::PublishError::InsufficientPeers) => {
                    // Normal while the mesh is still forming or the node is alone.
                    debug!(%topic, "No peers to publish to");
                }
                Err(e) => {
                    error!(%topic, "Error publishing message: {e}");
                }
            }

            ControlFlow::Continue(())
        }

        CtrlMsg::Shutdown => ControlFlow::Break(()),
    }
}

async fn handle_swarm_event(
    event: SwarmEvent<BehaviourEvent>,
    topics: &HashMap<gossipsub::TopicHash, Topic>,
    tx_event: &mpsc::Sender<Event>,
) -> ControlFlow<()> {
    match event {
        SwarmEvent::NewListenAddr { address, .. } => {
            debug!("Node is listening on {address}");

            if let Err(e) = tx_event.send(Event::Listening(address)).await {
                error!("Error sending listening event to handle: {e}");
                return ControlFlow::Break(());
            }
        }

        SwarmEvent::ConnectionEstablished { peer_id, .. } => {
            debug!("Connected to {peer_id}");

            if let Err(e) = tx_event.send(Event::PeerConnected(peer_id)).await {
                error!("Error sending peer connected event to handle: {e}");
                return ControlFlow::Break(());
            }
        }

        SwarmEvent::ConnectionClosed { peer_id, .. } => {
            debug!("Disconnected from {peer_id}");

            if let Err(e) = tx_event.send(Event::PeerDisconnected(peer_id)).await {
                error!("Error sending peer disconnected event to handle: {e}");
                return ControlFlow::Break(());
            }
        }

        SwarmEvent::Behaviour(BehaviourEvent::Identify(identify::Event::Sent {
            peer_id, ..
        })) => {
            debug!("Sent identity to {peer_id}");
        }

        SwarmEvent::Behaviour(BehaviourEvent::Identify(identify::Event::Received {
            peer_id,
            ..
        })) => {
            debug!("Received identity from {peer_id}");
        }

        SwarmEvent::Behaviour(BehaviourEvent::Gossipsub(gossipsub::Event::Subscribed {
            peer_id,
            topic,
        })) => {
            debug!("Peer {peer_id} subscribed to {topic}");
        }

        SwarmEvent::Behaviour(BehaviourEvent::Gossipsub(gossipsub::Event::Message {
            propagation_source: peer_id,
            message_id: _,
            message,
        })) => {
            let Some(topic) = topics.get(&message.topic).copied() else {
                debug!("Received message from {peer_id} on unknown topic {}", message.topic);
                return ControlFlow::Continue(());
            };

            debug!(
                %topic,
                "Received message from {peer_id} of {} bytes",
                message.data.len()
            );

            let event = Event::Message(peer_id, topic, Bytes::from(message.data));
            if let Err(e) = tx_event.send(event).await {
                error!("Error sending message to handle: {e}");
                return ControlFlow::Break(());
            }
        }

        _ => {}
    }

    ControlFlow::Continue(())
}
