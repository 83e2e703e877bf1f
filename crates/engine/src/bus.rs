//! The gossip message bus, as an actor.
//!
//! Wraps the libp2p overlay from `vladiator-network`: outbound [`Message`]s
//! are serialized and published under their topic; inbound frames are
//! decoded, passed through the 5-second dedup window and fanned out to
//! subscribers. Published frames are also looped back to subscribers, so a
//! node observes its own traffic like any peer's.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ractor::{Actor, ActorCell, ActorProcessingErr, ActorRef, RpcReplyPort};
use tokio::task::JoinHandle;
use tracing::{debug, error, error_span, Instrument};

use vladiator_core::Message;
use vladiator_metrics::SharedRegistry;
use vladiator_network::handle::CtrlHandle;
use vladiator_network::{Config, Event, Keypair, Multiaddr, PeerId, RecentGossip};

use crate::Metrics;

pub type BusRef = ActorRef<Msg>;

pub struct Bus;

impl Bus {
    pub async fn spawn(
        keypair: Keypair,
        config: Config,
        registry: SharedRegistry,
        metrics: Metrics,
        supervisor: Option<ActorCell>,
    ) -> Result<BusRef, ractor::SpawnErr> {
        let args = Args {
            keypair,
            config,
            registry,
            metrics,
        };

        let (actor_ref, _) = if let Some(supervisor) = supervisor {
            Actor::spawn_linked(None, Self, args, supervisor).await?
        } else {
            Actor::spawn(None, Self, args).await?
        };

        Ok(actor_ref)
    }

    fn publish_event(&self, event: BusEvent, subscribers: &mut [ActorRef<Arc<BusEvent>>]) {
        let event = Arc::new(event);

        if let Some((last, head)) = subscribers.split_last() {
            for subscriber in head {
                let _ = subscriber.cast(Arc::clone(&event));
            }

            let _ = last.cast(event);
        }
    }
}

pub struct Args {
    pub keypair: Keypair,
    pub config: Config,
    pub registry: SharedRegistry,
    pub metrics: Metrics,
}

#[derive(Clone, Debug)]
pub enum BusEvent {
    Listening(Multiaddr),
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    /// A decoded, deduplicated frame, from a peer or from this node itself.
    Frame(PeerId, Message),
}

pub enum Msg {
    /// Subscribe an actor to bus events
    Subscribe(ActorRef<Arc<BusEvent>>),

    /// Serialize and publish a frame under its topic
    Publish(Message),

    /// Number of connected peers
    GetPeerCount { reply: RpcReplyPort<usize> },

    // Internal message
    #[doc(hidden)]
    NewEvent(Event),
}

pub enum State {
    Stopped,
    Running {
        local_peer_id: PeerId,
        peers: BTreeSet<PeerId>,
        subscribers: Vec<ActorRef<Arc<BusEvent>>>,
        recent: RecentGossip,
        metrics: Metrics,
        ctrl_handle: CtrlHandle,
        recv_task: JoinHandle<()>,
    },
}

#[async_trait]
impl Actor for Bus {
    type Msg = Msg;
    type State = State;
    type Arguments = Args;

    async fn pre_start(
        &self,
        myself: ActorRef<Msg>,
        args: Args,
    ) -> Result<Self::State, ActorProcessingErr> {
        let local_peer_id = args.keypair.public().to_peer_id();

        let handle =
            vladiator_network::spawn(args.keypair, args.config, &args.registry).await?;

        let (mut recv_handle, ctrl_handle) = handle.split();

        let recv_task = tokio::spawn(
            async move {
                while let Some(event) = recv_handle.recv().await {
                    if let Err(e) = myself.cast(Msg::NewEvent(event)) {
                        error!("Actor has died, stopping gossip: {e:?}");
                        break;
                    }
                }
            }
            .instrument(error_span!("gossip.recv")),
        );

        Ok(State::Running {
            local_peer_id,
            peers: BTreeSet::new(),
            subscribers: Vec::new(),
            recent: RecentGossip::default(),
            metrics: args.metrics,
            ctrl_handle,
            recv_task,
        })
    }

    #[tracing::instrument(name = "bus", skip_all)]
    async fn handle(
        &self,
        _myself: ActorRef<Msg>,
        msg: Msg,
        state: &mut State,
    ) -> Result<(), ActorProcessingErr> {
        let State::Running {
            local_peer_id,
            peers,
            subscribers,
            recent,
            metrics,
            ctrl_handle,
            ..
        } = state
        else {
            return Ok(());
        };

        match msg {
            Msg::Subscribe(subscriber) => subscribers.push(subscriber),

            Msg::Publish(message) => {
                let data = match serde_json::to_vec(&message) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to encode frame: {e}");
                        return Ok(());
                    }
                };

                ctrl_handle
                    .publish(message.topic, Bytes::from(data))
                    .await?;

                metrics.frames_published.inc();

                // Gossipsub does not deliver a node's own frames back to it;
                // loop them through ingress so subscribers (and the dedup
                // window) observe our traffic like any peer's.
                if !recent.should_drop(&message) {
                    self.publish_event(BusEvent::Frame(*local_peer_id, message), subscribers);
                }
            }

            Msg::NewEvent(Event::Listening(addr)) => {
                self.publish_event(BusEvent::Listening(addr), subscribers);
            }

            Msg::NewEvent(Event::PeerConnected(peer_id)) => {
                peers.insert(peer_id);
                metrics.connected_peers.set(peers.len() as i64);
                self.publish_event(BusEvent::PeerConnected(peer_id), subscribers);
            }

            Msg::NewEvent(Event::PeerDisconnected(peer_id)) => {
                peers.remove(&peer_id);
                metrics.connected_peers.set(peers.len() as i64);
                self.publish_event(BusEvent::PeerDisconnected(peer_id), subscribers);
            }

            Msg::NewEvent(Event::Message(from, topic, data)) => {
                let message = match serde_json::from_slice::<Message>(&data) {
                    Ok(message) => message,
                    Err(e) => {
                        debug!(%from, %topic, "Dropping malformed frame: {e}");
                        metrics.decode_errors.inc();
                        return Ok(());
                    }
                };

                if message.topic != topic {
                    debug!(
                        %from, %topic, label = %message.topic,
                        "Dropping frame whose type does not match its topic"
                    );
                    metrics.decode_errors.inc();
                    return Ok(());
                }

                if recent.should_drop(&message) {
                    debug!(%from, %topic, "Dropping duplicate frame");
                    metrics.frames_deduplicated.inc();
                    return Ok(());
                }

                metrics.frames_received.inc();
                self.publish_event(BusEvent::Frame(from, message), subscribers);
            }

            Msg::GetPeerCount { reply } => {
                reply.send(peers.len())?;
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Msg>,
        state: &mut State,
    ) -> Result<(), ActorProcessingErr> {
        let state = std::mem::replace(state, State::Stopped);

        if let State::Running {
            ctrl_handle,
            recv_task,
            ..
        } = state
        {
            ctrl_handle.wait_shutdown().await?;
            recv_task.await?;
        }

        Ok(())
    }
}
