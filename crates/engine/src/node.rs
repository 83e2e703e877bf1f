use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{BusRef, VladiatorRef};

pub type NodeRef = ActorRef<()>;

/// Top-level supervisor: links the bus and the orchestrator and shuts the
/// node down when either of them goes away, since a deaf or headless
/// validator is of no use to the network.
pub struct Node {
    bus: BusRef,
    vladiator: VladiatorRef,
    span: tracing::Span,
}

impl Node {
    pub fn new(bus: BusRef, vladiator: VladiatorRef, span: tracing::Span) -> Self {
        Self {
            bus,
            vladiator,
            span,
        }
    }

    pub async fn spawn(self) -> Result<(NodeRef, JoinHandle<()>), ractor::SpawnErr> {
        Actor::spawn(None, self, ()).await
    }
}

#[async_trait]
impl Actor for Node {
    type Msg = ();
    type State = ();
    type Arguments = ();

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        _args: (),
    ) -> Result<(), ActorProcessingErr> {
        // Set ourselves as the supervisor of the other actors
        self.bus.link(myself.get_cell());
        self.vladiator.link(myself.get_cell());

        Ok(())
    }

    #[tracing::instrument(name = "node", parent = &self.span, skip_all)]
    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        _msg: Self::Msg,
        _state: &mut (),
    ) -> Result<(), ActorProcessingErr> {
        Ok(())
    }

    #[tracing::instrument(name = "node", parent = &self.span, skip_all)]
    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        evt: SupervisionEvent,
        _state: &mut (),
    ) -> Result<(), ActorProcessingErr> {
        match evt {
            SupervisionEvent::ActorStarted(cell) => {
                info!(actor = %cell.get_id(), "Actor has started");
            }

            SupervisionEvent::ActorTerminated(cell, _state, reason) => {
                error!(
                    actor = %cell.get_id(),
                    "Actor has terminated: {}",
                    reason.unwrap_or_else(|| "no reason provided".to_string())
                );

                myself.stop(Some("Shutting down node due to child actor termination".to_string()));
            }

            SupervisionEvent::ActorFailed(cell, error) => {
                error!(actor = %cell.get_id(), "Actor has failed: {error}");

                myself.stop(Some("Shutting down node due to child actor failure".to_string()));
            }

            SupervisionEvent::ProcessGroupChanged(_) => (),
        }

        Ok(())
    }
}
