use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use vladiator_core::Topic;

use crate::{BoxError, CtrlMsg, Event};

/// Receiving half of a running gossip node.
pub struct RecvHandle {
    rx_event: mpsc::Receiver<Event>,
}

impl RecvHandle {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx_event.recv().await
    }
}

/// Control half of a running gossip node.
pub struct CtrlHandle {
    tx_ctrl: mpsc::Sender<CtrlMsg>,
    task_handle: JoinHandle<()>,
}

impl CtrlHandle {
    /// Publish a frame under the given topic, best-effort to all subscribers.
    pub async fn publish(&self, topic: Topic, data: Bytes) -> Result<(), BoxError> {
        self.tx_ctrl.send(CtrlMsg::Publish(topic, data)).await?;
        Ok(())
    }

    /// Ask the swarm task to stop and wait for it to wind down.
    pub async fn wait_shutdown(self) -> Result<(), BoxError> {
        self.tx_ctrl.send(CtrlMsg::Shutdown).await?;
        self.task_handle.await?;
        Ok(())
    }
}

/// A handle to a running gossip node, created by [`crate::spawn`].
pub struct Handle {
    recv: RecvHandle,
    ctrl: CtrlHandle,
}

impl Handle {
    pub(crate) fn new(
        tx_ctrl: mpsc::Sender<CtrlMsg>,
        rx_event: mpsc::Receiver<Event>,
        task_handle: JoinHandle<()>,
    ) -> Self {
        Self {
            recv: RecvHandle { rx_event },
            ctrl: CtrlHandle {
                tx_ctrl,
                task_handle,
            },
        }
    }

    pub fn split(self) -> (RecvHandle, CtrlHandle) {
        (self.recv, self.ctrl)
    }

    pub async fn recv(&mut self) -> Option<Event> {
        self.recv.recv().await
    }

    pub async fn publish(&self, topic: Topic, data: Bytes) -> Result<(), BoxError> {
        self.ctrl.publish(topic, data).await
    }
}
