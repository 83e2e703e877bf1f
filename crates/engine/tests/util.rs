#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::mpsc;
use tokio::time::timeout;

use vladiator_core::{Message, Topic, TransferValues};
use vladiator_driver::{Driver, DriverError, TransactionData};
use vladiator_engine::{bus, NodeIdentity};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn identity() -> NodeIdentity {
    NodeIdentity {
        public_key: "test-node-pk".to_string(),
        signer_address: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
    }
}

pub fn transfer_values() -> TransferValues {
    TransferValues {
        tx_id: "42".to_string(),
        sender: "0x1111111111111111111111111111111111111111".to_string(),
        recipient: "0x2222222222222222222222222222222222222222".to_string(),
        chain: "56".to_string(),
        express: false,
        encoded_data: "0xdeadbeef".to_string(),
        confirmations: 12,
    }
}

pub fn request(values: TransferValues) -> Message {
    Message {
        transaction_hash: Some(
            "0x00000000000000000000000000000000000000000000000000000000000000aa".to_string(),
        ),
        values: Some(values),
        ..Message::new(Topic::MessageRequest, "peer-pk", 1)
    }
}

/// A driver whose "chain" is whatever the test configures.
pub struct MockDriver {
    chain_id: u64,
    pub chain_values: Mutex<Option<TransferValues>>,
    pub chain_feature: Mutex<Option<(u32, String)>>,
    pub fail_populate: AtomicBool,
    pub short_confirmations: AtomicBool,
    pub populate_calls: AtomicU32,
    pub sign_calls: AtomicU32,
    pub sign_delay: Mutex<Duration>,
}

impl MockDriver {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            chain_values: Mutex::new(None),
            chain_feature: Mutex::new(None),
            fail_populate: AtomicBool::new(false),
            short_confirmations: AtomicBool::new(false),
            populate_calls: AtomicU32::new(0),
            sign_calls: AtomicU32::new(0),
            sign_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn with_chain_values(self, values: TransferValues) -> Self {
        *self.chain_values.lock().unwrap() = Some(values);
        self
    }

    pub fn with_chain_feature(self, feature_id: u32, data: &str) -> Self {
        *self.chain_feature.lock().unwrap() = Some((feature_id, data.to_string()));
        self
    }

    fn rpc_error() -> DriverError {
        DriverError::Rpc(alloy::transports::TransportErrorKind::custom_str(
            "mock rpc failure",
        ))
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn signer_address(&self) -> String {
        format!("0xmock-signer-{}", self.chain_id)
    }

    async fn populate_message(&self, message: &mut Message) -> Result<(), DriverError> {
        self.populate_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_populate.load(Ordering::SeqCst) {
            return Err(Self::rpc_error());
        }

        message.values = self.chain_values.lock().unwrap().clone();

        let feature = self.chain_feature.lock().unwrap().clone();
        match feature {
            Some((feature_id, data)) => {
                message.feature_id = Some(feature_id);
                message.feature_data = Some(data);
            }
            None => {
                message.feature_id = None;
                message.feature_data = None;
            }
        }

        Ok(())
    }

    async fn is_message_valid(&self, message: &Message) -> Result<bool, DriverError> {
        if self.short_confirmations.load(Ordering::SeqCst) {
            return Err(DriverError::ConfirmationShortfall);
        }

        Ok(*self.chain_values.lock().unwrap() == message.values)
    }

    async fn is_message_processed(&self, _message: &Message) -> Result<bool, DriverError> {
        Ok(false)
    }

    async fn sign_transaction_data(&self, tx: &TransactionData) -> Result<String, DriverError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.sign_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // Deterministic over the canonical tuple, like a real signer.
        Ok(format!(
            "0x{}",
            hex::encode(format!(
                "{}:{}:{}:{}:{}:{}",
                tx.tx_id, tx.source_chain_id, tx.dest_chain_id, tx.sender, tx.recipient, tx.data
            ))
        ))
    }

    async fn get_chainsig(&self) -> Result<String, DriverError> {
        Ok("0xcccccccccccccccccccccccccccccccccccccccc".to_string())
    }

    async fn get_exsig(&self, _project: &str) -> Result<String, DriverError> {
        Ok("0x0000000000000000000000000000000000000000".to_string())
    }
}

/// Stands in for the bus: records every published frame for assertions.
pub struct RecordingBus {
    tx: mpsc::UnboundedSender<Message>,
}

impl RecordingBus {
    pub async fn spawn() -> (ActorRef<bus::Msg>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let (actor_ref, _) = Actor::spawn(None, RecordingBus { tx }, ())
            .await
            .expect("failed to spawn recording bus");

        (actor_ref, rx)
    }
}

#[async_trait]
impl Actor for RecordingBus {
    type Msg = bus::Msg;
    type State = ();
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: (),
    ) -> Result<(), ActorProcessingErr> {
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        msg: bus::Msg,
        _state: &mut (),
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            bus::Msg::Publish(message) => {
                let _ = self.tx.send(message);
            }
            bus::Msg::Subscribe(_) => {}
            bus::Msg::GetPeerCount { reply } => {
                let _ = reply.send(0);
            }
            bus::Msg::NewEvent(_) => {}
        }

        Ok(())
    }
}

pub async fn recv_frame(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("bus recorder closed")
}

/// Assert that nothing else was (or is about to be) published.
pub async fn assert_no_frames(rx: &mut mpsc::UnboundedReceiver<Message>) {
    tokio::time::sleep(Duration::from_millis(200)).await;

    if let Ok(frame) = rx.try_recv() {
        panic!("unexpected frame published: {frame:?}");
    }
}
