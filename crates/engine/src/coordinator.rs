//! Per-driver request coordinator.
//!
//! One coordinator actor runs for every source-chain driver. It owns the
//! signature, retry and feature-reply caches and is their only writer: each
//! accepted request runs as a detached pipeline task
//! (populate → validate → feature → sign) that reports the resulting cache
//! transition back as a message. Distinct `txId`s proceed concurrently; the
//! `Locked` sentinel serializes attempts on the same `txId`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ractor::{Actor, ActorCell, ActorProcessingErr, ActorRef};
use tracing::{debug, error, error_span, info, warn, Instrument};

use vladiator_core::{Message, Topic, MAX_REQUEST_RETRIES};
use vladiator_driver::{Driver, DriverError, TransactionData};

use crate::bus::Msg as BusMsg;
use crate::{BusRef, DriverTable, FeatureRegistry, Metrics, NodeIdentity};

pub type CoordinatorRef = ActorRef<Msg>;

pub struct Coordinator {
    identity: NodeIdentity,
    driver: Arc<dyn Driver>,
    drivers: DriverTable,
    features: Arc<FeatureRegistry>,
    bus: BusRef,
    metrics: Metrics,
}

impl Coordinator {
    pub fn new(
        identity: NodeIdentity,
        driver: Arc<dyn Driver>,
        drivers: DriverTable,
        features: Arc<FeatureRegistry>,
        bus: BusRef,
        metrics: Metrics,
    ) -> Self {
        Self {
            identity,
            driver,
            drivers,
            features,
            bus,
            metrics,
        }
    }

    pub async fn spawn(
        self,
        supervisor: Option<ActorCell>,
    ) -> Result<CoordinatorRef, ractor::SpawnErr> {
        let (actor_ref, _) = if let Some(supervisor) = supervisor {
            Actor::spawn_linked(None, self, (), supervisor).await?
        } else {
            Actor::spawn(None, self, ()).await?
        };

        Ok(actor_ref)
    }

    fn publish(&self, message: Message) {
        publish(&self.bus, message);
    }
}

/// Per-`txId` signing state. Absence from the map is the third state.
pub enum TxState {
    /// A pipeline task is working on this transfer.
    Locked,
    /// Terminal: the finalized signature hex. Replays re-emit it.
    Signed(String),
}

pub enum Msg {
    /// An inbound `MESSAGE:REQUEST` routed to this driver
    Request(Message),

    // Internal messages from pipeline tasks
    #[doc(hidden)]
    Signed {
        tx_id: String,
        signature: String,
        feature_reply: Option<String>,
        frame: Message,
    },
    #[doc(hidden)]
    Abandoned { tx_id: String },
}

#[derive(Default)]
pub struct State {
    signatures: HashMap<String, TxState>,
    retries: HashMap<String, u32>,
    feature_replies: HashMap<String, String>,
    /// The exact frames we signed, kept so replays re-emit identical values.
    signed_frames: HashMap<String, Message>,
}

#[async_trait]
impl Actor for Coordinator {
    type Msg = Msg;
    type State = State;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Msg>,
        _args: (),
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(
            chain = self.driver.chain_id(),
            name = self.driver.name(),
            "Coordinator started"
        );

        Ok(State::default())
    }

    #[tracing::instrument(name = "coordinator", skip_all, fields(chain = self.driver.chain_id()))]
    async fn handle(
        &self,
        myself: ActorRef<Msg>,
        msg: Msg,
        state: &mut State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            Msg::Request(message) => self.on_request(myself, message, state),

            Msg::Signed {
                tx_id,
                signature,
                feature_reply,
                frame,
            } => {
                state
                    .signatures
                    .insert(tx_id.clone(), TxState::Signed(signature));

                if let Some(reply) = feature_reply {
                    state.feature_replies.insert(tx_id.clone(), reply);
                }

                state.signed_frames.insert(tx_id.clone(), frame.clone());

                debug!(%tx_id, "Transfer signed, publishing");
                self.metrics.signed.inc();
                self.publish(frame);
            }

            Msg::Abandoned { tx_id } => {
                state.signatures.remove(&tx_id);
                debug!(%tx_id, "Released lock");
            }
        }

        Ok(())
    }
}

impl Coordinator {
    fn on_request(&self, myself: ActorRef<Msg>, message: Message, state: &mut State) {
        let (Some(tx_id), Some(_)) = (message.tx_id(), message.transaction_hash.as_deref())
        else {
            debug!("Ignoring request without values or transactionHash");
            return;
        };
        let tx_id = tx_id.to_string();

        match state.signatures.get(&tx_id) {
            Some(TxState::Signed(_)) => {
                // Idempotent replay: re-emit the cached frame so the
                // signature is byte-identical, carrying the preserved
                // feature reply.
                if let Some(frame) = state.signed_frames.get(&tx_id) {
                    debug!(%tx_id, "Replaying cached signature");
                    let mut frame = frame.clone();
                    frame.feature_reply = state.feature_replies.get(&tx_id).cloned();
                    self.metrics.signed.inc();
                    self.publish(frame);
                }
                return;
            }

            Some(TxState::Locked) => {
                debug!(%tx_id, "Request already in flight");
                return;
            }

            None => {}
        }

        let attempts = state.retries.entry(tx_id.clone()).or_insert(0);
        *attempts += 1;

        if *attempts > MAX_REQUEST_RETRIES {
            debug!(%tx_id, attempts, "Retry budget exhausted, dropping request");
            self.metrics.retries_exhausted.inc();
            return;
        }

        state.signatures.insert(tx_id.clone(), TxState::Locked);
        self.metrics.requests_accepted.inc();

        let pipeline = Pipeline {
            coordinator: myself,
            identity: self.identity.clone(),
            driver: Arc::clone(&self.driver),
            drivers: self.drivers.clone(),
            features: Arc::clone(&self.features),
            bus: self.bus.clone(),
            metrics: self.metrics.clone(),
        };

        let span = error_span!("request", chain = self.driver.chain_id(), %tx_id);
        tokio::spawn(pipeline.run(message).instrument(span));
    }
}

/// One in-flight `processMessageRequest`: everything between lock
/// acquisition and the resulting cache transition.
struct Pipeline {
    coordinator: CoordinatorRef,
    identity: NodeIdentity,
    driver: Arc<dyn Driver>,
    drivers: DriverTable,
    features: Arc<FeatureRegistry>,
    bus: BusRef,
    metrics: Metrics,
}

impl Pipeline {
    async fn run(self, request: Message) {
        let tx_id = request
            .tx_id()
            .expect("request accepted without values")
            .to_string();

        let outcome = self.process(&tx_id, request).await;

        let msg = match outcome {
            Some((signature, feature_reply, frame)) => Msg::Signed {
                tx_id,
                signature,
                feature_reply,
                frame,
            },
            None => Msg::Abandoned { tx_id },
        };

        if let Err(e) = self.coordinator.cast(msg) {
            error!("Coordinator is gone, dropping pipeline outcome: {e}");
        }
    }

    /// The request pipeline proper. Returns `None` when the attempt is
    /// abandoned; emission of INVALID / PENALTY / FEATURE frames happens
    /// inline at the failing stage.
    async fn process(
        &self,
        tx_id: &str,
        request: Message,
    ) -> Option<(String, Option<String>, Message)> {
        // Populate: on-chain truth replaces the peer's claims.
        let mut populated = request.clone();
        if let Err(e) = self.driver.populate_message(&mut populated).await {
            warn!(%tx_id, "Failed to populate message from chain: {e}");
            return None;
        }

        let Some(values) = populated.values.clone() else {
            debug!(%tx_id, "No send event on chain, abandoning");
            return None;
        };

        // Validate the claim as received against the chain.
        match self.driver.is_message_valid(&request).await {
            Ok(true) => {}

            Ok(false) => {
                debug!(%tx_id, "Claimed values do not match chain, flagging invalid");
                self.metrics.invalid.inc();
                publish(
                    &self.bus,
                    Message {
                        transaction_hash: request.transaction_hash.clone(),
                        values: request.values.clone(),
                        ..Message::new(
                            Topic::MessageInvalid,
                            &self.identity.public_key,
                            self.driver.chain_id(),
                        )
                    },
                );
                return None;
            }

            Err(DriverError::ConfirmationShortfall) => {
                debug!(%tx_id, "Confirmations below threshold, abandoning");
                return None;
            }

            Err(e) => {
                warn!(%tx_id, "Validation errored: {e}");
                return None;
            }
        }

        // Destination lookup through the narrow driver table.
        let dest_chain = values.chain.parse::<u64>().ok();
        let dest = dest_chain.and_then(|chain| self.drivers.get(chain));

        let Some(dest) = dest else {
            info!(%tx_id, chain = %values.chain, "No driver for destination chain");
            self.metrics.penalties.inc();
            publish(
                &self.bus,
                Message {
                    transaction_hash: populated.transaction_hash.clone(),
                    values: Some(values),
                    ..Message::new(
                        Topic::PenaltyChainmiss,
                        &self.identity.public_key,
                        self.driver.chain_id(),
                    )
                },
            );
            return None;
        };

        // Feature stage.
        let mut feature_reply = None;
        if let Some(feature_id) = populated.feature_id {
            publish(
                &self.bus,
                Message {
                    transaction_hash: populated.transaction_hash.clone(),
                    values: Some(values.clone()),
                    feature_id: Some(feature_id),
                    ..Message::new(
                        Topic::FeatureStart,
                        &self.identity.public_key,
                        self.driver.chain_id(),
                    )
                },
            );

            match self
                .features
                .process(feature_id, Arc::clone(&self.driver), populated.clone())
                .await
            {
                Ok(processed) => {
                    feature_reply = processed.feature_reply.clone();
                    populated = processed;

                    publish(
                        &self.bus,
                        Message {
                            transaction_hash: populated.transaction_hash.clone(),
                            values: Some(values.clone()),
                            feature_id: Some(feature_id),
                            feature_reply: feature_reply.clone(),
                            ..Message::new(
                                Topic::FeatureCompleted,
                                &self.identity.public_key,
                                self.driver.chain_id(),
                            )
                        },
                    );
                }

                Err(e) => {
                    warn!(%tx_id, feature_id, "Feature failed: {e}");
                    self.metrics.feature_failures.inc();
                    publish(
                        &self.bus,
                        Message {
                            transaction_hash: populated.transaction_hash.clone(),
                            values: Some(values.clone()),
                            feature_id: Some(feature_id),
                            feature_failed: Some(true),
                            ..Message::new(
                                Topic::FeatureFailed,
                                &self.identity.public_key,
                                self.driver.chain_id(),
                            )
                        },
                    );
                    return None;
                }
            }
        }

        // Sign the canonical tuple with the destination chain's scheme.
        let tx = TransactionData {
            tx_id: values.tx_id.clone(),
            source_chain_id: self.driver.chain_id(),
            dest_chain_id: dest.chain_id(),
            sender: values.sender.clone(),
            recipient: values.recipient.clone(),
            data: values.encoded_data.clone(),
        };

        let signature = match dest.sign_transaction_data(&tx).await {
            Ok(signature) => signature,
            Err(e) => {
                warn!(%tx_id, "Failed to sign transaction data: {e}");
                return None;
            }
        };

        let frame = Message {
            transaction_hash: populated.transaction_hash.clone(),
            values: Some(values),
            feature_id: populated.feature_id,
            feature_reply: feature_reply.clone(),
            signer: Some(self.identity.signer_address.clone()),
            signature: Some(signature.clone()),
            ..Message::new(
                Topic::MessageSigned,
                &self.identity.public_key,
                self.driver.chain_id(),
            )
        };

        Some((signature, feature_reply, frame))
    }
}

fn publish(bus: &BusRef, message: Message) {
    if let Err(e) = bus.cast(BusMsg::Publish(message)) {
        error!("Failed to hand frame to the bus: {e}");
    }
}
