//! Driver for EVM-family chains (`EVMMV3`), speaking JSON-RPC over HTTP.

use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use tracing::{debug, warn};

use vladiator_core::{Message, NetworkConfig, TransferValues};

use crate::abi::MessageContract;
use crate::{decode_hex, encode_hex, Driver, DriverError, NodeSigner, TransactionData};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const RECEIPT_MAX_POLLS: u32 = 40;

pub struct EvmDriver {
    chain_id: u64,
    name: String,
    contract_address: Address,
    finality: u64,
    provider: DynProvider,
    signer: NodeSigner,
}

impl EvmDriver {
    /// Validate the configured message contract and open an RPC session.
    pub async fn connect(config: &NetworkConfig, signer: NodeSigner) -> Result<Self, DriverError> {
        let chain_id = config
            .chain_id()
            .map_err(|e| DriverError::Connect(format!("chain id {:?}: {e}", config.id)))?;

        let contract_address: Address = config
            .contract
            .as_deref()
            .ok_or_else(|| {
                DriverError::Connect(format!("no message contract configured for {}", config.name))
            })?
            .parse()
            .map_err(|e| DriverError::Connect(format!("message contract address: {e}")))?;

        let provider = ProviderBuilder::new()
            .connect(&config.rpc)
            .await
            .map_err(|e| DriverError::Connect(format!("rpc {}: {e}", config.rpc)))?
            .erased();

        let reported = provider
            .get_chain_id()
            .await
            .map_err(|e| DriverError::Connect(format!("chain id probe: {e}")))?;

        if reported != chain_id {
            warn!(
                chain = %config.name,
                configured = chain_id,
                reported,
                "RPC endpoint reports a different chain id"
            );
        }

        Ok(Self {
            chain_id,
            name: config.name.clone(),
            contract_address,
            finality: config.finality,
            provider,
            signer,
        })
    }

    fn contract(&self) -> MessageContract::MessageContractInstance<DynProvider> {
        MessageContract::new(self.contract_address, self.provider.clone())
    }

    /// Poll for the receipt until it has the required confirmations.
    /// Running out of polls, with or without a receipt in hand, is a
    /// confirmation shortfall.
    async fn wait_for_confirmations(
        &self,
        hash: B256,
        required: u64,
    ) -> Result<TransactionReceipt, DriverError> {
        for poll in 0..RECEIPT_MAX_POLLS {
            if poll > 0 {
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }

            let Some(receipt) = self.provider.get_transaction_receipt(hash).await? else {
                debug!(%hash, "Receipt not yet available");
                continue;
            };

            let Some(block_number) = receipt.block_number else {
                continue;
            };

            let latest = self.provider.get_block_number().await?;
            let confirmations = latest.saturating_sub(block_number) + 1;

            if confirmations >= required {
                return Ok(receipt);
            }

            debug!(%hash, confirmations, required, "Waiting for confirmations");
        }

        Err(DriverError::ConfirmationShortfall)
    }

    fn required_confirmations(&self, values: &TransferValues) -> u64 {
        if values.confirmations == 0 {
            self.finality
        } else {
            values.confirmations
        }
    }
}

#[async_trait]
impl Driver for EvmDriver {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn signer_address(&self) -> String {
        self.signer.address().to_string()
    }

    async fn populate_message(&self, message: &mut Message) -> Result<(), DriverError> {
        let hash = parse_tx_hash(message.transaction_hash.as_deref())?;

        // Peer-supplied fields are never trusted: everything below is
        // overwritten from the receipt, including clearing stale claims.
        message.values = None;
        message.feature_id = None;
        message.feature_data = None;

        let Some(receipt) = self.provider.get_transaction_receipt(hash).await? else {
            return Ok(());
        };

        for log in receipt.inner.logs() {
            if log.address() != self.contract_address {
                continue;
            }

            match log.topic0() {
                Some(&MessageContract::SendRequested::SIGNATURE_HASH) => {
                    let event = log
                        .log_decode::<MessageContract::SendRequested>()
                        .map_err(|e| DriverError::Parse(format!("SendRequested log: {e}")))?
                        .inner
                        .data;

                    message.values = Some(values_from_event(&event));
                }

                Some(&MessageContract::SendMessageWithFeature::SIGNATURE_HASH) => {
                    let event = log
                        .log_decode::<MessageContract::SendMessageWithFeature>()
                        .map_err(|e| {
                            DriverError::Parse(format!("SendMessageWithFeature log: {e}"))
                        })?
                        .inner
                        .data;

                    message.feature_id = Some(event.featureId);
                    message.feature_data = Some(encode_hex(&event.featureData));
                }

                _ => {}
            }
        }

        Ok(())
    }

    async fn is_message_valid(&self, message: &Message) -> Result<bool, DriverError> {
        let Some(values) = &message.values else {
            return Ok(false);
        };

        let Ok(hash) = parse_tx_hash(message.transaction_hash.as_deref()) else {
            return Ok(false);
        };

        let required = self.required_confirmations(values);
        let receipt = self.wait_for_confirmations(hash, required).await?;

        let matched = receipt.inner.logs().iter().any(|log| {
            log.address() == self.contract_address
                && log.topic0() == Some(&MessageContract::SendRequested::SIGNATURE_HASH)
                && log
                    .log_decode::<MessageContract::SendRequested>()
                    .map(|decoded| event_matches_values(&decoded.inner.data, values))
                    .unwrap_or(false)
        });

        Ok(matched)
    }

    async fn is_message_processed(&self, message: &Message) -> Result<bool, DriverError> {
        let tx_id = parse_tx_id(message)?;
        let processed = self.contract().processedTransfers(tx_id).call().await?;
        Ok(processed)
    }

    async fn sign_transaction_data(&self, tx: &TransactionData) -> Result<String, DriverError> {
        self.signer.sign(tx).await
    }

    async fn get_chainsig(&self) -> Result<String, DriverError> {
        let chainsig = self.contract().chainsig().call().await?;
        Ok(chainsig.to_string())
    }

    async fn get_exsig(&self, project: &str) -> Result<String, DriverError> {
        let project: Address = project
            .parse()
            .map_err(|e| DriverError::Parse(format!("project address {project:?}: {e}")))?;

        let exsig = self.contract().exsig(project).call().await?;
        Ok(exsig.to_string())
    }
}

fn parse_tx_hash(hash: Option<&str>) -> Result<B256, DriverError> {
    let hash = hash.ok_or_else(|| DriverError::Parse("missing transactionHash".to_string()))?;

    hash.parse()
        .map_err(|e| DriverError::Parse(format!("transactionHash {hash:?}: {e}")))
}

fn parse_tx_id(message: &Message) -> Result<U256, DriverError> {
    let tx_id = message
        .tx_id()
        .ok_or_else(|| DriverError::Parse("missing values.txId".to_string()))?;

    tx_id
        .parse()
        .map_err(|e| DriverError::Parse(format!("txId {tx_id:?}: {e}")))
}

fn values_from_event(event: &MessageContract::SendRequested) -> TransferValues {
    TransferValues {
        tx_id: event.txId.to_string(),
        sender: event.sender.to_string(),
        recipient: event.recipient.to_string(),
        chain: event.chain.to_string(),
        express: event.express,
        encoded_data: encode_hex(&event.data),
        confirmations: u64::from(event.confirmations),
    }
}

/// Exact comparison between a decoded log and peer-claimed values:
/// addresses compared case-insensitively (parsed form), payload bytes-equal.
fn event_matches_values(event: &MessageContract::SendRequested, values: &TransferValues) -> bool {
    let Ok(sender) = values.sender.parse::<Address>() else {
        return false;
    };
    let Ok(recipient) = values.recipient.parse::<Address>() else {
        return false;
    };
    let Ok(payload) = decode_hex(&values.encoded_data) else {
        return false;
    };

    event.txId.to_string() == values.tx_id
        && event.sender == sender
        && event.recipient == recipient
        && event.chain.to_string() == values.chain
        && event.express == values.express
        && event.data.as_ref() == payload.as_slice()
        && u64::from(event.confirmations) == values.confirmations
}
