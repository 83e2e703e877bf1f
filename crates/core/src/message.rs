use serde::{Deserialize, Serialize};

use crate::{Topic, HEARTBEAT_SOURCE};

/// The transfer fields of a cross-chain request, as announced by a peer or
/// as read back from the source chain.
///
/// `txId` and `chain` are decimal strings on the wire; `encodedData` is a
/// 0x-prefixed hex payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferValues {
    pub tx_id: String,
    pub sender: String,
    pub recipient: String,
    pub chain: String,
    pub express: bool,
    pub encoded_data: String,
    pub confirmations: u64,
}

/// A self-describing frame exchanged over the gossip bus.
///
/// Every frame carries `type` and `author`; everything else is optional and
/// omitted from the wire when absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub topic: Topic,

    /// Public key of the publishing node.
    pub author: String,

    /// Numeric id of the source chain, or [`HEARTBEAT_SOURCE`].
    pub source: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<TransferValues>,

    // Feature plug-in slots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_failed: Option<bool>,

    // Cryptographic attestations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chainsig: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exsig: Option<String>,

    // Observability fields populated by EXECUTION-topic publishers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_gas_refund: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator_balance: Option<String>,

    /// Free-form liveness payload on `HEARTBEAT` frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Message {
    /// A frame with only the mandatory fields set.
    pub fn new(topic: Topic, author: impl Into<String>, source: u64) -> Self {
        Self {
            topic,
            author: author.into(),
            source,
            transaction_hash: None,
            values: None,
            feature_id: None,
            feature_data: None,
            feature_reply: None,
            feature_failed: None,
            signer: None,
            signature: None,
            chainsig: None,
            exsig: None,
            execution_hash: None,
            source_gas: None,
            dest_gas: None,
            dest_gas_refund: None,
            token_price: None,
            validator_balance: None,
            status: None,
        }
    }

    /// A liveness frame carrying the sentinel source.
    pub fn heartbeat(author: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::new(Topic::Heartbeat, author, HEARTBEAT_SOURCE)
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        self.topic == Topic::Heartbeat || self.source == HEARTBEAT_SOURCE
    }

    /// The `txId` of the referenced transfer, when present.
    pub fn tx_id(&self) -> Option<&str> {
        self.values.as_ref().map(|values| values.tx_id.as_str())
    }
}
