use std::collections::BTreeMap;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};

/// Node configuration: a map of network label to [`NetworkConfig`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub networks: BTreeMap<String, NetworkConfig>,
}

impl Config {
    pub fn networks(&self) -> impl Iterator<Item = (&str, &NetworkConfig)> {
        self.networks
            .iter()
            .map(|(label, network)| (label.as_str(), network))
    }
}

/// Which driver family serves a configured network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverKind {
    /// EVM-family chains speaking JSON-RPC over HTTP.
    #[serde(rename = "EVMMV3")]
    EvmMv3,
    /// Substrate-family chains with an EVM pallet (WebSocket RPC).
    #[serde(rename = "Reef")]
    Reef,
}

/// Per-chain configuration block.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Chain id as a decimal string.
    pub id: String,

    #[serde(rename = "type")]
    pub kind: DriverKind,

    pub name: String,

    /// Primary RPC endpoint.
    pub rpc: String,

    /// Alternate endpoint for writes, when the primary is read-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_exec: Option<String>,

    /// Address of the message contract on this chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    /// Default number of confirmations required before a transfer is final.
    pub finality: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback_delay: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_gas: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_offset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_legacy_gas: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_gas_fee_amount: Option<String>,
}

impl NetworkConfig {
    /// The chain id parsed out of its decimal-string form.
    pub fn chain_id(&self) -> Result<u64, ParseIntError> {
        self.id.parse()
    }
}
