//! Chain drivers.
//!
//! A driver owns the connection to one chain: it fetches and decodes message
//! contract event logs, answers validity and processed-state queries, and
//! signs canonical transaction tuples under the chain's signature scheme.
//! Peer-supplied message fields are never trusted; everything a driver
//! reports comes from its own RPC session.

use async_trait::async_trait;

use vladiator_core::Message;

mod abi;
mod error;
mod evm;
mod signer;

pub use abi::MessageContract;
pub use error::DriverError;
pub use evm::EvmDriver;
pub use signer::NodeSigner;

/// The canonical tuple signed to authorize execution on the destination
/// chain. Any deviation in field order or encoding breaks execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionData {
    /// Decimal transfer id.
    pub tx_id: String,
    pub source_chain_id: u64,
    pub dest_chain_id: u64,
    pub sender: String,
    pub recipient: String,
    /// 0x-prefixed hex payload.
    pub data: String,
}

/// Polymorphic contract every chain family implements.
#[async_trait]
pub trait Driver: Send + Sync {
    fn chain_id(&self) -> u64;

    fn name(&self) -> &str;

    /// The address signatures produced by this driver recover to.
    fn signer_address(&self) -> String;

    /// Overwrite `message.values` and the feature slots from the on-chain
    /// receipt referenced by `message.transaction_hash`. Leaves `values`
    /// absent when the expected event is not found.
    async fn populate_message(&self, message: &mut Message) -> Result<(), DriverError>;

    /// Whether a log at the configured message contract matches
    /// `message.values` exactly, with sufficient confirmations.
    async fn is_message_valid(&self, message: &Message) -> Result<bool, DriverError>;

    /// View call `processedTransfers(txId)` against this chain's message
    /// contract.
    async fn is_message_processed(&self, message: &Message) -> Result<bool, DriverError>;

    /// Sign the canonical tuple under this chain's signature scheme.
    async fn sign_transaction_data(&self, tx: &TransactionData) -> Result<String, DriverError>;

    /// The contract's current authoritative signer address.
    async fn get_chainsig(&self) -> Result<String, DriverError>;

    /// The external signer registered for a project, if any.
    async fn get_exsig(&self, project: &str) -> Result<String, DriverError>;
}

/// Decode a hex string with or without a `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.trim_start_matches("0x"))
}

/// Encode bytes as 0x-prefixed hex.
pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(decode_hex("0xdeadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_hex("deadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(encode_hex([0xde, 0xad, 0xbe, 0xef]), "0xdeadbeef");
    }
}
