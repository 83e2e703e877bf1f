use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use alloy::sol_types::SolValue;

use crate::{decode_hex, DriverError, TransactionData};

/// The node's signing capability over the canonical transaction tuple.
///
/// The tuple `(uint256 txId, uint256 sourceChainId, uint256 destChainId,
/// address sender, address recipient, bytes data)` is ABI-encoded and
/// keccak-256 hashed; the 32-byte digest is then signed as an EIP-191
/// personal message so that on-chain `ecrecover` matches.
#[derive(Clone, Debug)]
pub struct NodeSigner {
    inner: PrivateKeySigner,
}

impl NodeSigner {
    pub fn from_hex(private_key: &str) -> Result<Self, DriverError> {
        let inner = private_key
            .trim_start_matches("0x")
            .parse::<PrivateKeySigner>()
            .map_err(|e| DriverError::Parse(format!("node private key: {e}")))?;

        Ok(Self { inner })
    }

    /// The EVM address recovered signatures will resolve to.
    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// The canonical digest for a transaction tuple. Deterministic: any two
    /// nodes hashing the same tuple obtain the same digest.
    pub fn digest(tx: &TransactionData) -> Result<B256, DriverError> {
        let tx_id: U256 = tx
            .tx_id
            .parse()
            .map_err(|e| DriverError::Parse(format!("txId {:?}: {e}", tx.tx_id)))?;

        let sender: Address = tx
            .sender
            .parse()
            .map_err(|e| DriverError::Parse(format!("sender {:?}: {e}", tx.sender)))?;

        let recipient: Address = tx
            .recipient
            .parse()
            .map_err(|e| DriverError::Parse(format!("recipient {:?}: {e}", tx.recipient)))?;

        let data = decode_hex(&tx.data)
            .map_err(|e| DriverError::Parse(format!("encoded data: {e}")))?;

        let encoded = (
            tx_id,
            U256::from(tx.source_chain_id),
            U256::from(tx.dest_chain_id),
            sender,
            recipient,
            Bytes::from(data),
        )
            .abi_encode_params();

        Ok(keccak256(&encoded))
    }

    /// Sign the canonical tuple, returning the 65-byte `r‖s‖v` signature as
    /// 0x-prefixed hex.
    pub async fn sign(&self, tx: &TransactionData) -> Result<String, DriverError> {
        let digest = Self::digest(tx)?;
        let signature = self.inner.sign_message(digest.as_slice()).await?;

        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn transfer() -> TransactionData {
        TransactionData {
            tx_id: "42".to_string(),
            source_chain_id: 1,
            dest_chain_id: 56,
            sender: "0x1111111111111111111111111111111111111111".to_string(),
            recipient: "0x2222222222222222222222222222222222222222".to_string(),
            data: "0xdeadbeef".to_string(),
        }
    }

    #[test]
    fn digest_is_deterministic() {
        let a = NodeSigner::digest(&transfer()).unwrap();
        let b = NodeSigner::digest(&transfer()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn digest_commits_to_every_field() {
        let base = NodeSigner::digest(&transfer()).unwrap();

        let mut tx = transfer();
        tx.tx_id = "43".to_string();
        assert_ne!(NodeSigner::digest(&tx).unwrap(), base);

        let mut tx = transfer();
        tx.dest_chain_id = 137;
        assert_ne!(NodeSigner::digest(&tx).unwrap(), base);

        let mut tx = transfer();
        tx.recipient = "0x3333333333333333333333333333333333333333".to_string();
        assert_ne!(NodeSigner::digest(&tx).unwrap(), base);

        let mut tx = transfer();
        tx.data = "0xdeadbeee".to_string();
        assert_ne!(NodeSigner::digest(&tx).unwrap(), base);
    }

    #[test]
    fn digest_ignores_address_case() {
        let mut lower = transfer();
        lower.sender = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".to_string();

        let mut upper = transfer();
        upper.sender = "0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD".to_string();

        assert_eq!(
            NodeSigner::digest(&lower).unwrap(),
            NodeSigner::digest(&upper).unwrap()
        );
    }

    #[test]
    fn encoding_uses_standard_tuple_layout() {
        // Six head slots plus a length slot plus one 32-byte padded chunk for
        // the 4-byte payload.
        let tx = transfer();
        let tx_id: U256 = tx.tx_id.parse().unwrap();
        let sender: Address = tx.sender.parse().unwrap();
        let recipient: Address = tx.recipient.parse().unwrap();

        let encoded = (
            tx_id,
            U256::from(tx.source_chain_id),
            U256::from(tx.dest_chain_id),
            sender,
            recipient,
            Bytes::from(decode_hex(&tx.data).unwrap()),
        )
            .abi_encode_params();

        assert_eq!(encoded.len(), 8 * 32);
    }

    #[tokio::test]
    async fn signature_is_byte_identical_across_runs() {
        let signer = NodeSigner::from_hex(TEST_KEY).unwrap();

        let first = signer.sign(&transfer()).await.unwrap();
        let second = signer.sign(&transfer()).await.unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("0x"));
        // 65 bytes of signature as hex
        assert_eq!(first.len(), 2 + 65 * 2);
    }

    #[tokio::test]
    async fn different_keys_produce_different_signatures() {
        let a = NodeSigner::from_hex(TEST_KEY).unwrap();
        let b = NodeSigner::from_hex(
            "0x8b3a350cf5c34c9194ca85829a2df0ec3153be0318b5e2d3348e872092edffba",
        )
        .unwrap();

        assert_ne!(a.address(), b.address());
        assert_ne!(
            a.sign(&transfer()).await.unwrap(),
            b.sign(&transfer()).await.unwrap()
        );
    }

    #[test]
    fn rejects_malformed_fields() {
        let mut tx = transfer();
        tx.tx_id = "not-a-number".to_string();
        assert!(NodeSigner::digest(&tx).is_err());

        let mut tx = transfer();
        tx.sender = "0x123".to_string();
        assert!(NodeSigner::digest(&tx).is_err());
    }
}
