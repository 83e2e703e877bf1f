use thiserror::Error;

/// Errors surfaced by chain drivers.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver could not be brought up against its configured chain.
    #[error("failed to connect driver: {0}")]
    Connect(String),

    /// The RPC endpoint was unreachable or misbehaved.
    #[error("rpc transport error: {0}")]
    Rpc(#[from] alloy::transports::TransportError),

    /// A contract view call failed.
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    /// A peer-supplied or configured field could not be parsed.
    #[error("malformed field: {0}")]
    Parse(String),

    /// The confirmation wait ended with fewer confirmations than required.
    #[error("confirmations below required threshold")]
    ConfirmationShortfall,

    #[error("signer error: {0}")]
    Signer(#[from] alloy::signers::Error),
}
