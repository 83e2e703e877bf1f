//! On-chain surface of the message contract.
//!
//! Event topic hashes are compile-time constants (`SIGNATURE_HASH`) and are
//! compared byte-for-byte against receipt logs.

use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    contract MessageContract {
        event SendRequested(
            uint256 txId,
            address sender,
            address recipient,
            uint256 chain,
            bool express,
            bytes data,
            uint16 confirmations
        );

        event SendProcessed(
            uint256 txId,
            uint256 sourceChainId,
            address sender,
            address recipient
        );

        event SendMessageWithFeature(
            uint256 txId,
            uint256 destinationChainId,
            uint32 featureId,
            bytes featureData
        );

        event Success(
            uint256 txId,
            uint256 sourceChainId,
            address sender,
            address recipient,
            uint256 amount
        );

        event SetChainsig(address signer);

        function processedTransfers(uint256 txId) external view returns (bool);
        function chainsig() external view returns (address);
        function exsig(address project) external view returns (address);
    }
}
