use std::collections::BTreeMap;

use vladiator_core::{Config, DriverKind, NetworkConfig};

/// A starter configuration with placeholder endpoints, written by `init`.
pub fn sample_config() -> Config {
    let mut networks = BTreeMap::new();

    networks.insert(
        "ethereum".to_string(),
        NetworkConfig {
            id: "1".to_string(),
            kind: DriverKind::EvmMv3,
            name: "Ethereum".to_string(),
            rpc: "https://eth.example.org".to_string(),
            rpc_exec: None,
            contract: Some("0x0000000000000000000000000000000000000000".to_string()),
            finality: 12,
            chunk_size: Some(5000),
            lookback: None,
            lookback_delay: None,
            free_gas: None,
            gas_offset: None,
            force_legacy_gas: None,
            force_gas_fee_amount: None,
        },
    );

    networks.insert(
        "bsc".to_string(),
        NetworkConfig {
            id: "56".to_string(),
            kind: DriverKind::EvmMv3,
            name: "BNB Chain".to_string(),
            rpc: "https://bsc.example.org".to_string(),
            rpc_exec: None,
            contract: Some("0x0000000000000000000000000000000000000000".to_string()),
            finality: 15,
            chunk_size: Some(5000),
            lookback: None,
            lookback_delay: None,
            free_gas: Some(true),
            gas_offset: None,
            force_legacy_gas: None,
            force_gas_fee_amount: None,
        },
    );

    Config { networks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_round_trips() {
        let config = sample_config();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(back.networks.len(), 2);
        assert_eq!(back.networks["ethereum"].chain_id().unwrap(), 1);
        assert_eq!(back.networks["bsc"].kind, DriverKind::EvmMv3);
    }
}
