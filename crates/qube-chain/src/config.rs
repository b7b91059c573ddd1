//! Network configuration for chain connections and transactions.
//!
//! - REST (LCD) endpoints: all staking queries
//! - EVM JSON-RPC endpoints: the MetaMask bridge and `wallet_addEthereumChain`
//! - Precompile addresses: staking writes from the EVM side

use std::time::Duration;

use qube_core::{Network, ReadPolicy, ValidatorConfig};

/// Staking precompile (delegate / undelegate).
pub const STAKING_PRECOMPILE: &str = "0x0000000000000000000000000000000000000800";

/// Distribution precompile (reward withdrawal).
pub const DISTRIBUTION_PRECOMPILE: &str = "0x0000000000000000000000000000000000000801";

/// Get the REST endpoints for a network, in order of preference.
pub fn get_rest_endpoints(network: Network) -> &'static [&'static str] {
    match network {
        Network::Mainnet => &[
            "https://swagger.qubetics.com",
            "https://api.qubetics.com",
        ],
        Network::Testnet => &["https://swagger-testnet.qubetics.work"],
    }
}

/// Get the EVM JSON-RPC endpoints for a network.
pub fn get_evm_rpc_endpoints(network: Network) -> &'static [&'static str] {
    match network {
        Network::Mainnet => &["https://rpc.qubetics.com"],
        Network::Testnet => &["https://rpc-testnet.qubetics.work"],
    }
}

/// Block explorer for a network.
pub fn get_explorer_url(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "https://ticsscan.com",
        Network::Testnet => "https://testnet.qubetics.work",
    }
}

/// Gas limits and price for staking transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasConfig {
    pub delegate: u64,
    pub undelegate: u64,
    pub redelegate: u64,
    /// Per validator withdrawn from.
    pub claim: u64,
    pub cancel_unbonding: u64,
    /// Minimal units per gas unit.
    pub gas_price: u128,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            delegate: 300_000,
            undelegate: 350_000,
            redelegate: 400_000,
            claim: 250_000,
            cancel_unbonding: 350_000,
            gas_price: 1_000_000_000,
        }
    }
}

/// How long the EVM bridge waits for a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPolling {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReceiptPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

/// Everything the wallet backends and the orchestrator need to know about
/// the target chain.
#[derive(Debug, Clone)]
pub struct StakingConfig {
    pub network: Network,
    pub validator: ValidatorConfig,
    pub gas: GasConfig,
    pub receipt_polling: ReceiptPolling,
    pub read_policy: ReadPolicy,
    /// EVM RPC advertised to MetaMask when the network must be added.
    pub evm_rpc_url: String,
    pub default_memo: String,
}

impl StakingConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            validator: ValidatorConfig::default(),
            gas: GasConfig::default(),
            receipt_polling: ReceiptPolling::default(),
            read_policy: ReadPolicy::default(),
            evm_rpc_url: get_evm_rpc_endpoints(network)[0].to_string(),
            default_memo: String::new(),
        }
    }

    /// Chain id as `0x`-prefixed hex, the form EIP-1193 wallets use.
    pub fn evm_chain_id_hex(&self) -> String {
        format!("0x{:x}", self.network.evm_chain_id())
    }

    /// Parameters for `wallet_addEthereumChain`.
    pub fn add_chain_params(&self) -> serde_json::Value {
        serde_json::json!({
            "chainId": self.evm_chain_id_hex(),
            "chainName": self.network.to_string(),
            "nativeCurrency": {
                "name": self.network.token_symbol(),
                "symbol": self.network.token_symbol(),
                "decimals": self.network.token_decimals(),
            },
            "rpcUrls": [self.evm_rpc_url],
            "blockExplorerUrls": [get_explorer_url(self.network)],
        })
    }

    /// Memo to use when the caller passes an empty one.
    pub fn memo_or_default<'a>(&'a self, memo: &'a str) -> &'a str {
        if memo.trim().is_empty() {
            &self.default_memo
        } else {
            memo
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_network_has_endpoints() {
        for network in Network::all() {
            assert!(!get_rest_endpoints(*network).is_empty());
            assert!(!get_evm_rpc_endpoints(*network).is_empty());
        }
    }

    #[test]
    fn test_evm_chain_id_hex() {
        assert_eq!(StakingConfig::new(Network::Mainnet).evm_chain_id_hex(), "0x2346");
        assert_eq!(StakingConfig::new(Network::Testnet).evm_chain_id_hex(), "0x2345");
    }

    #[test]
    fn test_add_chain_params() {
        let params = StakingConfig::new(Network::Mainnet).add_chain_params();
        assert_eq!(params["chainId"], "0x2346");
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
        assert_eq!(params["rpcUrls"][0], "https://rpc.qubetics.com");
    }

    #[test]
    fn test_memo_or_default() {
        let mut config = StakingConfig::new(Network::Mainnet);
        config.default_memo = "Staked via QubeNode".into();
        assert_eq!(config.memo_or_default(""), "Staked via QubeNode");
        assert_eq!(config.memo_or_default("hello"), "hello");
    }
}
