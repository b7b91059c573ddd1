//! Core domain types for the QubeNode staking client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator address of the QubeNode validator.
pub const QUBENODE_OPERATOR: &str = "qubeticsvaloper15mner98f4u6nj0fvukucw2nvgfd8zecunfzhhp";

/// Minimum delegation accepted by the QubeNode validator, in whole tokens.
pub const DEFAULT_MIN_DELEGATION: &str = "1";

/// Supported networks - exhaustive match required (no default case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn token_symbol(&self) -> &'static str {
        match self {
            Network::Mainnet => "TICS",
            Network::Testnet => "TICS",
        }
    }

    /// Base denomination used by the bank module.
    pub fn denom(&self) -> &'static str {
        match self {
            Network::Mainnet => "tics",
            Network::Testnet => "tics",
        }
    }

    pub fn token_decimals(&self) -> u8 {
        18
    }

    /// Human-readable part of account addresses.
    pub fn bech32_prefix(&self) -> &'static str {
        "qubetics"
    }

    /// Cosmos chain id.
    pub fn chain_id(&self) -> &'static str {
        match self {
            Network::Mainnet => "qubetics_9030-1",
            Network::Testnet => "qubetics_9029-1",
        }
    }

    /// EIP-155 chain id of the EVM side.
    pub fn evm_chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 9030,
            Network::Testnet => 9029,
        }
    }

    /// Returns all known networks.
    pub fn all() -> &'static [Network] {
        &[Network::Mainnet, Network::Testnet]
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "Qubetics Mainnet"),
            Network::Testnet => write!(f, "Qubetics Testnet"),
        }
    }
}

/// Wallet integration used for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    /// Keplr browser extension (native Cosmos signing).
    Keplr,
    /// Leap browser extension (native Cosmos signing).
    Leap,
    /// MetaMask, routed through the EVM staking precompiles.
    MetaMask,
}

impl WalletKind {
    pub fn label(&self) -> &'static str {
        match self {
            WalletKind::Keplr => "Keplr",
            WalletKind::Leap => "Leap",
            WalletKind::MetaMask => "MetaMask",
        }
    }

    /// True for the EVM bridge variant.
    pub fn is_evm(&self) -> bool {
        matches!(self, WalletKind::MetaMask)
    }

    pub fn all() -> &'static [WalletKind] {
        &[WalletKind::Keplr, WalletKind::Leap, WalletKind::MetaMask]
    }
}

impl std::fmt::Display for WalletKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a wallet kind string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown wallet type '{0}'. Valid options: keplr, leap, metamask")]
pub struct UnknownWalletKind(pub String);

impl std::str::FromStr for WalletKind {
    type Err = UnknownWalletKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keplr" => Ok(WalletKind::Keplr),
            "leap" => Ok(WalletKind::Leap),
            "metamask" | "evm" => Ok(WalletKind::MetaMask),
            _ => Err(UnknownWalletKind(s.to_string())),
        }
    }
}

/// The active wallet session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub wallet_kind: WalletKind,
    /// Address as reported by the wallet (bech32 for native, `0x` hex for EVM).
    pub address: String,
    /// Chain-native bech32 address used for queries.
    pub chain_address: String,
    pub connected: bool,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// A delegation from the session account to one validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Delegation {
    pub validator_address: String,
    /// Minimal units, decimal string.
    #[serde(default)]
    pub amount: String,
}

/// Pending reward from one validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardEntry {
    pub validator_address: String,
    /// Minimal units, decimal string (fractional part of the DecCoin dropped).
    #[serde(default)]
    pub amount: String,
}

/// One unbonding entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnbondingEntry {
    pub validator_address: String,
    /// Minimal units, decimal string.
    #[serde(default)]
    pub amount: String,
    pub completion_time: Option<DateTime<Utc>>,
    /// Block height the unbonding started at; required to cancel it.
    pub creation_height: u64,
}

/// Aggregate staking view of the session account.
///
/// Always rebuilt from chain data in one piece; never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingOverview {
    pub balance: String,
    pub total_delegated: String,
    pub total_rewards: String,
    pub total_unbonding: String,
    pub delegations: Vec<Delegation>,
    pub rewards: Vec<RewardEntry>,
    pub unbonding: Vec<UnbondingEntry>,
}

impl Default for StakingOverview {
    fn default() -> Self {
        Self {
            balance: "0".to_string(),
            total_delegated: "0".to_string(),
            total_rewards: "0".to_string(),
            total_unbonding: "0".to_string(),
            delegations: Vec::new(),
            rewards: Vec::new(),
            unbonding: Vec::new(),
        }
    }
}

impl StakingOverview {
    /// Delegation to a given validator, if any.
    pub fn delegation_to(&self, validator: &str) -> Option<&Delegation> {
        self.delegations
            .iter()
            .find(|d| d.validator_address == validator)
    }

    /// Validators with a pending reward.
    pub fn reward_validators(&self) -> Vec<String> {
        self.rewards
            .iter()
            .map(|r| r.validator_address.clone())
            .collect()
    }
}

/// Static configuration of the validator this client stakes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub operator_address: String,
    /// Minimum delegation in whole tokens (human units).
    pub min_delegation: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            operator_address: QUBENODE_OPERATOR.to_string(),
            min_delegation: DEFAULT_MIN_DELEGATION.to_string(),
        }
    }
}

/// How failed read queries are reported while building an overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadPolicy {
    /// Any failed query fails the whole refresh.
    #[default]
    Strict,
    /// A failed query contributes an empty/zero value and is logged.
    Lenient,
}

/// Result of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub height: Option<u64>,
    pub gas_used: Option<u64>,
}
