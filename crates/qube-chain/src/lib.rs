pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod queries;
pub mod staking;
pub mod stats;
pub mod store;
pub mod totals;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::JsonRpcProvider;
pub use client::*;
pub use config::*;
pub use error::*;
pub use queries::ChainQuery;
pub use queries::slashing::SigningInfo;
pub use queries::staking::{BondStatus, StakingPool, ValidatorInfo};
pub use staking::{OrchestratorState, StakingOrchestrator, WalletProviders};
pub use store::{MemoryStore, SessionStore};
#[cfg(feature = "persistence")]
pub use store::ConfigStore;
pub use totals::{
    build_overview, calculate_total_delegated, calculate_total_rewards, calculate_total_unbonding,
};
pub use wallet::{
    BroadcastResult, CosmosExtension, Eip1193Provider, EvmBridgeBackend, NativeBackend,
    ProviderError, ProviderEvent, WalletBackend,
};
