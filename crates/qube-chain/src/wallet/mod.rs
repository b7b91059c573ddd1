//! Wallet backends.
//!
//! One [`WalletBackend`] trait with two implementations:
//! - [`NativeBackend`]: Keplr and Leap, signing Cosmos staking messages
//! - [`EvmBridgeBackend`]: MetaMask, calling the staking precompiles
//!
//! Backends always propagate read errors; the orchestrator decides what a
//! failed read means for the overview.

pub mod evm;
pub mod msgs;
pub mod native;
pub mod precompile;

use async_trait::async_trait;
use qube_core::{
    Delegation, ReadPolicy, RewardEntry, StakingOverview, TxReceipt, UnbondingEntry, WalletKind,
};

use crate::error::WalletError;

pub use evm::{Eip1193Provider, EvmBridgeBackend, ProviderError, ProviderEvent};
pub use native::{BroadcastResult, CosmosExtension, NativeBackend};

/// Optional operations a backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub redelegate: bool,
    pub cancel_unbonding: bool,
}

impl Capabilities {
    pub const FULL: Self = Self {
        redelegate: true,
        cancel_unbonding: true,
    };

    pub const BASIC: Self = Self {
        redelegate: false,
        cancel_unbonding: false,
    };
}

#[async_trait]
pub trait WalletBackend: Send + Sync {
    fn kind(&self) -> WalletKind;

    fn capabilities(&self) -> Capabilities;

    /// Ask the wallet for authorization. Returns the wallet's own address.
    async fn connect(&self) -> Result<String, WalletError>;

    /// Address as the wallet reports it.
    async fn address(&self) -> Result<String, WalletError>;

    /// Bech32 account address used for chain queries.
    async fn chain_address(&self) -> Result<String, WalletError>;

    async fn balance(&self) -> Result<String, WalletError>;

    async fn delegations(&self) -> Result<Vec<Delegation>, WalletError>;

    async fn rewards(&self) -> Result<Vec<RewardEntry>, WalletError>;

    async fn unbonding_delegations(&self) -> Result<Vec<UnbondingEntry>, WalletError>;

    async fn delegate(
        &self,
        validator: &str,
        amount: u128,
        memo: &str,
    ) -> Result<TxReceipt, WalletError>;

    async fn undelegate(
        &self,
        validator: &str,
        amount: u128,
        memo: &str,
    ) -> Result<TxReceipt, WalletError>;

    async fn claim_rewards(
        &self,
        validators: &[String],
        memo: &str,
    ) -> Result<Vec<TxReceipt>, WalletError>;

    async fn redelegate(
        &self,
        _src_validator: &str,
        _dst_validator: &str,
        _amount: u128,
        _memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        Err(WalletError::Unsupported("redelegate"))
    }

    async fn cancel_unbonding(
        &self,
        _validator: &str,
        _amount: u128,
        _creation_height: u64,
        _memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        Err(WalletError::Unsupported("cancel unbonding"))
    }

    /// Switch to another account of the same wallet. Returns the new chain address.
    async fn set_account(&self, _address: &str) -> Result<String, WalletError> {
        Err(WalletError::Unsupported("account switching"))
    }

    /// Backends with their own aggregation service return the full overview.
    async fn overview(&self, _policy: ReadPolicy) -> Result<Option<StakingOverview>, WalletError> {
        Ok(None)
    }

    /// Forget the connected account. Safe to call repeatedly.
    async fn disconnect(&self);
}

/// Resolve one read under the given policy.
///
/// Under [`ReadPolicy::Lenient`] a failure yields `fallback()` and a warning.
pub(crate) fn apply_read_policy<T, E: std::fmt::Display>(
    policy: ReadPolicy,
    what: &str,
    result: Result<T, E>,
    fallback: impl FnOnce() -> T,
) -> Result<T, E> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if policy == ReadPolicy::Lenient => {
            tracing::warn!("{} query failed, using empty value: {}", what, e);
            Ok(fallback())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_policy_propagates() {
        let result: Result<Vec<u8>, String> = Err("boom".into());
        assert_eq!(
            apply_read_policy(ReadPolicy::Strict, "delegations", result, Vec::new),
            Err("boom".to_string())
        );
    }

    #[test]
    fn test_lenient_policy_falls_back() {
        let result: Result<String, String> = Err("boom".into());
        assert_eq!(
            apply_read_policy(ReadPolicy::Lenient, "balance", result, || "0".into()),
            Ok("0".to_string())
        );
        let ok: Result<String, String> = Ok("5".into());
        assert_eq!(
            apply_read_policy(ReadPolicy::Lenient, "balance", ok, || "0".into()),
            Ok("5".to_string())
        );
    }
}
