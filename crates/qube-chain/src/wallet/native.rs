//! Native Cosmos wallets (Keplr, Leap).
//!
//! Both extensions expose the same surface: suggest the chain, enable it,
//! list the signer's accounts and sign + broadcast a set of messages.
//! Reads go straight to the REST API with the signer's bech32 address.

use std::sync::Arc;

use async_trait::async_trait;
use qube_core::{
    Delegation, Network, ReadPolicy, RewardEntry, StakingOverview, TxReceipt, UnbondingEntry,
    WalletKind,
};
use serde_json::Value;
use tokio::sync::RwLock;

use super::msgs::{Coin, Fee, StakingMsg};
use super::{Capabilities, WalletBackend, apply_read_policy};
use crate::config::StakingConfig;
use crate::error::WalletError;
use crate::queries::ChainQuery;
use crate::totals::build_overview;

/// Result of a broadcast, as reported by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BroadcastResult {
    /// Non-zero when the chain rejected the transaction.
    pub code: u32,
    pub tx_hash: String,
    pub height: u64,
    pub gas_used: u64,
    pub raw_log: String,
}

/// Host bridge to a Cosmos signing extension.
#[async_trait]
pub trait CosmosExtension: Send + Sync {
    /// Offer the chain definition to the extension.
    async fn suggest_chain(&self, network: Network) -> Result<(), WalletError>;

    async fn enable(&self, chain_id: &str) -> Result<(), WalletError>;

    /// Bech32 accounts of the offline signer for `chain_id`.
    async fn accounts(&self, chain_id: &str) -> Result<Vec<String>, WalletError>;

    async fn sign_and_broadcast(
        &self,
        chain_id: &str,
        signer: &str,
        msgs: Vec<Value>,
        fee: Fee,
        memo: &str,
    ) -> Result<BroadcastResult, WalletError>;
}

pub struct NativeBackend {
    kind: WalletKind,
    extension: Option<Arc<dyn CosmosExtension>>,
    chain: Arc<dyn ChainQuery>,
    config: StakingConfig,
    address: RwLock<Option<String>>,
}

impl NativeBackend {
    /// `extension` is `None` when the host has no such wallet installed.
    pub fn new(
        kind: WalletKind,
        extension: Option<Arc<dyn CosmosExtension>>,
        chain: Arc<dyn ChainQuery>,
        config: StakingConfig,
    ) -> Self {
        Self {
            kind,
            extension,
            chain,
            config,
            address: RwLock::new(None),
        }
    }

    fn extension(&self) -> Result<&Arc<dyn CosmosExtension>, WalletError> {
        self.extension
            .as_ref()
            .ok_or(WalletError::ProviderNotFound(self.kind))
    }

    async fn connected_address(&self) -> Result<String, WalletError> {
        self.address.read().await.clone().ok_or(WalletError::NotConnected)
    }

    async fn signer(&self) -> Result<(Arc<dyn CosmosExtension>, String), WalletError> {
        let address = self
            .address
            .read()
            .await
            .clone()
            .ok_or(WalletError::SignerNotReady)?;
        let extension = self
            .extension
            .clone()
            .ok_or(WalletError::SignerNotReady)?;
        Ok((extension, address))
    }

    fn coin(&self, amount: u128) -> Coin {
        Coin::new(self.config.network.denom(), amount)
    }

    async fn submit(
        &self,
        build: impl FnOnce(&str) -> Vec<StakingMsg>,
        gas_limit: u64,
        memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        let (extension, signer) = self.signer().await?;
        let msgs = build(&signer);
        let fee = Fee::new(
            self.config.network.denom(),
            gas_limit,
            self.config.gas.gas_price,
        );

        tracing::info!(
            "Submitting {} via {} ({})",
            msgs.iter().map(|m| m.type_url()).collect::<Vec<_>>().join(", "),
            self.kind,
            signer
        );

        let encoded = msgs.iter().map(StakingMsg::to_encode_object).collect();
        let result = extension
            .sign_and_broadcast(self.config.network.chain_id(), &signer, encoded, fee, memo)
            .await?;

        if result.code != 0 {
            tracing::warn!("Transaction {} failed: {}", result.tx_hash, result.raw_log);
            let reason = format!("code {}: {}", result.code, result.raw_log);
            // height 0: rejected by CheckTx, never included
            if result.height == 0 {
                return Err(WalletError::Transaction(reason));
            }
            return Err(WalletError::Reverted {
                tx_hash: result.tx_hash,
                reason,
            });
        }

        tracing::info!("Transaction {} included at {}", result.tx_hash, result.height);
        Ok(TxReceipt {
            tx_hash: result.tx_hash,
            height: Some(result.height),
            gas_used: Some(result.gas_used),
        })
    }

    /// Fetch everything the dashboard shows in one pass.
    pub async fn load_overview(&self, policy: ReadPolicy) -> Result<StakingOverview, WalletError> {
        let address = self.connected_address().await?;
        let (balance, delegations, rewards, unbonding) = futures::join!(
            self.chain.balance(&address),
            self.chain.delegations(&address),
            self.chain.rewards(&address),
            self.chain.unbonding_delegations(&address),
        );

        Ok(build_overview(
            apply_read_policy(policy, "balance", balance, || "0".to_string())?,
            apply_read_policy(policy, "delegations", delegations, Vec::new)?,
            apply_read_policy(policy, "rewards", rewards, Vec::new)?,
            apply_read_policy(policy, "unbonding", unbonding, Vec::new)?,
        ))
    }
}

#[async_trait]
impl WalletBackend for NativeBackend {
    fn kind(&self) -> WalletKind {
        self.kind
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FULL
    }

    async fn connect(&self) -> Result<String, WalletError> {
        let extension = self.extension()?;
        let network = self.config.network;
        let chain_id = network.chain_id();

        match extension.suggest_chain(network).await {
            Ok(()) => {}
            Err(WalletError::UserRejected) => return Err(WalletError::UserRejected),
            Err(e) => tracing::warn!("{} did not accept chain suggestion: {}", self.kind, e),
        }

        extension.enable(chain_id).await?;
        let address = extension
            .accounts(chain_id)
            .await?
            .into_iter()
            .next()
            .ok_or(WalletError::UserRejected)?;

        let (prefix, _) = qube_core::address::decode(&address)?;
        if prefix != network.bech32_prefix() {
            return Err(WalletError::NetworkMismatch(format!(
                "{} account {} is not a {} address",
                self.kind, address, network
            )));
        }

        tracing::info!("Connected {} account {}", self.kind, address);
        *self.address.write().await = Some(address.clone());
        Ok(address)
    }

    async fn address(&self) -> Result<String, WalletError> {
        self.connected_address().await
    }

    async fn chain_address(&self) -> Result<String, WalletError> {
        self.connected_address().await
    }

    async fn balance(&self) -> Result<String, WalletError> {
        let address = self.connected_address().await?;
        Ok(self.chain.balance(&address).await?)
    }

    async fn delegations(&self) -> Result<Vec<Delegation>, WalletError> {
        let address = self.connected_address().await?;
        Ok(self.chain.delegations(&address).await?)
    }

    async fn rewards(&self) -> Result<Vec<RewardEntry>, WalletError> {
        let address = self.connected_address().await?;
        Ok(self.chain.rewards(&address).await?)
    }

    async fn unbonding_delegations(&self) -> Result<Vec<UnbondingEntry>, WalletError> {
        let address = self.connected_address().await?;
        Ok(self.chain.unbonding_delegations(&address).await?)
    }

    async fn delegate(
        &self,
        validator: &str,
        amount: u128,
        memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        let amount = self.coin(amount);
        self.submit(
            |delegator| {
                vec![StakingMsg::Delegate {
                    delegator: delegator.to_string(),
                    validator: validator.to_string(),
                    amount,
                }]
            },
            self.config.gas.delegate,
            memo,
        )
        .await
    }

    async fn undelegate(
        &self,
        validator: &str,
        amount: u128,
        memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        let amount = self.coin(amount);
        self.submit(
            |delegator| {
                vec![StakingMsg::Undelegate {
                    delegator: delegator.to_string(),
                    validator: validator.to_string(),
                    amount,
                }]
            },
            self.config.gas.undelegate,
            memo,
        )
        .await
    }

    async fn claim_rewards(
        &self,
        validators: &[String],
        memo: &str,
    ) -> Result<Vec<TxReceipt>, WalletError> {
        if validators.is_empty() {
            self.signer().await?;
            return Ok(Vec::new());
        }
        let gas = self.config.gas.claim.saturating_mul(validators.len() as u64);
        let receipt = self
            .submit(
                |delegator| {
                    validators
                        .iter()
                        .map(|v| StakingMsg::WithdrawReward {
                            delegator: delegator.to_string(),
                            validator: v.clone(),
                        })
                        .collect()
                },
                gas,
                memo,
            )
            .await?;
        Ok(vec![receipt])
    }

    async fn redelegate(
        &self,
        src_validator: &str,
        dst_validator: &str,
        amount: u128,
        memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        let amount = self.coin(amount);
        self.submit(
            |delegator| {
                vec![StakingMsg::BeginRedelegate {
                    delegator: delegator.to_string(),
                    src_validator: src_validator.to_string(),
                    dst_validator: dst_validator.to_string(),
                    amount,
                }]
            },
            self.config.gas.redelegate,
            memo,
        )
        .await
    }

    async fn cancel_unbonding(
        &self,
        validator: &str,
        amount: u128,
        creation_height: u64,
        memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        let amount = self.coin(amount);
        self.submit(
            |delegator| {
                vec![StakingMsg::CancelUnbonding {
                    delegator: delegator.to_string(),
                    validator: validator.to_string(),
                    amount,
                    creation_height,
                }]
            },
            self.config.gas.cancel_unbonding,
            memo,
        )
        .await
    }

    async fn overview(&self, policy: ReadPolicy) -> Result<Option<StakingOverview>, WalletError> {
        self.load_overview(policy).await.map(Some)
    }

    async fn disconnect(&self) {
        if self.address.write().await.take().is_some() {
            tracing::info!("Disconnected {}", self.kind);
        }
    }
}
