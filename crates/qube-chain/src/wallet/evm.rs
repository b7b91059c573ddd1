//! MetaMask through the EVM precompile bridge.
//!
//! The wallet only knows its `0x` account. Reads use the bech32 form of the
//! same 20 bytes; writes are `eth_sendTransaction` calls to the staking and
//! distribution precompiles, confirmed by polling for the receipt.

use std::sync::Arc;

use async_trait::async_trait;
use qube_core::{
    Delegation, RewardEntry, TxReceipt, UnbondingEntry, WalletKind, evm_to_bech32,
};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use super::precompile;
use super::{Capabilities, WalletBackend};
use crate::config::{DISTRIBUTION_PRECOMPILE, STAKING_PRECOMPILE, StakingConfig};
use crate::error::WalletError;
use crate::queries::ChainQuery;

/// User declined the request.
pub const USER_REJECTED: i64 = 4001;
/// Chain not added to the wallet yet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Error object returned by an EIP-1193 `request`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ProviderError> for WalletError {
    fn from(e: ProviderError) -> Self {
        if e.code == USER_REJECTED {
            WalletError::UserRejected
        } else {
            WalletError::Provider {
                code: e.code,
                message: e.message,
            }
        }
    }
}

/// Events an EIP-1193 provider emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    /// New chain id, `0x` hex.
    ChainChanged(String),
}

/// An injected EVM provider (`window.ethereum` or a JSON-RPC endpoint).
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

#[derive(Debug, Clone)]
struct EvmAccount {
    evm: String,
    bech32: String,
}

pub struct EvmBridgeBackend {
    provider: Arc<dyn Eip1193Provider>,
    chain: Arc<dyn ChainQuery>,
    config: StakingConfig,
    account: RwLock<Option<EvmAccount>>,
}

/// Parse a `0x` hex quantity.
pub(crate) fn parse_quantity(value: &Value) -> Option<u64> {
    let s = value.as_str()?;
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok()
}

impl EvmBridgeBackend {
    pub fn new(
        provider: Arc<dyn Eip1193Provider>,
        chain: Arc<dyn ChainQuery>,
        config: StakingConfig,
    ) -> Self {
        Self {
            provider,
            chain,
            config,
            account: RwLock::new(None),
        }
    }

    fn account_for(&self, evm: &str) -> Result<EvmAccount, WalletError> {
        let evm = evm.to_lowercase();
        let bech32 = evm_to_bech32(&evm, self.config.network.bech32_prefix())?;
        Ok(EvmAccount { evm, bech32 })
    }

    async fn current(&self) -> Result<EvmAccount, WalletError> {
        self.account.read().await.clone().ok_or(WalletError::NotConnected)
    }

    async fn signer(&self) -> Result<EvmAccount, WalletError> {
        self.account
            .read()
            .await
            .clone()
            .ok_or(WalletError::SignerNotReady)
    }

    async fn chain_id(&self) -> Result<Option<u64>, WalletError> {
        let value = self.provider.request("eth_chainId", json!([])).await?;
        Ok(parse_quantity(&value))
    }

    /// Make sure the wallet is on the target chain, adding it if unknown.
    async fn ensure_network(&self) -> Result<(), WalletError> {
        let target = self.config.network.evm_chain_id();
        if self.chain_id().await? == Some(target) {
            return Ok(());
        }

        let chain_id_hex = self.config.evm_chain_id_hex();
        tracing::info!("Switching wallet to chain {}", chain_id_hex);

        let switched = self
            .provider
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": chain_id_hex }]),
            )
            .await;

        match switched {
            Ok(_) => {}
            Err(e) if e.code == USER_REJECTED => return Err(WalletError::UserRejected),
            Err(e) if e.code == UNRECOGNIZED_CHAIN => {
                tracing::info!("Chain {} unknown to wallet, adding it", chain_id_hex);
                match self
                    .provider
                    .request("wallet_addEthereumChain", json!([self.config.add_chain_params()]))
                    .await
                {
                    Ok(_) => {}
                    Err(e) if e.code == USER_REJECTED => return Err(WalletError::UserRejected),
                    Err(e) => return Err(WalletError::NetworkMismatch(e.message)),
                }
            }
            Err(e) => return Err(WalletError::NetworkMismatch(e.message)),
        }

        match self.chain_id().await? {
            Some(id) if id == target => Ok(()),
            other => Err(WalletError::NetworkMismatch(format!(
                "wallet is on chain {:?}, expected {}",
                other, target
            ))),
        }
    }

    /// Send a precompile call and wait for it to be mined.
    async fn send_call(
        &self,
        from: &str,
        to: &str,
        data: Vec<u8>,
        gas_limit: u64,
        memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        if !memo.is_empty() {
            tracing::debug!("Memo '{}' not carried by precompile calls", memo);
        }
        let tx = json!({
            "from": from,
            "to": to,
            "data": format!("0x{}", hex::encode(data)),
            "gas": format!("0x{:x}", gas_limit),
        });

        let hash = self
            .provider
            .request("eth_sendTransaction", json!([tx]))
            .await?;
        let hash = hash
            .as_str()
            .ok_or_else(|| WalletError::Transaction(format!("unexpected tx hash {hash}")))?
            .to_string();

        tracing::info!("Submitted {} to {}", hash, to);
        self.wait_for_receipt(&hash).await
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<TxReceipt, WalletError> {
        let polling = self.config.receipt_polling;
        for attempt in 0..polling.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(polling.interval).await;
            }
            let receipt = self
                .provider
                .request("eth_getTransactionReceipt", json!([hash]))
                .await
                .map_err(|e| WalletError::Unconfirmed {
                    tx_hash: hash.to_string(),
                    message: e.to_string(),
                })?;
            if receipt.is_null() {
                continue;
            }

            if receipt.get("status").and_then(Value::as_str) == Some("0x0") {
                tracing::warn!("Transaction {} reverted", hash);
                return Err(WalletError::Reverted {
                    tx_hash: hash.to_string(),
                    reason: "execution reverted".to_string(),
                });
            }

            let height = receipt.get("blockNumber").and_then(parse_quantity);
            tracing::info!("Transaction {} mined at {:?}", hash, height);
            return Ok(TxReceipt {
                tx_hash: hash.to_string(),
                height,
                gas_used: receipt.get("gasUsed").and_then(parse_quantity),
            });
        }

        Err(WalletError::ReceiptTimeout(hash.to_string()))
    }
}

#[async_trait]
impl WalletBackend for EvmBridgeBackend {
    fn kind(&self) -> WalletKind {
        WalletKind::MetaMask
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::BASIC
    }

    async fn connect(&self) -> Result<String, WalletError> {
        let accounts = self
            .provider
            .request("eth_requestAccounts", json!([]))
            .await?;
        let evm = accounts
            .as_array()
            .and_then(|a| a.first())
            .and_then(Value::as_str)
            .ok_or(WalletError::UserRejected)?
            .to_string();

        self.ensure_network().await?;

        let account = self.account_for(&evm)?;
        tracing::info!("Connected MetaMask account {} ({})", account.evm, account.bech32);
        let evm = account.evm.clone();
        *self.account.write().await = Some(account);
        Ok(evm)
    }

    async fn address(&self) -> Result<String, WalletError> {
        Ok(self.current().await?.evm)
    }

    async fn chain_address(&self) -> Result<String, WalletError> {
        Ok(self.current().await?.bech32)
    }

    async fn balance(&self) -> Result<String, WalletError> {
        let account = self.current().await?;
        Ok(self.chain.balance(&account.bech32).await?)
    }

    async fn delegations(&self) -> Result<Vec<Delegation>, WalletError> {
        let account = self.current().await?;
        Ok(self.chain.delegations(&account.bech32).await?)
    }

    async fn rewards(&self) -> Result<Vec<RewardEntry>, WalletError> {
        let account = self.current().await?;
        Ok(self.chain.rewards(&account.bech32).await?)
    }

    async fn unbonding_delegations(&self) -> Result<Vec<UnbondingEntry>, WalletError> {
        let account = self.current().await?;
        Ok(self.chain.unbonding_delegations(&account.bech32).await?)
    }

    async fn delegate(
        &self,
        validator: &str,
        amount: u128,
        memo: &str,
    ) -> Result<TxReceipt, WalletError> {
        let account = self.signer().await?;
        let data = precompile::delegate_call(&account.evm, validator, amount)?;
        self.send_call(
            &account.evm,
            STAKING_PRECOMPILE,
            data,
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
        let account = self.signer().await?;
        let data = precompile::undelegate_call(&account.evm, validator, amount)?;
        self.send_call(
            &account.evm,
            STAKING_PRECOMPILE,
            data,
            self.config.gas.undelegate,
            memo,
        )
        .await
    }

    /// One precompile call per validator; stops at the first failure.
    ///
    /// A failure after some claims went through is a
    /// [`WalletError::PartialClaim`] carrying their receipts.
    async fn claim_rewards(
        &self,
        validators: &[String],
        memo: &str,
    ) -> Result<Vec<TxReceipt>, WalletError> {
        let account = self.signer().await?;
        let mut receipts = Vec::with_capacity(validators.len());
        for validator in validators {
            let sent = match precompile::withdraw_reward_call(&account.evm, validator) {
                Ok(data) => {
                    self.send_call(
                        &account.evm,
                        DISTRIBUTION_PRECOMPILE,
                        data,
                        self.config.gas.claim,
                        memo,
                    )
                    .await
                }
                Err(e) => Err(e.into()),
            };

            match sent {
                Ok(receipt) => receipts.push(receipt),
                Err(e) if receipts.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Claim from {} failed after {} confirmed claim(s): {}",
                        validator,
                        receipts.len(),
                        e
                    );
                    return Err(WalletError::PartialClaim {
                        receipts,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(receipts)
    }

    async fn set_account(&self, address: &str) -> Result<String, WalletError> {
        let account = self.account_for(address)?;
        tracing::info!("MetaMask account changed to {}", account.evm);
        let bech32 = account.bech32.clone();
        *self.account.write().await = Some(account);
        Ok(bech32)
    }

    async fn disconnect(&self) {
        if self.account.write().await.take().is_some() {
            tracing::info!("Disconnected MetaMask");
        }
    }
}
