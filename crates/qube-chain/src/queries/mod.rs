//! Chain query implementations.

pub mod bank;
pub mod distribution;
pub mod slashing;
pub mod staking;

use async_trait::async_trait;
use qube_core::{Delegation, RewardEntry, UnbondingEntry};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::ChainClient;
use crate::client::NodeInfo;
use crate::error::ChainError;

const PAGE_LIMIT: &str = "200";
const MAX_PAGES: usize = 50;

/// Read surface used by the wallet backends and the orchestrator.
///
/// Addresses are bech32 account addresses; amounts are minimal-unit
/// decimal strings.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    async fn node_info(&self) -> Result<NodeInfo, ChainError>;

    /// Spendable balance of the bond denom.
    async fn balance(&self, address: &str) -> Result<String, ChainError>;

    async fn delegations(&self, address: &str) -> Result<Vec<Delegation>, ChainError>;

    async fn rewards(&self, address: &str) -> Result<Vec<RewardEntry>, ChainError>;

    async fn unbonding_delegations(&self, address: &str)
    -> Result<Vec<UnbondingEntry>, ChainError>;
}

#[async_trait]
impl ChainQuery for ChainClient {
    async fn node_info(&self) -> Result<NodeInfo, ChainError> {
        self.get_node_info().await
    }

    async fn balance(&self, address: &str) -> Result<String, ChainError> {
        self.get_balance(address, self.network().denom()).await
    }

    async fn delegations(&self, address: &str) -> Result<Vec<Delegation>, ChainError> {
        self.get_delegations(address).await
    }

    async fn rewards(&self, address: &str) -> Result<Vec<RewardEntry>, ChainError> {
        self.get_rewards(address).await
    }

    async fn unbonding_delegations(
        &self,
        address: &str,
    ) -> Result<Vec<UnbondingEntry>, ChainError> {
        self.get_unbonding_delegations(address).await
    }
}

/// A `cosmos.base.v1beta1.Coin` or `DecCoin`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Coin {
    pub denom: String,
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageResponse {
    #[serde(default)]
    pub next_key: Option<String>,
}

/// Drop the fractional part of a `DecCoin` amount.
pub(crate) fn truncate_dec(amount: &str) -> String {
    let int_part = amount.split('.').next().unwrap_or_default().trim();
    if int_part.is_empty() {
        "0".to_string()
    } else {
        int_part.to_string()
    }
}

/// Amount of `denom` in a coin list, `"0"` when absent.
pub(crate) fn amount_of(coins: &[Coin], denom: &str) -> String {
    coins
        .iter()
        .find(|c| c.denom == denom)
        .map(|c| truncate_dec(&c.amount))
        .unwrap_or_else(|| "0".to_string())
}

impl ChainClient {
    /// Follow `pagination.next_key` until the last page.
    pub(crate) async fn get_paginated<R, T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        mut take: impl FnMut(R) -> (Vec<T>, Option<String>) + Send,
    ) -> Result<Vec<T>, ChainError>
    where
        R: DeserializeOwned + Send,
        T: Send,
    {
        let mut items = Vec::new();
        let mut key: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut params: Vec<(&str, &str)> = query.to_vec();
            params.push(("pagination.limit", PAGE_LIMIT));
            if let Some(ref k) = key {
                params.push(("pagination.key", k.as_str()));
            }

            let response: R = self.get_json(path, &params).await?;
            let (mut page, next) = take(response);
            items.append(&mut page);

            match next.filter(|k| !k.is_empty()) {
                Some(next_key) => key = Some(next_key),
                None => return Ok(items),
            }
        }

        tracing::warn!(
            "Stopped paging {} after {} pages ({} items)",
            path,
            MAX_PAGES,
            items.len()
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_dec() {
        assert_eq!(truncate_dec("1234.560000000000000000"), "1234");
        assert_eq!(truncate_dec("0.999"), "0");
        assert_eq!(truncate_dec("42"), "42");
        assert_eq!(truncate_dec(".5"), "0");
        assert_eq!(truncate_dec(""), "0");
    }

    #[test]
    fn test_amount_of() {
        let coins = vec![
            Coin {
                denom: "ibc/ABC".into(),
                amount: "5".into(),
            },
            Coin {
                denom: "tics".into(),
                amount: "100.5".into(),
            },
        ];
        assert_eq!(amount_of(&coins, "tics"), "100");
        assert_eq!(amount_of(&coins, "uatom"), "0");
        assert_eq!(amount_of(&[], "tics"), "0");
    }
}
