//! Staking module queries.

use base64::Engine;
use chrono::{DateTime, Utc};
use qube_core::{Delegation, UnbondingEntry, parse_minimal};
use serde::Deserialize;

use super::{Coin, PageResponse};
use crate::ChainClient;
use crate::error::ChainError;

/// Bond status of a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondStatus {
    Bonded,
    Unbonding,
    Unbonded,
    Unspecified,
}

impl BondStatus {
    /// Value of the `status` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            BondStatus::Bonded => "BOND_STATUS_BONDED",
            BondStatus::Unbonding => "BOND_STATUS_UNBONDING",
            BondStatus::Unbonded => "BOND_STATUS_UNBONDED",
            BondStatus::Unspecified => "BOND_STATUS_UNSPECIFIED",
        }
    }

    fn from_query(s: &str) -> Self {
        match s {
            "BOND_STATUS_BONDED" => BondStatus::Bonded,
            "BOND_STATUS_UNBONDING" => BondStatus::Unbonding,
            "BOND_STATUS_UNBONDED" => BondStatus::Unbonded,
            _ => BondStatus::Unspecified,
        }
    }
}

/// Validator data from chain.
#[derive(Debug, Clone)]
pub struct ValidatorInfo {
    pub operator_address: String,
    /// Raw ed25519 consensus public key, when the node exposes it.
    pub consensus_pubkey: Option<Vec<u8>>,
    pub moniker: String,
    pub website: String,
    pub details: String,
    pub jailed: bool,
    pub status: BondStatus,
    /// Bonded tokens in minimal units.
    pub tokens: u128,
    /// Commission rate as a fraction (0.0 to 1.0).
    pub commission: f64,
    pub max_commission: f64,
    pub min_self_delegation: u128,
}

/// Bonded and not-bonded token supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StakingPool {
    pub bonded: u128,
    pub not_bonded: u128,
}

// ==================== Response types ====================

#[derive(Debug, Deserialize)]
struct DelegationsResponse {
    #[serde(default)]
    delegation_responses: Vec<DelegationResponse>,
    #[serde(default)]
    pagination: Option<PageResponse>,
}

#[derive(Debug, Deserialize)]
struct DelegationResponse {
    delegation: DelegationBody,
    #[serde(default)]
    balance: Option<Coin>,
}

#[derive(Debug, Deserialize)]
struct DelegationBody {
    validator_address: String,
}

#[derive(Debug, Deserialize)]
struct UnbondingResponse {
    #[serde(default)]
    unbonding_responses: Vec<UnbondingDelegation>,
    #[serde(default)]
    pagination: Option<PageResponse>,
}

#[derive(Debug, Deserialize)]
struct UnbondingDelegation {
    validator_address: String,
    #[serde(default)]
    entries: Vec<RawUnbondingEntry>,
}

#[derive(Debug, Deserialize)]
struct RawUnbondingEntry {
    #[serde(default)]
    creation_height: String,
    #[serde(default)]
    completion_time: String,
    #[serde(default)]
    balance: String,
}

#[derive(Debug, Deserialize)]
struct ValidatorsResponse {
    #[serde(default)]
    validators: Vec<RawValidator>,
    #[serde(default)]
    pagination: Option<PageResponse>,
}

#[derive(Debug, Deserialize)]
struct ValidatorResponse {
    validator: RawValidator,
}

#[derive(Debug, Deserialize)]
struct RawValidator {
    operator_address: String,
    #[serde(default)]
    consensus_pubkey: Option<RawPubKey>,
    #[serde(default)]
    jailed: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    tokens: String,
    #[serde(default)]
    description: RawDescription,
    #[serde(default)]
    commission: Option<RawCommission>,
    #[serde(default)]
    min_self_delegation: String,
}

#[derive(Debug, Deserialize)]
struct RawPubKey {
    #[serde(default)]
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawDescription {
    #[serde(default)]
    moniker: String,
    #[serde(default)]
    website: String,
    #[serde(default)]
    details: String,
}

#[derive(Debug, Deserialize)]
struct RawCommission {
    commission_rates: RawCommissionRates,
}

#[derive(Debug, Deserialize)]
struct RawCommissionRates {
    #[serde(default)]
    rate: String,
    #[serde(default)]
    max_rate: String,
}

#[derive(Debug, Deserialize)]
struct PoolResponse {
    pool: RawPool,
}

#[derive(Debug, Deserialize)]
struct RawPool {
    #[serde(default)]
    bonded_tokens: String,
    #[serde(default)]
    not_bonded_tokens: String,
}

// ==================== Conversions ====================

fn next_key(pagination: Option<PageResponse>) -> Option<String> {
    pagination.and_then(|p| p.next_key)
}

fn parse_delegations(response: DelegationsResponse) -> (Vec<Delegation>, Option<String>) {
    let delegations = response
        .delegation_responses
        .into_iter()
        .map(|d| Delegation {
            validator_address: d.delegation.validator_address,
            amount: d.balance.map(|b| b.amount).unwrap_or_default(),
        })
        .collect();
    (delegations, next_key(response.pagination))
}

fn parse_completion_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| tracing::debug!("Unparseable completion time '{}': {}", raw, e))
        .ok()
}

fn parse_unbonding(response: UnbondingResponse) -> (Vec<UnbondingEntry>, Option<String>) {
    let entries = response
        .unbonding_responses
        .into_iter()
        .flat_map(|u| {
            let validator = u.validator_address;
            u.entries.into_iter().map(move |e| UnbondingEntry {
                validator_address: validator.clone(),
                amount: e.balance,
                completion_time: parse_completion_time(&e.completion_time),
                creation_height: e.creation_height.parse().unwrap_or(0),
            })
        })
        .collect();
    (entries, next_key(response.pagination))
}

/// Parse an `sdk.Dec` string such as `"0.050000000000000000"`.
fn parse_dec(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

fn parse_validator(raw: RawValidator) -> ValidatorInfo {
    let consensus_pubkey = raw.consensus_pubkey.and_then(|pk| {
        base64::engine::general_purpose::STANDARD
            .decode(pk.key.as_bytes())
            .ok()
    });
    let (commission, max_commission) = raw
        .commission
        .map(|c| {
            (
                parse_dec(&c.commission_rates.rate),
                parse_dec(&c.commission_rates.max_rate),
            )
        })
        .unwrap_or((0.0, 0.0));

    ValidatorInfo {
        operator_address: raw.operator_address,
        consensus_pubkey,
        moniker: raw.description.moniker,
        website: raw.description.website,
        details: raw.description.details,
        jailed: raw.jailed,
        status: BondStatus::from_query(&raw.status),
        tokens: parse_minimal(&raw.tokens).unwrap_or(0),
        commission,
        max_commission,
        min_self_delegation: parse_minimal(&raw.min_self_delegation).unwrap_or(0),
    }
}

fn parse_validators(response: ValidatorsResponse) -> (Vec<ValidatorInfo>, Option<String>) {
    let validators = response
        .validators
        .into_iter()
        .map(parse_validator)
        .collect();
    (validators, next_key(response.pagination))
}

impl ChainClient {
    /// Get all delegations of an account.
    pub async fn get_delegations(&self, delegator: &str) -> Result<Vec<Delegation>, ChainError> {
        let path = format!("/cosmos/staking/v1beta1/delegations/{delegator}");
        self.get_paginated(&path, &[], parse_delegations).await
    }

    /// Get all unbonding entries of an account, flattened across validators.
    pub async fn get_unbonding_delegations(
        &self,
        delegator: &str,
    ) -> Result<Vec<UnbondingEntry>, ChainError> {
        let path = format!("/cosmos/staking/v1beta1/delegators/{delegator}/unbonding_delegations");
        self.get_paginated(&path, &[], parse_unbonding).await
    }

    /// Get validators, optionally filtered by bond status.
    pub async fn get_validators(
        &self,
        status: Option<BondStatus>,
    ) -> Result<Vec<ValidatorInfo>, ChainError> {
        let query: Vec<(&str, &str)> = status
            .map(|s| vec![("status", s.as_query())])
            .unwrap_or_default();
        let validators = self
            .get_paginated("/cosmos/staking/v1beta1/validators", &query, parse_validators)
            .await?;
        tracing::debug!("Fetched {} validators", validators.len());
        Ok(validators)
    }

    /// Get a single validator by operator address.
    pub async fn get_validator(&self, operator_address: &str) -> Result<ValidatorInfo, ChainError> {
        let path = format!("/cosmos/staking/v1beta1/validators/{operator_address}");
        let response: ValidatorResponse = self.get_json(&path, &[]).await?;
        Ok(parse_validator(response.validator))
    }

    /// Get the bonded / not-bonded token pool.
    pub async fn get_staking_pool(&self) -> Result<StakingPool, ChainError> {
        let response: PoolResponse = self.get_json("/cosmos/staking/v1beta1/pool", &[]).await?;
        Ok(StakingPool {
            bonded: parse_minimal(&response.pool.bonded_tokens).unwrap_or(0),
            not_bonded: parse_minimal(&response.pool.not_bonded_tokens).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_delegations() {
        let json = r#"{
            "delegation_responses": [
                {
                    "delegation": {
                        "delegator_address": "qubetics1xyz",
                        "validator_address": "qubeticsvaloper1aaa",
                        "shares": "100.000000000000000000"
                    },
                    "balance": {"denom": "tics", "amount": "100"}
                },
                {
                    "delegation": {
                        "delegator_address": "qubetics1xyz",
                        "validator_address": "qubeticsvaloper1bbb",
                        "shares": "250.000000000000000000"
                    }
                }
            ],
            "pagination": {"next_key": "AQID", "total": "3"}
        }"#;
        let response: DelegationsResponse = serde_json::from_str(json).unwrap();
        let (delegations, next) = parse_delegations(response);
        assert_eq!(
            delegations,
            vec![
                Delegation {
                    validator_address: "qubeticsvaloper1aaa".into(),
                    amount: "100".into(),
                },
                Delegation {
                    validator_address: "qubeticsvaloper1bbb".into(),
                    amount: String::new(),
                },
            ]
        );
        assert_eq!(next.as_deref(), Some("AQID"));
    }

    #[test]
    fn test_parse_unbonding_flattens_entries() {
        let json = r#"{
            "unbonding_responses": [
                {
                    "delegator_address": "qubetics1xyz",
                    "validator_address": "qubeticsvaloper1aaa",
                    "entries": [
                        {
                            "creation_height": "1200",
                            "completion_time": "2026-11-01T10:00:00.123456789Z",
                            "initial_balance": "50",
                            "balance": "50"
                        },
                        {
                            "creation_height": "1300",
                            "completion_time": "not a time",
                            "initial_balance": "70",
                            "balance": "60"
                        }
                    ]
                }
            ],
            "pagination": {"next_key": null, "total": "1"}
        }"#;
        let response: UnbondingResponse = serde_json::from_str(json).unwrap();
        let (entries, next) = parse_unbonding(response);
        assert!(next.is_none());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].validator_address, "qubeticsvaloper1aaa");
        assert_eq!(entries[0].amount, "50");
        assert_eq!(entries[0].creation_height, 1200);
        assert_eq!(
            entries[0].completion_time.unwrap().to_rfc3339(),
            "2026-11-01T10:00:00.123456789+00:00"
        );
        assert_eq!(entries[1].amount, "60");
        assert!(entries[1].completion_time.is_none());
    }

    #[test]
    fn test_parse_validator() {
        let json = r#"{
            "validator": {
                "operator_address": "qubeticsvaloper1aaa",
                "consensus_pubkey": {
                    "@type": "/cosmos.crypto.ed25519.PubKey",
                    "key": "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8="
                },
                "jailed": false,
                "status": "BOND_STATUS_BONDED",
                "tokens": "5000000000000000000000",
                "delegator_shares": "5000000000000000000000.000000000000000000",
                "description": {"moniker": "QubeNode", "identity": "", "website": "https://qubenode.space", "details": ""},
                "commission": {
                    "commission_rates": {"rate": "0.050000000000000000", "max_rate": "0.200000000000000000", "max_change_rate": "0.010000000000000000"},
                    "update_time": "2025-01-01T00:00:00Z"
                },
                "min_self_delegation": "1"
            }
        }"#;
        let response: ValidatorResponse = serde_json::from_str(json).unwrap();
        let v = parse_validator(response.validator);
        assert_eq!(v.moniker, "QubeNode");
        assert_eq!(v.status, BondStatus::Bonded);
        assert_eq!(v.tokens, 5_000_000_000_000_000_000_000);
        assert!((v.commission - 0.05).abs() < 1e-9);
        assert!((v.max_commission - 0.2).abs() < 1e-9);
        assert_eq!(v.consensus_pubkey.unwrap(), (0u8..32).collect::<Vec<_>>());
        assert_eq!(v.min_self_delegation, 1);
    }

    #[test]
    fn test_parse_validator_minimal_fields() {
        let json = r#"{"validators": [{"operator_address": "qubeticsvaloper1bbb", "jailed": true}]}"#;
        let response: ValidatorsResponse = serde_json::from_str(json).unwrap();
        let (validators, next) = parse_validators(response);
        assert!(next.is_none());
        assert_eq!(validators.len(), 1);
        assert!(validators[0].jailed);
        assert_eq!(validators[0].status, BondStatus::Unspecified);
        assert_eq!(validators[0].tokens, 0);
        assert!(validators[0].consensus_pubkey.is_none());
    }

    #[test]
    fn test_parse_pool() {
        let json = r#"{"pool": {"not_bonded_tokens": "10", "bonded_tokens": "90"}}"#;
        let response: PoolResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parse_minimal(&response.pool.bonded_tokens), Some(90));
        assert_eq!(parse_minimal(&response.pool.not_bonded_tokens), Some(10));
    }

    #[test]
    fn test_bond_status_query_round_trip() {
        for status in [
            BondStatus::Bonded,
            BondStatus::Unbonding,
            BondStatus::Unbonded,
            BondStatus::Unspecified,
        ] {
            assert_eq!(BondStatus::from_query(status.as_query()), status);
        }
    }
}
