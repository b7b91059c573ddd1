//! Display types for frontends.
//!
//! Frontends only read these; every value is derived from a chain snapshot.

use serde::{Deserialize, Serialize};

use crate::types::StakingOverview;
use crate::units::{format_units, parse_minimal};

/// Validator information for listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayValidator {
    /// Bech32 operator address.
    pub operator_address: String,
    /// Moniker from the validator description.
    pub moniker: Option<String>,
    /// Commission rate as a fraction (0.0 to 1.0).
    pub commission: f64,
    pub jailed: bool,
    /// Bonded tokens in minimal units.
    pub tokens: u128,
    /// Share of the bonded pool (0.0 to 1.0).
    pub voting_power_share: f64,
    /// Missed blocks in the current signing window, when known.
    pub missed_blocks: Option<u64>,
}

impl DisplayValidator {
    /// Returns the commission as a percentage.
    pub fn commission_percent(&self) -> f64 {
        self.commission * 100.0
    }

    /// Returns the voting power as a percentage.
    pub fn voting_power_percent(&self) -> f64 {
        self.voting_power_share * 100.0
    }

    /// Returns the moniker or a truncated address if no moniker is set.
    pub fn display_name(&self) -> &str {
        match self.moniker.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                if self.operator_address.len() > 24 {
                    &self.operator_address[..24]
                } else {
                    &self.operator_address
                }
            }
        }
    }
}

/// Parsed totals of a [`StakingOverview`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StakingSummary {
    pub balance: u128,
    pub delegated: u128,
    pub rewards: u128,
    pub unbonding: u128,
    pub delegation_count: usize,
    pub unbonding_count: usize,
}

impl StakingSummary {
    pub fn from_overview(overview: &StakingOverview) -> Self {
        Self {
            balance: parse_minimal(&overview.balance).unwrap_or(0),
            delegated: parse_minimal(&overview.total_delegated).unwrap_or(0),
            rewards: parse_minimal(&overview.total_rewards).unwrap_or(0),
            unbonding: parse_minimal(&overview.total_unbonding).unwrap_or(0),
            delegation_count: overview.delegations.len(),
            unbonding_count: overview.unbonding.len(),
        }
    }

    /// Returns true if the account has any staked funds.
    pub fn is_staking(&self) -> bool {
        self.delegated > 0
    }

    /// Returns true if there are rewards to claim.
    pub fn has_pending_rewards(&self) -> bool {
        self.rewards > 0
    }
}

/// `"1.500000 TICS"`.
pub fn format_token(minimal: u128, symbol: &str) -> String {
    format!("{} {}", format_units(minimal), symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Delegation, UnbondingEntry};

    fn validator(moniker: Option<&str>) -> DisplayValidator {
        DisplayValidator {
            operator_address: "qubeticsvaloper15mner98f4u6nj0fvukucw2nvgfd8zecunfzhhp".to_string(),
            moniker: moniker.map(String::from),
            commission: 0.05,
            jailed: false,
            tokens: 1_000,
            voting_power_share: 0.125,
            missed_blocks: Some(3),
        }
    }

    #[test]
    fn test_display_validator_percentages() {
        let v = validator(Some("QubeNode"));
        assert!((v.commission_percent() - 5.0).abs() < 0.001);
        assert!((v.voting_power_percent() - 12.5).abs() < 0.001);
    }

    #[test]
    fn test_display_validator_display_name() {
        assert_eq!(validator(Some("QubeNode")).display_name(), "QubeNode");
        assert_eq!(
            validator(None).display_name(),
            "qubeticsvaloper15mner98f"
        );
        assert_eq!(validator(Some("  ")).display_name(), "qubeticsvaloper15mner98f");
    }

    #[test]
    fn test_staking_summary_from_overview() {
        let overview = StakingOverview {
            balance: "10".into(),
            total_delegated: "350".into(),
            total_rewards: "0".into(),
            total_unbonding: "bogus".into(),
            delegations: vec![Delegation::default(), Delegation::default()],
            rewards: vec![],
            unbonding: vec![UnbondingEntry::default()],
        };
        let summary = StakingSummary::from_overview(&overview);
        assert_eq!(summary.balance, 10);
        assert_eq!(summary.delegated, 350);
        assert_eq!(summary.unbonding, 0);
        assert_eq!(summary.delegation_count, 2);
        assert_eq!(summary.unbonding_count, 1);
        assert!(summary.is_staking());
        assert!(!summary.has_pending_rewards());
    }

    #[test]
    fn test_format_token() {
        assert_eq!(
            format_token(2_500_000_000_000_000_000, "TICS"),
            "2.500000 TICS"
        );
    }
}
