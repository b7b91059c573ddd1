//! Aggregation of per-validator amounts into overview totals.
//!
//! Sums are exact `u128` arithmetic over minimal-unit strings. An entry whose
//! amount is missing, malformed or would overflow the running sum is skipped
//! and logged; it never poisons the total.

use qube_core::{Delegation, RewardEntry, StakingOverview, UnbondingEntry, parse_minimal};

fn sum_amounts<'a>(kind: &str, entries: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut total: u128 = 0;
    for (validator, amount) in entries {
        let Some(value) = parse_minimal(amount) else {
            tracing::warn!(
                "Skipping {} entry for {} with malformed amount '{}'",
                kind,
                validator,
                amount
            );
            continue;
        };
        match total.checked_add(value) {
            Some(sum) => total = sum,
            None => tracing::warn!(
                "Skipping {} entry for {}: amount {} overflows the total",
                kind,
                validator,
                amount
            ),
        }
    }
    total.to_string()
}

/// Total amount delegated across validators.
pub fn calculate_total_delegated(delegations: &[Delegation]) -> String {
    sum_amounts(
        "delegation",
        delegations
            .iter()
            .map(|d| (d.validator_address.as_str(), d.amount.as_str())),
    )
}

/// Total pending rewards across validators.
pub fn calculate_total_rewards(rewards: &[RewardEntry]) -> String {
    sum_amounts(
        "reward",
        rewards
            .iter()
            .map(|r| (r.validator_address.as_str(), r.amount.as_str())),
    )
}

/// Total amount currently unbonding.
pub fn calculate_total_unbonding(entries: &[UnbondingEntry]) -> String {
    sum_amounts(
        "unbonding",
        entries
            .iter()
            .map(|u| (u.validator_address.as_str(), u.amount.as_str())),
    )
}

/// Assemble a fresh overview, computing every total from its entries.
pub fn build_overview(
    balance: String,
    delegations: Vec<Delegation>,
    rewards: Vec<RewardEntry>,
    unbonding: Vec<UnbondingEntry>,
) -> StakingOverview {
    StakingOverview {
        balance,
        total_delegated: calculate_total_delegated(&delegations),
        total_rewards: calculate_total_rewards(&rewards),
        total_unbonding: calculate_total_unbonding(&unbonding),
        delegations,
        rewards,
        unbonding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delegation(validator: &str, amount: &str) -> Delegation {
        Delegation {
            validator_address: validator.into(),
            amount: amount.into(),
        }
    }

    #[test]
    fn test_empty_totals_are_zero() {
        assert_eq!(calculate_total_delegated(&[]), "0");
        assert_eq!(calculate_total_rewards(&[]), "0");
        assert_eq!(calculate_total_unbonding(&[]), "0");
    }

    #[test]
    fn test_total_delegated() {
        let delegations = vec![delegation("a", "100"), delegation("b", "250")];
        assert_eq!(calculate_total_delegated(&delegations), "350");
    }

    #[test]
    fn test_total_exceeds_f64_precision() {
        // 2^53 + 1 would be lost in floating point.
        let delegations = vec![
            delegation("a", "9007199254740992"),
            delegation("b", "1"),
            delegation("c", "1000000000000000000000000"),
        ];
        assert_eq!(
            calculate_total_delegated(&delegations),
            "1000000009007199254740993"
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let delegations = vec![
            delegation("a", "100"),
            delegation("b", ""),
            delegation("c", "12abc"),
            delegation("d", "-5"),
            delegation("e", "1.5"),
            delegation("f", "7"),
        ];
        assert_eq!(calculate_total_delegated(&delegations), "107");
    }

    #[test]
    fn test_overflowing_entry_is_skipped() {
        let delegations = vec![
            delegation("a", &u128::MAX.to_string()),
            delegation("b", "1"),
            delegation("c", "2"),
        ];
        // "b" would overflow after "a"; "c" too.
        assert_eq!(calculate_total_delegated(&delegations), u128::MAX.to_string());
    }

    #[test]
    fn test_total_rewards_and_unbonding() {
        let rewards = vec![
            RewardEntry {
                validator_address: "a".into(),
                amount: "5".into(),
            },
            RewardEntry {
                validator_address: "b".into(),
                amount: "0".into(),
            },
        ];
        assert_eq!(calculate_total_rewards(&rewards), "5");

        let unbonding = vec![
            UnbondingEntry {
                validator_address: "a".into(),
                amount: "40".into(),
                completion_time: None,
                creation_height: 1,
            },
            UnbondingEntry {
                validator_address: "a".into(),
                amount: "2".into(),
                completion_time: None,
                creation_height: 2,
            },
        ];
        assert_eq!(calculate_total_unbonding(&unbonding), "42");
    }

    #[test]
    fn test_build_overview_totals() {
        let overview = build_overview(
            "9".into(),
            vec![delegation("a", "100"), delegation("b", "250")],
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(overview.balance, "9");
        assert_eq!(overview.total_delegated, "350");
        assert_eq!(overview.total_rewards, "0");
        assert_eq!(overview.total_unbonding, "0");
        assert_eq!(overview.delegations.len(), 2);
    }
}
