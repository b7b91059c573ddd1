//! Distribution module queries.

use qube_core::RewardEntry;
use serde::Deserialize;

use super::{Coin, amount_of};
use crate::ChainClient;
use crate::error::ChainError;

#[derive(Debug, Deserialize)]
struct RewardsResponse {
    #[serde(default)]
    rewards: Vec<DelegationReward>,
}

#[derive(Debug, Deserialize)]
struct DelegationReward {
    validator_address: String,
    #[serde(default)]
    reward: Vec<Coin>,
}

fn parse_rewards(response: RewardsResponse, denom: &str) -> Vec<RewardEntry> {
    response
        .rewards
        .into_iter()
        .map(|r| RewardEntry {
            amount: amount_of(&r.reward, denom),
            validator_address: r.validator_address,
        })
        .collect()
}

impl ChainClient {
    /// Get pending rewards per validator, truncated to whole minimal units.
    pub async fn get_rewards(&self, delegator: &str) -> Result<Vec<RewardEntry>, ChainError> {
        let path = format!("/cosmos/distribution/v1beta1/delegators/{delegator}/rewards");
        let response: RewardsResponse = self.get_json(&path, &[]).await?;
        Ok(parse_rewards(response, self.network().denom()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rewards() {
        let json = r#"{
            "rewards": [
                {
                    "validator_address": "qubeticsvaloper1aaa",
                    "reward": [{"denom": "tics", "amount": "1234567.890000000000000000"}]
                },
                {
                    "validator_address": "qubeticsvaloper1bbb",
                    "reward": []
                }
            ],
            "total": [{"denom": "tics", "amount": "1234567.890000000000000000"}]
        }"#;
        let response: RewardsResponse = serde_json::from_str(json).unwrap();
        let rewards = parse_rewards(response, "tics");
        assert_eq!(rewards.len(), 2);
        assert_eq!(rewards[0].validator_address, "qubeticsvaloper1aaa");
        assert_eq!(rewards[0].amount, "1234567");
        assert_eq!(rewards[1].amount, "0");
    }

    #[test]
    fn test_parse_no_rewards() {
        let response: RewardsResponse =
            serde_json::from_str(r#"{"rewards": [], "total": []}"#).unwrap();
        assert!(parse_rewards(response, "tics").is_empty());
    }
}
