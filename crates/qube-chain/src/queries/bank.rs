//! Bank module queries.

use serde::Deserialize;

use super::{Coin, amount_of};
use crate::ChainClient;
use crate::error::ChainError;

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    balances: Vec<Coin>,
}

impl ChainClient {
    /// Get the balance of one denom for an account, `"0"` if it holds none.
    pub async fn get_balance(&self, address: &str, denom: &str) -> Result<String, ChainError> {
        let path = format!("/cosmos/bank/v1beta1/balances/{address}");
        let response: BalancesResponse = self.get_json(&path, &[]).await?;
        Ok(amount_of(&response.balances, denom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balances() {
        let json = r#"{
            "balances": [
                {"denom": "tics", "amount": "2500000000000000000"}
            ],
            "pagination": {"next_key": null, "total": "1"}
        }"#;
        let response: BalancesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(amount_of(&response.balances, "tics"), "2500000000000000000");
    }

    #[test]
    fn test_parse_empty_balances() {
        let response: BalancesResponse = serde_json::from_str(r#"{"balances": []}"#).unwrap();
        assert_eq!(amount_of(&response.balances, "tics"), "0");
    }
}
