//! Slashing module queries (validator uptime).

use serde::Deserialize;

use super::PageResponse;
use crate::ChainClient;
use crate::error::ChainError;

/// Liveness record of one validator, keyed by its consensus address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningInfo {
    pub consensus_address: String,
    pub missed_blocks: u64,
    pub tombstoned: bool,
}

#[derive(Debug, Deserialize)]
struct SigningInfosResponse {
    #[serde(default)]
    info: Vec<RawSigningInfo>,
    #[serde(default)]
    pagination: Option<PageResponse>,
}

#[derive(Debug, Deserialize)]
struct RawSigningInfo {
    address: String,
    #[serde(default)]
    missed_blocks_counter: String,
    #[serde(default)]
    tombstoned: bool,
}

#[derive(Debug, Deserialize)]
struct ParamsResponse {
    params: SlashingParams,
}

#[derive(Debug, Deserialize)]
struct SlashingParams {
    #[serde(default)]
    signed_blocks_window: String,
}

fn parse_signing_infos(response: SigningInfosResponse) -> (Vec<SigningInfo>, Option<String>) {
    let infos = response
        .info
        .into_iter()
        .map(|i| SigningInfo {
            consensus_address: i.address,
            missed_blocks: i.missed_blocks_counter.parse().unwrap_or(0),
            tombstoned: i.tombstoned,
        })
        .collect();
    (infos, response.pagination.and_then(|p| p.next_key))
}

impl ChainClient {
    /// Get signing infos of all validators.
    pub async fn get_signing_infos(&self) -> Result<Vec<SigningInfo>, ChainError> {
        self.get_paginated(
            "/cosmos/slashing/v1beta1/signing_infos",
            &[],
            parse_signing_infos,
        )
        .await
    }

    /// Number of blocks over which missed blocks are counted.
    pub async fn get_signed_blocks_window(&self) -> Result<u64, ChainError> {
        let response: ParamsResponse = self
            .get_json("/cosmos/slashing/v1beta1/params", &[])
            .await?;
        response
            .params
            .signed_blocks_window
            .parse()
            .map_err(|_| {
                ChainError::InvalidData(format!(
                    "signed_blocks_window '{}'",
                    response.params.signed_blocks_window
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signing_infos() {
        let json = r#"{
            "info": [
                {
                    "address": "qubeticsvalcons1abc",
                    "start_height": "10",
                    "index_offset": "5000",
                    "jailed_until": "1970-01-01T00:00:00Z",
                    "tombstoned": false,
                    "missed_blocks_counter": "12"
                },
                {
                    "address": "qubeticsvalcons1def",
                    "tombstoned": true
                }
            ],
            "pagination": {"next_key": null, "total": "2"}
        }"#;
        let response: SigningInfosResponse = serde_json::from_str(json).unwrap();
        let (infos, next) = parse_signing_infos(response);
        assert!(next.is_none());
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].missed_blocks, 12);
        assert!(!infos[0].tombstoned);
        assert_eq!(infos[1].missed_blocks, 0);
        assert!(infos[1].tombstoned);
    }

    #[test]
    fn test_parse_params() {
        let json = r#"{"params": {"signed_blocks_window": "10000", "min_signed_per_window": "0.5"}}"#;
        let response: ParamsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.params.signed_blocks_window, "10000");
    }
}
