//! Validator statistics joined from staking, pool and slashing queries.

use std::collections::HashMap;

use qube_core::DisplayValidator;
use sp_crypto_hashing::sha2_256;

use crate::ChainClient;
use crate::error::ChainError;
use crate::queries::slashing::SigningInfo;
use crate::queries::staking::{BondStatus, StakingPool, ValidatorInfo};

/// Consensus (valcons) address of an ed25519 consensus key:
/// the first 20 bytes of its SHA-256, bech32-encoded.
pub fn consensus_address(pubkey: &[u8], prefix: &str) -> Option<String> {
    let hash = sha2_256(pubkey);
    qube_core::address::encode(&format!("{prefix}valcons"), &hash[..20]).ok()
}

/// Build display rows for validators.
///
/// Voting power is the share of the bonded pool; validators that are not
/// bonded get zero. Missed blocks are matched through the consensus address.
pub fn build_display_validators(
    validators: &[ValidatorInfo],
    pool: &StakingPool,
    signing_infos: &[SigningInfo],
    prefix: &str,
) -> Vec<DisplayValidator> {
    let missed: HashMap<&str, u64> = signing_infos
        .iter()
        .map(|s| (s.consensus_address.as_str(), s.missed_blocks))
        .collect();

    let mut rows: Vec<DisplayValidator> = validators
        .iter()
        .map(|v| {
            let voting_power_share = if v.status == BondStatus::Bonded && pool.bonded > 0 {
                v.tokens as f64 / pool.bonded as f64
            } else {
                0.0
            };
            let missed_blocks = v
                .consensus_pubkey
                .as_deref()
                .and_then(|pk| consensus_address(pk, prefix))
                .and_then(|addr| missed.get(addr.as_str()).copied());

            DisplayValidator {
                operator_address: v.operator_address.clone(),
                moniker: Some(v.moniker.clone()).filter(|m| !m.trim().is_empty()),
                commission: v.commission,
                jailed: v.jailed,
                tokens: v.tokens,
                voting_power_share,
                missed_blocks,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.tokens.cmp(&a.tokens));
    rows
}

impl ChainClient {
    /// Fetch validators, pool and signing infos concurrently and join them.
    pub async fn get_validator_overview(
        &self,
        status: Option<BondStatus>,
    ) -> Result<Vec<DisplayValidator>, ChainError> {
        let (validators, pool, signing_infos) = futures::try_join!(
            self.get_validators(status),
            self.get_staking_pool(),
            self.get_signing_infos(),
        )?;

        tracing::info!(
            "Loaded {} validators, {} signing infos",
            validators.len(),
            signing_infos.len()
        );

        Ok(build_display_validators(
            &validators,
            &pool,
            &signing_infos,
            self.network().bech32_prefix(),
        ))
    }

    /// Display row for one validator.
    pub async fn get_validator_stats(
        &self,
        operator_address: &str,
    ) -> Result<DisplayValidator, ChainError> {
        let (validator, pool, signing_infos) = futures::try_join!(
            self.get_validator(operator_address),
            self.get_staking_pool(),
            self.get_signing_infos(),
        )?;

        build_display_validators(
            std::slice::from_ref(&validator),
            &pool,
            &signing_infos,
            self.network().bech32_prefix(),
        )
        .pop()
        .ok_or_else(|| ChainError::InvalidData(format!("validator {operator_address}")))
    }
}
