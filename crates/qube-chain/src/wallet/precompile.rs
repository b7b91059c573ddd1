//! Call data for the staking and distribution precompiles.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, sol};
use qube_core::AddressError;

const ADDRESS_LEN: usize = 20;

sol! {
    /// Staking precompile at `0x…0800`.
    interface IStaking {
        function delegate(address delegatorAddress, string validatorAddress, uint256 amount) external returns (bool success);
        function undelegate(address delegatorAddress, string validatorAddress, uint256 amount) external returns (int64 completionTime);
    }

    /// Distribution precompile at `0x…0801`.
    interface IDistribution {
        function withdrawDelegatorReward(address delegatorAddress, string validatorAddress) external returns (uint256 amount);
    }
}

fn parse_address(address: &str) -> Result<Address, AddressError> {
    let stripped = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    let bytes = hex::decode(stripped).map_err(|_| AddressError::InvalidHex(address.to_string()))?;
    if bytes.len() != ADDRESS_LEN {
        return Err(AddressError::InvalidLength(bytes.len()));
    }
    Ok(Address::from_slice(&bytes))
}

pub fn delegate_call(delegator: &str, validator: &str, amount: u128) -> Result<Vec<u8>, AddressError> {
    Ok(IStaking::delegateCall {
        delegatorAddress: parse_address(delegator)?,
        validatorAddress: validator.to_string(),
        amount: U256::from(amount),
    }
    .abi_encode())
}

pub fn undelegate_call(
    delegator: &str,
    validator: &str,
    amount: u128,
) -> Result<Vec<u8>, AddressError> {
    Ok(IStaking::undelegateCall {
        delegatorAddress: parse_address(delegator)?,
        validatorAddress: validator.to_string(),
        amount: U256::from(amount),
    }
    .abi_encode())
}

pub fn withdraw_reward_call(delegator: &str, validator: &str) -> Result<Vec<u8>, AddressError> {
    Ok(IDistribution::withdrawDelegatorRewardCall {
        delegatorAddress: parse_address(delegator)?,
        validatorAddress: validator.to_string(),
    }
    .abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD: usize = 32;
    const DELEGATOR: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";
    const VALIDATOR: &str = "qubeticsvaloper15mner98f4u6nj0fvukucw2nvgfd8zecunfzhhp";

    fn word(data: &[u8], index: usize) -> String {
        hex::encode(&data[4 + index * WORD..4 + (index + 1) * WORD])
    }

    fn uint_hex(value: u128) -> String {
        format!("{:064x}", value)
    }

    #[test]
    fn test_precompile_selectors() {
        assert_eq!(hex::encode(IStaking::delegateCall::SELECTOR), "53266bbb");
        assert_eq!(hex::encode(IStaking::undelegateCall::SELECTOR), "3edab33c");
        assert_eq!(
            hex::encode(IDistribution::withdrawDelegatorRewardCall::SELECTOR),
            "0b4e2b6e"
        );
    }

    #[test]
    fn test_delegate_layout() {
        let amount = 1_500_000_000_000_000_000u128;
        let data = delegate_call(DELEGATOR, VALIDATOR, amount).unwrap();

        assert_eq!(hex::encode(&data[..4]), "53266bbb");
        assert_eq!(
            word(&data, 0),
            "0000000000000000000000008ba1f109551bd432803012645ac136ddd64dba72"
        );
        // string head points past the three head words
        assert_eq!(word(&data, 1), uint_hex(0x60));
        assert_eq!(word(&data, 2), uint_hex(amount));
        assert_eq!(word(&data, 3), uint_hex(VALIDATOR.len() as u128));
        assert_eq!(
            &data[4 + 4 * WORD..4 + 4 * WORD + VALIDATOR.len()],
            VALIDATOR.as_bytes()
        );
        // 54-byte string padded to two words
        assert_eq!(data.len(), 4 + 4 * WORD + 2 * WORD);
        assert!(data[4 + 4 * WORD + VALIDATOR.len()..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_undelegate_uses_its_own_selector() {
        let data = undelegate_call(DELEGATOR, VALIDATOR, 1).unwrap();
        assert_eq!(hex::encode(&data[..4]), "3edab33c");
        assert_eq!(word(&data, 2), uint_hex(1));
    }

    #[test]
    fn test_withdraw_layout() {
        let data = withdraw_reward_call(DELEGATOR, VALIDATOR).unwrap();
        assert_eq!(hex::encode(&data[..4]), "0b4e2b6e");
        assert_eq!(word(&data, 1), uint_hex(0x40));
        assert_eq!(word(&data, 2), uint_hex(VALIDATOR.len() as u128));
        assert_eq!(data.len(), 4 + 3 * WORD + 2 * WORD);
    }

    #[test]
    fn test_mixed_case_delegator() {
        let lower = delegate_call(DELEGATOR, VALIDATOR, 1).unwrap();
        let checksummed =
            delegate_call("0x8bA1f109551bD432803012645Ac136ddd64DBA72", VALIDATOR, 1).unwrap();
        assert_eq!(lower, checksummed);
    }

    #[test]
    fn test_bad_delegator() {
        assert_eq!(
            delegate_call("0x1234", VALIDATOR, 1),
            Err(AddressError::InvalidLength(2))
        );
        assert_eq!(
            delegate_call("0xzz", VALIDATOR, 1),
            Err(AddressError::InvalidHex("0xzz".into()))
        );
    }
}
