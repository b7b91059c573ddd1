//! Cosmos staking messages as handed to a signing extension.
//!
//! Messages are rendered as `{ typeUrl, value }` encode objects with
//! camelCase fields, the shape extension signers accept.

use serde::Serialize;
use serde_json::{Value, json};

pub const MSG_DELEGATE: &str = "/cosmos.staking.v1beta1.MsgDelegate";
pub const MSG_UNDELEGATE: &str = "/cosmos.staking.v1beta1.MsgUndelegate";
pub const MSG_BEGIN_REDELEGATE: &str = "/cosmos.staking.v1beta1.MsgBeginRedelegate";
pub const MSG_WITHDRAW_REWARD: &str =
    "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward";
pub const MSG_CANCEL_UNBONDING: &str = "/cosmos.staking.v1beta1.MsgCancelUnbondingDelegation";

/// Amount of one denom, minimal units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: &str, amount: u128) -> Self {
        Self {
            denom: denom.to_string(),
            amount: amount.to_string(),
        }
    }
}

/// Transaction fee: `gas_limit * gas_price` of the bond denom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

impl Fee {
    pub fn new(denom: &str, gas_limit: u64, gas_price: u128) -> Self {
        let amount = u128::from(gas_limit).saturating_mul(gas_price);
        Self {
            amount: vec![Coin::new(denom, amount)],
            gas: gas_limit.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingMsg {
    Delegate {
        delegator: String,
        validator: String,
        amount: Coin,
    },
    Undelegate {
        delegator: String,
        validator: String,
        amount: Coin,
    },
    BeginRedelegate {
        delegator: String,
        src_validator: String,
        dst_validator: String,
        amount: Coin,
    },
    WithdrawReward {
        delegator: String,
        validator: String,
    },
    CancelUnbonding {
        delegator: String,
        validator: String,
        amount: Coin,
        creation_height: u64,
    },
}

impl StakingMsg {
    pub fn type_url(&self) -> &'static str {
        match self {
            StakingMsg::Delegate { .. } => MSG_DELEGATE,
            StakingMsg::Undelegate { .. } => MSG_UNDELEGATE,
            StakingMsg::BeginRedelegate { .. } => MSG_BEGIN_REDELEGATE,
            StakingMsg::WithdrawReward { .. } => MSG_WITHDRAW_REWARD,
            StakingMsg::CancelUnbonding { .. } => MSG_CANCEL_UNBONDING,
        }
    }

    pub fn to_encode_object(&self) -> Value {
        let value = match self {
            StakingMsg::Delegate {
                delegator,
                validator,
                amount,
            }
            | StakingMsg::Undelegate {
                delegator,
                validator,
                amount,
            } => json!({
                "delegatorAddress": delegator,
                "validatorAddress": validator,
                "amount": amount,
            }),
            StakingMsg::BeginRedelegate {
                delegator,
                src_validator,
                dst_validator,
                amount,
            } => json!({
                "delegatorAddress": delegator,
                "validatorSrcAddress": src_validator,
                "validatorDstAddress": dst_validator,
                "amount": amount,
            }),
            StakingMsg::WithdrawReward {
                delegator,
                validator,
            } => json!({
                "delegatorAddress": delegator,
                "validatorAddress": validator,
            }),
            StakingMsg::CancelUnbonding {
                delegator,
                validator,
                amount,
                creation_height,
            } => json!({
                "delegatorAddress": delegator,
                "validatorAddress": validator,
                "amount": amount,
                "creationHeight": creation_height.to_string(),
            }),
        };
        json!({ "typeUrl": self.type_url(), "value": value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_is_gas_times_price() {
        let fee = Fee::new("tics", 300_000, 1_000_000_000);
        assert_eq!(fee.gas, "300000");
        assert_eq!(fee.amount, vec![Coin::new("tics", 300_000_000_000_000)]);
    }

    #[test]
    fn test_delegate_encode_object() {
        let msg = StakingMsg::Delegate {
            delegator: "qubetics1abc".into(),
            validator: "qubeticsvaloper1xyz".into(),
            amount: Coin::new("tics", 5),
        };
        let obj = msg.to_encode_object();
        assert_eq!(obj["typeUrl"], MSG_DELEGATE);
        assert_eq!(obj["value"]["delegatorAddress"], "qubetics1abc");
        assert_eq!(obj["value"]["validatorAddress"], "qubeticsvaloper1xyz");
        assert_eq!(obj["value"]["amount"]["denom"], "tics");
        assert_eq!(obj["value"]["amount"]["amount"], "5");
    }

    #[test]
    fn test_redelegate_and_cancel_fields() {
        let msg = StakingMsg::BeginRedelegate {
            delegator: "d".into(),
            src_validator: "a".into(),
            dst_validator: "b".into(),
            amount: Coin::new("tics", 1),
        };
        let obj = msg.to_encode_object();
        assert_eq!(obj["typeUrl"], MSG_BEGIN_REDELEGATE);
        assert_eq!(obj["value"]["validatorSrcAddress"], "a");
        assert_eq!(obj["value"]["validatorDstAddress"], "b");

        let msg = StakingMsg::CancelUnbonding {
            delegator: "d".into(),
            validator: "a".into(),
            amount: Coin::new("tics", 1),
            creation_height: 1234,
        };
        let obj = msg.to_encode_object();
        assert_eq!(obj["typeUrl"], MSG_CANCEL_UNBONDING);
        assert_eq!(obj["value"]["creationHeight"], "1234");
    }

    #[test]
    fn test_withdraw_has_no_amount() {
        let msg = StakingMsg::WithdrawReward {
            delegator: "d".into(),
            validator: "v".into(),
        };
        let obj = msg.to_encode_object();
        assert_eq!(obj["typeUrl"], MSG_WITHDRAW_REWARD);
        assert!(obj["value"].get("amount").is_none());
    }
}
