//! Command implementations.
//!
//! Human-readable output goes to stdout; with `--json` every command prints
//! one pretty-printed JSON document instead.

use std::sync::Arc;

use color_eyre::Result;
use color_eyre::eyre::eyre;
use qube_chain::{
    BondStatus, ChainClient, ChainQuery, ConfigStore, JsonRpcProvider, RestEndpoints,
    StakingConfig, StakingError, StakingOrchestrator, WalletError, WalletProviders,
    build_overview,
};
use qube_core::address::decode;
use qube_core::{
    AppConfig, DisplayValidator, StakingOverview, StakingSummary, TxReceipt, WalletKind,
    bech32_to_evm, evm_to_bech32, format_amount, format_token, parse_minimal,
};
use serde::Serialize;
use serde_json::json;

use crate::StakeAction;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn is_evm_address(address: &str) -> bool {
    address.starts_with("0x") || address.starts_with("0X")
}

/// Bech32 account address for either address form.
fn account_address(config: &AppConfig, address: &str) -> Result<String> {
    let prefix = config.network.bech32_prefix();
    if is_evm_address(address) {
        return Ok(evm_to_bech32(address, prefix)?);
    }

    let (hrp, _) = decode(address)?;
    if hrp != prefix {
        return Err(eyre!(
            "{} is not a {} account address (prefix '{}')",
            address,
            config.network,
            prefix
        ));
    }
    Ok(address.to_string())
}

async fn connect_chain(config: &AppConfig) -> Result<ChainClient> {
    let endpoints = RestEndpoints {
        rest: config.rest_url.clone(),
    };
    Ok(ChainClient::connect(config.network, &endpoints).await?)
}

fn staking_config(config: &AppConfig) -> StakingConfig {
    let mut staking = StakingConfig::new(config.network);
    staking.validator = config.validator.clone();
    staking.read_policy = config.read_policy;
    staking.default_memo = config.default_memo.clone();
    if let Some(ref url) = config.evm_rpc_url {
        staking.evm_rpc_url = url.clone();
    }
    staking
}

pub fn address(config: &AppConfig, address: &str, json: bool) -> Result<()> {
    let (evm, bech32) = if is_evm_address(address) {
        (
            address.to_lowercase(),
            evm_to_bech32(address, config.network.bech32_prefix())?,
        )
    } else {
        (bech32_to_evm(address)?, address.to_string())
    };

    if json {
        return print_json(&json!({ "evm": evm, "bech32": bech32 }));
    }
    println!("EVM:    {}", evm);
    println!("Bech32: {}", bech32);
    Ok(())
}

pub fn to_minimal(amount: &str, json: bool) -> Result<()> {
    let minimal = qube_core::to_minimal(amount)?;
    if json {
        return print_json(&json!({ "human": amount, "minimal": minimal }));
    }
    println!("{}", minimal);
    Ok(())
}

pub fn to_human(amount: &str, json: bool) -> Result<()> {
    if parse_minimal(amount).is_none() {
        return Err(eyre!("'{}' is not a minimal-unit amount", amount));
    }
    if json {
        return print_json(&json!({ "minimal": amount, "human": qube_core::to_human(amount) }));
    }
    println!("{}", format_amount(amount));
    Ok(())
}

fn print_overview(config: &AppConfig, overview: &StakingOverview) {
    let symbol = config.network.token_symbol();
    let summary = StakingSummary::from_overview(overview);

    println!("Balance:    {}", format_token(summary.balance, symbol));
    println!("Delegated:  {}", format_token(summary.delegated, symbol));
    println!("Rewards:    {}", format_token(summary.rewards, symbol));
    println!("Unbonding:  {}", format_token(summary.unbonding, symbol));

    if !overview.delegations.is_empty() {
        println!();
        println!("Delegations:");
        for d in &overview.delegations {
            println!("  {}  {}", d.validator_address, format_amount(&d.amount));
        }
    }

    if !overview.rewards.is_empty() {
        println!();
        println!("Pending rewards:");
        for r in &overview.rewards {
            println!("  {}  {}", r.validator_address, format_amount(&r.amount));
        }
    }

    if !overview.unbonding.is_empty() {
        println!();
        println!("Unbonding:");
        for u in &overview.unbonding {
            let completes = u
                .completion_time
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "  {}  {}  completes {}  (height {})",
                u.validator_address,
                format_amount(&u.amount),
                completes,
                u.creation_height
            );
        }
    }
}

pub async fn overview(config: &AppConfig, address: &str, json: bool) -> Result<()> {
    let account = account_address(config, address)?;
    let client = connect_chain(config).await?;

    let (balance, delegations, rewards, unbonding) = futures::try_join!(
        client.balance(&account),
        client.delegations(&account),
        client.rewards(&account),
        client.unbonding_delegations(&account),
    )?;
    let overview = build_overview(balance, delegations, rewards, unbonding);

    if json {
        return print_json(&overview);
    }
    println!("Account:    {} ({})", account, config.network);
    print_overview(config, &overview);
    Ok(())
}

fn print_validator_row(rank: usize, v: &DisplayValidator) {
    let missed = v
        .missed_blocks
        .map(|m| m.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:>4}  {:<28} {:>7.2}% {:>7.2}% {:>8} {}",
        rank,
        v.display_name(),
        v.voting_power_percent(),
        v.commission_percent(),
        missed,
        if v.jailed { "jailed" } else { "" }
    );
}

pub async fn validators(
    config: &AppConfig,
    status: Option<BondStatus>,
    json: bool,
) -> Result<()> {
    let client = connect_chain(config).await?;
    let validators = client.get_validator_overview(status).await?;

    if json {
        return print_json(&validators);
    }
    println!(
        "{:>4}  {:<28} {:>8} {:>8} {:>8}",
        "#", "Validator", "Power", "Comm.", "Missed"
    );
    for (i, v) in validators.iter().enumerate() {
        print_validator_row(i + 1, v);
    }
    Ok(())
}

pub async fn validator(
    config: &AppConfig,
    operator_address: Option<String>,
    json: bool,
) -> Result<()> {
    let operator_address =
        operator_address.unwrap_or_else(|| config.validator.operator_address.clone());
    let client = connect_chain(config).await?;
    let v = client.get_validator_stats(&operator_address).await?;

    if json {
        return print_json(&v);
    }
    println!("Validator:     {}", v.display_name());
    println!("Operator:      {}", v.operator_address);
    println!(
        "Bonded:        {}",
        format_token(v.tokens, config.network.token_symbol())
    );
    println!("Voting power:  {:.2}%", v.voting_power_percent());
    println!("Commission:    {:.2}%", v.commission_percent());
    match v.missed_blocks {
        Some(missed) => println!("Missed blocks: {}", missed),
        None => println!("Missed blocks: unknown"),
    }
    println!("Jailed:        {}", if v.jailed { "yes" } else { "no" });
    Ok(())
}

fn print_receipts(receipts: &[TxReceipt]) {
    for r in receipts {
        let height = r
            .height
            .map(|h| h.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("Confirmed {} at height {}", r.tx_hash, height);
    }
}

pub async fn stake(
    config: &AppConfig,
    from: &str,
    memo: &str,
    action: StakeAction,
    json: bool,
) -> Result<()> {
    let staking = staking_config(config);
    let evm_rpc_url = staking.evm_rpc_url.clone();

    let chain: Arc<dyn ChainQuery> = Arc::new(connect_chain(config).await?);
    let providers = WalletProviders {
        evm: Some(Arc::new(JsonRpcProvider::new(&evm_rpc_url, from))),
        ..Default::default()
    };
    let store = Arc::new(ConfigStore::default_location()?);
    let orchestrator = StakingOrchestrator::new(chain, providers, store, staking);

    let session = orchestrator.connect(WalletKind::MetaMask).await?;
    tracing::info!("Signing as {} ({})", session.address, session.chain_address);

    let receipts = match action {
        StakeAction::Delegate { amount } => vec![orchestrator.delegate(&amount, memo).await?],
        StakeAction::Undelegate { amount } => vec![orchestrator.undelegate(&amount, memo).await?],
        StakeAction::Claim { validators, all } => {
            let validators = if all {
                let pending = orchestrator
                    .overview()
                    .await
                    .map(|o| o.reward_validators())
                    .unwrap_or_default();
                if pending.is_empty() {
                    return Err(eyre!("No pending rewards for {}", session.chain_address));
                }
                Some(pending)
            } else if validators.is_empty() {
                None
            } else {
                Some(validators)
            };
            match orchestrator.claim_rewards(memo, validators).await {
                Ok(receipts) => receipts,
                Err(StakingError::Wallet(WalletError::PartialClaim { receipts, source })) => {
                    if json {
                        print_json(&json!({ "receipts": receipts }))?;
                    } else {
                        print_receipts(&receipts);
                    }
                    return Err(eyre!(
                        "Claim stopped after {} transaction(s): {}",
                        receipts.len(),
                        source
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let overview = orchestrator.overview().await;
    if json {
        return print_json(&json!({ "receipts": receipts, "overview": overview.as_deref() }));
    }
    print_receipts(&receipts);
    if let Some(overview) = overview {
        println!();
        print_overview(config, &overview);
    }
    Ok(())
}
