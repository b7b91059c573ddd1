//! QubeNode staking client - command line interface for the Qubetics chain.

mod commands;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use qube_chain::BondStatus;
use qube_core::{AppConfig, Network};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// QubeNode staking client - view and manage TICS staking on Qubetics.
#[derive(Parser, Debug)]
#[command(name = "qubenode")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Network to connect to (defaults to the configured one)
    #[arg(short, long, global = true)]
    network: Option<NetworkArg>,

    /// Custom REST (LCD) endpoint URL
    #[arg(long = "rest-url", global = true)]
    rest_url: Option<String>,

    /// Custom EVM JSON-RPC endpoint URL (for staking transactions)
    #[arg(long = "evm-rpc-url", global = true)]
    evm_rpc_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert between 0x and bech32 account addresses
    Address {
        /// `0x` EVM address or bech32 account address
        address: String,
    },
    /// Convert between token and minimal-unit amounts
    Convert {
        #[command(subcommand)]
        direction: ConvertDirection,
    },
    /// Show balance, delegations, rewards and unbonding of an account
    Overview {
        /// `0x` EVM address or bech32 account address
        address: String,
    },
    /// List validators by voting power
    Validators {
        /// Only validators with this bond status
        #[arg(long, default_value = "bonded")]
        status: StatusArg,
    },
    /// Show one validator (the QubeNode validator by default)
    Validator {
        /// Operator address
        operator_address: Option<String>,
    },
    /// Submit staking transactions through the EVM JSON-RPC endpoint
    Stake {
        /// Account the endpoint signs for
        #[arg(long)]
        from: String,

        /// Transaction memo
        #[arg(long, default_value = "")]
        memo: String,

        #[command(subcommand)]
        action: StakeAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConvertDirection {
    /// Token amount (e.g. `1.5`) to minimal units
    ToMinimal { amount: String },
    /// Minimal units to tokens
    ToHuman { amount: String },
}

#[derive(Subcommand, Debug, Clone)]
enum StakeAction {
    /// Delegate tokens to the QubeNode validator
    Delegate { amount: String },
    /// Undelegate tokens from the QubeNode validator
    Undelegate { amount: String },
    /// Withdraw pending rewards
    Claim {
        /// Validators to claim from (defaults to the QubeNode validator)
        #[arg(long = "validator")]
        validators: Vec<String>,
        /// Claim from every validator with a pending reward
        #[arg(long, conflicts_with = "validators")]
        all: bool,
    },
}

/// Network argument that can be parsed from string.
#[derive(Debug, Clone, Copy)]
struct NetworkArg(Network);

impl std::str::FromStr for NetworkArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(NetworkArg(Network::Mainnet)),
            "testnet" | "test" => Ok(NetworkArg(Network::Testnet)),
            _ => Err(format!(
                "Unknown network '{}'. Valid options: mainnet, testnet",
                s
            )),
        }
    }
}

/// Bond status filter; `all` lists every validator.
#[derive(Debug, Clone, Copy)]
struct StatusArg(Option<BondStatus>);

impl std::str::FromStr for StatusArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusArg(None)),
            "bonded" => Ok(StatusArg(Some(BondStatus::Bonded))),
            "unbonding" => Ok(StatusArg(Some(BondStatus::Unbonding))),
            "unbonded" => Ok(StatusArg(Some(BondStatus::Unbonded))),
            _ => Err(format!(
                "Unknown status '{}'. Valid options: all, bonded, unbonding, unbonded",
                s
            )),
        }
    }
}

/// Saved config with the command line overrides applied.
fn effective_config(args: &Args) -> AppConfig {
    let mut config = match qube_core::config::load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            AppConfig::default()
        }
    };

    if let Some(network) = args.network {
        config.network = network.0;
    }
    if let Some(ref url) = args.rest_url {
        config.rest_url = Some(url.clone());
    }
    if let Some(ref url) = args.evm_rpc_url {
        config.evm_rpc_url = Some(url.clone());
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("qubenode=info".parse()?)
        .add_directive("qube_chain=info".parse()?)
        .add_directive("qube_core=info".parse()?);

    // stdout carries command output only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = effective_config(&args);
    let json = args.json;

    match args.command {
        Command::Address { address } => commands::address(&config, &address, json),
        Command::Convert { direction } => match direction {
            ConvertDirection::ToMinimal { amount } => commands::to_minimal(&amount, json),
            ConvertDirection::ToHuman { amount } => commands::to_human(&amount, json),
        },
        Command::Overview { address } => commands::overview(&config, &address, json).await,
        Command::Validators { status } => commands::validators(&config, status.0, json).await,
        Command::Validator { operator_address } => {
            commands::validator(&config, operator_address, json).await
        }
        Command::Stake { from, memo, action } => {
            commands::stake(&config, &from, &memo, action, json).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_arg() {
        assert_eq!("mainnet".parse::<NetworkArg>().unwrap().0, Network::Mainnet);
        assert_eq!("TESTNET".parse::<NetworkArg>().unwrap().0, Network::Testnet);
        assert!("polkadot".parse::<NetworkArg>().is_err());
    }

    #[test]
    fn test_status_arg() {
        assert_eq!("all".parse::<StatusArg>().unwrap().0, None);
        assert_eq!(
            "bonded".parse::<StatusArg>().unwrap().0,
            Some(BondStatus::Bonded)
        );
        assert!("jailed".parse::<StatusArg>().is_err());
    }

    #[test]
    fn test_parse_stake_delegate() {
        let args = Args::try_parse_from([
            "qubenode",
            "--network",
            "testnet",
            "stake",
            "--from",
            "0x8ba1f109551bd432803012645ac136ddd64dba72",
            "delegate",
            "1.5",
        ])
        .unwrap();

        assert_eq!(args.network.map(|n| n.0), Some(Network::Testnet));
        match args.command {
            Command::Stake { from, memo, action } => {
                assert_eq!(from, "0x8ba1f109551bd432803012645ac136ddd64dba72");
                assert_eq!(memo, "");
                assert!(matches!(action, StakeAction::Delegate { amount } if amount == "1.5"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_claim_conflicts() {
        let result = Args::try_parse_from([
            "qubenode",
            "stake",
            "--from",
            "0x00",
            "claim",
            "--all",
            "--validator",
            "qubeticsvaloper1abc",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validators_default_status() {
        let args = Args::try_parse_from(["qubenode", "validators"]).unwrap();
        match args.command {
            Command::Validators { status } => assert_eq!(status.0, Some(BondStatus::Bonded)),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
