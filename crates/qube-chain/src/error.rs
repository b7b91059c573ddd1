//! Error types for chain, wallet and staking operations.

use qube_core::{AddressError, TxReceipt, UnitError, WalletKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Failed to connect to chain: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("REST query {path} failed with status {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Errors raised by a wallet backend.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("{0} wallet not found")]
    ProviderNotFound(WalletKind),

    #[error("Request rejected by the user")]
    UserRejected,

    #[error("Wallet is on the wrong network: {0}")]
    NetworkMismatch(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("No signer attached to the wallet")]
    SignerNotReady,

    #[error("{0} is not supported by this wallet")]
    Unsupported(&'static str),

    #[error("Provider error {code}: {message}")]
    Provider { code: i64, message: String },

    /// Refused before it was included in a block.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Included in a block but failed on execution.
    #[error("Transaction {tx_hash} failed on chain: {reason}")]
    Reverted { tx_hash: String, reason: String },

    #[error("No receipt for transaction {0}")]
    ReceiptTimeout(String),

    #[error("Transaction {tx_hash} submitted but not confirmed: {message}")]
    Unconfirmed { tx_hash: String, message: String },

    /// A multi-transaction claim stopped part way.
    #[error("{source} ({} claim(s) confirmed before it)", .receipts.len())]
    PartialClaim {
        receipts: Vec<TxReceipt>,
        source: Box<WalletError>,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

impl WalletError {
    /// True when a transaction may have reached the chain, so account state
    /// can differ from before the call.
    pub fn reached_chain(&self) -> bool {
        match self {
            WalletError::Reverted { .. }
            | WalletError::ReceiptTimeout(_)
            | WalletError::Unconfirmed { .. } => true,
            WalletError::PartialClaim { receipts, source } => {
                !receipts.is_empty() || source.reached_chain()
            }
            _ => false,
        }
    }
}

/// Errors raised by the staking orchestrator.
#[derive(Error, Debug)]
pub enum StakingError {
    #[error("Unknown wallet type '{0}'")]
    UnknownWalletType(String),

    #[error("EVM wallet connector is not available")]
    ConnectorMissing,

    #[error("No wallet connected")]
    NotConnected,

    #[error("Amount {amount} is below the minimum delegation of {minimum}")]
    BelowMinimum { amount: String, minimum: String },

    #[error("{operation} is not supported by {kind}")]
    UnsupportedByBackend {
        operation: &'static str,
        kind: WalletKind,
    },

    #[error(transparent)]
    InvalidAmount(#[from] UnitError),

    #[error("Another staking operation is in progress")]
    Busy,

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
