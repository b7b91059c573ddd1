//! Core domain logic for the QubeNode staking client.
//!
//! This crate provides:
//! - Core domain types (`types` module)
//! - Token unit conversion (`units` module)
//! - Bech32 address encoding (`address` module)
//! - Display types for UI (`display` module)
//!
//! With the `persistence` feature enabled:
//! - Configuration management (`config` module)

pub mod address;
pub mod display;
pub mod types;
pub mod units;

#[cfg(feature = "persistence")]
pub mod config;

// Re-export commonly used items from core modules
pub use address::{AddressError, bech32_to_evm, evm_to_bech32, valoper_prefix};
pub use display::*;
pub use types::*;
pub use units::{UnitError, format_amount, parse_minimal, to_human, to_minimal};

// Re-export key persistence types when feature is enabled
#[cfg(feature = "persistence")]
pub use config::{AppConfig, ConfigError};
