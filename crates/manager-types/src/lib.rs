//! Shared data model for the position manager.
//!
//! This crate defines the intent, authorization and step types exchanged
//! between the planner, the sequencer and the driver, plus the conversions
//! between caller-facing decimal amounts and on-chain integer units.

pub mod amount;
pub mod authorization;
pub mod clock;
pub mod intent;
pub mod step;
pub mod transaction;

pub use amount::{from_base_units, to_base_units, to_signed_base_units, AmountError};
pub use authorization::*;
pub use clock::unix_now;
pub use intent::*;
pub use step::*;
pub use transaction::*;

// Re-export commonly used ethereum types
pub use alloy_primitives::{Address, B256, I256, U256};
