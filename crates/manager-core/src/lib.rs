//! Caller-facing orchestration for the position manager.
//!
//! [`ManagerEngine`] is the entry point: it plans an intent into a step
//! sequence and either exposes the sequence for manual driving or drives
//! it end to end itself, awaiting transaction confirmation between steps
//! and threading freshly signed permits back into the sequence.

use manager_account::AccountError;
use manager_chain::ChainError;
use manager_config::ConfigError;
use manager_delivery::DeliveryError;
use manager_types::{AmountError, TransactionHash};
use thiserror::Error;

mod callbacks;
mod driver;

pub use callbacks::{EndHook, StartHook, StepCallbacks};
pub use driver::{ManagerBuilder, ManagerEngine};
pub use manager_plan::{PlanError, SequencerYield, StepSequencer};

#[derive(Debug, Error)]
pub enum ManageError {
	#[error(transparent)]
	Plan(#[from] PlanError),
	#[error(transparent)]
	Chain(#[from] ChainError),
	#[error(transparent)]
	Account(#[from] AccountError),
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Amount(#[from] AmountError),
	/// A submitted step reverted on-chain. Already-confirmed steps stay
	/// in effect; re-planning against fresh chain state skips them.
	#[error("Transaction {hash} failed on-chain")]
	TransactionFailed { hash: TransactionHash },
	#[error("Configuration error: {0}")]
	Configuration(String),
}
