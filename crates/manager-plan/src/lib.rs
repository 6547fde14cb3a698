//! Step planning core.
//!
//! Decides which authorization steps an intent needs (operator
//! whitelisting, ERC-20 approvals, EIP-2612 permits), fixes their order
//! and count up front, and sequences them ahead of the terminal execution
//! call through a pausable state machine.

use manager_chain::ChainError;
use manager_config::ConfigError;
use manager_types::{AmountError, TokenId};
use thiserror::Error;

pub mod authorize;
pub mod planner;
pub mod route;
pub mod sequencer;

pub use authorize::{AuthDecision, AuthMethod, AuthRequirement};
pub use planner::{Planner, StepPlan};
pub use route::ResolvedRoute;
pub use sequencer::{SequencerYield, StepSequencer};

/// Errors surfaced while planning or sequencing steps.
#[derive(Debug, Error)]
pub enum PlanError {
	/// Every amount change is zero and the intent is not a close-out.
	#[error("Intent changes nothing: all amount changes are zero")]
	InvalidIntent,
	/// The authorization token cannot settle the targeted operation.
	#[error("Token {token} cannot be used to settle this operation")]
	UnsupportedRoute { token: TokenId },
	/// A permit step was resumed without the signature it asked for.
	#[error("Permit step for {token} resumed without a signature")]
	SignatureRequired { token: TokenId },
	/// Authorization state could not be fetched.
	#[error(transparent)]
	Chain(#[from] ChainError),
	/// The intent references tokens the configuration does not know.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// An amount does not convert to on-chain units.
	#[error(transparent)]
	Amount(#[from] AmountError),
}
