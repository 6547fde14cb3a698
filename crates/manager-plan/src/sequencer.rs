//! Pausable step sequencing.
//!
//! The sequencer is a cooperative state machine: it yields one step per
//! advance and suspends until driven forward again. Exactly one value can
//! be injected, at the resume point immediately after a permit step, to
//! thread a wallet-signed permit back into the sequence. It performs no
//! I/O; every side effect lives with whoever executes the steps.

use crate::authorize::{AuthMethod, AuthRequirement};
use crate::route::ResolvedRoute;
use crate::PlanError;
use manager_types::{
	ExecuteCall, Intent, IntentAction, PermitSignature, Step, StepKind, TokenId,
};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// What the sequencer produced on one advance.
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerYield {
	Step(Step),
	Done,
}

/// Which permit slot an injected signature lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PermitSlot {
	Primary,
	Secondary,
}

#[derive(Debug)]
pub(crate) enum PlannedStep {
	Whitelist { operator: manager_types::Address },
	Auth { slot: PermitSlot, requirement: AuthRequirement },
	Execute,
}

/// Cooperative state machine yielding the plan's steps one at a time, in
/// the fixed order: whitelist, primary authorization, secondary
/// authorization, execute. Skipped states never appear; positions are
/// immutable once yielded; there are no back-edges.
pub struct StepSequencer {
	intent: Intent,
	route: ResolvedRoute,
	queue: VecDeque<PlannedStep>,
	total_steps: u32,
	next_number: u32,
	/// Set while suspended immediately after a yielded permit step.
	awaiting: Option<(PermitSlot, TokenId)>,
	primary_permit: PermitSignature,
	secondary_permit: PermitSignature,
	finished: bool,
}

impl StepSequencer {
	pub(crate) fn new(
		intent: Intent,
		route: ResolvedRoute,
		queue: VecDeque<PlannedStep>,
		primary_permit: PermitSignature,
		secondary_permit: PermitSignature,
	) -> Self {
		let total_steps = queue.len() as u32;
		Self {
			intent,
			route,
			queue,
			total_steps,
			next_number: 1,
			awaiting: None,
			primary_permit,
			secondary_permit,
			finished: false,
		}
	}

	/// Total number of steps in the plan, fixed before the first yield.
	pub fn total_steps(&self) -> u32 {
		self.total_steps
	}

	pub fn is_finished(&self) -> bool {
		self.finished
	}

	/// Advances the sequence. `input` is consumed only when the previous
	/// yield was a permit step; anywhere else it is dropped, mirroring
	/// generator resume semantics. Resuming past a permit step without a
	/// signature fails before any further step is yielded.
	pub fn next(&mut self, input: Option<PermitSignature>) -> Result<SequencerYield, PlanError> {
		if let Some((slot, token)) = self.awaiting.take() {
			match input {
				Some(signature) => match slot {
					PermitSlot::Primary => self.primary_permit = signature,
					PermitSlot::Secondary => self.secondary_permit = signature,
				},
				None => {
					self.awaiting = Some((slot, token.clone()));
					return Err(PlanError::SignatureRequired { token });
				}
			}
		}

		let Some(planned) = self.queue.pop_front() else {
			self.finished = true;
			return Ok(SequencerYield::Done);
		};

		let step_number = self.next_number;
		self.next_number += 1;

		let kind = match planned {
			PlannedStep::Whitelist { operator } => StepKind::Whitelist { operator },
			PlannedStep::Auth { slot, requirement } => match requirement.method {
				AuthMethod::Permit => {
					self.awaiting = Some((slot, requirement.token.clone()));
					StepKind::Permit {
						token: requirement.token,
						amount: requirement.amount,
						spender: requirement.spender,
					}
				}
				AuthMethod::Approve => StepKind::Approve {
					token: requirement.token,
					amount: requirement.amount,
					spender: requirement.spender,
				},
			},
			PlannedStep::Execute => StepKind::Execute {
				call: self.execute_call(),
			},
		};

		Ok(SequencerYield::Step(Step {
			step_number,
			total_steps: self.total_steps,
			kind,
		}))
	}

	/// Materializes the terminal call with the permit signatures collected
	/// so far (or the empty sentinel where authorization was on-chain).
	fn execute_call(&self) -> ExecuteCall {
		match &self.intent.action {
			IntentAction::AdjustPosition {
				collateral_delta,
				debt_delta,
			} => ExecuteCall::AdjustPosition {
				collateral_delta: *collateral_delta,
				debt_delta: *debt_delta,
				route: self.route.route,
				collateral_permit: self.primary_permit.clone(),
				debt_permit: self.secondary_permit.clone(),
			},
			IntentAction::Savings { delta } => {
				if *delta > Decimal::ZERO {
					ExecuteCall::SavingsDeposit {
						amount: *delta,
						permit: self.primary_permit.clone(),
					}
				} else {
					ExecuteCall::SavingsWithdraw { amount: -*delta }
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use manager_types::{Address, ApprovalMethod, Route, B256, U256};

	fn route() -> ResolvedRoute {
		ResolvedRoute {
			route: Route::Gateway,
			spender: Address::repeat_byte(0x33),
			primary_token: TokenId::from("weth"),
			secondary_token: TokenId::from("dai"),
		}
	}

	fn intent() -> Intent {
		Intent {
			action: IntentAction::AdjustPosition {
				collateral_delta: Decimal::from(10),
				debt_delta: Decimal::from(-5),
			},
			authorization_token: TokenId::from("dai"),
			fee_cap: Decimal::ZERO,
			approval_preference: ApprovalMethod::Permit,
		}
	}

	fn permit_requirement(token: &str) -> AuthRequirement {
		AuthRequirement {
			token: TokenId::from(token),
			amount: Decimal::from(10),
			spender: Address::repeat_byte(0x33),
			method: AuthMethod::Permit,
		}
	}

	fn signature() -> PermitSignature {
		PermitSignature {
			token: Address::repeat_byte(0x55),
			value: U256::from(10u64),
			deadline: 1_700_000_000,
			v: 27,
			r: B256::repeat_byte(0x01),
			s: B256::repeat_byte(0x02),
		}
	}

	fn sequencer(queue: Vec<PlannedStep>) -> StepSequencer {
		StepSequencer::new(
			intent(),
			route(),
			queue.into(),
			PermitSignature::empty(),
			PermitSignature::empty(),
		)
	}

	#[test]
	fn yields_steps_in_order_with_contiguous_numbering() {
		let mut sequencer = sequencer(vec![
			PlannedStep::Whitelist {
				operator: Address::repeat_byte(0x33),
			},
			PlannedStep::Execute,
		]);
		assert_eq!(sequencer.total_steps(), 2);

		let SequencerYield::Step(first) = sequencer.next(None).unwrap() else {
			panic!("expected a step");
		};
		assert_eq!(first.step_number, 1);
		assert_eq!(first.total_steps, 2);
		assert!(matches!(first.kind, StepKind::Whitelist { .. }));

		let SequencerYield::Step(second) = sequencer.next(None).unwrap() else {
			panic!("expected a step");
		};
		assert_eq!(second.step_number, 2);
		assert!(matches!(second.kind, StepKind::Execute { .. }));

		assert_eq!(sequencer.next(None).unwrap(), SequencerYield::Done);
		assert!(sequencer.is_finished());
	}

	#[test]
	fn permit_step_requires_a_signature_on_resume() {
		let mut sequencer = sequencer(vec![
			PlannedStep::Auth {
				slot: PermitSlot::Secondary,
				requirement: permit_requirement("dai"),
			},
			PlannedStep::Execute,
		]);

		let SequencerYield::Step(step) = sequencer.next(None).unwrap() else {
			panic!("expected a step");
		};
		assert!(matches!(step.kind, StepKind::Permit { .. }));

		// No signature, no progress.
		let error = sequencer.next(None).unwrap_err();
		assert!(matches!(error, PlanError::SignatureRequired { .. }));

		// The failure is sticky until a signature arrives.
		assert!(sequencer.next(None).is_err());

		let SequencerYield::Step(execute) = sequencer.next(Some(signature())).unwrap() else {
			panic!("expected the execute step");
		};
		let StepKind::Execute {
			call: ExecuteCall::AdjustPosition { debt_permit, .. },
		} = execute.kind
		else {
			panic!("expected an adjust call");
		};
		assert_eq!(debt_permit, signature());
	}

	#[test]
	fn input_outside_a_permit_resume_is_dropped() {
		let mut sequencer = sequencer(vec![
			PlannedStep::Whitelist {
				operator: Address::repeat_byte(0x33),
			},
			PlannedStep::Execute,
		]);

		sequencer.next(Some(signature())).unwrap();
		let SequencerYield::Step(execute) = sequencer.next(Some(signature())).unwrap() else {
			panic!("expected the execute step");
		};
		let StepKind::Execute {
			call:
				ExecuteCall::AdjustPosition {
					collateral_permit,
					debt_permit,
					..
				},
		} = execute.kind
		else {
			panic!("expected an adjust call");
		};
		// Neither slot picked the stray input up.
		assert!(collateral_permit.is_empty());
		assert!(debt_permit.is_empty());
	}

	#[test]
	fn savings_withdrawal_negates_the_delta() {
		let withdraw = Intent {
			action: IntentAction::Savings {
				delta: Decimal::from(-40),
			},
			authorization_token: TokenId::from("usds"),
			fee_cap: Decimal::ZERO,
			approval_preference: ApprovalMethod::Approve,
		};
		let mut sequencer = StepSequencer::new(
			withdraw,
			route(),
			vec![PlannedStep::Execute].into(),
			PermitSignature::empty(),
			PermitSignature::empty(),
		);

		let SequencerYield::Step(step) = sequencer.next(None).unwrap() else {
			panic!("expected a step");
		};
		assert_eq!(
			step.kind,
			StepKind::Execute {
				call: ExecuteCall::SavingsWithdraw {
					amount: Decimal::from(40),
				},
			}
		);
	}
}
