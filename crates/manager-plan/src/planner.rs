//! Step planning: which authorization steps an intent needs.
//!
//! The planner resolves the route, fills whatever authorization state the
//! caller did not prefetch, and fixes the step order and count before the
//! first step is produced. Decision logic itself is pure; all chain reads
//! happen here, concurrently where independent.

use crate::authorize::{self, AuthDecision, AuthRequirement};
use crate::route::{resolve_route, ResolvedRoute};
use crate::sequencer::{PermitSlot, PlannedStep, StepSequencer};
use crate::PlanError;
use manager_chain::ChainReader;
use manager_config::NetworkConfig;
use manager_types::{
	from_base_units, unix_now, Address, ApprovalMethod, AuthorizationState, Intent, IntentAction,
	PermitSignature, Route,
};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Planning outcome: which optional steps are needed ahead of the
/// always-present terminal execute step.
#[derive(Debug)]
pub struct StepPlan {
	pub whitelist_needed: bool,
	pub primary_auth: Option<AuthRequirement>,
	pub secondary_auth: Option<AuthRequirement>,
	pub total_steps: u32,
	/// Cached permits that suppressed a step, carried into the terminal
	/// call.
	primary_cached: PermitSignature,
	secondary_cached: PermitSignature,
}

/// Authorization state with every planner-relevant field resolved.
struct ResolvedState {
	operator_approved: bool,
	primary_allowance: Decimal,
	secondary_allowance: Decimal,
	signer_is_eoa: bool,
}

pub struct Planner {
	config: Arc<NetworkConfig>,
	chain: Arc<dyn ChainReader>,
}

impl Planner {
	pub fn new(config: Arc<NetworkConfig>, chain: Arc<dyn ChainReader>) -> Self {
		Self { config, chain }
	}

	/// Computes the full step plan for an intent and wraps it in a
	/// sequencer. Everything the plan depends on is resolved here; the
	/// sequencer itself never touches the network.
	pub async fn plan(
		&self,
		intent: Intent,
		state: AuthorizationState,
		owner: Address,
	) -> Result<StepSequencer, PlanError> {
		if intent.is_noop() {
			return Err(PlanError::InvalidIntent);
		}

		let route = resolve_route(&self.config, &intent)?;
		let primary_amount = primary_spend_amount(&intent);
		let secondary_amount = secondary_pull_amount(&intent, &route);

		let resolved = self
			.resolve_state(
				&intent,
				&route,
				&state,
				owner,
				primary_amount.is_some(),
				secondary_amount.is_some(),
			)
			.await?;

		let plan = self.build_plan(
			&intent,
			&route,
			&resolved,
			&state,
			primary_amount,
			secondary_amount,
		)?;
		debug!(
			total_steps = plan.total_steps,
			whitelist = plan.whitelist_needed,
			primary = plan.primary_auth.is_some(),
			secondary = plan.secondary_auth.is_some(),
			"Step plan computed"
		);

		let queue = assemble_queue(&route, &plan);
		Ok(StepSequencer::new(
			intent,
			route,
			queue,
			plan.primary_cached,
			plan.secondary_cached,
		))
	}

	/// Fills the authorization-state fields the caller did not supply.
	/// Independent reads run concurrently, and all of them resolve before
	/// the first step exists, since the step count must be fixed up front.
	async fn resolve_state(
		&self,
		intent: &Intent,
		route: &ResolvedRoute,
		state: &AuthorizationState,
		owner: Address,
		needs_primary: bool,
		needs_secondary: bool,
	) -> Result<ResolvedState, PlanError> {
		let needs_operator = route.route == Route::Gateway;
		let needs_eoa = intent.approval_preference == ApprovalMethod::Permit
			&& (needs_primary || needs_secondary);

		let operator = async {
			match state.operator_approved {
				Some(known) => Ok::<_, PlanError>(known),
				None if needs_operator => {
					Ok(self.chain.is_operator_approved(owner, route.spender).await?)
				}
				None => Ok(false),
			}
		};

		let primary = async {
			match state.primary_allowance {
				Some(known) => Ok::<_, PlanError>(known),
				None if needs_primary => {
					let token = self.config.token(&route.primary_token)?;
					let raw = self
						.chain
						.allowance(token.address, owner, route.spender)
						.await?;
					Ok(from_base_units(raw, token.decimals))
				}
				None => Ok(Decimal::ZERO),
			}
		};

		let secondary = async {
			match state.secondary_allowance {
				Some(known) => Ok::<_, PlanError>(known),
				None if needs_secondary => {
					let token = self.config.token(&route.secondary_token)?;
					let raw = self
						.chain
						.allowance(token.address, owner, route.spender)
						.await?;
					Ok(from_base_units(raw, token.decimals))
				}
				None => Ok(Decimal::ZERO),
			}
		};

		let eoa = async {
			if needs_eoa {
				Ok::<_, PlanError>(self.chain.is_externally_owned(owner).await?)
			} else {
				Ok(false)
			}
		};

		let (operator_approved, primary_allowance, secondary_allowance, signer_is_eoa) =
			tokio::try_join!(operator, primary, secondary, eoa)?;

		Ok(ResolvedState {
			operator_approved,
			primary_allowance,
			secondary_allowance,
			signer_is_eoa,
		})
	}

	/// Pure step decision over fully resolved state.
	fn build_plan(
		&self,
		intent: &Intent,
		route: &ResolvedRoute,
		resolved: &ResolvedState,
		state: &AuthorizationState,
		primary_amount: Option<Decimal>,
		secondary_amount: Option<Decimal>,
	) -> Result<StepPlan, PlanError> {
		let now = unix_now();
		let whitelist_needed = route.route == Route::Gateway && !resolved.operator_approved;

		let mut primary_cached = PermitSignature::empty();
		let primary_auth = match primary_amount {
			Some(amount) => {
				let token = self.config.token(&route.primary_token)?;
				match authorize::evaluate(
					route.primary_token.clone(),
					token,
					amount,
					route.spender,
					resolved.primary_allowance,
					state.primary_permit.as_ref(),
					intent.approval_preference,
					resolved.signer_is_eoa,
					now,
				)? {
					AuthDecision::AllowanceSufficient => None,
					AuthDecision::CachedPermit(signature) => {
						primary_cached = signature;
						None
					}
					AuthDecision::Step(requirement) => Some(requirement),
				}
			}
			None => None,
		};

		let mut secondary_cached = PermitSignature::empty();
		let secondary_auth = match secondary_amount {
			Some(amount) => {
				let token = self.config.token(&route.secondary_token)?;
				match authorize::evaluate(
					route.secondary_token.clone(),
					token,
					amount,
					route.spender,
					resolved.secondary_allowance,
					state.secondary_permit.as_ref(),
					intent.approval_preference,
					resolved.signer_is_eoa,
					now,
				)? {
					AuthDecision::AllowanceSufficient => None,
					AuthDecision::CachedPermit(signature) => {
						secondary_cached = signature;
						None
					}
					AuthDecision::Step(requirement) => Some(requirement),
				}
			}
			None => None,
		};

		let total_steps = 1
			+ u32::from(whitelist_needed)
			+ u32::from(primary_auth.is_some())
			+ u32::from(secondary_auth.is_some());

		Ok(StepPlan {
			whitelist_needed,
			primary_auth,
			secondary_auth,
			total_steps,
			primary_cached,
			secondary_cached,
		})
	}
}

/// The amount the primary side must be authorized to spend, if any:
/// collateral locks and savings deposits spend a token balance.
fn primary_spend_amount(intent: &Intent) -> Option<Decimal> {
	match &intent.action {
		IntentAction::AdjustPosition {
			collateral_delta, ..
		} if *collateral_delta > Decimal::ZERO => Some(*collateral_delta),
		IntentAction::Savings { delta } if *delta > Decimal::ZERO => Some(*delta),
		_ => None,
	}
}

/// The amount the secondary side must authorize the gateway to pull, if
/// any: debt repayments on the gateway route. The direct path settles
/// repayments inside the engine and never needs this.
fn secondary_pull_amount(intent: &Intent, route: &ResolvedRoute) -> Option<Decimal> {
	match &intent.action {
		IntentAction::AdjustPosition { debt_delta, .. }
			if route.route == Route::Gateway && *debt_delta < Decimal::ZERO =>
		{
			if *debt_delta == Decimal::MIN {
				// Repay-everything needs an unlimited grant.
				Some(Decimal::MAX)
			} else {
				Some(-*debt_delta)
			}
		}
		_ => None,
	}
}

/// Fixed step order: whitelist, primary authorization, secondary
/// authorization, execute.
fn assemble_queue(route: &ResolvedRoute, plan: &StepPlan) -> VecDeque<PlannedStep> {
	let mut queue = VecDeque::new();
	if plan.whitelist_needed {
		queue.push_back(PlannedStep::Whitelist {
			operator: route.spender,
		});
	}
	if let Some(requirement) = &plan.primary_auth {
		queue.push_back(PlannedStep::Auth {
			slot: PermitSlot::Primary,
			requirement: requirement.clone(),
		});
	}
	if let Some(requirement) = &plan.secondary_auth {
		queue.push_back(PlannedStep::Auth {
			slot: PermitSlot::Secondary,
			requirement: requirement.clone(),
		});
	}
	queue.push_back(PlannedStep::Execute);
	queue
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sequencer::SequencerYield;
	use async_trait::async_trait;
	use manager_chain::ChainError;
	use manager_types::{ExecuteCall, Step, StepKind, TokenId, B256, U256};
	use std::collections::HashMap;

	const CONFIG: &str = r#"
		[network]
		name = "testnet"
		chain_id = 11155111
		rpc_url = "https://rpc.example.org"
		confirmations = 1

		[account]
		private_key = "0x01"

		[contracts]
		vault_engine = "0x1111111111111111111111111111111111111111"
		savings_vault = "0x2222222222222222222222222222222222222222"
		gateway = "0x3333333333333333333333333333333333333333"

		[tokens.weth]
		address = "0x4444444444444444444444444444444444444444"
		decimals = 18

		[tokens.usds]
		address = "0x5555555555555555555555555555555555555555"
		decimals = 18
		permit = true

		[tokens.dai]
		address = "0x6666666666666666666666666666666666666666"
		decimals = 18
		permit = true

		[position]
		collateral_token = "weth"
		debt_token = "usds"
		gateway_token = "dai"

		[savings]
		underlying_token = "usds"
	"#;

	fn config() -> Arc<NetworkConfig> {
		Arc::new(toml::from_str(CONFIG).unwrap())
	}

	#[derive(Default)]
	struct MockChain {
		allowances: HashMap<Address, U256>,
		operator_approved: bool,
		eoa: bool,
	}

	#[async_trait]
	impl ChainReader for MockChain {
		async fn allowance(
			&self,
			token: Address,
			_owner: Address,
			_spender: Address,
		) -> Result<U256, ChainError> {
			Ok(self.allowances.get(&token).copied().unwrap_or_default())
		}

		async fn is_operator_approved(
			&self,
			_owner: Address,
			_operator: Address,
		) -> Result<bool, ChainError> {
			Ok(self.operator_approved)
		}

		async fn is_externally_owned(&self, _address: Address) -> Result<bool, ChainError> {
			Ok(self.eoa)
		}

		async fn permit_nonce(
			&self,
			_token: Address,
			_owner: Address,
		) -> Result<U256, ChainError> {
			Ok(U256::ZERO)
		}

		async fn token_name(&self, _token: Address) -> Result<String, ChainError> {
			Ok("Mock Token".to_string())
		}
	}

	fn planner(chain: MockChain) -> Planner {
		Planner::new(config(), Arc::new(chain))
	}

	fn owner() -> Address {
		Address::repeat_byte(0x77)
	}

	fn position_intent(
		collateral: i64,
		debt: i64,
		token: &str,
		preference: ApprovalMethod,
	) -> Intent {
		Intent {
			action: IntentAction::AdjustPosition {
				collateral_delta: Decimal::from(collateral),
				debt_delta: Decimal::from(debt),
			},
			authorization_token: TokenId::from(token),
			fee_cap: Decimal::ZERO,
			approval_preference: preference,
		}
	}

	fn savings_intent(delta: i64, preference: ApprovalMethod) -> Intent {
		Intent {
			action: IntentAction::Savings {
				delta: Decimal::from(delta),
			},
			authorization_token: TokenId::from("usds"),
			fee_cap: Decimal::ZERO,
			approval_preference: preference,
		}
	}

	fn signature(token: Address, value: u64, deadline: u64) -> PermitSignature {
		PermitSignature {
			token,
			value: manager_types::to_base_units(Decimal::from(value), 18).unwrap(),
			deadline,
			v: 27,
			r: B256::repeat_byte(0x01),
			s: B256::repeat_byte(0x02),
		}
	}

	fn drain(sequencer: &mut StepSequencer) -> Vec<Step> {
		let mut steps = Vec::new();
		loop {
			match sequencer.next(None).unwrap() {
				SequencerYield::Step(step) => {
					let is_permit = matches!(step.kind, StepKind::Permit { .. });
					steps.push(step);
					assert!(!is_permit, "drain cannot cross a permit step");
				}
				SequencerYield::Done => return steps,
			}
		}
	}

	fn dai_address() -> Address {
		config().tokens["dai"].address
	}

	fn weth_address() -> Address {
		config().tokens["weth"].address
	}

	fn usds_address() -> Address {
		config().tokens["usds"].address
	}

	#[tokio::test]
	async fn fully_authorized_intent_plans_a_single_execute_step() {
		let chain = MockChain {
			allowances: HashMap::from([
				(weth_address(), U256::MAX),
				(dai_address(), U256::MAX),
			]),
			operator_approved: true,
			eoa: true,
		};
		let intent = position_intent(100, -50, "dai", ApprovalMethod::Approve);

		let mut sequencer = planner(chain)
			.plan(intent, AuthorizationState::default(), owner())
			.await
			.unwrap();
		assert_eq!(sequencer.total_steps(), 1);

		let steps = drain(&mut sequencer);
		assert_eq!(steps.len(), 1);
		assert_eq!(steps[0].step_number, 1);
		assert_eq!(steps[0].total_steps, 1);
		assert!(matches!(steps[0].kind, StepKind::Execute { .. }));
	}

	#[tokio::test]
	async fn full_plan_yields_whitelist_then_primary_then_secondary_then_execute() {
		let chain = MockChain::default();
		let intent = position_intent(100, -50, "dai", ApprovalMethod::Approve);

		let mut sequencer = planner(chain)
			.plan(intent, AuthorizationState::default(), owner())
			.await
			.unwrap();
		let steps = drain(&mut sequencer);

		assert_eq!(steps.len(), 4);
		for (index, step) in steps.iter().enumerate() {
			assert_eq!(step.step_number, index as u32 + 1);
			assert_eq!(step.total_steps, 4);
		}

		let gateway = config().contracts.gateway;
		assert!(
			matches!(steps[0].kind, StepKind::Whitelist { operator } if operator == gateway)
		);
		assert!(matches!(
			&steps[1].kind,
			StepKind::Approve { token, spender, .. }
				if token.as_str() == "weth" && *spender == gateway
		));
		assert!(matches!(
			&steps[2].kind,
			StepKind::Approve { token, spender, .. }
				if token.as_str() == "dai" && *spender == gateway
		));
		assert!(matches!(steps[3].kind, StepKind::Execute { .. }));
	}

	#[tokio::test]
	async fn permit_step_resumed_without_signature_fails() {
		let chain = MockChain {
			eoa: true,
			..Default::default()
		};
		let intent = savings_intent(100, ApprovalMethod::Permit);

		let mut sequencer = planner(chain)
			.plan(intent, AuthorizationState::default(), owner())
			.await
			.unwrap();

		let SequencerYield::Step(step) = sequencer.next(None).unwrap() else {
			panic!("expected a step");
		};
		assert!(matches!(step.kind, StepKind::Permit { .. }));

		assert!(matches!(
			sequencer.next(None),
			Err(PlanError::SignatureRequired { token }) if token.as_str() == "usds"
		));
	}

	#[tokio::test]
	async fn permit_plan_threads_the_signature_into_execute() {
		let chain = MockChain {
			eoa: true,
			..Default::default()
		};
		let intent = savings_intent(100, ApprovalMethod::Permit);

		let mut sequencer = planner(chain)
			.plan(intent, AuthorizationState::default(), owner())
			.await
			.unwrap();
		assert_eq!(sequencer.total_steps(), 2);

		let SequencerYield::Step(permit_step) = sequencer.next(None).unwrap() else {
			panic!("expected a step");
		};
		let savings_vault = config().contracts.savings_vault;
		assert!(matches!(
			&permit_step.kind,
			StepKind::Permit { token, amount, spender }
				if token.as_str() == "usds"
					&& *amount == Decimal::from(100)
					&& *spender == savings_vault
		));

		let signed = signature(usds_address(), 100, u64::MAX);
		let SequencerYield::Step(execute) = sequencer.next(Some(signed.clone())).unwrap() else {
			panic!("expected the execute step");
		};
		assert_eq!(
			execute.kind,
			StepKind::Execute {
				call: ExecuteCall::SavingsDeposit {
					amount: Decimal::from(100),
					permit: signed,
				},
			}
		);
		assert_eq!(sequencer.next(None).unwrap(), SequencerYield::Done);
	}

	#[tokio::test]
	async fn cached_allowance_suppresses_the_step_only_when_sufficient() {
		let intent = savings_intent(100, ApprovalMethod::Approve);

		// Sufficient prefetched allowance: no authorization step, and the
		// chain is never asked.
		let state = AuthorizationState {
			primary_allowance: Some(Decimal::from(200)),
			..Default::default()
		};
		let mut sequencer = planner(MockChain::default())
			.plan(intent.clone(), state, owner())
			.await
			.unwrap();
		assert_eq!(sequencer.total_steps(), 1);
		assert!(matches!(
			drain(&mut sequencer)[0].kind,
			StepKind::Execute { .. }
		));

		// Insufficient prefetched allowance: the step stays.
		let state = AuthorizationState {
			primary_allowance: Some(Decimal::from(50)),
			..Default::default()
		};
		let mut sequencer = planner(MockChain::default())
			.plan(intent, state, owner())
			.await
			.unwrap();
		assert_eq!(sequencer.total_steps(), 2);
		assert!(matches!(
			drain(&mut sequencer)[0].kind,
			StepKind::Approve { .. }
		));
	}

	#[tokio::test]
	async fn cached_permit_suppresses_the_step_and_reaches_execute() {
		let chain = MockChain {
			eoa: true,
			..Default::default()
		};
		let cached = signature(usds_address(), 150, u64::MAX);
		let state = AuthorizationState {
			primary_permit: Some(cached.clone()),
			..Default::default()
		};

		let mut sequencer = planner(chain)
			.plan(savings_intent(100, ApprovalMethod::Permit), state, owner())
			.await
			.unwrap();
		assert_eq!(sequencer.total_steps(), 1);

		let steps = drain(&mut sequencer);
		assert_eq!(
			steps[0].kind,
			StepKind::Execute {
				call: ExecuteCall::SavingsDeposit {
					amount: Decimal::from(100),
					permit: cached,
				},
			}
		);
	}

	#[tokio::test]
	async fn close_out_is_a_valid_intent() {
		// Direct route: the engine settles the repayment itself, no
		// secondary authorization, a single execute step.
		let intent = Intent {
			action: IntentAction::AdjustPosition {
				collateral_delta: Decimal::ZERO,
				debt_delta: Decimal::MIN,
			},
			authorization_token: TokenId::from("usds"),
			fee_cap: Decimal::ZERO,
			approval_preference: ApprovalMethod::Approve,
		};
		let chain = MockChain {
			operator_approved: true,
			..Default::default()
		};
		let mut sequencer = planner(chain)
			.plan(intent, AuthorizationState::default(), owner())
			.await
			.unwrap();
		assert_eq!(sequencer.total_steps(), 1);
		assert!(matches!(
			drain(&mut sequencer)[0].kind,
			StepKind::Execute { .. }
		));
	}

	#[tokio::test]
	async fn close_out_via_gateway_needs_an_unlimited_grant() {
		let intent = Intent {
			action: IntentAction::AdjustPosition {
				collateral_delta: Decimal::ZERO,
				debt_delta: Decimal::MIN,
			},
			authorization_token: TokenId::from("dai"),
			fee_cap: Decimal::ZERO,
			approval_preference: ApprovalMethod::Approve,
		};
		let chain = MockChain {
			operator_approved: true,
			..Default::default()
		};
		let mut sequencer = planner(chain)
			.plan(intent, AuthorizationState::default(), owner())
			.await
			.unwrap();

		let steps = drain(&mut sequencer);
		assert_eq!(steps.len(), 2);
		assert!(matches!(
			&steps[0].kind,
			StepKind::Approve { token, amount, .. }
				if token.as_str() == "dai" && *amount == Decimal::MAX
		));
	}

	#[tokio::test]
	async fn contract_wallet_is_downgraded_to_approvals_everywhere() {
		let chain = MockChain {
			operator_approved: true,
			eoa: false,
			..Default::default()
		};
		// Permit-capable token on both sides of a gateway repay + deposit.
		let intent = position_intent(10, -5, "dai", ApprovalMethod::Permit);

		let mut sequencer = planner(chain)
			.plan(intent, AuthorizationState::default(), owner())
			.await
			.unwrap();
		let steps = drain(&mut sequencer);

		assert_eq!(steps.len(), 3);
		assert!(matches!(steps[0].kind, StepKind::Approve { .. }));
		assert!(matches!(steps[1].kind, StepKind::Approve { .. }));
		assert!(matches!(steps[2].kind, StepKind::Execute { .. }));
	}

	#[tokio::test]
	async fn noop_intents_are_rejected() {
		let noop = position_intent(0, 0, "usds", ApprovalMethod::Approve);
		assert!(matches!(
			planner(MockChain::default())
				.plan(noop, AuthorizationState::default(), owner())
				.await,
			Err(PlanError::InvalidIntent)
		));

		let noop = savings_intent(0, ApprovalMethod::Approve);
		assert!(matches!(
			planner(MockChain::default())
				.plan(noop, AuthorizationState::default(), owner())
				.await,
			Err(PlanError::InvalidIntent)
		));
	}

	#[tokio::test]
	async fn unroutable_authorization_tokens_are_rejected() {
		let intent = position_intent(10, 0, "weth", ApprovalMethod::Approve);
		assert!(matches!(
			planner(MockChain::default())
				.plan(intent, AuthorizationState::default(), owner())
				.await,
			Err(PlanError::UnsupportedRoute { token }) if token.as_str() == "weth"
		));

		let mut intent = savings_intent(10, ApprovalMethod::Approve);
		intent.authorization_token = TokenId::from("dai");
		assert!(matches!(
			planner(MockChain::default())
				.plan(intent, AuthorizationState::default(), owner())
				.await,
			Err(PlanError::UnsupportedRoute { .. })
		));
	}

	#[tokio::test]
	async fn direct_route_never_asks_for_whitelist_or_secondary_auth() {
		// Repay on the native path with nothing approved at all: the plan
		// is still just the execute step.
		let intent = position_intent(0, -50, "usds", ApprovalMethod::Approve);
		let mut sequencer = planner(MockChain::default())
			.plan(intent, AuthorizationState::default(), owner())
			.await
			.unwrap();
		assert_eq!(sequencer.total_steps(), 1);
		assert!(matches!(
			drain(&mut sequencer)[0].kind,
			StepKind::Execute { .. }
		));
	}
}
