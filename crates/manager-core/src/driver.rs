//! The orchestration driver.

use crate::{ManageError, StepCallbacks};
use manager_account::permit::{permit_digest, permit_domain, PERMIT_TTL_SECS};
use manager_account::AccountInterface;
use manager_chain::{calls, ChainReader};
use manager_config::NetworkConfig;
use manager_delivery::DeliveryInterface;
use manager_plan::{Planner, StepSequencer, SequencerYield};
use manager_types::{
	to_base_units, unix_now, Address, AuthorizationState, Intent, PermitSignature, Step, StepKind,
	TokenId, Transaction, TransactionReceipt,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// What one executed step produced.
enum StepOutcome {
	/// A confirmed transaction.
	Confirmed(TransactionReceipt),
	/// A freshly signed permit, injected into the sequencer on the next
	/// advance. Signatures need no on-chain wait.
	Signed(PermitSignature),
}

/// Plans intents and drives their step sequences.
pub struct ManagerEngine {
	config: Arc<NetworkConfig>,
	chain: Arc<dyn ChainReader>,
	account: Arc<dyn AccountInterface>,
	delivery: Arc<dyn DeliveryInterface>,
	planner: Planner,
}

impl ManagerEngine {
	/// Computes the step sequence for an intent without executing
	/// anything. The returned sequencer is drivable by the caller; the
	/// [`ManagerEngine::transaction_for_step`] and
	/// [`ManagerEngine::sign_permit_for_step`] helpers perform the
	/// per-step work on demand.
	pub async fn plan(
		&self,
		intent: Intent,
		state: AuthorizationState,
	) -> Result<StepSequencer, ManageError> {
		let owner = self.account.address().await?;
		Ok(self.planner.plan(intent, state, owner).await?)
	}

	/// Plans an intent and drives every step to completion, awaiting
	/// transaction confirmation between steps. Errors surface after the
	/// matching end callback has observed them; nothing is retried or
	/// rolled back.
	pub async fn run(
		&self,
		intent: Intent,
		state: AuthorizationState,
		callbacks: &StepCallbacks,
	) -> Result<(), ManageError> {
		let owner = self.account.address().await?;
		let fee_cap = self.fee_cap_wei(intent.fee_cap)?;
		let mut sequencer = self.planner.plan(intent, state, owner).await?;
		info!(total_steps = sequencer.total_steps(), "Executing step plan");

		let mut injected: Option<PermitSignature> = None;
		loop {
			match sequencer.next(injected.take())? {
				SequencerYield::Done => return Ok(()),
				SequencerYield::Step(step) => {
					debug!(
						step = step.step_number,
						total = step.total_steps,
						kind = step.kind.label(),
						"Executing step"
					);
					callbacks.start(&step);
					match self.execute_step(&step, owner, fee_cap).await {
						Ok(outcome) => {
							callbacks.end(&step, None);
							if let StepOutcome::Signed(signature) = outcome {
								injected = Some(signature);
							}
						}
						Err(error) => {
							callbacks.end(&step, Some(&error));
							return Err(error);
						}
					}
				}
			}
		}
	}

	/// Builds the transaction a non-permit step submits, for callers
	/// driving the sequence themselves. Permit steps return `None`; they
	/// produce a signature instead.
	pub fn transaction_for_step(
		&self,
		step: &Step,
		owner: Address,
	) -> Result<Option<Transaction>, ManageError> {
		match &step.kind {
			StepKind::Whitelist { operator } => {
				Ok(Some(calls::whitelist_transaction(&self.config, *operator)))
			}
			StepKind::Approve {
				token,
				amount,
				spender,
			} => Ok(Some(calls::approve_transaction(
				&self.config,
				token,
				*spender,
				*amount,
			)?)),
			StepKind::Execute { call } => {
				Ok(Some(calls::execute_transaction(&self.config, owner, call)?))
			}
			StepKind::Permit { .. } => Ok(None),
		}
	}

	/// Signs the permit a permit step asks for. Non-permit steps return
	/// `None`.
	pub async fn sign_permit_for_step(
		&self,
		step: &Step,
		owner: Address,
	) -> Result<Option<PermitSignature>, ManageError> {
		match &step.kind {
			StepKind::Permit {
				token,
				amount,
				spender,
			} => Ok(Some(self.sign_permit(token, *amount, *spender, owner).await?)),
			_ => Ok(None),
		}
	}

	async fn execute_step(
		&self,
		step: &Step,
		owner: Address,
		fee_cap: Option<u128>,
	) -> Result<StepOutcome, ManageError> {
		match &step.kind {
			StepKind::Permit {
				token,
				amount,
				spender,
			} => {
				let signature = self.sign_permit(token, *amount, *spender, owner).await?;
				Ok(StepOutcome::Signed(signature))
			}
			_ => {
				let transaction = self
					.transaction_for_step(step, owner)?
					.ok_or_else(|| ManageError::Configuration("step has no transaction".into()))?;
				let receipt = self.submit_and_confirm(transaction, fee_cap).await?;
				Ok(StepOutcome::Confirmed(receipt))
			}
		}
	}

	async fn submit_and_confirm(
		&self,
		mut transaction: Transaction,
		fee_cap: Option<u128>,
	) -> Result<TransactionReceipt, ManageError> {
		transaction.max_fee_per_gas = fee_cap;
		let gas = self.delivery.estimate_gas(&transaction).await?;
		transaction.gas_limit = Some(gas);

		let hash = self.delivery.submit(transaction).await?;
		let receipt = self
			.delivery
			.wait_for_confirmation(&hash, self.config.network.confirmations)
			.await?;

		if !receipt.success {
			return Err(ManageError::TransactionFailed { hash });
		}
		Ok(receipt)
	}

	async fn sign_permit(
		&self,
		token_id: &TokenId,
		amount: Decimal,
		spender: Address,
		owner: Address,
	) -> Result<PermitSignature, ManageError> {
		let token = self.config.token(token_id)?;
		let value = to_base_units(amount, token.decimals)?;

		// The domain binds the token's on-chain name, not a configured one.
		let (name, nonce) = tokio::try_join!(
			self.chain.token_name(token.address),
			self.chain.permit_nonce(token.address, owner),
		)?;

		let deadline = unix_now() + PERMIT_TTL_SECS;
		let domain = permit_domain(
			&name,
			&token.version,
			self.config.network.chain_id,
			token.address,
		);
		let digest = permit_digest(&domain, owner, spender, value, nonce, deadline);
		let signature = self.account.sign_digest(&digest).await?;

		debug!(token = %token_id, deadline, "Signed permit");
		Ok(PermitSignature {
			token: token.address,
			value,
			deadline,
			v: signature.v,
			r: signature.r,
			s: signature.s,
		})
	}

	/// Converts the intent's fee cap into a max-fee-per-gas in wei. Zero
	/// leaves fees to the node's own estimation.
	fn fee_cap_wei(&self, fee_cap: Decimal) -> Result<Option<u128>, ManageError> {
		if fee_cap.is_zero() {
			return Ok(None);
		}
		let units = to_base_units(fee_cap, self.config.network.fee_decimals)?;
		let wei = u128::try_from(units).map_err(|_| {
			ManageError::Configuration("fee cap exceeds the representable fee range".to_string())
		})?;
		Ok(Some(wei))
	}
}

/// Assembles a [`ManagerEngine`] from its collaborators.
pub struct ManagerBuilder {
	config: Option<Arc<NetworkConfig>>,
	chain: Option<Arc<dyn ChainReader>>,
	account: Option<Arc<dyn AccountInterface>>,
	delivery: Option<Arc<dyn DeliveryInterface>>,
}

impl ManagerBuilder {
	pub fn new() -> Self {
		Self {
			config: None,
			chain: None,
			account: None,
			delivery: None,
		}
	}

	pub fn with_config(mut self, config: NetworkConfig) -> Self {
		self.config = Some(Arc::new(config));
		self
	}

	pub fn with_chain(mut self, chain: Box<dyn ChainReader>) -> Self {
		self.chain = Some(Arc::from(chain));
		self
	}

	pub fn with_account(mut self, account: Box<dyn AccountInterface>) -> Self {
		self.account = Some(Arc::from(account));
		self
	}

	pub fn with_delivery(mut self, delivery: Box<dyn DeliveryInterface>) -> Self {
		self.delivery = Some(Arc::from(delivery));
		self
	}

	pub fn build(self) -> Result<ManagerEngine, ManageError> {
		let config = self
			.config
			.ok_or_else(|| ManageError::Configuration("Network config not provided".into()))?;
		let chain = self
			.chain
			.ok_or_else(|| ManageError::Configuration("Chain reader not provided".into()))?;
		let account = self
			.account
			.ok_or_else(|| ManageError::Configuration("Account not provided".into()))?;
		let delivery = self
			.delivery
			.ok_or_else(|| ManageError::Configuration("Delivery not provided".into()))?;

		let planner = Planner::new(config.clone(), chain.clone());
		Ok(ManagerEngine {
			config,
			chain,
			account,
			delivery,
			planner,
		})
	}
}

impl Default for ManagerBuilder {
	fn default() -> Self {
		Self::new()
	}
}
