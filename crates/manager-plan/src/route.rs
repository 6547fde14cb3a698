//! Authorization-token routing.
//!
//! The intent's authorization token decides whether an operation talks to
//! the engine or savings vault directly, or routes through the gateway
//! operator contract. The route fixes the allowance spender and which
//! tokens each side of the plan spends.

use crate::PlanError;
use manager_config::NetworkConfig;
use manager_types::{Address, Intent, IntentAction, Route, TokenId};

/// Resolved contract path for one intent.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
	pub route: Route,
	/// Contract granted token allowances for this operation.
	pub spender: Address,
	/// Token spent on the primary (collateral / savings) side.
	pub primary_token: TokenId,
	/// Token pulled on the secondary (debt repayment) side.
	pub secondary_token: TokenId,
}

/// Maps an intent's authorization token onto a contract route, rejecting
/// tokens that cannot settle the targeted operation.
pub fn resolve_route(config: &NetworkConfig, intent: &Intent) -> Result<ResolvedRoute, PlanError> {
	let unsupported = || PlanError::UnsupportedRoute {
		token: intent.authorization_token.clone(),
	};

	match &intent.action {
		IntentAction::AdjustPosition { .. } => {
			let authorization = intent.authorization_token.as_str();
			if authorization == config.position.debt_token {
				Ok(ResolvedRoute {
					route: Route::Direct,
					spender: config.contracts.vault_engine,
					primary_token: TokenId::new(&config.position.collateral_token),
					secondary_token: intent.authorization_token.clone(),
				})
			} else if authorization == config.position.gateway_token {
				Ok(ResolvedRoute {
					route: Route::Gateway,
					spender: config.contracts.gateway,
					primary_token: TokenId::new(&config.position.collateral_token),
					secondary_token: intent.authorization_token.clone(),
				})
			} else {
				Err(unsupported())
			}
		}
		IntentAction::Savings { .. } => {
			if intent.authorization_token.as_str() == config.savings.underlying_token {
				Ok(ResolvedRoute {
					route: Route::Direct,
					spender: config.contracts.savings_vault,
					primary_token: intent.authorization_token.clone(),
					secondary_token: intent.authorization_token.clone(),
				})
			} else {
				Err(unsupported())
			}
		}
	}
}
