use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use manager_account::implementations::create_account;
use manager_chain::implementations::create_chain_reader;
use manager_config::ConfigLoader;
use manager_core::{ManagerBuilder, ManagerEngine, SequencerYield, StepCallbacks};
use manager_delivery::implementations::create_http_delivery;
use manager_types::{AuthorizationState, Intent, PermitSignature, StepKind};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "position-manager")]
#[command(about = "On-chain position and savings step planner", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	#[arg(long, env = "MANAGER_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the step plan for an intent without executing anything
	Plan {
		/// Path to an intent JSON file
		intent: PathBuf,
	},
	/// Execute an intent end to end
	Run {
		/// Path to an intent JSON file
		intent: PathBuf,
	},
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	match cli.command {
		Commands::Plan { intent } => plan(&cli.config, &intent).await,
		Commands::Run { intent } => run(&cli.config, &intent).await,
		Commands::Validate => validate(&cli.config).await,
	}
}

async fn plan(config_path: &Path, intent_path: &Path) -> Result<()> {
	let engine = build_engine(config_path).await?;
	let intent = read_intent(intent_path)?;

	let mut sequencer = engine
		.plan(intent, AuthorizationState::default())
		.await
		.context("Planning failed")?;

	let mut input = None;
	loop {
		match sequencer.next(input.take())? {
			SequencerYield::Done => break,
			SequencerYield::Step(step) => {
				println!(
					"[{}/{}] {}",
					step.step_number,
					step.total_steps,
					describe(&step.kind)
				);
				if matches!(step.kind, StepKind::Permit { .. }) {
					// Dry run: resume permit steps with the empty sentinel.
					input = Some(PermitSignature::empty());
				}
			}
		}
	}

	Ok(())
}

async fn run(config_path: &Path, intent_path: &Path) -> Result<()> {
	let engine = build_engine(config_path).await?;
	let intent = read_intent(intent_path)?;

	let callbacks = StepCallbacks {
		on_whitelist_start: Some(Box::new(|step| {
			info!(step = step.step_number, total = step.total_steps, "Whitelisting operator");
		})),
		on_whitelist_end: Some(Box::new(|_, error| {
			if let Some(error) = error {
				warn!(%error, "Whitelisting failed");
			}
		})),
		on_authorization_start: Some(Box::new(|step| {
			info!(
				step = step.step_number,
				total = step.total_steps,
				kind = step.kind.label(),
				"Authorizing token spend"
			);
		})),
		on_authorization_end: Some(Box::new(|_, error| {
			if let Some(error) = error {
				warn!(%error, "Authorization failed");
			}
		})),
		on_execute_start: Some(Box::new(|step| {
			info!(step = step.step_number, total = step.total_steps, "Executing");
		})),
		on_execute_end: Some(Box::new(|_, error| {
			if let Some(error) = error {
				warn!(%error, "Execution failed");
			}
		})),
	};

	engine
		.run(intent, AuthorizationState::default(), &callbacks)
		.await
		.context("Intent execution failed")?;

	info!("Intent executed successfully");
	Ok(())
}

async fn validate(config_path: &Path) -> Result<()> {
	let config = ConfigLoader::new()
		.with_file(config_path)
		.load()
		.await
		.context("Failed to load configuration")?;

	info!("Configuration is valid");
	info!("Network: {} (chain id {})", config.network.name, config.network.chain_id);
	info!("Tokens:");
	for (id, token) in &config.tokens {
		info!(
			"  {}: {} ({} decimals{})",
			id,
			token.address,
			token.decimals,
			if token.permit { ", permit" } else { "" }
		);
	}

	Ok(())
}

async fn build_engine(config_path: &Path) -> Result<ManagerEngine> {
	let config = ConfigLoader::new()
		.with_file(config_path)
		.load()
		.await
		.context("Failed to load configuration")?;

	let chain = create_chain_reader(&config).context("Failed to create chain reader")?;
	let account = create_account(&config.account).context("Failed to create account")?;
	let delivery = create_http_delivery(&config).context("Failed to create delivery")?;

	ManagerBuilder::new()
		.with_config(config)
		.with_chain(chain)
		.with_account(account)
		.with_delivery(delivery)
		.build()
		.context("Failed to assemble the engine")
}

fn read_intent(path: &Path) -> Result<Intent> {
	let raw = std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read intent file {:?}", path))?;
	serde_json::from_str(&raw).context("Failed to parse intent JSON")
}

fn describe(kind: &StepKind) -> String {
	match kind {
		StepKind::Whitelist { operator } => format!("whitelist operator {}", operator),
		StepKind::Permit {
			token,
			amount,
			spender,
		} => format!("sign permit: {} {} for {}", amount, token, spender),
		StepKind::Approve {
			token,
			amount,
			spender,
		} => format!("approve: {} {} for {}", amount, token, spender),
		StepKind::Execute { .. } => "execute".to_string(),
	}
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}
