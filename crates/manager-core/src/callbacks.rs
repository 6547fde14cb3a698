//! Lifecycle callbacks observed around each executed step.

use crate::ManageError;
use manager_types::{Step, StepKind};

pub type StartHook = Box<dyn Fn(&Step) + Send + Sync>;
pub type EndHook = Box<dyn Fn(&Step, Option<&ManageError>) + Send + Sync>;

/// Observation hooks, one start/end pair per step family. End hooks see
/// the error exactly once before it propagates out of the run.
#[derive(Default)]
pub struct StepCallbacks {
	pub on_whitelist_start: Option<StartHook>,
	pub on_whitelist_end: Option<EndHook>,
	/// Covers both permit and approval steps.
	pub on_authorization_start: Option<StartHook>,
	pub on_authorization_end: Option<EndHook>,
	pub on_execute_start: Option<StartHook>,
	pub on_execute_end: Option<EndHook>,
}

impl StepCallbacks {
	pub(crate) fn start(&self, step: &Step) {
		let hook = match step.kind {
			StepKind::Whitelist { .. } => &self.on_whitelist_start,
			StepKind::Permit { .. } | StepKind::Approve { .. } => &self.on_authorization_start,
			StepKind::Execute { .. } => &self.on_execute_start,
		};
		if let Some(hook) = hook {
			hook(step);
		}
	}

	pub(crate) fn end(&self, step: &Step, error: Option<&ManageError>) {
		let hook = match step.kind {
			StepKind::Whitelist { .. } => &self.on_whitelist_end,
			StepKind::Permit { .. } | StepKind::Approve { .. } => &self.on_authorization_end,
			StepKind::Execute { .. } => &self.on_execute_end,
		};
		if let Some(hook) = hook {
			hook(step, error);
		}
	}
}
