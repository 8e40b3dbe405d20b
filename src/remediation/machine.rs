//! Per-package remediation state machine.
//!
//! A [`PackageMachine`] owns one package's [`RemediationState`] and runs the
//! three guarded operations against a [`RemediationActions`] collaborator:
//! - The `Idle` check and the phase write happen in one atomic step, so any
//!   number of drivers may share a machine through an `Arc`
//! - A request arriving while another operation is in flight is ignored
//! - The phase returns to `Idle` only once the collaborator has terminated,
//!   even when the caller stops waiting for the result
//! - Collaborator faults (errors, panics) never escape; they become an error
//!   [`StatusMessage`]

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::config::{RemediatorConfig, UpgradePolicy};
use crate::model::{ActionResult, PackageInfo, StatusMessage};
use crate::remediation::actions::{available_actions, AvailableActions};
use crate::remediation::phase::{Operation, Phase, RemediationState};
use crate::traits::RemediationActions;

/// Banner text for collaborator faults.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Result of asking a machine to run an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The operation ran; this is the message it left behind.
    Completed(StatusMessage),
    /// The machine was busy (or policy refused) and nothing happened.
    Ignored,
}

impl OperationOutcome {
    pub fn message(&self) -> Option<&StatusMessage> {
        match self {
            OperationOutcome::Completed(message) => Some(message),
            OperationOutcome::Ignored => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, OperationOutcome::Ignored)
    }
}

/// Point-in-time copy of a package and its runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSnapshot {
    pub info: PackageInfo,
    pub state: RemediationState,
    pub actions: AvailableActions,
}

pub struct PackageMachine {
    info: watch::Sender<PackageInfo>,
    state: Arc<watch::Sender<RemediationState>>,
    actions: Arc<dyn RemediationActions>,
    upgrade_policy: UpgradePolicy,
}

impl PackageMachine {
    pub fn new(info: PackageInfo, actions: Arc<dyn RemediationActions>) -> Self {
        let (info, _) = watch::channel(info);
        let (state, _) = watch::channel(RemediationState::default());
        Self {
            info,
            state: Arc::new(state),
            actions,
            upgrade_policy: UpgradePolicy::default(),
        }
    }

    /// Applies the upgrade policy from `config`.
    pub fn with_config(mut self, config: &RemediatorConfig) -> Self {
        self.upgrade_policy = config.upgrade_policy;
        self
    }

    pub fn with_upgrade_policy(mut self, policy: UpgradePolicy) -> Self {
        self.upgrade_policy = policy;
        self
    }

    pub fn path(&self) -> String {
        self.info.borrow().path.clone()
    }

    pub fn info(&self) -> PackageInfo {
        self.info.borrow().clone()
    }

    pub fn state(&self) -> RemediationState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn is_vulnerable(&self) -> bool {
        self.info.borrow().is_vulnerable()
    }

    /// Receives every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RemediationState> {
        self.state.subscribe()
    }

    /// Receives refreshed package info; unchanged refreshes are not signalled.
    pub fn subscribe_info(&self) -> watch::Receiver<PackageInfo> {
        self.info.subscribe()
    }

    /// Replaces the discovered info; runtime state is untouched.
    pub fn update_info(&self, info: PackageInfo) {
        self.info.send_if_modified(|current| {
            if *current == info {
                false
            } else {
                *current = info;
                true
            }
        });
    }

    pub fn snapshot(&self) -> PackageSnapshot {
        let info = self.info();
        let state = self.state();
        let actions = available_actions(&info, &state);
        PackageSnapshot {
            info,
            state,
            actions,
        }
    }

    pub async fn upgrade(&self) -> OperationOutcome {
        self.run(Operation::Upgrade).await
    }

    pub async fn commit_and_push(&self) -> OperationOutcome {
        self.run(Operation::CommitAndPush).await
    }

    pub async fn checkout_default_branch(&self) -> OperationOutcome {
        self.run(Operation::CheckoutDefaultBranch).await
    }

    /// Runs `operation` if the machine is idle.
    ///
    /// The operation is driven by its own task, which also writes the final
    /// state. Dropping the returned future stops waiting for the result but
    /// leaves the operation running; the machine stays busy until it ends.
    #[instrument(skip(self), fields(path = %self.path()))]
    pub async fn run(&self, operation: Operation) -> OperationOutcome {
        let pkg = self.info();

        if operation == Operation::Upgrade
            && self.upgrade_policy == UpgradePolicy::VulnerableOnly
            && !pkg.is_vulnerable()
        {
            debug!("Ignoring upgrade for package that is not vulnerable");
            return OperationOutcome::Ignored;
        }

        if !Self::claim(&self.state, operation) {
            debug!(%operation, phase = ?self.phase(), "Ignoring request while busy");
            return OperationOutcome::Ignored;
        }

        info!(%operation, "Starting operation");

        let state = Arc::clone(&self.state);
        let actions = Arc::clone(&self.actions);
        let driver = tokio::spawn(async move {
            let collaborator = tokio::spawn(async move {
                match operation {
                    Operation::Upgrade => actions.upgrade(&pkg).await,
                    Operation::CommitAndPush => actions.commit_and_push(&pkg).await,
                    Operation::CheckoutDefaultBranch => {
                        actions.checkout_default_branch(&pkg).await
                    }
                }
            }
            .in_current_span());

            let message = match collaborator.await {
                Ok(Ok(result)) => Self::message_from(operation, result),
                Ok(Err(e)) => {
                    warn!(%operation, error = %e, "Collaborator fault");
                    StatusMessage::error(UNEXPECTED_ERROR)
                }
                Err(e) => {
                    warn!(%operation, error = %e, "Collaborator task did not complete");
                    StatusMessage::error(UNEXPECTED_ERROR)
                }
            };

            if message.is_error() {
                warn!(%operation, text = %message.text, "Operation failed");
            } else {
                info!(%operation, text = %message.text, "Operation succeeded");
            }

            Self::release(&state, operation, message.clone());
            message
        }
        .in_current_span());

        match driver.await {
            Ok(message) => OperationOutcome::Completed(message),
            Err(e) => {
                warn!(%operation, error = %e, "Operation driver did not complete");
                OperationOutcome::Completed(StatusMessage::error(UNEXPECTED_ERROR))
            }
        }
    }

    /// Moves an idle machine into `operation`'s phase and clears the banner.
    fn claim(state: &watch::Sender<RemediationState>, operation: Operation) -> bool {
        state.send_if_modified(|s| {
            if !s.phase.is_idle() {
                return false;
            }
            s.phase = operation.phase();
            s.last_message = None;
            true
        })
    }

    /// Records the final message and returns to `Idle` in one update.
    fn release(
        state: &watch::Sender<RemediationState>,
        operation: Operation,
        message: StatusMessage,
    ) {
        let upgraded = operation == Operation::Upgrade && !message.is_error();
        state.send_modify(|s| {
            if upgraded {
                s.was_upgraded = true;
            }
            s.last_message = Some(message);
            s.phase = Phase::Idle;
        });
    }

    fn message_from(operation: Operation, result: ActionResult) -> StatusMessage {
        if result.success {
            StatusMessage::success(
                result
                    .message
                    .unwrap_or_else(|| operation.success_fallback().to_string()),
            )
        } else {
            StatusMessage::error(
                result
                    .error
                    .unwrap_or_else(|| operation.failure_fallback().to_string()),
            )
        }
    }
}
