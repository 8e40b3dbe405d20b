//! Phase tags and the per-package runtime state they live in.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::StatusMessage;

/// What a machine is doing right now. At most one active phase exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Upgrading,
    Committing,
    CheckingOut,
}

impl Phase {
    pub fn is_idle(self) -> bool {
        self == Phase::Idle
    }
}

/// The three guarded operations a machine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Upgrade,
    CommitAndPush,
    CheckoutDefaultBranch,
}

impl Operation {
    /// Phase held while this operation is in flight.
    pub fn phase(self) -> Phase {
        match self {
            Operation::Upgrade => Phase::Upgrading,
            Operation::CommitAndPush => Phase::Committing,
            Operation::CheckoutDefaultBranch => Phase::CheckingOut,
        }
    }

    /// Used when a successful result carries no message.
    pub fn success_fallback(self) -> &'static str {
        match self {
            Operation::Upgrade => "Upgraded!",
            Operation::CommitAndPush => "Committed and pushed!",
            Operation::CheckoutDefaultBranch => "Checked out!",
        }
    }

    /// Used when a failed result carries no error.
    pub fn failure_fallback(self) -> &'static str {
        match self {
            Operation::Upgrade => "Upgrade failed",
            Operation::CommitAndPush => "Commit failed",
            Operation::CheckoutDefaultBranch => "Checkout failed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Upgrade => "upgrade",
            Operation::CommitAndPush => "commit_and_push",
            Operation::CheckoutDefaultBranch => "checkout_default_branch",
        };
        f.write_str(name)
    }
}

/// Mutable session state owned by exactly one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationState {
    pub phase: Phase,
    /// Set once an upgrade succeeds; never cleared.
    pub was_upgraded: bool,
    pub last_message: Option<StatusMessage>,
}

impl RemediationState {
    pub fn is_busy(&self) -> bool {
        !self.phase.is_idle()
    }
}
