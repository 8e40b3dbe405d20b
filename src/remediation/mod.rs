//! Remediation module - guarded per-package operations.
//!
//! - **Phase**: [`Phase`], [`Operation`] and the owned [`RemediationState`]
//! - **Machine**: [`PackageMachine`], one per tracked package
//! - **Actions**: which controls a package offers, via [`available_actions`]

pub mod actions;
pub mod machine;
pub mod phase;

pub use actions::{
    available_actions, checkout_action, offers_commit, offers_upgrade, ActionButton, ActionIcon,
    AvailableActions, CheckoutAction, CheckoutKind,
};
pub use machine::{OperationOutcome, PackageMachine, PackageSnapshot, UNEXPECTED_ERROR};
pub use phase::{Operation, Phase, RemediationState};
