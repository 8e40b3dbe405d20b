//! Which controls a package offers, derived from its info and state.

use serde::{Deserialize, Serialize};

use crate::model::PackageInfo;
use crate::remediation::phase::{Phase, RemediationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionIcon {
    Upgrade,
    Commit,
    Home,
    Download,
    Spinner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutKind {
    /// Already on the default branch; fetch what it is missing.
    Pull,
    /// Switch back to the default branch.
    ReturnToDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutAction {
    pub kind: CheckoutKind,
    pub label: String,
    pub icon: ActionIcon,
    /// `"+N"` when the branch trails the default branch.
    pub badge: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub icon: ActionIcon,
    pub enabled: bool,
    pub in_flight: bool,
}

impl ActionButton {
    fn new(icon: ActionIcon, active: Phase, own: Phase) -> Self {
        let in_flight = active == own;
        Self {
            icon: if in_flight { ActionIcon::Spinner } else { icon },
            enabled: active.is_idle(),
            in_flight,
        }
    }
}

/// Controls offered for one package. `None` means the control is hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableActions {
    pub upgrade: Option<ActionButton>,
    pub commit: Option<ActionButton>,
    pub checkout: Option<CheckoutAction>,
}

pub fn offers_upgrade(info: &PackageInfo) -> bool {
    info.is_vulnerable()
}

/// Commit stays available after an upgrade even once the vulnerability clears.
pub fn offers_commit(info: &PackageInfo, was_upgraded: bool) -> bool {
    info.is_vulnerable() || was_upgraded
}

pub fn checkout_action(info: &PackageInfo, state: &RemediationState) -> Option<CheckoutAction> {
    let default_branch = info.default_branch.as_ref()?;
    info.git_branch.as_ref()?;

    let on_default = info.on_default_branch();
    let behind = info.behind_count();
    if on_default && behind.is_none() {
        return None;
    }

    let (kind, label, icon) = if on_default {
        (CheckoutKind::Pull, "Pull".to_string(), ActionIcon::Download)
    } else {
        (
            CheckoutKind::ReturnToDefault,
            default_branch.clone(),
            ActionIcon::Home,
        )
    };

    let icon = if state.phase == Phase::CheckingOut {
        ActionIcon::Spinner
    } else {
        icon
    };

    Some(CheckoutAction {
        kind,
        label,
        icon,
        badge: behind.map(|n| format!("+{n}")),
        enabled: state.phase.is_idle(),
    })
}

pub fn available_actions(info: &PackageInfo, state: &RemediationState) -> AvailableActions {
    AvailableActions {
        upgrade: offers_upgrade(info)
            .then(|| ActionButton::new(ActionIcon::Upgrade, state.phase, Phase::Upgrading)),
        commit: offers_commit(info, state.was_upgraded)
            .then(|| ActionButton::new(ActionIcon::Commit, state.phase, Phase::Committing)),
        checkout: checkout_action(info, state),
    }
}
