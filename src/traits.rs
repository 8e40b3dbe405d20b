use crate::model::{ActionResult, PackageInfo};
use async_trait::async_trait;
use thiserror::Error;

/// Collaborator fault outside the normal [`ActionResult`] contract.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Command failed: {0}")]
    CommandFailed(String),
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Remote-mutating operations performed against a package's working copy.
///
/// An expected failure is `Ok(ActionResult { success: false, .. })`. `Err`
/// is reserved for faults the collaborator could not report normally.
#[async_trait]
pub trait RemediationActions: Send + Sync {
    /// Upgrades the vulnerable dependencies in the package manifest.
    async fn upgrade(&self, pkg: &PackageInfo) -> Result<ActionResult, ActionError>;

    /// Stages, commits and pushes the working copy's current changes.
    async fn commit_and_push(&self, pkg: &PackageInfo) -> Result<ActionResult, ActionError>;

    /// Switches to `pkg.default_branch`, or pulls when already on it.
    async fn checkout_default_branch(&self, pkg: &PackageInfo)
        -> Result<ActionResult, ActionError>;
}

/// Supplies the ordered set of tracked packages.
#[async_trait]
pub trait PackageDiscovery: Send + Sync {
    async fn discover(&self) -> Result<Vec<PackageInfo>, ActionError>;
}
