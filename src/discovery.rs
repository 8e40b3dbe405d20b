use crate::model::PackageInfo;
use crate::traits::{ActionError, PackageDiscovery};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Reads the package list from a JSON snapshot written by the scanner.
///
/// The file holds an array of [`PackageInfo`] objects in camelCase.
pub struct JsonSnapshotDiscovery {
    path: PathBuf,
}

impl JsonSnapshotDiscovery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PackageDiscovery for JsonSnapshotDiscovery {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn discover(&self) -> Result<Vec<PackageInfo>, ActionError> {
        let raw = tokio::fs::read(&self.path).await?;
        let packages: Vec<PackageInfo> = serde_json::from_slice(&raw)?;
        info!(count = packages.len(), "Loaded package snapshot");
        Ok(packages)
    }
}
