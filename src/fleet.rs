//! Fleet controller: the set of tracked packages and its derived view.
//!
//! The controller owns one [`PackageMachine`] per package path, in discovery
//! order. Nothing is cached: [`FleetController::view`] recomputes counts and
//! the filtered sequence from the machines every time it is called.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::RemediatorConfig;
use crate::executor::{BatchOutcome, FleetExecutor};
use crate::model::PackageInfo;
use crate::remediation::{Operation, OperationOutcome, PackageMachine, PackageSnapshot};
use crate::traits::{ActionError, PackageDiscovery, RemediationActions};

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Unknown package: {0}")]
    UnknownPackage(String),
    #[error("Duplicate package path: {0}")]
    DuplicatePath(String),
    #[error("Discovery failed: {0}")]
    Discovery(#[from] ActionError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    #[default]
    All,
    VulnerableOnly,
}

impl Filter {
    pub fn matches(self, info: &PackageInfo) -> bool {
        match self {
            Filter::All => true,
            Filter::VulnerableOnly => info.is_vulnerable(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FleetStatus {
    AllSecure,
    Vulnerable(usize),
}

/// Derived view over the fleet at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetView {
    pub total: usize,
    pub vulnerable: usize,
    pub filter: Filter,
    /// Size of the filtered sequence, reported only when filtering hides packages.
    pub shown: Option<usize>,
    pub packages: Vec<PackageSnapshot>,
}

impl FleetView {
    pub fn status(&self) -> FleetStatus {
        if self.vulnerable == 0 {
            FleetStatus::AllSecure
        } else {
            FleetStatus::Vulnerable(self.vulnerable)
        }
    }

    /// Label for the filter toggle; `None` when there is nothing to filter.
    pub fn filter_toggle(&self) -> Option<&'static str> {
        if self.vulnerable == 0 {
            return None;
        }
        Some(match self.filter {
            Filter::All => "Vulnerable Only",
            Filter::VulnerableOnly => "Show All",
        })
    }
}

pub struct FleetController {
    config: RemediatorConfig,
    actions: Arc<dyn RemediationActions>,
    executor: FleetExecutor,
    order: Vec<String>,
    machines: HashMap<String, Arc<PackageMachine>>,
    filter: Filter,
}

impl FleetController {
    pub fn new(config: RemediatorConfig, actions: Arc<dyn RemediationActions>) -> Self {
        let executor = FleetExecutor::new(config.max_concurrent_operations.max(1));
        Self {
            config,
            actions,
            executor,
            order: Vec::new(),
            machines: HashMap::new(),
            filter: Filter::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn machine(&self, path: &str) -> Option<Arc<PackageMachine>> {
        self.machines.get(path).cloned()
    }

    /// Machines in canonical order.
    pub fn machines(&self) -> impl Iterator<Item = &Arc<PackageMachine>> {
        self.order.iter().filter_map(|path| self.machines.get(path))
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn toggle_filter(&mut self) -> Filter {
        self.filter = match self.filter {
            Filter::All => Filter::VulnerableOnly,
            Filter::VulnerableOnly => Filter::All,
        };
        self.filter
    }

    /// Reconciles the fleet with a fresh discovery result.
    ///
    /// Known paths keep their machine and runtime state, new paths get a fresh
    /// machine, and paths no longer reported are dropped. On a duplicate path
    /// the fleet is left unchanged.
    #[instrument(skip(self, packages), fields(count = packages.len()))]
    pub fn sync(&mut self, packages: Vec<PackageInfo>) -> Result<(), FleetError> {
        let mut seen = HashSet::with_capacity(packages.len());
        for pkg in &packages {
            if !seen.insert(pkg.path.as_str()) {
                return Err(FleetError::DuplicatePath(pkg.path.clone()));
            }
        }

        let mut previous = std::mem::take(&mut self.machines);
        let mut order = Vec::with_capacity(packages.len());
        let mut added = 0usize;

        for pkg in packages {
            let path = pkg.path.clone();
            let machine = match previous.remove(&path) {
                Some(machine) => {
                    machine.update_info(pkg);
                    machine
                }
                None => {
                    added += 1;
                    Arc::new(
                        PackageMachine::new(pkg, Arc::clone(&self.actions))
                            .with_config(&self.config),
                    )
                }
            };
            self.machines.insert(path.clone(), machine);
            order.push(path);
        }
        self.order = order;

        for path in previous.keys() {
            debug!(path = %path, "No longer tracked");
        }
        info!(
            tracked = self.order.len(),
            added,
            removed = previous.len(),
            "Fleet synchronized"
        );
        Ok(())
    }

    pub async fn refresh(&mut self, discovery: &dyn PackageDiscovery) -> Result<(), FleetError> {
        let packages = discovery.discover().await?;
        self.sync(packages)
    }

    pub fn view(&self) -> FleetView {
        let snapshots: Vec<PackageSnapshot> = self.machines().map(|m| m.snapshot()).collect();
        let total = snapshots.len();
        let vulnerable = snapshots.iter().filter(|s| s.info.is_vulnerable()).count();

        let packages: Vec<PackageSnapshot> = snapshots
            .into_iter()
            .filter(|s| self.filter.matches(&s.info))
            .collect();
        let shown = (self.filter == Filter::VulnerableOnly && packages.len() != total)
            .then_some(packages.len());

        FleetView {
            total,
            vulnerable,
            filter: self.filter,
            shown,
            packages,
        }
    }

    pub async fn run(
        &self,
        path: &str,
        operation: Operation,
    ) -> Result<OperationOutcome, FleetError> {
        let machine = self
            .machine(path)
            .ok_or_else(|| FleetError::UnknownPackage(path.to_string()))?;
        Ok(machine.run(operation).await)
    }

    pub async fn upgrade(&self, path: &str) -> Result<OperationOutcome, FleetError> {
        self.run(path, Operation::Upgrade).await
    }

    pub async fn commit_and_push(&self, path: &str) -> Result<OperationOutcome, FleetError> {
        self.run(path, Operation::CommitAndPush).await
    }

    pub async fn checkout_default_branch(
        &self,
        path: &str,
    ) -> Result<OperationOutcome, FleetError> {
        self.run(path, Operation::CheckoutDefaultBranch).await
    }

    /// Runs `operation` on every package matching `filter`, bounded by the
    /// configured concurrency.
    pub async fn run_batch(&self, operation: Operation, filter: Filter) -> Vec<BatchOutcome> {
        let targets: Vec<Arc<PackageMachine>> = self
            .machines()
            .filter(|m| filter.matches(&m.info()))
            .cloned()
            .collect();
        self.executor.execute_all(targets, operation).await
    }

    pub async fn remediate_vulnerable(&self) -> Vec<BatchOutcome> {
        self.run_batch(Operation::Upgrade, Filter::VulnerableOnly).await
    }
}
