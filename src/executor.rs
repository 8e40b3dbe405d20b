use crate::remediation::{Operation, OperationOutcome, PackageMachine};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinError;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Semaphore error: {0}")]
    Semaphore(#[from] AcquireError),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
}

/// Outcome for one package in a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub path: String,
    pub result: Result<OperationOutcome, ExecutorError>,
}

/// Runs operations across many machines with a cap on how many are in flight.
pub struct FleetExecutor {
    semaphore: Arc<Semaphore>,
}

impl FleetExecutor {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
        }
    }

    #[instrument(skip(self, machine), fields(path = %machine.path()))]
    pub async fn execute(
        &self,
        machine: Arc<PackageMachine>,
        operation: Operation,
    ) -> Result<OperationOutcome, ExecutorError> {
        let _permit = self.semaphore.acquire().await?;
        Ok(machine.run(operation).await)
    }

    /// Runs `operation` on every machine concurrently. Results keep input order.
    #[instrument(skip(self, machines), fields(count = machines.len()))]
    pub async fn execute_all(
        &self,
        machines: Vec<Arc<PackageMachine>>,
        operation: Operation,
    ) -> Vec<BatchOutcome> {
        info!(%operation, "Starting batch");

        let handles: Vec<_> = machines
            .into_iter()
            .map(|machine| {
                let semaphore = Arc::clone(&self.semaphore);
                let path = machine.path();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await?;
                    Ok::<_, ExecutorError>(machine.run(operation).await)
                });
                (path, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ExecutorError::from(e)),
            };
            outcomes.push(BatchOutcome { path, result });
        }

        let completed = outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(OperationOutcome::Completed(_))))
            .count();
        info!(%operation, completed, total = outcomes.len(), "Finished batch");
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionResult, PackageInfo};
    use crate::traits::{ActionError, RemediationActions};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // Tracks the highest number of overlapping upgrade calls
    #[derive(Default)]
    struct CountingActions {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RemediationActions for CountingActions {
        async fn upgrade(&self, pkg: &PackageInfo) -> Result<ActionResult, ActionError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(ActionResult::ok(format!("Upgraded {}", pkg.relative_path)))
        }

        async fn commit_and_push(&self, _pkg: &PackageInfo) -> Result<ActionResult, ActionError> {
            Ok(ActionResult::failed("nothing to commit"))
        }

        async fn checkout_default_branch(
            &self,
            _pkg: &PackageInfo,
        ) -> Result<ActionResult, ActionError> {
            Ok(ActionResult::ok("Checked out main"))
        }
    }

    fn machines(actions: Arc<CountingActions>, count: usize) -> Vec<Arc<PackageMachine>> {
        (0..count)
            .map(|i| {
                let pkg = PackageInfo::new(format!("/repo/pkg-{i}"), format!("pkg-{i}"));
                Arc::new(PackageMachine::new(pkg, actions.clone()))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_execute_single() {
        let actions = Arc::new(CountingActions::default());
        let executor = FleetExecutor::new(1);
        let machine = machines(actions, 1).remove(0);

        let outcome = executor
            .execute(machine.clone(), Operation::CommitAndPush)
            .await
            .unwrap();

        assert_eq!(outcome.message().unwrap().text, "nothing to commit");
        assert!(!machine.state().was_upgraded);
    }

    #[tokio::test]
    async fn test_execute_all_respects_limit_and_order() {
        let actions = Arc::new(CountingActions::default());
        let executor = FleetExecutor::new(2);
        let fleet = machines(actions.clone(), 6);

        let outcomes = executor.execute_all(fleet.clone(), Operation::Upgrade).await;

        assert_eq!(outcomes.len(), 6);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.path, format!("/repo/pkg-{i}"));
            let message = outcome.result.as_ref().unwrap().message().unwrap();
            assert_eq!(message.text, format!("Upgraded pkg-{i}"));
        }
        assert!(actions.peak.load(Ordering::SeqCst) <= 2);
        assert!(fleet.iter().all(|m| m.state().was_upgraded));
    }

    #[tokio::test]
    async fn test_execute_all_empty() {
        let executor = FleetExecutor::new(4);
        let outcomes = executor.execute_all(Vec::new(), Operation::Upgrade).await;
        assert!(outcomes.is_empty());
    }
}
