use async_trait::async_trait;
use fleet_remediator::{
    logging, ActionError, ActionResult, CheckoutKind, Filter, FleetController,
    JsonSnapshotDiscovery, MessageKind, PackageInfo, Phase, RemediationActions, RemediatorConfig,
    StatusMessage,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Scripted collaborator standing in for the package manager and git
#[derive(Default)]
struct ScriptedActions {
    upgrades: AtomicUsize,
}

#[async_trait]
impl RemediationActions for ScriptedActions {
    async fn upgrade(&self, _pkg: &PackageInfo) -> Result<ActionResult, ActionError> {
        self.upgrades.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(ActionResult::ok("Upgraded react to 18.3.1"))
    }

    async fn commit_and_push(&self, _pkg: &PackageInfo) -> Result<ActionResult, ActionError> {
        Ok(ActionResult::failed("nothing to commit"))
    }

    async fn checkout_default_branch(
        &self,
        pkg: &PackageInfo,
    ) -> Result<ActionResult, ActionError> {
        match &pkg.default_branch {
            Some(branch) => Ok(ActionResult::ok(format!("Switched to {branch}"))),
            None => Err(ActionError::CommandFailed("no default branch".to_string())),
        }
    }
}

fn react_vulnerable(path: &str) -> PackageInfo {
    let mut pkg = PackageInfo::new(path, path.trim_start_matches('/'));
    pkg.react_version = Some("19.0.0".to_string());
    pkg.is_react_vulnerable = true;
    pkg
}

fn controller(actions: Arc<ScriptedActions>, packages: Vec<PackageInfo>) -> FleetController {
    logging::try_init();
    let mut fleet = FleetController::new(RemediatorConfig::default(), actions);
    fleet.sync(packages).unwrap();
    fleet
}

#[tokio::test]
async fn upgrade_then_commit_stays_available_before_refresh() {
    let fleet = controller(
        Arc::new(ScriptedActions::default()),
        vec![react_vulnerable("/shop")],
    );

    fleet.upgrade("/shop").await.unwrap();

    let view = fleet.view();
    let shop = &view.packages[0];
    assert_eq!(shop.state.phase, Phase::Idle);
    assert!(shop.state.was_upgraded);
    assert_eq!(
        shop.state.last_message,
        Some(StatusMessage::success("Upgraded react to 18.3.1"))
    );
    // Vulnerability flag is still stale here
    assert!(shop.info.is_vulnerable());
    assert!(shop.actions.commit.is_some());
}

#[tokio::test]
async fn commit_failure_is_reported_and_keeps_flags() {
    let fleet = controller(
        Arc::new(ScriptedActions::default()),
        vec![react_vulnerable("/shop")],
    );

    fleet.commit_and_push("/shop").await.unwrap();

    let state = fleet.machine("/shop").unwrap().state();
    assert_eq!(
        state.last_message,
        Some(StatusMessage::error("nothing to commit"))
    );
    assert_eq!(state.phase, Phase::Idle);
    assert!(!state.was_upgraded);
}

#[tokio::test]
async fn concurrent_drivers_run_only_one_operation() {
    let actions = Arc::new(ScriptedActions::default());
    let fleet = controller(actions.clone(), vec![react_vulnerable("/shop")]);
    let machine = fleet.machine("/shop").unwrap();

    let first = tokio::spawn({
        let machine = Arc::clone(&machine);
        async move { machine.upgrade().await }
    });
    let second = tokio::spawn({
        let machine = Arc::clone(&machine);
        async move { machine.upgrade().await }
    });

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let ran = outcomes.iter().filter(|o| !o.is_ignored()).count();

    assert_eq!(ran, 1);
    assert_eq!(actions.upgrades.load(Ordering::SeqCst), 1);
    assert_eq!(machine.phase(), Phase::Idle);
}

#[tokio::test]
async fn refresh_from_snapshot_drives_checkout_controls() {
    let path = std::env::temp_dir().join(format!("fleet_scenario_{}.json", std::process::id()));
    let json = r#"[
        {"path": "/web", "relativePath": "web", "gitBranch": "feature-x", "defaultBranch": "main", "commitsBehindDefault": null},
        {"path": "/api", "relativePath": "api", "gitBranch": "main", "defaultBranch": "main", "commitsBehindDefault": 3, "isNextVulnerable": true},
        {"path": "/docs", "relativePath": "docs", "gitBranch": "main", "defaultBranch": "main", "commitsBehindDefault": 0}
    ]"#;
    tokio::fs::write(&path, json).await.unwrap();

    let mut fleet = controller(Arc::new(ScriptedActions::default()), vec![]);
    let refreshed = fleet.refresh(&JsonSnapshotDiscovery::new(&path)).await;
    std::fs::remove_file(&path).ok();
    refreshed.unwrap();

    let view = fleet.view();
    assert_eq!(view.total, 3);
    assert_eq!(view.vulnerable, 1);

    let web = view.packages[0].actions.checkout.as_ref().unwrap();
    assert_eq!(web.kind, CheckoutKind::ReturnToDefault);
    assert_eq!(web.label, "main");
    assert_eq!(web.badge, None);

    let api = view.packages[1].actions.checkout.as_ref().unwrap();
    assert_eq!(api.kind, CheckoutKind::Pull);
    assert_eq!(api.label, "Pull");
    assert_eq!(api.badge.as_deref(), Some("+3"));

    assert!(view.packages[2].actions.checkout.is_none());

    fleet.set_filter(Filter::VulnerableOnly);
    let filtered = fleet.view();
    assert_eq!(filtered.shown, Some(1));
    assert_eq!(filtered.packages[0].info.path, "/api");

    let outcome = fleet.checkout_default_branch("/web").await.unwrap();
    assert_eq!(outcome.message().unwrap().kind, MessageKind::Success);
}

// Upgrade holds the working copy with blocking work; every mutation is counted
#[derive(Default)]
struct WorkingCopyActions {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl WorkingCopyActions {
    async fn mutate(&self, hold: Duration) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::task::spawn_blocking(move || std::thread::sleep(hold))
            .await
            .unwrap();
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemediationActions for WorkingCopyActions {
    async fn upgrade(&self, _pkg: &PackageInfo) -> Result<ActionResult, ActionError> {
        self.mutate(Duration::from_millis(400)).await;
        Ok(ActionResult::ok("Upgraded next to 15.1.9"))
    }

    async fn commit_and_push(&self, _pkg: &PackageInfo) -> Result<ActionResult, ActionError> {
        self.mutate(Duration::from_millis(10)).await;
        Ok(ActionResult::ok("pushed"))
    }

    async fn checkout_default_branch(
        &self,
        _pkg: &PackageInfo,
    ) -> Result<ActionResult, ActionError> {
        self.mutate(Duration::from_millis(10)).await;
        Ok(ActionResult::ok("Switched to main"))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_upgrade_never_overlaps_a_commit() {
    let actions = Arc::new(WorkingCopyActions::default());
    let mut fleet = FleetController::new(RemediatorConfig::default(), actions.clone());
    fleet.sync(vec![react_vulnerable("/shop")]).unwrap();
    let machine = fleet.machine("/shop").unwrap();
    let mut states = machine.subscribe();

    let abandoned = tokio::time::timeout(Duration::from_millis(50), machine.upgrade()).await;
    assert!(abandoned.is_err());

    assert_eq!(machine.phase(), Phase::Upgrading);
    assert!(machine.commit_and_push().await.is_ignored());

    states
        .wait_for(|s| s.phase == Phase::Idle)
        .await
        .unwrap();
    assert!(machine.state().was_upgraded);

    let outcome = machine.commit_and_push().await;
    assert_eq!(outcome.message(), Some(&StatusMessage::success("pushed")));
    assert_eq!(actions.peak.load(Ordering::SeqCst), 1);
}
