//! End-to-end reconciliation cycles against the in-memory store and
//! compute provider.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use warden_reconciler::compute::{InMemoryCompute, NetworkInterface, ScaleSetInstance};
use warden_reconciler::storage::{BatchOperation, InMemoryStorage};
use warden_reconciler::{Reconciler, ReconcilerConfig, StatusEvent, StatusEventData};
use warden_types::{
    BackendTarget, BalancerTarget, StateEntity, StatusEntity, StatusTarget, TargetRegistry,
};

const WEB: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachineScaleSets/web";
const LB: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachineScaleSets/lb";
const OTHER: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachineScaleSets/other";
const KIND: &str = "VirtualMachineScaleSet";

type TestReconciler = Reconciler<InMemoryStorage, InMemoryCompute>;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

fn registry(grace: u64, expiration: u64) -> TargetRegistry {
    TargetRegistry::new(
        vec![StatusTarget {
            name: "web".into(),
            kind: KIND.into(),
            resources: vec![WEB.into()],
            unhealthy: "DOWN".into(),
            expiration,
            grace,
            minimum: 1,
        }],
        vec![BalancerTarget {
            frontend: LB.into(),
            backends: vec![BackendTarget {
                id: WEB.into(),
                prefix: "web".into(),
            }],
        }],
    )
}

async fn setup(
    targets: TargetRegistry,
) -> (TestReconciler, Arc<InMemoryStorage>, Arc<InMemoryCompute>) {
    init_logging();
    let storage = Arc::new(InMemoryStorage::new());
    let compute = Arc::new(InMemoryCompute::new());
    let reconciler = Reconciler::new(
        ReconcilerConfig::default(),
        targets,
        storage.clone(),
        compute.clone(),
    );
    reconciler.initialize().await.unwrap();
    storage.clear_batches().await;
    (reconciler, storage, compute)
}

fn state(tag: &str, value: &str, created_when: DateTime<Utc>) -> StateEntity {
    StateEntity::new(WEB, KIND, tag, created_when, value)
}

fn status(
    host: &str,
    label: &str,
    changed_when: DateTime<Utc>,
    timestamp: DateTime<Utc>,
) -> StatusEntity {
    StatusEntity::new(WEB, KIND, host, changed_when, label, timestamp)
}

fn web_event(host: &str, label: &str) -> StatusEvent {
    StatusEvent {
        topic: "health".into(),
        subject: WEB.into(),
        event_type: "warden-status".into(),
        data: StatusEventData {
            kind: KIND.into(),
            name: host.into(),
            status: label.into(),
        },
    }
}

#[tokio::test]
async fn test_not_ready_is_noop() {
    init_logging();
    let storage = Arc::new(InMemoryStorage::new());
    let compute = Arc::new(InMemoryCompute::new());
    compute
        .put_instance("rg", "web", ScaleSetInstance::new("0", "Succeeded"))
        .await;
    let reconciler = Reconciler::new(
        ReconcilerConfig::default(),
        registry(0, 60),
        storage.clone(),
        compute.clone(),
    );

    assert!(!reconciler.is_ready().await.unwrap());
    reconciler.run_cycle().await.unwrap();
    reconciler.event(&web_event("web000000", "UP")).await.unwrap();

    assert!(storage.batches().await.is_empty());
    assert!(compute.deletions().await.is_empty());
}

#[tokio::test]
async fn test_state_sync_failed_transition() {
    let (reconciler, storage, compute) = setup(registry(0, 60)).await;
    let seeded = state("0", "Succeeded", Utc::now() - Duration::hours(1));
    reconciler.data().upsert_states(&[seeded.clone()]).await.unwrap();
    compute
        .put_instance("rg", "web", ScaleSetInstance::new("0", "Failed"))
        .await;
    storage.clear_batches().await;

    reconciler.state().await.unwrap();

    let batches = storage.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].operation, BatchOperation::Upsert);
    assert_eq!(batches[0].row_keys, vec![seeded.row_key()]);

    let states = reconciler.data().read_states().await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].state, "Failed");
    assert_eq!(states[0].created_when, seeded.created_when);

    let deletions = compute.deletions().await;
    assert_eq!(deletions.len(), 1);
    assert_eq!(deletions[0].instance_ids, vec!["0".to_string()]);
}

#[tokio::test]
async fn test_state_sync_creates_missing() {
    let (reconciler, storage, compute) = setup(registry(0, 60)).await;
    compute
        .put_instance("rg", "web", ScaleSetInstance::new("1", "Creating"))
        .await;

    reconciler.state().await.unwrap();

    let states = reconciler.data().read_states().await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].tag, "1");
    assert_eq!(states[0].state, "Creating");
    assert_eq!(states[0].id, WEB.to_lowercase());

    let batches = storage.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].row_keys.len(), 1);
    assert!(compute.deletions().await.is_empty());
}

#[tokio::test]
async fn test_state_sync_removes_vanished_and_untracked() {
    let (reconciler, _storage, compute) = setup(registry(0, 60)).await;
    let now = Utc::now();
    reconciler
        .data()
        .upsert_states(&[
            state("2", "Succeeded", now),
            state("3", "Succeeded", now),
            StateEntity::new(OTHER, KIND, "0", now, "Succeeded"),
        ])
        .await
        .unwrap();
    compute
        .put_instance("rg", "web", ScaleSetInstance::new("3", "Succeeded"))
        .await;

    reconciler.state().await.unwrap();

    let states = reconciler.data().read_states().await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].tag, "3");
    assert!(compute.deletions().await.is_empty());
}

#[tokio::test]
async fn test_status_sync_expiration() {
    let (reconciler, _storage, compute) = setup(registry(0, 60)).await;
    let now = Utc::now();
    reconciler
        .data()
        .upsert_states(&[state("1", "Succeeded", now - Duration::hours(1))])
        .await
        .unwrap();

    // unhealthy, but not for long enough
    reconciler
        .data()
        .upsert_status(&status("web000001", "DOWN", now - Duration::seconds(30), now))
        .await
        .unwrap();
    reconciler.status().await.unwrap();
    assert_eq!(reconciler.data().read_statuses().await.unwrap().len(), 1);
    assert!(compute.deletions().await.is_empty());

    reconciler
        .data()
        .upsert_status(&status("web000001", "DOWN", now - Duration::seconds(120), now))
        .await
        .unwrap();
    reconciler.status().await.unwrap();
    assert!(reconciler.data().read_statuses().await.unwrap().is_empty());

    let deletions = compute.deletions().await;
    assert_eq!(deletions.len(), 1);
    assert_eq!(deletions[0].instance_ids, vec!["1".to_string()]);
}

#[tokio::test]
async fn test_status_sync_silence_expires() {
    let (reconciler, _storage, compute) = setup(registry(0, 60)).await;
    let now = Utc::now();
    reconciler
        .data()
        .upsert_states(&[state("11", "Succeeded", now - Duration::hours(1))])
        .await
        .unwrap();
    reconciler
        .data()
        .upsert_status(&status(
            "web00000B",
            "UP",
            now - Duration::hours(1),
            now - Duration::seconds(300),
        ))
        .await
        .unwrap();

    reconciler.status().await.unwrap();

    assert_eq!(compute.deletions().await[0].instance_ids, vec!["11".to_string()]);
}

#[tokio::test]
async fn test_status_sync_failed_ignores_grace() {
    let (reconciler, _storage, compute) = setup(registry(3600, 3600)).await;
    let now = Utc::now();
    reconciler
        .data()
        .upsert_states(&[state("4", "Failed", now)])
        .await
        .unwrap();
    reconciler
        .data()
        .upsert_status(&status("web000004", "UP", now, now))
        .await
        .unwrap();

    reconciler.status().await.unwrap();

    assert!(reconciler.data().read_statuses().await.unwrap().is_empty());
    assert_eq!(compute.deletions().await[0].instance_ids, vec!["4".to_string()]);
}

#[tokio::test]
async fn test_status_sync_grace_protects_new_instances() {
    let (reconciler, _storage, compute) = setup(registry(600, 60)).await;
    let now = Utc::now();
    reconciler
        .data()
        .upsert_states(&[state("5", "Succeeded", now - Duration::seconds(60))])
        .await
        .unwrap();
    reconciler
        .data()
        .upsert_status(&status("web000005", "DOWN", now - Duration::seconds(120), now))
        .await
        .unwrap();

    reconciler.status().await.unwrap();

    assert_eq!(reconciler.data().read_statuses().await.unwrap().len(), 1);
    assert!(compute.deletions().await.is_empty());
}

#[tokio::test]
async fn test_status_sync_cleans_orphans_without_compute_calls() {
    let (reconciler, _storage, compute) = setup(registry(0, 60)).await;
    let now = Utc::now();
    reconciler
        .data()
        .upsert_statuses(&[
            status("web000007", "DOWN", now - Duration::hours(1), now),
            StatusEntity::new(OTHER, KIND, "other000000", now, "UP", now),
        ])
        .await
        .unwrap();

    reconciler.status().await.unwrap();

    assert!(reconciler.data().read_statuses().await.unwrap().is_empty());
    assert!(compute.deletions().await.is_empty());
}

#[tokio::test]
async fn test_status_sync_removes_undecodable_tags() {
    let (reconciler, _storage, compute) = setup(registry(0, 60)).await;
    compute
        .put_instance("rg", "web", ScaleSetInstance::new("1", "Succeeded"))
        .await;
    reconciler.event(&web_event("web000001", "UP")).await.unwrap();
    reconciler.event(&web_event("web-00_1", "DOWN")).await.unwrap();
    assert_eq!(reconciler.data().read_statuses().await.unwrap().len(), 2);

    reconciler.run_cycle().await.unwrap();

    let tags: Vec<String> = reconciler
        .data()
        .read_statuses()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.tag)
        .collect();
    assert_eq!(tags, vec!["web000001".to_string()]);
    assert!(compute.deletions().await.is_empty());
}

#[tokio::test]
async fn test_backends_respect_grace() {
    let (reconciler, storage, _compute) = setup(registry(600, 60)).await;
    let now = Utc::now();
    reconciler
        .data()
        .upsert_states(&[state("1", "Succeeded", now - Duration::seconds(60))])
        .await
        .unwrap();

    reconciler.backends().await.unwrap();
    assert!(storage.blob_paths("configuration").await.is_empty());

    reconciler
        .data()
        .upsert_states(&[state("1", "Succeeded", now - Duration::seconds(1200))])
        .await
        .unwrap();
    reconciler.backends().await.unwrap();

    let path = format!("template{LB}/latest.cfg");
    let config = storage.blob("configuration", &path).await.unwrap();
    assert_eq!(config.lines().count(), 1);
    assert!(config.starts_with("server vmss--sub--rg--web--1--Succeeded--"));
    assert!(config.ends_with(" web000001:80 check\n"));
}

#[tokio::test]
async fn test_backends_skip_only_instances_in_grace() {
    let (reconciler, storage, _compute) = setup(registry(600, 60)).await;
    let now = Utc::now();
    let settled = now - Duration::seconds(1200);
    reconciler
        .data()
        .upsert_states(&[
            state("0", "Succeeded", now),
            state("1", "Succeeded", settled),
            state("2", "Succeeded", settled),
        ])
        .await
        .unwrap();

    reconciler.backends().await.unwrap();

    let config = storage
        .blob("configuration", &format!("template{LB}/latest.cfg"))
        .await
        .unwrap();
    let mut lines: Vec<&str> = config.lines().collect();
    lines.sort_unstable();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("server vmss--sub--rg--web--1--Succeeded--"));
    assert!(lines[0].ends_with(" web000001:80 check"));
    assert!(lines[1].starts_with("server vmss--sub--rg--web--2--Succeeded--"));
    assert!(lines[1].ends_with(" web000002:80 check"));
}

#[tokio::test]
async fn test_backends_prefer_private_ip() {
    let (reconciler, storage, compute) = setup(registry(0, 60)).await;
    let created = Utc::now() - Duration::hours(2);
    reconciler
        .data()
        .upsert_states(&[state("0", "Succeeded", created), state("1", "Succeeded", created)])
        .await
        .unwrap();
    compute
        .put_network_interface(
            "rg",
            "web",
            NetworkInterface {
                virtual_machine_id: Some(format!("{WEB}/virtualMachines/0")),
                private_ip_address: Some("10.0.0.4".into()),
            },
        )
        .await;

    reconciler.backends().await.unwrap();

    let config = storage
        .blob("configuration", &format!("template{LB}/latest.cfg"))
        .await
        .unwrap();
    let lines: Vec<&str> = config.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().any(|l| l.ends_with(" 10.0.0.4:80 check")));
    assert!(lines.iter().any(|l| l.ends_with(" web000001:80 check")));
}

#[tokio::test]
async fn test_event_upserts_status() {
    let (reconciler, _storage, _compute) = setup(registry(0, 60)).await;

    reconciler.event(&web_event("web000003", "UP")).await.unwrap();
    let first = reconciler.data().read_statuses().await.unwrap().remove(0);
    assert_eq!(first.status, "UP");
    assert_eq!(first.changed_when, first.timestamp);

    reconciler.event(&web_event("web000003", "UP")).await.unwrap();
    let same = reconciler.data().read_statuses().await.unwrap().remove(0);
    assert_eq!(same.changed_when, first.changed_when);
    assert!(same.timestamp >= first.timestamp);

    reconciler.event(&web_event("web000003", "DOWN")).await.unwrap();
    let changed = reconciler.data().read_statuses().await.unwrap().remove(0);
    assert_eq!(changed.status, "DOWN");
    assert!(changed.changed_when >= first.changed_when);
    assert_eq!(changed.changed_when, changed.timestamp);
}

#[tokio::test]
async fn test_event_filters() {
    init_logging();
    let storage = Arc::new(InMemoryStorage::new());
    let mut config = ReconcilerConfig::default();
    config.events.topic_id = Some("health".into());
    let reconciler = Reconciler::new(
        config,
        registry(0, 60),
        storage.clone(),
        Arc::new(InMemoryCompute::new()),
    );
    reconciler.initialize().await.unwrap();

    let mut other_topic = web_event("web000001", "UP");
    other_topic.topic = "elsewhere".into();
    reconciler.event(&other_topic).await.unwrap();

    let mut other_type = web_event("web000001", "UP");
    other_type.event_type = "heartbeat".into();
    reconciler.event(&other_type).await.unwrap();

    let mut untracked = web_event("other000001", "UP");
    untracked.subject = OTHER.into();
    reconciler.event(&untracked).await.unwrap();

    assert!(reconciler.data().read_statuses().await.unwrap().is_empty());

    reconciler.event(&web_event("web000001", "UP")).await.unwrap();
    assert_eq!(reconciler.data().read_statuses().await.unwrap().len(), 1);

    assert!(reconciler.event(&web_event("", "UP")).await.is_err());
}

#[tokio::test]
async fn test_cycle_converges() {
    let (reconciler, storage, compute) = setup(registry(0, 60)).await;
    compute
        .put_instance("rg", "web", ScaleSetInstance::new("0", "Succeeded"))
        .await;
    compute
        .put_instance("rg", "web", ScaleSetInstance::new("1", "Succeeded"))
        .await;
    reconciler.event(&web_event("web000000", "UP")).await.unwrap();
    reconciler.event(&web_event("web000001", "UP")).await.unwrap();

    reconciler.run_cycle().await.unwrap();
    assert_eq!(reconciler.data().read_states().await.unwrap().len(), 2);
    assert_eq!(reconciler.data().read_statuses().await.unwrap().len(), 2);
    let first = storage
        .blob("configuration", &format!("template{LB}/latest.cfg"))
        .await
        .unwrap();

    storage.clear_batches().await;
    reconciler.run_cycle().await.unwrap();

    assert!(storage.batches().await.is_empty());
    assert!(compute.deletions().await.is_empty());
    let second = storage
        .blob("configuration", &format!("template{LB}/latest.cfg"))
        .await
        .unwrap();
    assert_eq!(first, second);
}
