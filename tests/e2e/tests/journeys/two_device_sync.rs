//! Two devices reconciling through one shared remote document

use std::collections::BTreeSet;

use chrono::Duration;
use murajaah_core::{
    Grade, NoSimilarity, NodeKey, SyncOrchestrator, SyncOutcome,
};
use murajaah_e2e_tests::harness::TestStorageManager;
use murajaah_e2e_tests::mocks::{SharedTransport, TestDataFactory};

const NODE: &str = "verse:2:1-5";

struct Device {
    db: TestStorageManager,
    sync: SyncOrchestrator<SharedTransport>,
}

impl Device {
    fn new(transport: &SharedTransport) -> Self {
        Self {
            db: TestStorageManager::new_temp(),
            sync: SyncOrchestrator::new(transport.clone()),
        }
    }

    async fn sync_at(&mut self, now: chrono::DateTime<chrono::Utc>) -> SyncOutcome {
        self.sync.sync(&mut self.db.storage, now).await
    }

    fn grade(&mut self, key: &NodeKey, grade: Grade, now: chrono::DateTime<chrono::Utc>) {
        self.db
            .storage
            .get_or_create_node(key, now.date_naive())
            .unwrap();
        self.db
            .storage
            .grade_node(&key.id(), grade, &NoSimilarity, now)
            .unwrap();
    }

    fn custom_ids(&self) -> BTreeSet<String> {
        self.db
            .storage
            .state()
            .custom_mutashabihat
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }
}

/// Two devices that have both been through one full round
async fn paired() -> (SharedTransport, Device, Device) {
    let transport = SharedTransport::new();
    let mut a = Device::new(&transport);
    let mut b = Device::new(&transport);
    let t0 = TestDataFactory::t0();

    a.grade(&NodeKey::verse(2, 1, 5), Grade::REMEMBERED, t0);
    assert_eq!(
        a.sync_at(t0).await,
        SyncOutcome::Success {
            pushed: true,
            imported: false,
            report: None
        }
    );

    let outcome = b.sync_at(t0 + Duration::hours(1)).await;
    match outcome {
        SyncOutcome::Success {
            imported: true,
            report: Some(report),
            ..
        } => assert_eq!(report.nodes_from_remote, 1),
        other => panic!("expected import, got {other:?}"),
    }
    (transport, a, b)
}

#[tokio::test]
async fn test_newer_review_travels_to_the_other_device() {
    let (transport, mut a, mut b) = paired().await;
    assert_eq!(b.db.storage.node(NODE), a.db.storage.node(NODE));

    // B reviews again the next day
    let t1 = TestDataFactory::day(1);
    b.grade(&NodeKey::verse(2, 1, 5), Grade::REMEMBERED, t1);
    assert!(b.sync_at(t1).await.is_success());

    // A picks it up
    let outcome = a.sync_at(t1 + Duration::hours(1)).await;
    assert!(outcome.is_success());
    let node = a.db.storage.node(NODE).unwrap();
    assert_eq!(node.scheduler.interval, 6);
    assert_eq!(node.scheduler.last_review, Some(t1));

    // Nothing left to exchange in either direction
    let pushes = transport.push_count();
    assert_eq!(
        a.sync_at(t1 + Duration::hours(2)).await,
        SyncOutcome::NoChange
    );
    assert_eq!(
        b.sync_at(t1 + Duration::hours(3)).await,
        SyncOutcome::NoChange
    );
    assert_eq!(transport.push_count(), pushes);
    assert_eq!(
        b.db.storage.last_sync().unwrap(),
        Some(t1 + Duration::hours(3))
    );

    // The merged node survived a restart
    a.db.reopen();
    assert_eq!(a.db.storage.node(NODE).unwrap().scheduler.interval, 6);
}

#[tokio::test]
async fn test_offline_sync_reports_error_and_changes_nothing() {
    let (transport, mut a, _b) = paired().await;
    let before = a.db.storage.state().clone();
    let last_sync = a.db.storage.last_sync().unwrap();
    let remote = transport.remote();

    transport.set_offline(true);
    let outcome = a.sync_at(TestDataFactory::day(2)).await;
    match outcome {
        SyncOutcome::Error { message } => assert!(message.contains("pull failed")),
        other => panic!("expected error, got {other:?}"),
    }

    assert_eq!(a.db.storage.state(), &before);
    assert_eq!(a.db.storage.last_sync().unwrap(), last_sync);
    assert_eq!(transport.remote(), remote);
}

#[tokio::test]
async fn test_offline_edits_on_both_devices_are_combined() {
    let (transport, mut a, mut b) = paired().await;

    transport.set_offline(true);
    let t3 = TestDataFactory::day(3);
    a.grade(&NodeKey::verse(18, 1, 8), Grade::REMEMBERED, t3);
    a.db.storage
        .add_custom_mutashabihat(TestDataFactory::custom_entry("from A"), t3)
        .unwrap();
    let b_time = t3 + Duration::minutes(1);
    b.grade(&NodeKey::verse(18, 9, 12), Grade::REMEMBERED, b_time);
    b.db.storage
        .add_custom_mutashabihat(TestDataFactory::custom_entry("from B"), b_time)
        .unwrap();
    assert!(!a.sync_at(t3).await.is_success());
    transport.set_offline(false);

    let t4 = TestDataFactory::day(4);
    assert!(a.sync_at(t4).await.is_success());
    assert!(b.sync_at(t4 + Duration::minutes(1)).await.is_success());
    assert!(a.sync_at(t4 + Duration::minutes(2)).await.is_success());

    for device in [&a, &b] {
        let storage = &device.db.storage;
        assert_eq!(storage.state().nodes.len(), 3);
        assert!(storage.node("verse:18:1-8").is_some());
        assert!(storage.node("verse:18:9-12").is_some());
        assert_eq!(device.custom_ids().len(), 2);
    }
    assert_eq!(a.custom_ids(), b.custom_ids());
}
