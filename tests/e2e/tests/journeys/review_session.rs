//! Review session journeys: grading a section, undo, and anchor suspension
//! from repeated failures until the diagram is fixed.

use chrono::Duration;
use murajaah_core::{
    EngineConfig, Grade, Maturity, MemoryKvStore, NoSimilarity, ReviewScope, ReviewSession,
    Storage,
};
use murajaah_e2e_tests::harness::TestStorageManager;
use murajaah_e2e_tests::mocks::{TestDataFactory, CAVE, SECTION};

fn start(db: &mut TestStorageManager, day: i64) -> ReviewSession {
    ReviewSession::start(
        &mut db.storage,
        ReviewScope::Section(SECTION),
        &TestDataFactory::cave_catalog(),
        TestDataFactory::day(day),
    )
    .unwrap()
}

#[test]
fn test_first_session_covers_the_whole_section() {
    let mut db = TestStorageManager::new_temp();
    let session = start(&mut db, 0);

    assert_eq!(
        session.node_ids().to_vec(),
        vec!["verse:18:1-8", "verse:18:9-12", "verse:18:13-16", "mindmap:18"]
    );
    // Walking the section materialized every unit
    assert_eq!(db.node_count(), 4);
    // Materializing is not a user edit
    assert_eq!(db.storage.modified_at(), None);

    let preview = session.preview(&db.storage, 0).unwrap();
    assert_eq!((preview.forgot, preview.remembered, preview.perfect), (1, 1, 1));
}

#[test]
fn test_failed_grading_is_logged_and_undo_removes_it() {
    let mut db = TestStorageManager::new_temp();
    let t0 = TestDataFactory::t0();
    db.storage
        .set_mindmap(CAVE, TestDataFactory::cave_mindmap(), t0)
        .unwrap();
    let similarity = TestDataFactory::similarity();
    let mut session = start(&mut db, 0);
    let fresh = db.storage.node("verse:18:1-8").unwrap().clone();

    let failed = session
        .grade(&mut db.storage, 0, Grade::FORGOT, &similarity, t0)
        .unwrap()
        .unwrap();
    assert_eq!(failed.scheduler.interval, 1);
    assert_eq!(failed.scheduler.repetition, 0);

    let errors = db.storage.review_log().entries();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].anchor_id.as_deref(), Some("intro"));
    assert_eq!(errors[0].similarity_group_ids, vec!["praise-openings"]);

    let record = session.undo(&mut db.storage, t0).unwrap().unwrap();
    assert_eq!(record.index, 0);
    assert!(db.storage.review_log().is_empty());
    assert_eq!(db.storage.node("verse:18:1-8").unwrap(), &fresh);
    assert_eq!(session.position(), 0);

    // Only one level is kept
    assert!(session.undo(&mut db.storage, t0).unwrap().is_none());

    // The undone state is what reaches disk
    db.reopen();
    assert!(db.storage.review_log().is_empty());
    assert_eq!(db.storage.node("verse:18:1-8").unwrap(), &fresh);
}

#[test]
fn test_postpone_and_out_of_range_grades() {
    let mut db = TestStorageManager::new_temp();
    let t0 = TestDataFactory::t0();
    let mut session = start(&mut db, 0);

    assert!(session
        .grade(&mut db.storage, 99, Grade::REMEMBERED, &NoSimilarity, t0)
        .unwrap()
        .is_none());
    assert!(!session.can_undo());

    let postponed = session.postpone(&mut db.storage, 3, t0).unwrap().unwrap();
    assert_eq!(postponed.scheduler.due_date, TestDataFactory::day(1).date_naive());
    assert_eq!(postponed.scheduler.interval, 0);
    assert!(session.is_finished());

    // Deferred, not dropped
    let tomorrow = start(&mut db, 1);
    assert!(tomorrow.node_ids().iter().any(|id| id == "mindmap:18"));

    session.undo(&mut db.storage, t0).unwrap();
    assert_eq!(
        db.storage.node("mindmap:18").unwrap().scheduler.due_date,
        t0.date_naive()
    );
}

#[test]
fn test_repeated_failures_suspend_an_anchor_until_cleared() {
    let mut db = TestStorageManager::new_temp();
    db.storage
        .set_mindmap(CAVE, TestDataFactory::cave_mindmap(), TestDataFactory::t0())
        .unwrap();

    // Day 0: the opening succeeds, both ranges under "sleepers" fail
    let mut session = start(&mut db, 0);
    let t0 = TestDataFactory::t0();
    session
        .grade(&mut db.storage, 0, Grade::REMEMBERED, &NoSimilarity, t0)
        .unwrap();
    session
        .grade(&mut db.storage, 1, Grade::FORGOT, &NoSimilarity, t0)
        .unwrap();
    session
        .grade(&mut db.storage, 2, Grade::FORGOT, &NoSimilarity, t0)
        .unwrap();
    assert_eq!(db.storage.anchor_failure_count(CAVE, "sleepers"), 2);
    assert!(db.storage.suspended_anchors().is_empty());

    // Day 1: a third failure reaches the threshold
    let mut session = start(&mut db, 1);
    assert_eq!(session.node_ids()[1], "verse:18:9-12");
    session
        .grade(&mut db.storage, 1, Grade::FORGOT, &NoSimilarity, TestDataFactory::day(1))
        .unwrap();

    let suspended = db.storage.suspended_anchors();
    assert_eq!(suspended.len(), 1);
    assert_eq!(suspended[0].anchor_id, "sleepers");
    assert_eq!(suspended[0].failures, 3);
    assert_eq!(suspended[0].range, Some((9, 16)));

    // Day 2: the suspended ranges stay out of the queue
    let session = start(&mut db, 2);
    assert_eq!(session.node_ids().to_vec(), vec!["verse:18:1-8", "mindmap:18"]);

    // Fixing the diagram clears the suspension without touching the log
    let t2 = TestDataFactory::day(2);
    db.storage.clear_suspension(CAVE, "sleepers", t2).unwrap();
    assert!(db.storage.suspended_anchors().is_empty());
    assert_eq!(db.storage.anchor_failure_count(CAVE, "sleepers"), 0);
    assert_eq!(db.storage.review_log().len(), 3);
    assert_eq!(start(&mut db, 2).len(), 4);

    db.reopen();
    let anchor = db.storage.mindmaps()["18"].anchor("sleepers").unwrap().clone();
    assert_eq!(anchor.cleared_at, Some(t2));
    assert!(db.storage.suspended_anchors().is_empty());
    assert_eq!(db.storage.review_log().len(), 3);
}

#[test]
fn test_success_elsewhere_in_the_anchor_resets_its_count() {
    let mut db = TestStorageManager::new_temp();
    let t0 = TestDataFactory::t0();
    db.storage
        .set_mindmap(CAVE, TestDataFactory::cave_mindmap(), t0)
        .unwrap();

    // Day 0: both ranges under "sleepers" fail
    let mut session = start(&mut db, 0);
    session
        .grade(&mut db.storage, 1, Grade::FORGOT, &NoSimilarity, t0)
        .unwrap();
    session
        .grade(&mut db.storage, 2, Grade::FORGOT, &NoSimilarity, t0)
        .unwrap();
    assert_eq!(db.storage.anchor_failure_count(CAVE, "sleepers"), 2);

    // Day 1: verses 13-16 are recalled, then 9-12 slips again
    let t1 = TestDataFactory::day(1);
    let mut session = start(&mut db, 1);
    assert_eq!(session.node_ids()[2], "verse:18:13-16");
    session
        .grade(&mut db.storage, 2, Grade::REMEMBERED, &NoSimilarity, t1)
        .unwrap();
    assert_eq!(db.storage.anchor_failure_count(CAVE, "sleepers"), 0);
    session
        .grade(&mut db.storage, 1, Grade::FORGOT, &NoSimilarity, t1 + Duration::minutes(1))
        .unwrap();

    assert_eq!(db.storage.anchor_failure_count(CAVE, "sleepers"), 1);
    assert!(db.storage.suspended_anchors().is_empty());
    assert_eq!(db.storage.review_log().len(), 3);
    assert_eq!(start(&mut db, 2).len(), 4);
}

#[test]
fn test_promoting_a_recovered_range_keeps_the_anchor_active() {
    let mut db = TestStorageManager::new_temp();
    let t0 = TestDataFactory::t0();
    db.storage
        .set_mindmap(CAVE, TestDataFactory::cave_mindmap(), t0)
        .unwrap();

    let mut session = start(&mut db, 0);
    session
        .grade(&mut db.storage, 1, Grade::FORGOT, &NoSimilarity, t0)
        .unwrap();
    session
        .grade(&mut db.storage, 2, Grade::FORGOT, &NoSimilarity, t0)
        .unwrap();
    let mut session = start(&mut db, 1);
    session
        .grade(&mut db.storage, 1, Grade::FORGOT, &NoSimilarity, TestDataFactory::day(1))
        .unwrap();
    assert_eq!(db.storage.suspended_anchors().len(), 1);

    // Recited correctly outside a session, then marked as mastered
    let t2 = TestDataFactory::day(2);
    db.storage
        .grade_node("verse:18:9-12", Grade::REMEMBERED, &NoSimilarity, t2)
        .unwrap();
    assert!(db.storage.suspended_anchors().is_empty());
    let node = db
        .storage
        .override_maturity("verse:18:9-12", Maturity::Mastered, t2 + Duration::hours(1))
        .unwrap();
    assert_eq!(node.scheduler.interval, 90);

    assert!(db.storage.suspended_anchors().is_empty());
    assert_eq!(db.storage.anchor_failure_count(CAVE, "sleepers"), 0);
    assert_eq!(
        start(&mut db, 3).node_ids().to_vec(),
        vec!["verse:18:1-8", "verse:18:13-16", "mindmap:18"]
    );

    db.reopen();
    assert!(db.storage.suspended_anchors().is_empty());
}

#[test]
fn test_unknown_anchor_cannot_be_cleared() {
    let mut db = TestStorageManager::new_temp();
    let result = db
        .storage
        .clear_suspension(CAVE, "missing", TestDataFactory::t0());
    assert!(result.is_err());
    assert_eq!(db.storage.modified_at(), None);
}

#[test]
fn test_threshold_comes_from_config() {
    let mut storage = Storage::new(
        Box::new(MemoryKvStore::new()),
        EngineConfig {
            suspension_threshold: 1,
        },
    )
    .unwrap();
    let t0 = TestDataFactory::t0();
    storage
        .set_mindmap(CAVE, TestDataFactory::cave_mindmap(), t0)
        .unwrap();

    let mut session = ReviewSession::start(
        &mut storage,
        ReviewScope::Section(SECTION),
        &TestDataFactory::cave_catalog(),
        t0,
    )
    .unwrap();
    session
        .grade(&mut storage, 2, Grade::FORGOT, &NoSimilarity, t0)
        .unwrap();

    let suspended = storage.suspended_anchors();
    assert_eq!(suspended.len(), 1);
    assert!(suspended[0].node_ids.contains("verse:18:13-16"));

    // A later success on the failed node resolves its failure
    let t1 = TestDataFactory::day(1);
    storage
        .grade_node("verse:18:13-16", Grade::REMEMBERED, &NoSimilarity, t1)
        .unwrap();
    assert!(storage.suspended_anchors().is_empty());
}
