//! Reconciliation and the edit-check sweep against an in-memory knowledge base.

use chrono::{DateTime, Duration, TimeZone, Utc};

use lotus_compose::Composer;
use lotus_core::store::{MemoryRecordStore, RecordStore};
use lotus_core::types::{EntityId, MoleculeDetails, PublicationId, TrackedField, TrackedRecord};
use lotus_engine::memory::{snapshot, MemoryKnowledgeBase, MemoryPublisher};
use lotus_engine::{check_edits, EngineError, RecordCheck, Reconciler, SweepOptions};

const COMPOUND: &str = "Q60235";
const TAXON: &str = "Q158767";
const REFERENCE: &str = "Q104225190";

fn published_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 3, 12, 0, 0).unwrap()
}

fn details(compound: &str, compound_label: &str) -> MoleculeDetails {
    MoleculeDetails {
        compound: compound_label.to_owned(),
        compound_id: EntityId::from(compound),
        taxon: "Coffea arabica".to_owned(),
        taxon_id: EntityId::from(TAXON),
        reference: "Alkaloids of coffee".to_owned(),
        reference_id: EntityId::from(REFERENCE),
        smiles: "CN1C=NC2=C1C(=O)N(C(=O)N2C)C".to_owned(),
        image_url: String::new(),
        taxon_image_url: String::new(),
        taxon_emoji: "🌿".to_owned(),
        kingdom_label: "Plantae".to_owned(),
    }
}

fn record() -> TrackedRecord {
    TrackedRecord::published(
        &details(COMPOUND, "caffeine"),
        Some(PublicationId::from("112233")),
        published_at(),
    )
}

/// Live state matching `record()` exactly, with one pre-publication revision.
fn kb() -> MemoryKnowledgeBase {
    let mut kb = MemoryKnowledgeBase::new();
    kb.set_relation(COMPOUND, TAXON, true);
    kb.set_label(COMPOUND, "caffeine");
    kb.set_label(TAXON, "Coffea arabica");
    kb.set_label(REFERENCE, "Alkaloids of coffee");
    kb.push_revision(
        COMPOUND,
        100,
        published_at() - Duration::days(30),
        Some("creator"),
        snapshot(Some("caffeine"), &[TAXON]),
    );
    kb
}

fn sweep(
    kb: &MemoryKnowledgeBase,
    store: &MemoryRecordStore,
    publisher: &MemoryPublisher,
) -> lotus_engine::SweepReport {
    let reconciler = Reconciler::new(kb, kb, kb, 50);
    let composer = Composer::new(500).expect("composer");
    check_edits(store, &reconciler, &composer, Some(publisher), SweepOptions::default(), now())
        .expect("sweep")
}

// ---------------------------------------------------------------------------
// 1. Detection
// ---------------------------------------------------------------------------

#[test]
fn matching_live_state_is_unchanged_and_nothing_is_saved() {
    let kb = kb();
    let store = MemoryRecordStore::new(vec![record()]);
    let publisher = MemoryPublisher::new();

    let report = sweep(&kb, &store, &publisher);

    assert_eq!(report.checked, 1);
    assert_eq!(report.unchanged, 1);
    assert!(report.replies.is_empty());
    assert!(!report.saved);
    assert_eq!(store.save_count(), 0);
    assert!(publisher.posts().is_empty());
}

#[test]
fn label_change_is_replied_to_and_attributed() {
    let mut kb = kb();
    kb.set_label(COMPOUND, "Coffeine");
    kb.push_revision(
        COMPOUND,
        101,
        published_at() + Duration::hours(5),
        Some("Jane Doe"),
        snapshot(Some("Coffeine"), &[TAXON]),
    );
    let store = MemoryRecordStore::new(vec![record()]);
    let publisher = MemoryPublisher::new();

    let report = sweep(&kb, &store, &publisher);

    assert_eq!(report.replies.len(), 1);
    let posts = publisher.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].reply_to, Some(PublicationId::from("112233")));
    assert!(posts[0].text.contains("compound label changed: “caffeine” → “Coffeine”"));
    assert!(posts[0].text.contains("[Jane Doe](https://www.wikidata.org/wiki/User:Jane_Doe)"));

    let saved = store.snapshot();
    assert_eq!(saved[0].last_checked(TrackedField::Compound), "Coffeine");
    assert_eq!(saved[0].last_checked(TrackedField::Taxon), "Coffea arabica");
    assert_eq!(saved[0].last_reply_at, Some(now()));
    // The original post's labels are history and stay put.
    assert_eq!(saved[0].compound_label, "caffeine");
}

#[test]
fn second_pass_after_a_reply_is_silent() {
    let mut kb = kb();
    kb.set_label(COMPOUND, "Coffeine");
    let store = MemoryRecordStore::new(vec![record()]);
    let publisher = MemoryPublisher::new();

    sweep(&kb, &store, &publisher);
    let second = sweep(&kb, &store, &publisher);

    assert_eq!(second.unchanged, 1);
    assert!(second.replies.is_empty());
    assert_eq!(publisher.posts().len(), 1);
    assert_eq!(store.save_count(), 1);
}

#[test]
fn removal_is_reported_once() {
    let mut kb = kb();
    kb.set_relation(COMPOUND, TAXON, false);
    kb.push_revision(
        COMPOUND,
        101,
        published_at() + Duration::hours(2),
        Some("Bob"),
        snapshot(Some("caffeine"), &[]),
    );
    let store = MemoryRecordStore::new(vec![record()]);
    let publisher = MemoryPublisher::new();

    let first = sweep(&kb, &store, &publisher);
    let second = sweep(&kb, &store, &publisher);

    assert_eq!(first.replies.len(), 1);
    assert!(first.replies[0].text.starts_with("💀"));
    assert!(first.replies[0].text.contains("[Bob](https://www.wikidata.org/wiki/User:Bob)"));
    assert!(second.replies.is_empty());
    assert_eq!(publisher.posts().len(), 1);
    assert!(!store.snapshot()[0].relation_present());
}

#[test]
fn unattributable_removal_still_replies_without_editors() {
    let mut kb = MemoryKnowledgeBase::new();
    kb.set_label(COMPOUND, "caffeine");
    kb.set_label(TAXON, "Coffea arabica");
    kb.set_label(REFERENCE, "Alkaloids of coffee");
    let store = MemoryRecordStore::new(vec![record()]);
    let publisher = MemoryPublisher::new();

    let report = sweep(&kb, &store, &publisher);

    assert_eq!(report.replies.len(), 1);
    assert!(report.replies[0].text.starts_with("💀"));
    assert!(!report.replies[0].text.contains("Edited by"));
}

#[test]
fn restored_relation_is_saved_without_reply() {
    let kb = kb();
    let mut removed = record();
    removed.initialize_last_checked();
    removed.set_relation_present(false);
    let store = MemoryRecordStore::new(vec![removed]);
    let publisher = MemoryPublisher::new();

    let report = sweep(&kb, &store, &publisher);

    assert_eq!(report.restored, 1);
    assert!(publisher.posts().is_empty());
    assert!(report.saved);
    assert!(store.snapshot()[0].relation_present());
}

#[test]
fn removed_label_is_a_change_to_empty() {
    let mut kb = kb();
    kb.remove_label(TAXON);
    let store = MemoryRecordStore::new(vec![record()]);
    let publisher = MemoryPublisher::new();

    sweep(&kb, &store, &publisher);

    let posts = publisher.posts();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].text.contains("taxon label changed: “Coffea arabica” → “”"));
    assert_eq!(store.snapshot()[0].last_checked(TrackedField::Taxon), "");
}

#[test]
fn explicit_empty_last_checked_matches_missing_label() {
    let mut kb = kb();
    kb.remove_label(REFERENCE);
    let mut tracked = record();
    tracked.reference_label_last_checked = Some(String::new());
    let store = MemoryRecordStore::new(vec![tracked]);
    let publisher = MemoryPublisher::new();

    let report = sweep(&kb, &store, &publisher);

    assert_eq!(report.unchanged, 1);
    assert!(publisher.posts().is_empty());
}

#[test]
fn record_without_publication_is_skipped() {
    let kb = kb();
    let mut tracked = record();
    tracked.publication_id = None;
    let store = MemoryRecordStore::new(vec![tracked]);
    let publisher = MemoryPublisher::new();

    let report = sweep(&kb, &store, &publisher);

    assert_eq!(report.skipped, 1);
    assert_eq!(report.checked, 0);
}

// ---------------------------------------------------------------------------
// 2. Failure isolation
// ---------------------------------------------------------------------------

#[test]
fn accessor_failure_leaves_record_untouched_and_others_proceed() {
    let mut kb = kb();
    kb.set_label(COMPOUND, "Coffeine");
    kb.make_unavailable("Q2");
    let broken = TrackedRecord::published(
        &details("Q2", "theobromine"),
        Some(PublicationId::from("445566")),
        published_at(),
    );
    let store = MemoryRecordStore::new(vec![broken.clone(), record()]);
    let publisher = MemoryPublisher::new();

    let report = sweep(&kb, &store, &publisher);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].compound, EntityId::from("Q2"));
    assert_eq!(report.replies.len(), 1);
    let saved = store.snapshot();
    assert_eq!(saved[0], broken);
    assert_eq!(saved[1].last_checked(TrackedField::Compound), "Coffeine");
}

#[test]
fn publish_failure_commits_nothing() {
    let mut kb = kb();
    kb.set_label(COMPOUND, "Coffeine");
    let store = MemoryRecordStore::new(vec![record()]);
    let publisher = MemoryPublisher::new();
    publisher.set_failing(true);

    let report = sweep(&kb, &store, &publisher);

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("publisher offline"));
    assert_eq!(store.save_count(), 0);

    // Once the publisher recovers the change is still detected.
    publisher.set_failing(false);
    let retry = sweep(&kb, &store, &publisher);
    assert_eq!(retry.replies.len(), 1);
}

#[test]
fn reconcile_reports_accessor_unavailable() {
    let mut kb = kb();
    kb.make_unavailable(COMPOUND);
    let reconciler = Reconciler::new(&kb, &kb, &kb, 50);

    let err = reconciler.reconcile(&record()).unwrap_err();

    assert!(matches!(err, EngineError::AccessorUnavailable { .. }), "got: {err}");
}

#[test]
fn reconcile_does_not_mutate_its_input() {
    let mut kb = kb();
    kb.set_label(COMPOUND, "Coffeine");
    let reconciler = Reconciler::new(&kb, &kb, &kb, 50);
    let original = record();

    let check = reconciler.reconcile(&original).expect("reconcile");

    assert_eq!(original, record());
    let RecordCheck::Changed { outcome, record } = check else {
        panic!("expected a change, got {check:?}");
    };
    assert_eq!(outcome.changes.len(), 1);
    assert_eq!(record.last_checked(TrackedField::Compound), "Coffeine");
}

#[test]
fn removal_and_label_change_in_one_outcome() {
    let mut kb = kb();
    kb.set_relation(COMPOUND, TAXON, false);
    kb.set_label(COMPOUND, "Coffeine");
    let reconciler = Reconciler::new(&kb, &kb, &kb, 50);

    let check = reconciler.reconcile(&record()).expect("reconcile");

    let RecordCheck::Changed { outcome, .. } = check else {
        panic!("expected a change, got {check:?}");
    };
    assert!(outcome.relation_removed);
    assert_eq!(outcome.changes.len(), 1);
}

#[test]
fn reference_changes_are_attributed_from_the_reference_history() {
    let mut entities = kb();
    entities.set_label(COMPOUND, "Coffeine");
    entities.set_label(REFERENCE, "Alkaloids of tea");
    entities.push_revision(
        COMPOUND,
        101,
        published_at() + Duration::hours(5),
        Some("Jane Doe"),
        snapshot(Some("Coffeine"), &[TAXON]),
    );
    // Same reference transition in the wrong history; it must not be consulted.
    entities.push_revision(
        REFERENCE,
        1,
        published_at() - Duration::days(1),
        Some("x"),
        snapshot(Some("Alkaloids of coffee"), &[]),
    );
    entities.push_revision(
        REFERENCE,
        2,
        published_at() + Duration::hours(1),
        Some("Wrong Source"),
        snapshot(Some("Alkaloids of tea"), &[]),
    );

    let mut references = MemoryKnowledgeBase::new();
    references.push_revision(
        REFERENCE,
        7,
        published_at() - Duration::days(1),
        Some("x"),
        snapshot(Some("Alkaloids of coffee"), &[]),
    );
    references.push_revision(
        REFERENCE,
        8,
        published_at() + Duration::hours(2),
        Some("Librarian"),
        snapshot(Some("Alkaloids of tea"), &[]),
    );

    let reconciler = Reconciler::new(&entities, &entities, &references, 50);
    let check = reconciler.reconcile(&record()).expect("reconcile");

    let RecordCheck::Changed { outcome, record } = check else {
        panic!("expected a change, got {check:?}");
    };
    assert_eq!(outcome.changes.len(), 2);
    let editors: Vec<&str> = outcome.editors.iter().map(String::as_str).collect();
    assert_eq!(editors, vec!["Jane Doe", "Librarian"]);
    assert_eq!(references.snapshot_fetches(), 2);
    assert_eq!(record.last_checked(TrackedField::Reference), "Alkaloids of tea");
}

// ---------------------------------------------------------------------------
// 3. Dry run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_composes_without_publishing() {
    let mut kb = kb();
    kb.set_label(COMPOUND, "Coffeine");
    let store = MemoryRecordStore::new(vec![record()]);
    let reconciler = Reconciler::new(&kb, &kb, &kb, 50);
    let composer = Composer::new(500).expect("composer");

    let report = check_edits(
        &store,
        &reconciler,
        &composer,
        None,
        SweepOptions { dry_run: true },
        now(),
    )
    .expect("sweep");

    assert_eq!(report.replies.len(), 1);
    assert_eq!(report.replies[0].published, None);
    let saved = store.load_all().expect("load");
    assert_eq!(saved[0].last_reply_at, None);
    assert_eq!(saved[0].last_checked(TrackedField::Compound), "Coffeine");
}

#[test]
fn live_run_requires_a_publisher() {
    let kb = kb();
    let store = MemoryRecordStore::new(vec![record()]);
    let reconciler = Reconciler::new(&kb, &kb, &kb, 50);
    let composer = Composer::new(500).expect("composer");

    let err = check_edits(&store, &reconciler, &composer, None, SweepOptions::default(), now())
        .unwrap_err();

    assert!(matches!(err, EngineError::PublisherRequired));
}
