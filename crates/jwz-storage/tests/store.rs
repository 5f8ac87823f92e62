//! End-to-end tests for the repository: dual-representation writes,
//! replay, prefix resolution, search, and blobs, all against real
//! store directories under a temp dir.

use std::collections::VecDeque;
use std::path::Path;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use jwz_core::idgen::IdGenerator;
use jwz_core::Sender;
use jwz_storage::{
    discover, init_store, Repository, RetryPolicy, StoreError, DB_FILE, LOG_FILE,
};

/// Base test timestamp. Divisible by 1024 so that `BASE_MS + 32`
/// yields an identifier sharing the first 8 characters and diverging
/// at the 9th.
const BASE_MS: u64 = 1_746_000_000_000;

/// Generator whose clock replays the given times, then keeps repeating
/// the last one (the generator's monotonic clamp handles the rest).
fn ids_at(times: &[u64]) -> IdGenerator {
    let mut queue: VecDeque<u64> = times.iter().copied().collect();
    let mut last = BASE_MS;
    IdGenerator::with_parts(
        Box::new(move || {
            if let Some(t) = queue.pop_front() {
                last = t;
            }
            last
        }),
        StdRng::seed_from_u64(42),
    )
}

/// Generator ticking one millisecond per call.
fn ticking_ids() -> IdGenerator {
    let mut now = BASE_MS;
    IdGenerator::with_parts(
        Box::new(move || {
            now += 1;
            now
        }),
        StdRng::seed_from_u64(7),
    )
}

fn open_repo(root: &Path, ids: IdGenerator) -> Repository {
    Repository::open_with(root, RetryPolicy::no_backoff(3), ids).unwrap()
}

fn new_store(dir: &Path) -> std::path::PathBuf {
    init_store(dir).unwrap()
}

/// Reads the persisted offset straight out of the index.
fn stored_offset(root: &Path) -> u64 {
    let conn = rusqlite::Connection::open(root.join(DB_FILE)).unwrap();
    conn.query_row(
        "SELECT value FROM meta WHERE key = 'jsonl_offset'",
        [],
        |row| row.get::<_, String>(0),
    )
    .unwrap()
    .parse()
    .unwrap()
}

fn log_len(root: &Path) -> u64 {
    std::fs::metadata(root.join(LOG_FILE)).unwrap().len()
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn create_and_read() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "work queue").unwrap();
    repo.create_message("tasks", None, "hello", None, None)
        .unwrap();

    let listed = repo.list_messages("tasks", 10).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].body, "hello");
    assert_eq!(listed[0].reply_count, 0);
    assert!(listed[0].is_root());
}

#[test]
fn threading() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let r = repo.create_message("tasks", None, "root", None, None).unwrap();
    let a = repo
        .create_message("tasks", Some(&r), "first reply", None, None)
        .unwrap();
    let b = repo
        .create_message("tasks", Some(&a), "nested reply", None, None)
        .unwrap();

    let thread_ids: Vec<String> = repo.thread(&r).unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(thread_ids, vec![r.clone(), a.clone(), b.clone()]);

    let reply_ids: Vec<String> = repo.replies(&r).unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(reply_ids, vec![a.clone()]);

    assert_eq!(repo.fetch_message(&r).unwrap().reply_count, 1);
    assert_eq!(repo.fetch_message(&a).unwrap().reply_count, 1);
    assert_eq!(repo.fetch_message(&b).unwrap().reply_count, 0);

    // Roots only in the listing.
    assert_eq!(repo.list_messages("tasks", 10).unwrap().len(), 1);
}

#[test]
fn prefix_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    // First tick is consumed by the topic; the two message timestamps
    // encode to ids sharing 8 characters and diverging at the 9th.
    let mut repo = open_repo(&root, ids_at(&[BASE_MS - 2048, BASE_MS, BASE_MS + 32]));

    repo.create_topic("tasks", "").unwrap();
    let first = repo
        .create_message("tasks", None, "one", None, None)
        .unwrap();
    let second = repo
        .create_message("tasks", None, "two", None, None)
        .unwrap();

    assert_eq!(&first[..8], &second[..8]);
    assert_ne!(&first[..9], &second[..9]);

    match repo.fetch_message(&first[..8]) {
        Err(StoreError::MessageIdAmbiguous(_)) => {}
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert_eq!(repo.fetch_message(&first[..9]).unwrap().id, first);
    assert_eq!(repo.fetch_message(&second[..9]).unwrap().id, second);

    // L4: a full identifier resolves to itself.
    assert_eq!(repo.resolve_message_id(&first).unwrap(), first);
}

#[test]
fn search_injection() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let id = repo
        .create_message("tasks", None, "report (draft)", None, None)
        .unwrap();
    repo.create_message("tasks", None, "unrelated", None, None)
        .unwrap();

    let hits = repo.search("report (draft)", None, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);

    // Operator soup must neither fail nor match.
    assert!(repo.search("x NEAR y AND NOT z:*", None, 10).unwrap().is_empty());

    // Topic-scoped search.
    let scoped = repo.search("report (draft)", Some("tasks"), 10).unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].id, id);
}

#[test]
fn crash_consistent_replay() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let r = repo.create_message("tasks", None, "root", None, None).unwrap();
    let a = repo
        .create_message("tasks", Some(&r), "first reply", None, None)
        .unwrap();
    let b = repo
        .create_message("tasks", Some(&a), "nested reply", None, None)
        .unwrap();
    repo.close().unwrap();

    // Lose the index (and its WAL artifacts) entirely.
    for name in [DB_FILE, "messages.db-wal", "messages.db-shm"] {
        let _ = std::fs::remove_file(root.join(name));
    }

    let repo = open_repo(&root, ticking_ids());
    let listed = repo.list_messages("tasks", 10).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, r);

    let thread_ids: Vec<String> = repo.thread(&r).unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(thread_ids, vec![r, a, b]);

    // Full-text search survives the rebuild.
    assert_eq!(repo.search("nested reply", None, 10).unwrap().len(), 1);
}

#[test]
fn blob_dedupe() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    let bytes = b"the payload".to_vec();
    let first = repo.put_blob(&bytes, Some("text/plain")).unwrap();
    let second = repo.put_blob(&bytes, None).unwrap();
    assert_eq!(first, second);

    let info = repo.fetch_blob(&first).unwrap();
    assert_eq!(info.mime_type.as_deref(), Some("text/plain")); // first writer wins
    assert_eq!(info.size, bytes.len() as i64);
    assert_eq!(repo.get_blob(&first).unwrap(), bytes);

    let conn = rusqlite::Connection::open(root.join(DB_FILE)).unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM blobs", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn offset_stays_tight_after_every_write() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    assert_eq!(stored_offset(&root), log_len(&root));

    let r = repo.create_message("tasks", None, "root", None, None).unwrap();
    assert_eq!(stored_offset(&root), log_len(&root));

    repo.create_message("tasks", Some(&r), "reply", None, None)
        .unwrap();
    assert_eq!(stored_offset(&root), log_len(&root));
}

#[test]
fn foreign_keys_hold_after_writes_and_replay() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let r = repo.create_message("tasks", None, "root", None, None).unwrap();
    repo.create_message("tasks", Some(&r), "reply", None, None)
        .unwrap();
    repo.close().unwrap();

    let _ = std::fs::remove_file(root.join(DB_FILE));
    let repo = open_repo(&root, ticking_ids());
    drop(repo);

    let conn = rusqlite::Connection::open(root.join(DB_FILE)).unwrap();
    let violations: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM (
                 SELECT 1 FROM messages m
                 LEFT JOIN topics t ON t.id = m.topic_id
                 WHERE t.id IS NULL
                 UNION ALL
                 SELECT 1 FROM messages m
                 LEFT JOIN messages p ON p.id = m.parent_id
                 WHERE m.parent_id IS NOT NULL AND p.id IS NULL
             )",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(violations, 0);
}

#[test]
fn every_message_is_searchable() {
    // FTS rows stay in one-to-one correspondence with message rows.
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let bodies = ["alpha body", "beta body", "gamma body"];
    for body in bodies {
        repo.create_message("tasks", None, body, None, None).unwrap();
    }

    for body in bodies {
        let hits = repo.search(body, None, 10).unwrap();
        assert_eq!(hits.len(), 1, "body {body:?} not indexed");
        assert_eq!(hits[0].body, body);
    }
}

#[test]
fn identifiers_increase_in_creation_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    // Constant clock: every id lands in the same millisecond.
    let mut repo = open_repo(&root, ids_at(&[BASE_MS]));

    repo.create_topic("tasks", "").unwrap();
    let mut previous = String::new();
    for i in 0..20 {
        let id = repo
            .create_message("tasks", None, &format!("message {i}"), None, None)
            .unwrap();
        assert!(id > previous, "{id} should sort after {previous}");
        previous = id;
    }
}

// ---------------------------------------------------------------------------
// Idempotence and uniqueness laws
// ---------------------------------------------------------------------------

#[test]
fn replay_twice_yields_same_answers() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let r = repo.create_message("tasks", None, "root", None, None).unwrap();
    repo.create_message("tasks", Some(&r), "reply", None, None)
        .unwrap();
    repo.close().unwrap();

    let snapshot = |repo: &Repository| -> Vec<(String, String, Option<String>)> {
        repo.thread(&r)
            .unwrap()
            .into_iter()
            .map(|m| (m.id, m.body, m.parent_id))
            .collect()
    };

    let _ = std::fs::remove_file(root.join(DB_FILE));
    let repo1 = open_repo(&root, ticking_ids());
    let first = snapshot(&repo1);
    repo1.close().unwrap();

    let _ = std::fs::remove_file(root.join(DB_FILE));
    let repo2 = open_repo(&root, ticking_ids());
    let second = snapshot(&repo2);

    assert_eq!(first, second);
}

#[test]
fn duplicate_topic_is_rejected_and_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let log_before = log_len(&root);

    match repo.create_topic("tasks", "again") {
        Err(StoreError::TopicExists(name)) => assert_eq!(name, "tasks"),
        other => panic!("expected TopicExists, got {other:?}"),
    }

    // The failed create must leave no trace in log or index.
    assert_eq!(log_len(&root), log_before);
    assert_eq!(repo.list_topics().unwrap().len(), 1);
    assert_eq!(stored_offset(&root), log_len(&root));
}

// ---------------------------------------------------------------------------
// Boundary behaviors
// ---------------------------------------------------------------------------

#[test]
fn truncated_log_rebuilds_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    repo.create_message("tasks", None, "kept", None, None).unwrap();
    let keep_len = log_len(&root);
    repo.create_message("tasks", None, "dropped", None, None)
        .unwrap();
    repo.close().unwrap();

    // An external actor truncates the log back to the first message.
    let content = std::fs::read(root.join(LOG_FILE)).unwrap();
    std::fs::write(root.join(LOG_FILE), &content[..keep_len as usize]).unwrap();

    let repo = open_repo(&root, ticking_ids());
    let listed = repo.list_messages("tasks", 10).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].body, "kept");
    assert_eq!(stored_offset(&root), keep_len);

    // The dropped message is gone from search too.
    assert!(repo.search("dropped", None, 10).unwrap().is_empty());
}

#[test]
fn validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    match repo.create_topic("   ", "desc") {
        Err(StoreError::EmptyTopicName) => {}
        other => panic!("expected EmptyTopicName, got {other:?}"),
    }

    repo.create_topic("tasks", "").unwrap();
    match repo.create_message("tasks", None, " \t ", None, None) {
        Err(StoreError::EmptyMessageBody) => {}
        other => panic!("expected EmptyMessageBody, got {other:?}"),
    }
    match repo.create_message("missing", None, "body", None, None) {
        Err(StoreError::TopicNotFound(name)) => assert_eq!(name, "missing"),
        other => panic!("expected TopicNotFound, got {other:?}"),
    }
    match repo.create_message("tasks", Some("0000000000ZZZZZZZZZZZZZZZZ"), "body", None, None) {
        Err(StoreError::ParentNotFound(_)) => {}
        other => panic!("expected ParentNotFound, got {other:?}"),
    }
}

#[test]
fn topic_lookup_trims_like_creation() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("  tasks  ", "").unwrap();
    repo.create_message(" tasks ", None, "hello", None, None)
        .unwrap();
    assert_eq!(repo.list_messages("tasks ", 10).unwrap().len(), 1);
}

#[test]
fn parent_must_be_in_the_same_topic() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    repo.create_topic("notes", "").unwrap();
    let in_tasks = repo
        .create_message("tasks", None, "root", None, None)
        .unwrap();

    match repo.create_message("notes", Some(&in_tasks), "cross-topic", None, None) {
        Err(StoreError::ParentNotFound(_)) => {}
        other => panic!("expected ParentNotFound, got {other:?}"),
    }
}

#[test]
fn discovery_walks_up_and_fails_outside() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let nested = dir.path().join("x").join("y");
    std::fs::create_dir_all(&nested).unwrap();

    let found = discover(&nested).unwrap();
    assert_eq!(found.canonicalize().unwrap(), root.canonicalize().unwrap());
}

// ---------------------------------------------------------------------------
// Multi-process interleaving (two open handles on one store)
// ---------------------------------------------------------------------------

#[test]
fn second_writer_ingests_the_gap_before_appending() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());

    let mut a = open_repo(&root, ticking_ids());
    a.create_topic("tasks", "").unwrap();

    // B opens after the topic exists, then both post in turn.
    let mut b = open_repo(&root, ids_at(&[BASE_MS + 1000]));
    a.create_message("tasks", None, "from a", None, None).unwrap();
    b.create_message("tasks", None, "from b", None, None).unwrap();

    // B's append ingested A's record first, so the offset covers both.
    assert_eq!(stored_offset(&root), log_len(&root));
    assert_eq!(b.list_messages("tasks", 10).unwrap().len(), 2);

    // A fresh open sees everything in log order.
    drop(a);
    drop(b);
    let c = open_repo(&root, ticking_ids());
    let bodies: Vec<String> = c
        .list_messages("tasks", 10)
        .unwrap()
        .into_iter()
        .map(|m| m.body)
        .collect();
    assert_eq!(bodies.len(), 2);
    assert!(bodies.contains(&"from a".to_string()));
    assert!(bodies.contains(&"from b".to_string()));
}

// ---------------------------------------------------------------------------
// Sender and git context persistence
// ---------------------------------------------------------------------------

#[test]
fn sender_and_git_context_survive_replay() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let sender = Sender {
        id: "agent-7".into(),
        name: "amber-falcon".into(),
        model: Some("opus".into()),
        role: Some("reviewer".into()),
    };
    let git = jwz_core::GitContext {
        oid: "0123456789abcdef0123456789abcdef01234567".into(),
        head: "main".into(),
        dirty: true,
        prefix: "crates/".into(),
    };
    let id = repo
        .create_message("tasks", None, "with context", Some(sender.clone()), Some(git.clone()))
        .unwrap();
    repo.close().unwrap();

    let _ = std::fs::remove_file(root.join(DB_FILE));
    let repo = open_repo(&root, ticking_ids());
    let message = repo.fetch_message(&id).unwrap();
    assert_eq!(message.sender, Some(sender));
    assert_eq!(message.git, Some(git));
}

#[test]
fn search_breaks_score_ties_by_recency() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    // Identical bodies score identically; newest must come first.
    let older = repo
        .create_message("tasks", None, "same body", None, None)
        .unwrap();
    let newer = repo
        .create_message("tasks", None, "same body", None, None)
        .unwrap();

    let ids: Vec<String> = repo
        .search("same body", None, 10)
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![newer, older]);
}

#[test]
fn search_with_unknown_topic_filter_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    repo.create_message("tasks", None, "findable", None, None)
        .unwrap();

    assert!(repo.search("findable", Some("nope"), 10).unwrap().is_empty());
}

#[test]
fn invalid_identifier_is_rejected_before_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let repo = open_repo(&root, ticking_ids());

    let too_long = "0".repeat(27);
    for bad in ["", "   ", "has space", "ILOU", too_long.as_str()] {
        match repo.fetch_message(bad) {
            Err(StoreError::InvalidMessageId(_)) => {}
            other => panic!("expected InvalidMessageId for {bad:?}, got {other:?}"),
        }
    }
}

#[test]
fn attachments_list_for_message() {
    let dir = tempfile::tempdir().unwrap();
    let root = new_store(dir.path());
    let mut repo = open_repo(&root, ticking_ids());

    repo.create_topic("tasks", "").unwrap();
    let message = repo
        .create_message("tasks", None, "see attachment", None, None)
        .unwrap();
    let blob = repo.put_blob(b"file bytes", Some("text/plain")).unwrap();

    repo.attach_blob(&message, &blob, Some("notes.txt")).unwrap();
    let attachments = repo.list_attachments(&message).unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].blob_id, blob);
    assert_eq!(attachments[0].name.as_deref(), Some("notes.txt"));

    match repo.attach_blob(&message, "sha256:unknown", None) {
        Err(StoreError::BlobNotFound(_)) => {}
        other => panic!("expected BlobNotFound, got {other:?}"),
    }
}
