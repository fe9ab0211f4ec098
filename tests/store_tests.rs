use std::sync::Arc;
use stride_lab::session::DEFAULT_STATE_KEY;
use stride_lab::{FileStore, LoadOutcome, MemoryStore, StateStore, StoreError, ThreatModelSession};

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.get("k").expect("get"), None);
    store.set("k", "v1").expect("set");
    store.set("k", "v2").expect("overwrite");
    assert_eq!(store.get("k").expect("get").as_deref(), Some("v2"));
    store.remove("k").expect("remove");
    assert_eq!(store.get("k").expect("get"), None);
}

#[test]
fn memory_store_quota_rejects_large_values() {
    let store = MemoryStore::with_quota(4);
    store.set("k", "1234").expect("at the limit");
    let err = store.set("k", "12345").expect_err("over quota");
    assert!(matches!(
        err,
        StoreError::QuotaExceeded {
            needed: 5,
            limit: 4
        }
    ));
    assert_eq!(store.get("k").expect("get").as_deref(), Some("1234"));
}

#[test]
fn file_store_round_trip_and_missing_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::open(dir.path().join("state")).expect("open");

    assert_eq!(store.get("threats").expect("get"), None);
    store.set("threats", "[1,2,3]").expect("set");
    assert_eq!(store.get("threats").expect("get").as_deref(), Some("[1,2,3]"));
    assert!(store.dir().join("threats.json").is_file());

    store.remove("threats").expect("remove");
    store.remove("threats").expect("remove twice is fine");
    assert_eq!(store.get("threats").expect("get"), None);
}

#[test]
fn file_store_rejects_path_like_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::open(dir.path()).expect("open");
    for key in ["", "../escape", "a/b", ".hidden", "sp ace"] {
        let err = store.set(key, "x").expect_err(key);
        assert!(matches!(err, StoreError::InvalidKey(_)), "{key}");
    }
}

#[test]
fn file_store_leaves_no_temp_files_behind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::open(dir.path()).expect("open");
    store.set("a", "one").expect("set");
    store.set("a", "two").expect("set");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read_dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.json".to_string()]);
}

#[test]
fn session_state_survives_across_file_store_instances() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let store = Arc::new(FileStore::open(dir.path()).expect("open"));
        let (mut session, outcome) = ThreatModelSession::load(store, DEFAULT_STATE_KEY);
        assert!(matches!(outcome, LoadOutcome::Fresh));
        assert!(session.toggle_mitigation("I-1").persisted());
        assert!(session.toggle_mitigation("E-1").persisted());
    }

    let store = Arc::new(FileStore::open(dir.path()).expect("reopen"));
    let (session, outcome) = ThreatModelSession::load(store, DEFAULT_STATE_KEY);
    assert!(matches!(outcome, LoadOutcome::Restored { threats: 6 }));
    assert_eq!(session.security_score(), 33);
    let mitigated: Vec<&str> = session
        .threats()
        .iter()
        .filter(|t| t.mitigated)
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(mitigated, vec!["I-1", "E-1"]);
}

#[test]
fn corrupt_state_file_is_recovered_not_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join(format!("{DEFAULT_STATE_KEY}.json")), b"\x00\x01garbage")
        .expect("write");

    let store = Arc::new(FileStore::open(dir.path()).expect("open"));
    let (mut session, outcome) = ThreatModelSession::load(store, DEFAULT_STATE_KEY);
    assert!(outcome.is_degraded());
    assert_eq!(session.security_score(), 0);

    // the next write replaces the corrupt file
    assert!(session.toggle_mitigation("S-1").persisted());
    let store = Arc::new(FileStore::open(dir.path()).expect("reopen"));
    let (_, outcome) = ThreatModelSession::load(store, DEFAULT_STATE_KEY);
    assert!(matches!(outcome, LoadOutcome::Restored { .. }));
}
