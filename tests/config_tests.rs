use serial_test::serial;
use std::path::PathBuf;
use stride_lab::config::{self, Config, StorageBackend};
use stride_lab::posture::PostureThresholds;
use stride_lab::startup;

const ENV_VARS: [&str; 4] = [
    "STRIDE_STATE_DIR",
    "STRIDE_STATE_KEY",
    "STRIDE_POSTURE_STRONG",
    "STRIDE_POSTURE_FAIR",
];

fn clear_env() {
    for v in ENV_VARS {
        std::env::remove_var(v);
    }
}

#[test]
fn example_config_parses_to_defaults() {
    let cfg: Config = toml::from_str(config::EXAMPLE).expect("example parses");
    cfg.validate().expect("example validates");
    assert_eq!(cfg, Config::default());
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("stride.toml");
    std::fs::write(
        &path,
        "[storage]\nbackend = \"memory\"\n\n[posture]\nstrong_score = 80\n",
    )
    .expect("write");

    let cfg = Config::load(&path).expect("load");
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(cfg.storage.key, "threatModeler_threats");
    assert_eq!(cfg.posture.strong_score, 80);
    assert_eq!(cfg.posture.fair_score, 40);
    assert_eq!(cfg.logging.filter, "warn");
}

#[test]
fn unknown_keys_and_bad_thresholds_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    let typo = dir.path().join("typo.toml");
    std::fs::write(&typo, "[storage]\nbakend = \"file\"\n").expect("write");
    assert!(Config::load(&typo).is_err());

    let inverted = dir.path().join("inverted.toml");
    std::fs::write(&inverted, "[posture]\nstrong_score = 30\nfair_score = 50\n").expect("write");
    let err = Config::load(&inverted).expect_err("fair above strong");
    assert!(format!("{err:#}").contains("fair_score"));

    let posture_typo = dir.path().join("posture_typo.toml");
    std::fs::write(&posture_typo, "[posture]\nstrong = 90\n").expect("write");
    let err = Config::load(&posture_typo).expect_err("unknown posture key");
    assert!(format!("{err:#}").contains("strong"));
}

#[test]
fn file_backend_rejects_keys_that_are_not_file_names() {
    let dir = tempfile::tempdir().expect("tempdir");

    for bad in ["team/threats", "../escape", ".hidden", "a b"] {
        let path = dir.path().join("bad_key.toml");
        std::fs::write(&path, format!("[storage]\nkey = \"{bad}\"\n")).expect("write");
        let err = Config::load(&path).expect_err(bad);
        assert!(format!("{err:#}").contains("storage.key"), "{bad}: {err:#}");
    }

    // the memory backend never turns the key into a path
    let path = dir.path().join("memory.toml");
    std::fs::write(&path, "[storage]\nbackend = \"memory\"\nkey = \"team/threats\"\n")
        .expect("write");
    let cfg = Config::load(&path).expect("memory backend accepts any non-empty key");
    assert_eq!(cfg.storage.key, "team/threats");
}

#[test]
fn missing_file_is_an_error_with_context() {
    let err = Config::load(&PathBuf::from("/nonexistent/stride.toml")).expect_err("missing");
    assert!(format!("{err:#}").contains("failed reading config file"));
}

#[test]
#[serial]
fn env_overrides_apply_on_resolve() {
    clear_env();
    std::env::set_var("STRIDE_STATE_DIR", "/tmp/stride-env-state");
    std::env::set_var("STRIDE_STATE_KEY", "custom_key");
    std::env::set_var("STRIDE_POSTURE_STRONG", "90");
    std::env::set_var("STRIDE_POSTURE_FAIR", "not-a-number");

    let cfg = Config::resolve(None).expect("resolve");
    assert_eq!(cfg.storage.dir, PathBuf::from("/tmp/stride-env-state"));
    assert_eq!(cfg.storage.backend, StorageBackend::File);
    assert_eq!(cfg.storage.key, "custom_key");
    assert_eq!(cfg.posture.strong_score, 90);
    assert_eq!(cfg.posture.fair_score, 40);

    clear_env();
}

#[test]
#[serial]
fn thresholds_from_env_fall_back_to_defaults() {
    clear_env();
    assert_eq!(PostureThresholds::from_env(), PostureThresholds::default());
    std::env::set_var("STRIDE_POSTURE_FAIR", " 25 ");
    assert_eq!(PostureThresholds::from_env().fair_score, 25);
    clear_env();
}

#[test]
#[serial]
fn startup_opens_session_with_configured_thresholds() {
    clear_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = Config::default();
    cfg.storage.dir = dir.path().to_path_buf();
    cfg.posture = PostureThresholds {
        strong_score: 10,
        fair_score: 5,
    };

    let store = startup::build_state_store(&cfg.storage).expect("store");
    let (mut session, _) = startup::open_session(&cfg, store);
    session.toggle_mitigation("S-1");
    assert_eq!(session.thresholds(), &cfg.posture);
    assert_eq!(
        session.posture().band,
        stride_lab::posture::PostureBand::Strong
    );
    assert!(dir.path().join("threatModeler_threats.json").is_file());
}
