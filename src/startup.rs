use crate::config::{Config, StorageBackend, StorageConfig};
use crate::session::{LoadOutcome, ThreatModelSession};
use crate::store::{self, StateStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests, embedding) is not an error worth reporting.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build the state store described by `storage`.
pub fn build_state_store(storage: &StorageConfig) -> Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match storage.backend {
        StorageBackend::File => {
            let fs = store::FileStore::open(&storage.dir).with_context(|| {
                format!("failed opening state directory: {}", storage.dir.display())
            })?;
            Arc::new(fs)
        }
        StorageBackend::Memory => {
            warn!("memory storage selected; mitigation state will not survive this process");
            Arc::new(store::MemoryStore::new())
        }
    };

    info!(backend = ?storage.backend, key = %storage.key, "state store ready");
    Ok(store)
}

/// Open a session against `store` using the configured key and thresholds.
pub fn open_session(
    config: &Config,
    store: Arc<dyn StateStore>,
) -> (ThreatModelSession, LoadOutcome) {
    let (session, outcome) = ThreatModelSession::load(store, config.storage.key.clone());
    if let LoadOutcome::Recovered(reason) = &outcome {
        warn!("started from a fresh catalog: {reason}");
    }
    (session.with_thresholds(config.posture), outcome)
}
