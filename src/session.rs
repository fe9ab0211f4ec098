//! Runtime state of one threat-modeling walkthrough.
//!
//! A session owns the current phase, the selected STRIDE category and the
//! per-threat mitigation flags. Only the threat list is persisted; phase and
//! category always start from their defaults.

use crate::architecture::{self, ArchNode, DataFlow};
use crate::catalog::ThreatCatalog;
use crate::error::{RestoreError, StoreError};
use crate::posture::{self, Posture, PostureThresholds};
use crate::report::ComplianceReport;
use crate::schema;
use crate::store::StateStore;
use crate::threat::{StrideCategory, ThreatRecord};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, sync::Arc};
use tracing::{debug, info, warn};

pub const DEFAULT_STATE_KEY: &str = "threatModeler_threats";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Definition,
    Analysis,
    Mitigation,
    Reporting,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Definition,
        Phase::Analysis,
        Phase::Mitigation,
        Phase::Reporting,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Next phase on the suggested forward path; `None` from Reporting.
    pub fn next(self) -> Option<Phase> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Phase> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Definition => "Architecture",
            Phase::Analysis => "Threat Analysis",
            Phase::Mitigation => "Risk Mitigation",
            Phase::Reporting => "Security Report",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::Definition => "System Overview",
            Phase::Analysis => "STRIDE Assessment",
            Phase::Mitigation => "Security Controls",
            Phase::Reporting => "Compliance Documentation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "definition" | "architecture" | "1" => Some(Phase::Definition),
            "analysis" | "2" => Some(Phase::Analysis),
            "mitigation" | "3" => Some(Phase::Mitigation),
            "reporting" | "report" | "4" => Some(Phase::Reporting),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    PhaseChanged { from: Phase, to: Phase },
    CategorySelected(Option<StrideCategory>),
    MitigationToggled { id: String, mitigated: bool, score: u8 },
}

/// Receives one notification per session mutation.
pub trait SessionObserver: Send + Sync {
    fn on_change(&self, change: &SessionChange);
}

impl<F> SessionObserver for F
where
    F: Fn(&SessionChange) + Send + Sync,
{
    fn on_change(&self, change: &SessionChange) {
        self(change)
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    /// Nothing was persisted; the session starts from the catalog.
    Fresh,
    Restored { threats: usize },
    /// Persisted state was discarded and the catalog used instead.
    Recovered(RestoreError),
}

impl LoadOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, LoadOutcome::Recovered(_))
    }
}

#[derive(Debug)]
pub enum ToggleOutcome {
    Toggled {
        mitigated: bool,
        saved: Result<(), StoreError>,
    },
    UnknownThreat,
}

impl ToggleOutcome {
    pub fn persisted(&self) -> bool {
        matches!(self, ToggleOutcome::Toggled { saved: Ok(()), .. })
    }
}

#[derive(Deserialize)]
struct PersistedFlag {
    id: String,
    mitigated: bool,
}

pub struct ThreatModelSession {
    phase: Phase,
    active_category: Option<StrideCategory>,
    threats: Vec<ThreatRecord>,
    catalog: ThreatCatalog,
    store: Arc<dyn StateStore>,
    key: String,
    thresholds: PostureThresholds,
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl ThreatModelSession {
    /// Open a session over the built-in catalog, restoring mitigation flags
    /// from `store` when a compatible record set is persisted under `key`.
    pub fn load(store: Arc<dyn StateStore>, key: impl Into<String>) -> (Self, LoadOutcome) {
        Self::load_with_catalog(ThreatCatalog::builtin().clone(), store, key)
    }

    pub fn load_with_catalog(
        catalog: ThreatCatalog,
        store: Arc<dyn StateStore>,
        key: impl Into<String>,
    ) -> (Self, LoadOutcome) {
        let key = key.into();

        let (threats, outcome) = match read_persisted(&catalog, store.as_ref(), &key) {
            Ok(Some(threats)) => {
                info!(key = %key, threats = threats.len(), "restored persisted threat state");
                let n = threats.len();
                (threats, LoadOutcome::Restored { threats: n })
            }
            Ok(None) => {
                debug!(key = %key, "no persisted threat state; starting from catalog");
                (catalog.fresh_threats(), LoadOutcome::Fresh)
            }
            Err(e) => {
                warn!(key = %key, "discarding persisted threat state: {e}");
                (catalog.fresh_threats(), LoadOutcome::Recovered(e))
            }
        };

        let session = Self {
            phase: Phase::default(),
            active_category: None,
            threats,
            catalog,
            store,
            key,
            thresholds: PostureThresholds::default(),
            observers: Vec::new(),
        };
        (session, outcome)
    }

    pub fn with_thresholds(mut self, thresholds: PostureThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_category(&self) -> Option<StrideCategory> {
        self.active_category
    }

    pub fn threats(&self) -> &[ThreatRecord] {
        &self.threats
    }

    pub fn catalog(&self) -> &ThreatCatalog {
        &self.catalog
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn thresholds(&self) -> &PostureThresholds {
        &self.thresholds
    }

    /// Any phase is reachable from any other; the category selection is
    /// always cleared.
    pub fn set_phase(&mut self, phase: Phase) {
        let from = self.phase;
        self.phase = phase;
        self.active_category = None;
        debug!(?from, to = ?phase, "phase changed");
        self.notify(&SessionChange::PhaseChanged { from, to: phase });
    }

    pub fn set_active_category(&mut self, category: StrideCategory) {
        self.active_category = Some(category);
        debug!(?category, "category selected");
        self.notify(&SessionChange::CategorySelected(Some(category)));
    }

    pub fn clear_active_category(&mut self) {
        self.active_category = None;
        self.notify(&SessionChange::CategorySelected(None));
    }

    /// Flip the mitigation flag of `id` and persist the full threat list.
    ///
    /// Unknown ids are a no-op and nothing is written. A failed write is
    /// logged and reported in the outcome; the in-memory flip stands.
    pub fn toggle_mitigation(&mut self, id: &str) -> ToggleOutcome {
        let Some(pos) = self.threats.iter().position(|t| t.id == id) else {
            debug!(threat = id, "toggle ignored: unknown threat id");
            return ToggleOutcome::UnknownThreat;
        };

        let updated = self.threats[pos].with_mitigated(!self.threats[pos].mitigated);
        let mitigated = updated.mitigated;
        self.threats[pos] = updated;
        info!(threat = id, mitigated, "mitigation toggled");

        let saved = self.save();
        let score = self.security_score();
        self.notify(&SessionChange::MitigationToggled {
            id: id.to_string(),
            mitigated,
            score,
        });

        ToggleOutcome::Toggled { mitigated, saved }
    }

    /// Persist the full threat list under the session key.
    pub fn save(&self) -> Result<(), StoreError> {
        let result = serde_json::to_string(&self.threats)
            .map_err(StoreError::from)
            .and_then(|raw| self.store.set(&self.key, &raw));
        if let Err(e) = &result {
            warn!(key = %self.key, "failed to persist threat state: {e}");
        }
        result
    }

    pub fn mitigated_count(&self) -> usize {
        self.threats.iter().filter(|t| t.mitigated).count()
    }

    pub fn remaining_count(&self) -> usize {
        self.threats.len() - self.mitigated_count()
    }

    pub fn security_score(&self) -> u8 {
        posture::security_score(self.mitigated_count(), self.threats.len())
    }

    pub fn posture(&self) -> Posture {
        posture::assess(&self.threats, &self.thresholds)
    }

    /// First threat of the selected category.
    pub fn active_threat(&self) -> Option<&ThreatRecord> {
        let category = self.active_category?;
        self.threats.iter().find(|t| t.category == category)
    }

    /// Architecture nodes the active threat can compromise.
    pub fn highlighted_nodes(&self) -> Vec<&'static ArchNode> {
        let Some(threat) = self.active_threat() else {
            return Vec::new();
        };
        architecture::NODES
            .iter()
            .filter(|n| threat.affects(n.id))
            .collect()
    }

    pub fn secured_links(&self) -> Vec<&'static DataFlow> {
        architecture::secured_links(&self.threats)
    }

    pub fn report(&self) -> ComplianceReport {
        ComplianceReport::generate(&self.threats, &self.thresholds)
    }

    fn notify(&self, change: &SessionChange) {
        for o in &self.observers {
            o.on_change(change);
        }
    }
}

fn read_persisted(
    catalog: &ThreatCatalog,
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<Vec<ThreatRecord>>, RestoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    restore(catalog, &raw).map(Some)
}

/// Rebuild the threat list from its persisted JSON form.
///
/// Only `id` and `mitigated` are taken from storage; record text comes from
/// the catalog. Catalog threats missing from storage are appended
/// unmitigated.
pub fn restore(catalog: &ThreatCatalog, raw: &str) -> Result<Vec<ThreatRecord>, RestoreError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !schema::matches_persisted_shape(&value) {
        return Err(RestoreError::SchemaMismatch);
    }
    let flags: Vec<PersistedFlag> = serde_json::from_value(value)?;

    let mut seen = HashSet::new();
    let mut threats = Vec::with_capacity(catalog.len());
    for flag in flags {
        let Some(record) = catalog.get(&flag.id) else {
            return Err(RestoreError::UnknownThreat(flag.id));
        };
        if !seen.insert(record.id.as_str()) {
            return Err(RestoreError::DuplicateThreat(flag.id));
        }
        threats.push(record.with_mitigated(flag.mitigated));
    }

    for record in catalog.threats() {
        if !seen.contains(record.id.as_str()) {
            debug!(threat = %record.id, "catalog threat missing from persisted state");
            threats.push(record.with_mitigated(false));
        }
    }

    Ok(threats)
}
