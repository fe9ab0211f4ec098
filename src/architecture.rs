//! Fixed vehicle-to-cloud telemetry architecture.
//!
//! The diagram is a static illustration: node coordinates are fixed and the
//! only dynamic aspects are which nodes a selected threat highlights and
//! which data flows count as secured once specific threats are mitigated.

use crate::threat::ThreatRecord;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum TrustZone {
    #[serde(rename = "car")]
    Vehicle,
    #[serde(rename = "public")]
    Public,
    #[serde(rename = "cloud")]
    Cloud,
}

impl TrustZone {
    pub const ALL: [TrustZone; 3] = [TrustZone::Vehicle, TrustZone::Public, TrustZone::Cloud];

    pub fn title(self) -> &'static str {
        match self {
            TrustZone::Vehicle => "Vehicle Trust Zone",
            TrustZone::Public => "Public Network",
            TrustZone::Cloud => "Cloud Trust Zone",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TrustZone::Vehicle => {
                "High trust. Physical access usually required for compromise, but connects to untrusted networks."
            }
            TrustZone::Public => {
                "Zero trust. Data traverses public infrastructure subject to interception and spoofing."
            }
            TrustZone::Cloud => {
                "Managed trust. Validated inputs only. Strict access controls required."
            }
        }
    }
}

impl fmt::Display for TrustZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Actor,
    External,
    Attacker,
    Process,
    Datastore,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchNode {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: NodeKind,
    pub trust_zone: TrustZone,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataFlow {
    pub source: &'static str,
    pub target: &'static str,
    pub label: &'static str,
}

pub const OVERVIEW: &str = "This Data Flow Diagram (DFD) represents a standard IoT architecture for a connected vehicle. \
The Telemetry Control Unit (TCU) collects sensor data (Speed, GPS, Engine Status) and transmits it \
via a public cellular network (4G/5G) to a Cloud Gateway, which then persists it to a Database.";

pub static NODES: &[ArchNode] = &[
    ArchNode { id: "car-tcu", label: "Car TCU", kind: NodeKind::Actor, trust_zone: TrustZone::Vehicle, x: 100, y: 150 },
    ArchNode { id: "network", label: "Cellular (4G/5G)", kind: NodeKind::External, trust_zone: TrustZone::Public, x: 300, y: 150 },
    ArchNode { id: "attacker", label: "Attacker", kind: NodeKind::Attacker, trust_zone: TrustZone::Public, x: 300, y: 260 },
    ArchNode { id: "cloud-gateway", label: "IoT Gateway", kind: NodeKind::Process, trust_zone: TrustZone::Cloud, x: 500, y: 150 },
    ArchNode { id: "db", label: "Telemetry DB", kind: NodeKind::Datastore, trust_zone: TrustZone::Cloud, x: 700, y: 150 },
];

pub static LINKS: &[DataFlow] = &[
    DataFlow { source: "car-tcu", target: "network", label: "MQTT" },
    DataFlow { source: "network", target: "cloud-gateway", label: "Ingress" },
    DataFlow { source: "cloud-gateway", target: "db", label: "Write" },
    DataFlow { source: "attacker", target: "network", label: "Intercept" },
];

/// Threat ids that must all be mitigated before a flow counts as secured.
static LINK_GUARDS: &[(&str, &str, &[&str])] = &[
    ("car-tcu", "network", &["S-1", "T-1"]),
    ("network", "cloud-gateway", &["D-1"]),
    ("cloud-gateway", "db", &["I-1"]),
];

pub fn node(id: &str) -> Option<&'static ArchNode> {
    NODES.iter().find(|n| n.id == id)
}

pub fn is_known_node(id: &str) -> bool {
    node(id).is_some()
}

/// Display label for a node id, falling back to the id itself.
pub fn label_for(id: &str) -> &str {
    node(id).map(|n| n.label).unwrap_or(id)
}

pub fn nodes_in(zone: TrustZone) -> impl Iterator<Item = &'static ArchNode> {
    NODES.iter().filter(move |n| n.trust_zone == zone)
}

impl DataFlow {
    pub fn is_attack(&self) -> bool {
        node(self.source).is_some_and(|n| n.kind == NodeKind::Attacker)
    }

    /// Threat ids guarding this flow; empty for flows that can never be secured.
    pub fn guarded_by(&self) -> &'static [&'static str] {
        LINK_GUARDS
            .iter()
            .find(|(s, t, _)| *s == self.source && *t == self.target)
            .map(|(_, _, ids)| *ids)
            .unwrap_or(&[])
    }

    pub fn is_secured(&self, threats: &[ThreatRecord]) -> bool {
        let guards = self.guarded_by();
        if guards.is_empty() || self.is_attack() {
            return false;
        }
        guards
            .iter()
            .all(|id| threats.iter().any(|t| t.id == *id && t.mitigated))
    }
}

pub fn secured_links(threats: &[ThreatRecord]) -> Vec<&'static DataFlow> {
    LINKS.iter().filter(|l| l.is_secured(threats)).collect()
}
