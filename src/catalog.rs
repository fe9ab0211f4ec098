use crate::architecture;
use crate::error::CatalogError;
use crate::threat::{Level, StrideCategory, ThreatRecord};
use once_cell::sync::Lazy;
use std::collections::HashSet;

static TELEMETRY: Lazy<ThreatCatalog> = Lazy::new(ThreatCatalog::telemetry);

/// Ordered, read-only list of threats a session starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatCatalog {
    threats: Vec<ThreatRecord>,
}

impl ThreatCatalog {
    /// The built-in connected-vehicle telemetry catalog.
    pub fn builtin() -> &'static ThreatCatalog {
        &TELEMETRY
    }

    /// Build a catalog from arbitrary records, enforcing unique ids and
    /// known architecture nodes. `mitigated` is reset on every record.
    pub fn new(threats: Vec<ThreatRecord>) -> Result<Self, CatalogError> {
        let catalog = Self {
            threats: threats.into_iter().map(|t| t.with_mitigated(false)).collect(),
        };
        catalog.check()?;
        Ok(catalog)
    }

    pub fn check(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for t in &self.threats {
            if !seen.insert(t.id.as_str()) {
                return Err(CatalogError::DuplicateId(t.id.clone()));
            }
            if let Some(node) = t
                .affected_components
                .iter()
                .find(|c| !architecture::is_known_node(c))
            {
                return Err(CatalogError::UnknownComponent {
                    threat: t.id.clone(),
                    node: node.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn threats(&self) -> &[ThreatRecord] {
        &self.threats
    }

    pub fn len(&self) -> usize {
        self.threats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threats.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ThreatRecord> {
        self.threats.iter().find(|t| t.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.threats.iter().map(|t| t.id.as_str())
    }

    pub fn by_category(&self, category: StrideCategory) -> impl Iterator<Item = &ThreatRecord> {
        self.threats.iter().filter(move |t| t.category == category)
    }

    /// Fresh session copy: every record unmitigated, catalog order.
    pub fn fresh_threats(&self) -> Vec<ThreatRecord> {
        self.threats.iter().map(|t| t.with_mitigated(false)).collect()
    }

    fn telemetry() -> Self {
        let threats = vec![
            threat(
                "S-1",
                StrideCategory::Spoofing,
                "TCU Identity Spoofing",
                "An attacker masquerades as a legitimate vehicle to inject false telemetry.",
                "A rogue device uses a cloned VIN (Vehicle Identification Number) to connect to the Cloud Gateway. If successful, it sends fake 'Crash Detected' alerts.",
                "Implement Mutual TLS (mTLS). Provision each TCU with a unique X.509 certificate stored in a Hardware Security Module (HSM).",
                &["attacker", "cloud-gateway"],
                Level::High,
            ),
            threat(
                "T-1",
                StrideCategory::Tampering,
                "Telemetry Man-in-the-Middle",
                "Modifying data in transit between the car and cloud.",
                "The attacker intercepts cellular packets using a rogue base station (IMSI catcher) and alters the GPS coordinates to hide the vehicle's location.",
                "Enforce TLS 1.3 for transport security and sign the data payload (HMAC) at the application layer.",
                &["network", "attacker"],
                Level::High,
            ),
            threat(
                "R-1",
                StrideCategory::Repudiation,
                "Driver Action Repudiation",
                "A user denies performing an action, and the system cannot prove otherwise.",
                "A user claims they did not unlock the car remotely via the app. The system lacks signed logs to prove the command came from their phone.",
                "Implement Non-Repudiation logging. All commands must be digitally signed by the user's private key before execution.",
                &["cloud-gateway", "db"],
                Level::Medium,
            ),
            threat(
                "I-1",
                StrideCategory::InformationDisclosure,
                "GPS History Leak",
                "Unwanted exposure of sensitive data.",
                "The database is compromised via SQL Injection, leaking the travel history (locations, times) of VIP customers.",
                "Encrypt data at rest (AES-256). Use parameterized queries to prevent injection. Implement Column-level encryption for GPS data.",
                &["db"],
                Level::High,
            ),
            threat(
                "D-1",
                StrideCategory::DenialOfService,
                "Gateway DDoS",
                "Degrading service availability for legitimate users.",
                "A botnet floods the MQTT broker with connection attempts, preventing legitimate cars from reporting emergency status.",
                "Deploy Cloud WAF/Shield. Implement rate limiting per IP and per Client ID at the ingress gateway.",
                &["cloud-gateway", "network"],
                Level::High,
            ),
            threat(
                "E-1",
                StrideCategory::ElevationOfPrivilege,
                "Remote Code Execution (RCE)",
                "An attacker gains elevated access permissions.",
                "An unpatched vulnerability in the OTA (Over-the-Air) update service allows an attacker to push a malicious firmware update, gaining root on the TCU.",
                "Code Signing for all firmware images. Secure Boot validation on the TCU. Least Privilege principles for OTA service accounts.",
                &["car-tcu", "cloud-gateway"],
                Level::High,
            ),
        ];
        Self { threats }
    }
}

#[allow(clippy::too_many_arguments)]
fn threat(
    id: &str,
    category: StrideCategory,
    title: &str,
    definition: &str,
    context: &str,
    mitigation: &str,
    affected: &[&str],
    impact: Level,
) -> ThreatRecord {
    ThreatRecord {
        id: id.to_string(),
        category,
        title: title.to_string(),
        definition: definition.to_string(),
        context: context.to_string(),
        mitigation: mitigation.to_string(),
        affected_components: affected.iter().map(|s| s.to_string()).collect(),
        impact,
        likelihood: None,
        cvss_score: None,
        security_controls: Vec::new(),
        compliance: Vec::new(),
        mitigated: false,
    }
}
