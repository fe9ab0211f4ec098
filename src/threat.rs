use serde::{Deserialize, Serialize};
use std::fmt;

/// The six STRIDE threat kinds.
///
/// Serialized with the display name ("Information Disclosure") so persisted
/// state stays readable by the browser build of the tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrideCategory {
    Spoofing,
    Tampering,
    Repudiation,
    #[serde(rename = "Information Disclosure")]
    InformationDisclosure,
    #[serde(rename = "Denial of Service")]
    DenialOfService,
    #[serde(rename = "Elevation of Privilege")]
    ElevationOfPrivilege,
}

impl StrideCategory {
    pub const ALL: [StrideCategory; 6] = [
        StrideCategory::Spoofing,
        StrideCategory::Tampering,
        StrideCategory::Repudiation,
        StrideCategory::InformationDisclosure,
        StrideCategory::DenialOfService,
        StrideCategory::ElevationOfPrivilege,
    ];

    /// Single-letter STRIDE code, also the prefix of catalog ids.
    pub fn letter(self) -> char {
        match self {
            StrideCategory::Spoofing => 'S',
            StrideCategory::Tampering => 'T',
            StrideCategory::Repudiation => 'R',
            StrideCategory::InformationDisclosure => 'I',
            StrideCategory::DenialOfService => 'D',
            StrideCategory::ElevationOfPrivilege => 'E',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StrideCategory::Spoofing => "Spoofing",
            StrideCategory::Tampering => "Tampering",
            StrideCategory::Repudiation => "Repudiation",
            StrideCategory::InformationDisclosure => "Information Disclosure",
            StrideCategory::DenialOfService => "Denial of Service",
            StrideCategory::ElevationOfPrivilege => "Elevation of Privilege",
        }
    }

    /// Accepts the STRIDE letter, the display label, or a snake/kebab-case
    /// name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        let t = s.trim();
        if t.len() == 1 {
            let c = t.chars().next()?.to_ascii_uppercase();
            return Self::ALL.into_iter().find(|cat| cat.letter() == c);
        }
        let norm: String = t
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|cat| {
            cat.label()
                .chars()
                .filter(|c| *c != ' ')
                .collect::<String>()
                .eq_ignore_ascii_case(&norm)
        })
    }
}

impl fmt::Display for StrideCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordinal rating used for both impact and likelihood.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
        })
    }
}

/// One STRIDE threat against the telemetry architecture.
///
/// `mitigated` is the only field a session ever changes. The extended
/// attributes (`likelihood`, `cvss_score`, `security_controls`,
/// `compliance`) are optional and omitted from JSON when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatRecord {
    pub id: String,
    pub category: StrideCategory,
    pub title: String,
    pub definition: String,
    pub context: String,
    pub mitigation: String,
    pub affected_components: Vec<String>,
    pub impact: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_controls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance: Vec<String>,
    #[serde(default)]
    pub mitigated: bool,
}

impl ThreatRecord {
    /// Copy of this record with `mitigated` replaced.
    pub fn with_mitigated(&self, mitigated: bool) -> Self {
        Self {
            mitigated,
            ..self.clone()
        }
    }

    pub fn affects(&self, node_id: &str) -> bool {
        self.affected_components.iter().any(|c| c == node_id)
    }
}
