use crate::architecture;
use crate::posture::{self, PostureBand, PostureThresholds};
use crate::threat::{Level, StrideCategory, ThreatRecord};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub const PROJECT_NAME: &str = "Connected Vehicle Telemetry V1.0";
pub const COMPLIANCE_FRAMEWORKS: [&str; 3] = ["ISO 21434", "UN R155", "NIST CSF"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Resolved,
    Open,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub category: StrideCategory,
    pub impact: Level,
    pub mitigation: String,
    pub affected_components: Vec<String>,
    pub status: FindingStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub category: StrideCategory,
    pub total: usize,
    pub mitigated: usize,
}

/// Reporting-phase assessment built from the current threat list.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub project: &'static str,
    pub generated_at: String,
    pub score: u8,
    pub posture: PostureBand,
    pub total_threats: usize,
    pub mitigated_threats: usize,
    pub remaining_threats: usize,
    pub meets_baseline: bool,
    pub summary: String,
    pub findings: Vec<Finding>,
    pub categories: Vec<CategoryBreakdown>,
    pub frameworks: Vec<&'static str>,
}

impl ComplianceReport {
    pub fn generate(threats: &[ThreatRecord], thresholds: &PostureThresholds) -> Self {
        Self::generate_at(threats, thresholds, OffsetDateTime::now_utc())
    }

    pub fn generate_at(
        threats: &[ThreatRecord],
        thresholds: &PostureThresholds,
        at: OffsetDateTime,
    ) -> Self {
        let p = posture::assess(threats, thresholds);

        let findings = threats
            .iter()
            .map(|t| Finding {
                id: t.id.clone(),
                title: t.title.clone(),
                category: t.category,
                impact: t.impact,
                mitigation: t.mitigation.clone(),
                affected_components: t
                    .affected_components
                    .iter()
                    .map(|c| architecture::label_for(c).to_string())
                    .collect(),
                status: if t.mitigated {
                    FindingStatus::Resolved
                } else {
                    FindingStatus::Open
                },
            })
            .collect();

        let categories = StrideCategory::ALL
            .into_iter()
            .map(|category| {
                let in_cat = threats.iter().filter(|t| t.category == category);
                CategoryBreakdown {
                    category,
                    total: in_cat.clone().count(),
                    mitigated: in_cat.filter(|t| t.mitigated).count(),
                }
            })
            .filter(|b| b.total > 0)
            .collect();

        Self {
            project: PROJECT_NAME,
            generated_at: at
                .format(&Rfc3339)
                .unwrap_or_else(|_| at.unix_timestamp().to_string()),
            score: p.score,
            posture: p.band,
            total_threats: p.total,
            mitigated_threats: p.mitigated,
            remaining_threats: p.total - p.mitigated,
            meets_baseline: p.score == 100,
            summary: executive_summary(p.total, p.mitigated, p.score),
            findings,
            categories,
            frameworks: COMPLIANCE_FRAMEWORKS.to_vec(),
        }
    }

    pub fn open_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.status == FindingStatus::Open)
    }
}

pub fn executive_summary(total: usize, mitigated: usize, score: u8) -> String {
    let closing = if score < 100 {
        "Immediate attention is required for the remaining vulnerabilities."
    } else {
        "The system architecture meets the baseline security requirements."
    };
    format!(
        "The threat model for the Car Telemetry system identified {total} critical threats across STRIDE categories. \
Currently, {mitigated} threats have been mitigated through architectural controls. {closing}"
    )
}
