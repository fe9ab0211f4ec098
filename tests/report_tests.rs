use stride_lab::posture::{PostureBand, PostureThresholds};
use stride_lab::report::{executive_summary, ComplianceReport, FindingStatus, COMPLIANCE_FRAMEWORKS};
use stride_lab::{StrideCategory, ThreatCatalog, ThreatRecord};
use time::macros::datetime;

fn threats_with(ids: &[&str]) -> Vec<ThreatRecord> {
    ThreatCatalog::builtin()
        .fresh_threats()
        .into_iter()
        .map(|t| {
            let m = ids.contains(&t.id.as_str());
            t.with_mitigated(m)
        })
        .collect()
}

#[test]
fn partial_mitigation_report() {
    let threats = threats_with(&["S-1", "T-1", "D-1"]);
    let report = ComplianceReport::generate_at(
        &threats,
        &PostureThresholds::default(),
        datetime!(2026-03-01 12:00 UTC),
    );

    assert_eq!(report.project, "Connected Vehicle Telemetry V1.0");
    assert_eq!(report.generated_at, "2026-03-01T12:00:00Z");
    assert_eq!(report.score, 50);
    assert_eq!(report.posture, PostureBand::AtRisk);
    assert_eq!(report.total_threats, 6);
    assert_eq!(report.mitigated_threats, 3);
    assert_eq!(report.remaining_threats, 3);
    assert!(!report.meets_baseline);
    assert!(report
        .summary
        .ends_with("Immediate attention is required for the remaining vulnerabilities."));

    let open: Vec<&str> = report.open_findings().map(|f| f.id.as_str()).collect();
    assert_eq!(open, vec!["R-1", "I-1", "E-1"]);
    assert_eq!(report.findings[0].status, FindingStatus::Resolved);
    assert_eq!(
        report.findings[0].affected_components,
        vec!["Attacker".to_string(), "IoT Gateway".to_string()]
    );
}

#[test]
fn full_mitigation_meets_baseline() {
    let threats = threats_with(&["S-1", "T-1", "R-1", "I-1", "D-1", "E-1"]);
    let report = ComplianceReport::generate(&threats, &PostureThresholds::default());
    assert_eq!(report.score, 100);
    assert_eq!(report.posture, PostureBand::Secure);
    assert!(report.meets_baseline);
    assert!(report
        .summary
        .ends_with("The system architecture meets the baseline security requirements."));
}

#[test]
fn category_breakdown_covers_every_stride_kind() {
    let threats = threats_with(&["I-1"]);
    let report = ComplianceReport::generate(&threats, &PostureThresholds::default());
    assert_eq!(report.categories.len(), 6);
    for b in &report.categories {
        assert_eq!(b.total, 1);
        let expect = usize::from(b.category == StrideCategory::InformationDisclosure);
        assert_eq!(b.mitigated, expect, "{}", b.category);
    }
}

#[test]
fn frameworks_and_json_shape() {
    let report = ComplianceReport::generate(&threats_with(&[]), &PostureThresholds::default());
    assert_eq!(report.frameworks, COMPLIANCE_FRAMEWORKS.to_vec());

    let v = serde_json::to_value(&report).expect("serialize");
    assert_eq!(v["posture"], "critical");
    assert_eq!(v["findings"][3]["status"], "open");
    assert_eq!(v["findings"][3]["category"], "Information Disclosure");
}

#[test]
fn summary_counts_threats() {
    let s = executive_summary(6, 2, 33);
    assert!(s.contains("identified 6 critical threats"));
    assert!(s.contains("Currently, 2 threats have been mitigated"));
}
