use crate::threat::ThreatRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostureThresholds {
    pub strong_score: u8,
    pub fair_score: u8,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            strong_score: 70,
            fair_score: 40,
        }
    }
}

impl PostureThresholds {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        fn get(name: &str, default: u8) -> u8 {
            std::env::var(name)
                .ok()
                .and_then(|v| v.trim().parse::<u8>().ok())
                .unwrap_or(default)
        }

        Self {
            strong_score: get("STRIDE_POSTURE_STRONG", self.strong_score),
            fair_score: get("STRIDE_POSTURE_FAIR", self.fair_score),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureBand {
    Critical,
    AtRisk,
    Strong,
    Secure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Posture {
    pub score: u8,
    pub mitigated: usize,
    pub total: usize,
    pub band: PostureBand,
}

/// Percentage of mitigated threats, rounded half-up. An empty set scores 0.
pub fn security_score(mitigated: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let mitigated = mitigated.min(total);
    // round(100 * m / n) == floor((200 * m + n) / (2 * n)) for non-negative m, n.
    ((200 * mitigated + total) / (2 * total)) as u8
}

/// Band a score.
///
/// Policy:
/// - 100 is `Secure`, regardless of thresholds.
/// - strictly above `strong_score` is `Strong`.
/// - strictly above `fair_score` is `AtRisk`.
/// - anything else is `Critical`.
pub fn classify(score: u8, t: &PostureThresholds) -> PostureBand {
    if score >= 100 {
        PostureBand::Secure
    } else if score > t.strong_score {
        PostureBand::Strong
    } else if score > t.fair_score {
        PostureBand::AtRisk
    } else {
        PostureBand::Critical
    }
}

pub fn assess(threats: &[ThreatRecord], t: &PostureThresholds) -> Posture {
    let mitigated = threats.iter().filter(|r| r.mitigated).count();
    let total = threats.len();
    let score = security_score(mitigated, total);
    Posture {
        score,
        mitigated,
        total,
        band: classify(score, t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_rounds_half_up() {
        assert_eq!(security_score(0, 6), 0);
        assert_eq!(security_score(1, 6), 17);
        assert_eq!(security_score(2, 6), 33);
        assert_eq!(security_score(3, 6), 50);
        assert_eq!(security_score(5, 6), 83);
        assert_eq!(security_score(6, 6), 100);
        // 12.5 rounds up
        assert_eq!(security_score(1, 8), 13);
    }

    #[test]
    fn empty_set_scores_zero() {
        assert_eq!(security_score(0, 0), 0);
    }

    #[test]
    fn bands_follow_thresholds() {
        let t = PostureThresholds::default();
        assert_eq!(classify(0, &t), PostureBand::Critical);
        assert_eq!(classify(40, &t), PostureBand::Critical);
        assert_eq!(classify(50, &t), PostureBand::AtRisk);
        assert_eq!(classify(70, &t), PostureBand::AtRisk);
        assert_eq!(classify(83, &t), PostureBand::Strong);
        assert_eq!(classify(100, &t), PostureBand::Secure);
    }
}
