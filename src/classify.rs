use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Coarse ordinal severity. Ordering is meaningful: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Routing priority shown to authorities; coarser than [`RiskLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl From<RiskLevel> for Priority {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Critical | RiskLevel::High => Priority::High,
            RiskLevel::Medium => Priority::Medium,
            RiskLevel::Low => Priority::Low,
        }
    }
}

/// Tags that on their own make a case critical.
pub const HIGH_RISK_TAGS: &[&str] = &[
    "Threats of Violence",
    "Incitement to Violence",
    "Doxxing/Personal Info",
];

/// Tags that on their own make a case high.
pub const MEDIUM_RISK_TAGS: &[&str] = &[
    "Harassment Campaign",
    "Vandalism/Destruction",
    "Hate Symbol/Imagery",
    "Holocaust Denial",
    "Blood Libel",
];

/// Violence terms and their inflections; any whole-word hit in the
/// description is critical. Suffixes are listed, not `\w*`, so names such as
/// "Gunther" stay out.
const URGENT_PATTERN: &str = concat!(
    r"(?i)\b(?:",
    r"(?:kill|bomb|shoot|attack|murder|massacre|explosive|burn)(?:s|es|d|ed|ing|ings|er|ers|ous|t)?",
    r"|stab(?:s|bed|bing|bings|ber|bers)?",
    r"|gun(?:s|ned|ning|man|men|fire|shot|shots)?",
    r")\b",
);

/// Community identifiers and the tag substrings that map to them.
const TARGET_GROUPS: &[(&str, &[&str])] = &[
    ("Jewish", &["antisemit", "jew", "holocaust", "blood libel", "zionis"]),
    ("Druze", &["druze"]),
];

const BASE_CONFIDENCE: f64 = 0.60;
const CONFIDENCE_STEP: f64 = 0.10;
const MAX_CONFIDENCE: f64 = 0.95;

fn urgent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URGENT_PATTERN).expect("urgent keyword pattern is valid"))
}

fn tag_in(tag: &str, set: &[&str]) -> bool {
    let tag = tag.trim();
    set.iter().any(|known| known.eq_ignore_ascii_case(tag))
}

/// Which rules fired for a given set of tags and description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskSignals {
    pub urgent_keyword: bool,
    pub high_risk_tag: bool,
    pub medium_risk_tag: bool,
    pub many_tags: bool,
    pub any_tag: bool,
}

impl RiskSignals {
    pub fn scan(tags: &[String], description: &str) -> Self {
        let tags: Vec<&str> = tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
        Self {
            urgent_keyword: urgent_regex().is_match(description),
            high_risk_tag: tags.iter().any(|t| tag_in(t, HIGH_RISK_TAGS)),
            medium_risk_tag: tags.iter().any(|t| tag_in(t, MEDIUM_RISK_TAGS)),
            many_tags: tags.len() >= 3,
            any_tag: !tags.is_empty(),
        }
    }

    /// Rule table, evaluated top-down.
    pub fn risk_level(&self) -> RiskLevel {
        if self.urgent_keyword || self.high_risk_tag {
            RiskLevel::Critical
        } else if self.medium_risk_tag || self.many_tags {
            RiskLevel::High
        } else if self.any_tag {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// More agreeing signals means more confidence in the level.
    pub fn confidence(&self) -> f64 {
        let fired = [
            self.urgent_keyword,
            self.high_risk_tag,
            self.medium_risk_tag,
            self.many_tags,
            self.any_tag,
        ]
        .iter()
        .filter(|s| **s)
        .count();
        let raw = (BASE_CONFIDENCE + CONFIDENCE_STEP * fired as f64).min(MAX_CONFIDENCE);
        (raw * 100.0).round() / 100.0
    }
}

pub fn risk_level(tags: &[String], description: &str) -> RiskLevel {
    RiskSignals::scan(tags, description).risk_level()
}

/// Community groups a case's tags point at, in a fixed order.
pub fn target_groups(tags: &[String]) -> Vec<String> {
    let lowered: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    TARGET_GROUPS
        .iter()
        .filter(|(_, keywords)| {
            lowered
                .iter()
                .any(|tag| keywords.iter().any(|kw| tag.contains(kw)))
        })
        .map(|(group, _)| group.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub target_groups: Vec<String>,
}

/// Classification capability used by the processing pipeline.
///
/// The built-in rule table is [`RuleClassifier`]; a model-backed service can
/// be dropped in without touching manifest assembly.
pub trait ClassificationService: Send + Sync {
    fn classify(&self, tags: &[String], description: &str) -> Classification;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl ClassificationService for RuleClassifier {
    fn classify(&self, tags: &[String], description: &str) -> Classification {
        let signals = RiskSignals::scan(tags, description);
        Classification {
            risk_level: signals.risk_level(),
            confidence: signals.confidence(),
            tags: tags.to_vec(),
            target_groups: target_groups(tags),
        }
    }
}
