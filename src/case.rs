use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceItem;
use crate::hasher::{self, ContentHash};

/// Where a case sits in its review lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Submitted,
    Processing,
    UnderReview,
    Routed,
    Closed,
}

impl CaseStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Processing => "Processing",
            Self::UnderReview => "Under Review",
            Self::Routed => "Routed to Authority",
            Self::Closed => "Closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// Case
///
/// One report: the reporter's form values plus the hashed evidence. Risk
/// level is not stored here; it is derived when the manifest is built so it
/// can never drift from the tags and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub title: String,
    pub platform: String,
    pub url: Option<String>,
    /// Always UTC; intake applies the reporter's offset.
    pub date_observed: NaiveDateTime,
    pub description: String,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub jurisdiction: Option<String>,
    pub anonymous: bool,
    pub contact: Option<String>,
    pub evidence: Vec<EvidenceItem>,
    pub status: CaseStatus,
    pub timeline: Vec<TimelineEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Aggregate fingerprint over every evidence hash, in order:
    /// `sha256(hash_1 "\n" hash_2 ...)`.
    pub fn evidence_digest(&self) -> ContentHash {
        let joined = self
            .evidence
            .iter()
            .map(|e| e.hash().as_str())
            .collect::<Vec<_>>()
            .join("\n");
        hasher::hash_str(&joined)
    }

    /// Moves the case to `status` and appends a timeline entry.
    pub fn advance(&mut self, status: CaseStatus, action: &str, details: &str, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
        self.timeline.push(TimelineEvent {
            action: action.to_string(),
            details: details.to_string(),
            timestamp: at,
        });
    }
}

/// `SA-<year>-<NNNN>`, e.g. `SA-2025-0001`.
pub fn generate_case_id() -> String {
    let year = Utc::now().year();
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("SA-{}-{:04}", year, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_id_shape() {
        let id = generate_case_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SA");
        assert_eq!(parts[1], Utc::now().year().to_string());
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&CaseStatus::UnderReview).unwrap(), "\"under_review\"");
        assert_eq!(CaseStatus::Routed.label(), "Routed to Authority");
    }
}
