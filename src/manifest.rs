use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::case::Case;
use crate::classify::{Classification, ClassificationService, Priority};
use crate::evidence::EvidenceKind;
use crate::hasher::ContentHash;
use crate::signer::{ManifestSigner, SignaturePayload};

pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("case field `{0}` is missing or blank")]
    MissingField(&'static str),

    #[error("case {0} has no evidence")]
    NoEvidence(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub platform: String,
    pub url: Option<String>,
    /// `Case::date_observed` is normalised to UTC at intake.
    pub date_observed: DateTime<Utc>,
    pub location: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceEntry {
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    pub hash: ContentHash,
    pub size: u64,
    pub url: Option<String>,
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
    pub anonymous: bool,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processing {
    pub steps: Vec<String>,
    pub completed_at: DateTime<Utc>,
    pub verification_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBlock {
    pub algorithm: String,
    pub value: String,
    pub public_key: String,
}

/// Manifest
///
/// Read-only projection of a finalized case for an outside party. Evidence is
/// referenced by hash, never copied. Built once, at submission completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub case_id: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub jurisdiction: String,
    pub priority: Priority,
    pub classification: Classification,
    pub incident: Incident,
    pub evidence: Vec<EvidenceEntry>,
    pub reporter: Reporter,
    pub processing: Processing,
    pub signature: SignatureBlock,
}

impl Manifest {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Assembles manifests from cases.
///
/// Holds the classification capability and the signer so both can be
/// swapped without touching assembly.
#[derive(Clone)]
pub struct ManifestBuilder {
    classifier: Arc<dyn ClassificationService>,
    signer: Arc<dyn ManifestSigner>,
    default_jurisdiction: String,
    verification_base_url: String,
}

impl ManifestBuilder {
    pub fn new(
        classifier: Arc<dyn ClassificationService>,
        signer: Arc<dyn ManifestSigner>,
        default_jurisdiction: impl Into<String>,
        verification_base_url: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            signer,
            default_jurisdiction: default_jurisdiction.into(),
            verification_base_url: verification_base_url.into(),
        }
    }

    pub fn build(&self, case: &Case, steps: &[String]) -> Result<Manifest, ManifestError> {
        self.build_at(case, steps, Utc::now())
    }

    /// Same as [`build`](Self::build) with an explicit wall clock. Only
    /// `timestamp` and `processing.completedAt` depend on `now`.
    pub fn build_at(
        &self,
        case: &Case,
        steps: &[String],
        now: DateTime<Utc>,
    ) -> Result<Manifest, ManifestError> {
        check_required(case)?;

        let classification = self.classifier.classify(&case.tags, &case.description);
        let priority = Priority::from(classification.risk_level);

        let payload = SignaturePayload {
            case_id: case.id.clone(),
            evidence_digest: case.evidence_digest(),
            created_at: case.created_at,
        };

        Ok(Manifest {
            case_id: case.id.clone(),
            version: MANIFEST_VERSION.to_string(),
            timestamp: now,
            jurisdiction: self.jurisdiction_for(case),
            priority,
            classification,
            incident: Incident {
                platform: case.platform.clone(),
                url: case.url.clone(),
                date_observed: case.date_observed.and_utc(),
                location: case.location.clone(),
                description: case.description.clone(),
            },
            evidence: case
                .evidence
                .iter()
                .map(|item| {
                    let mut metadata = item.metadata().clone();
                    metadata.insert("mediaType".into(), Value::String(item.media_type().to_string()));
                    EvidenceEntry {
                        filename: item.filename().to_string(),
                        kind: item.kind(),
                        hash: item.hash().clone(),
                        size: item.size(),
                        url: item.url().map(str::to_string),
                        metadata,
                    }
                })
                .collect(),
            reporter: Reporter {
                anonymous: case.anonymous,
                contact: if case.anonymous { None } else { case.contact.clone() },
            },
            processing: Processing {
                steps: steps.to_vec(),
                completed_at: now,
                verification_url: format!(
                    "{}/{}",
                    self.verification_base_url.trim_end_matches('/'),
                    case.id
                ),
            },
            signature: SignatureBlock {
                algorithm: self.signer.algorithm().to_string(),
                value: self.signer.sign(&payload),
                public_key: self.signer.public_key(),
            },
        })
    }

    /// Explicit jurisdiction, else the country part of "City, Country",
    /// else the configured default.
    pub fn jurisdiction_for(&self, case: &Case) -> String {
        non_blank(case.jurisdiction.as_deref())
            .or_else(|| {
                non_blank(case.location.as_deref())
                    .and_then(|loc| loc.rsplit(',').next())
                    .and_then(|country| non_blank(Some(country)))
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.default_jurisdiction.clone())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn check_required(case: &Case) -> Result<(), ManifestError> {
    let required = [
        ("id", &case.id),
        ("title", &case.title),
        ("platform", &case.platform),
        ("description", &case.description),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ManifestError::MissingField(name));
        }
    }
    if case.evidence.is_empty() {
        return Err(ManifestError::NoEvidence(case.id.clone()));
    }
    Ok(())
}
