use serde::Serialize;
use std::collections::HashMap;

use crate::case::{Case, CaseStatus, TimelineEvent};
use crate::classify::RiskLevel;
use crate::manifest::Manifest;

/// Case Registry
///
/// In-memory index of processed cases for status lookups. Nothing is written
/// to disk; a restart forgets every case.
#[derive(Default)]
pub struct CaseRegistry {
    cases: HashMap<String, Entry>,
}

struct Entry {
    case: Case,
    manifest: Manifest,
}

/// What the status page shows for a case.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStatusView {
    pub id: String,
    pub title: String,
    pub status: CaseStatus,
    pub status_label: &'static str,
    pub platform: String,
    pub jurisdiction: String,
    pub risk_level: RiskLevel,
    pub evidence_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub timeline: Vec<TimelineEvent>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` (and keeps the existing entry) if the id is taken.
    pub fn insert(&mut self, case: Case, manifest: Manifest) -> bool {
        if self.cases.contains_key(&case.id) {
            return false;
        }
        self.cases.insert(case.id.clone(), Entry { case, manifest });
        true
    }

    /// Draws ids from `generate` until one is free, at most `attempts` times.
    /// `None` means every draw collided; the id space may be exhausted.
    pub fn fresh_id<F>(&self, mut generate: F, attempts: usize) -> Option<String>
    where
        F: FnMut() -> String,
    {
        (0..attempts)
            .map(|_| generate())
            .find(|id| !self.cases.contains_key(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cases.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn status(&self, id: &str) -> Option<CaseStatusView> {
        self.cases.get(id.trim()).map(|e| CaseStatusView {
            id: e.case.id.clone(),
            title: e.case.title.clone(),
            status: e.case.status,
            status_label: e.case.status.label(),
            platform: e.case.platform.clone(),
            jurisdiction: e.manifest.jurisdiction.clone(),
            risk_level: e.manifest.classification.risk_level,
            evidence_count: e.case.evidence.len(),
            created_at: e.case.created_at,
            updated_at: e.case.updated_at,
            timeline: e.case.timeline.clone(),
        })
    }

    pub fn manifest(&self, id: &str) -> Option<&Manifest> {
        self.cases.get(id.trim()).map(|e| &e.manifest)
    }
}
