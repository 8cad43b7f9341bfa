use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::case::{Case, CaseStatus};
use crate::classify::{ClassificationService, RiskLevel};
use crate::evidence::EvidenceKind;
use crate::manifest::{self, Manifest, ManifestBuilder, ManifestError};

/// One stage of case processing. Each stage moves the case forward and may
/// record a timeline entry; the stage names end up in `processing.steps`.
pub trait ProcessingStep: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, case: &mut Case, now: DateTime<Utc>) -> Result<(), ManifestError>;
}

/// Rejects cases the manifest builder would reject, before anything else runs.
pub struct ValidateStep;

impl ProcessingStep for ValidateStep {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn run(&self, case: &mut Case, _now: DateTime<Utc>) -> Result<(), ManifestError> {
        manifest::check_required(case)
    }
}

/// Evidence was hashed at intake; this stage records what was captured.
pub struct CaptureStep;

impl ProcessingStep for CaptureStep {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn run(&self, case: &mut Case, now: DateTime<Utc>) -> Result<(), ManifestError> {
        let snapshots = case
            .evidence
            .iter()
            .filter(|e| e.kind() == EvidenceKind::UrlSnapshot)
            .count();
        let files = case.evidence.len() - snapshots;
        let details = format!(
            "{} file(s) hashed, {} URL snapshot(s) captured, evidence digest {}",
            files,
            snapshots,
            case.evidence_digest().short()
        );
        case.advance(CaseStatus::Processing, "Evidence processed", &details, now);
        Ok(())
    }
}

pub struct ClassifyStep {
    classifier: Arc<dyn ClassificationService>,
}

impl ClassifyStep {
    pub fn new(classifier: Arc<dyn ClassificationService>) -> Self {
        Self { classifier }
    }
}

impl ProcessingStep for ClassifyStep {
    fn name(&self) -> &'static str {
        "classify"
    }

    fn run(&self, case: &mut Case, now: DateTime<Utc>) -> Result<(), ManifestError> {
        let c = self.classifier.classify(&case.tags, &case.description);
        let details = format!(
            "risk level {:?}, confidence {:.2}, {} tag(s)",
            c.risk_level,
            c.confidence,
            c.tags.len()
        );
        if c.risk_level == RiskLevel::Critical {
            warn!(case_id = %case.id, "critical risk case");
        }
        case.advance(CaseStatus::Processing, "Content classified", &details, now);
        Ok(())
    }
}

/// Name of the final, always-present stage.
pub const MANIFEST_STEP: &str = "manifest";

/// Submission lifecycle as seen by the reporter. Every transition produces a
/// new value; nothing is mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Form,
    Processing {
        case_id: String,
        started_at: DateTime<Utc>,
    },
    Success {
        case: Box<Case>,
        manifest: Box<Manifest>,
    },
    Failed {
        case_id: String,
        reason: String,
    },
}

impl SubmissionState {
    pub fn begin(self, case_id: &str, at: DateTime<Utc>) -> Self {
        match self {
            Self::Form => Self::Processing {
                case_id: case_id.to_string(),
                started_at: at,
            },
            other => other,
        }
    }

    pub fn complete(self, case: Case, manifest: Manifest) -> Self {
        match self {
            Self::Processing { .. } => Self::Success {
                case: Box::new(case),
                manifest: Box::new(manifest),
            },
            other => other,
        }
    }

    pub fn fail(self, reason: impl Into<String>) -> Self {
        match self {
            Self::Processing { case_id, .. } => Self::Failed {
                case_id,
                reason: reason.into(),
            },
            other => other,
        }
    }
}

/// Runs the processing stages in order, then builds the manifest once.
pub struct Pipeline {
    steps: Vec<Box<dyn ProcessingStep>>,
    builder: ManifestBuilder,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn ProcessingStep>>, builder: ManifestBuilder) -> Self {
        Self { steps, builder }
    }

    /// validate → capture → classify → manifest
    pub fn standard(builder: ManifestBuilder, classifier: Arc<dyn ClassificationService>) -> Self {
        Self::new(
            vec![
                Box::new(ValidateStep),
                Box::new(CaptureStep),
                Box::new(ClassifyStep::new(classifier)),
            ],
            builder,
        )
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| s.name().to_string())
            .chain(std::iter::once(MANIFEST_STEP.to_string()))
            .collect()
    }

    /// Drives a freshly created case to `Success` or `Failed`.
    pub fn process(&self, mut case: Case) -> SubmissionState {
        // 1. Form → Processing
        let state = SubmissionState::Form.begin(&case.id, Utc::now());

        // 2. Run the steps in order; the first failure ends processing
        for step in &self.steps {
            if let Err(e) = step.run(&mut case, Utc::now()) {
                warn!(case_id = %case.id, step = step.name(), error = %e, "processing step failed");
                return state.fail(e.to_string());
            }
        }

        // 3. Build the manifest exactly once, after every step passed
        let manifest = match self.builder.build(&case, &self.step_names()) {
            Ok(m) => m,
            Err(e) => return state.fail(e.to_string()),
        };
        // 4. Record the hand-off on the timeline
        case.advance(
            CaseStatus::UnderReview,
            "Manifest generated",
            &format!("signed with {}", manifest.signature.algorithm),
            manifest.processing.completed_at,
        );
        info!(
            case_id = %case.id,
            risk = ?manifest.classification.risk_level,
            evidence = manifest.evidence.len(),
            "case processed"
        );
        // 5. Processing → Success
        state.complete(case, manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RuleClassifier;
    use crate::evidence::EvidenceItem;
    use crate::signer::SharedSecretSigner;
    use chrono::NaiveDate;

    fn pipeline() -> Pipeline {
        let classifier: Arc<dyn ClassificationService> = Arc::new(RuleClassifier);
        let builder = ManifestBuilder::new(
            classifier.clone(),
            Arc::new(SharedSecretSigner::new("k")),
            "International",
            "https://verify.example.org/cases",
        );
        Pipeline::standard(builder, classifier)
    }

    fn case(evidence: Vec<EvidenceItem>) -> Case {
        let now = Utc::now();
        Case {
            id: "SA-2025-0042".into(),
            title: "Vandalised memorial photos".into(),
            platform: "Instagram".into(),
            url: None,
            date_observed: NaiveDate::from_ymd_opt(2025, 2, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            description: "Photos of a defaced memorial".into(),
            location: None,
            tags: vec!["Vandalism/Destruction".into()],
            jurisdiction: None,
            anonymous: true,
            contact: None,
            evidence,
            status: CaseStatus::Submitted,
            timeline: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_step_names() {
        assert_eq!(pipeline().step_names(), vec!["validate", "capture", "classify", "manifest"]);
    }

    #[test]
    fn test_process_success() {
        let item = EvidenceItem::from_bytes("memorial.jpg", None, b"jpeg-ish");
        match pipeline().process(case(vec![item])) {
            SubmissionState::Success { case, manifest } => {
                assert_eq!(case.status, CaseStatus::UnderReview);
                assert_eq!(case.timeline.len(), 3);
                assert_eq!(manifest.processing.steps.len(), 4);
                assert_eq!(manifest.classification.risk_level, RiskLevel::High);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_process_without_evidence_fails() {
        match pipeline().process(case(vec![])) {
            SubmissionState::Failed { case_id, reason } => {
                assert_eq!(case_id, "SA-2025-0042");
                assert!(reason.contains("no evidence"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    struct Refuse;

    impl ProcessingStep for Refuse {
        fn name(&self) -> &'static str {
            "refuse"
        }

        fn run(&self, _case: &mut Case, _now: DateTime<Utc>) -> Result<(), ManifestError> {
            Err(ManifestError::MissingField("location"))
        }
    }

    #[test]
    fn test_failed_step_stops_later_steps_and_manifest() {
        let classifier: Arc<dyn ClassificationService> = Arc::new(RuleClassifier);
        let builder = ManifestBuilder::new(
            classifier.clone(),
            Arc::new(SharedSecretSigner::new("k")),
            "International",
            "https://verify.example.org/cases",
        );
        let pipeline = Pipeline::new(
            vec![
                Box::new(ValidateStep),
                Box::new(Refuse),
                Box::new(CaptureStep),
                Box::new(ClassifyStep::new(classifier)),
            ],
            builder,
        );
        let item = EvidenceItem::from_bytes("memorial.jpg", None, b"jpeg-ish");
        match pipeline.process(case(vec![item])) {
            SubmissionState::Failed { case_id, reason } => {
                assert_eq!(case_id, "SA-2025-0042");
                assert!(reason.contains("location"), "{reason}");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_transitions_ignore_out_of_order_events() {
        let form = SubmissionState::Form;
        assert_eq!(form.clone().fail("x"), SubmissionState::Form);
        let processing = form.begin("SA-1", Utc::now());
        assert!(matches!(processing.clone().begin("SA-2", Utc::now()), SubmissionState::Processing { ref case_id, .. } if case_id == "SA-1"));
    }
}
