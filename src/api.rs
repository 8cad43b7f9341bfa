use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::{
    case::generate_case_id,
    evidence::{self, format_file_size, HashOutcome},
    hasher,
    manifest::Manifest,
    pipeline::{Pipeline, SubmissionState},
    registry::{CaseRegistry, CaseStatusView},
    submission::CaseSubmission,
    verify::{self, Verification},
};

// ==========================================
// Shared state
// ==========================================
// The pipeline is read-only; the registry is the only mutable piece.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub registry: Arc<Mutex<CaseRegistry>>,
}

// ==========================================
// DTOs
// ==========================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFileRef {
    pub path: PathBuf,
    #[serde(default)]
    pub media_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(flatten)]
    pub form: CaseSubmission,
    #[serde(default)]
    pub evidence: Vec<EvidenceFileRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedFile {
    pub filename: String,
    pub error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub case_id: String,
    pub manifest: Manifest,
    pub failed_files: Vec<FailedFile>,
}

/// Error body of `POST /cases`. Files that could not be hashed are listed
/// here too, so a rejected submission still says which files were lost.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFailure {
    pub error: String,
    pub failed_files: Vec<FailedFile>,
}

#[derive(Serialize)]
pub struct HashResponse {
    pub hash: String,
    pub size: u64,
    pub size_label: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub reason: Option<String>,
}

type ApiError = (StatusCode, String);
type SubmitError = (StatusCode, Json<SubmitFailure>);

/// Random ids to try before giving up on a free one.
const CASE_ID_ATTEMPTS: usize = 64;

fn rejected(
    status: StatusCode,
    error: impl Into<String>,
    failed_files: Vec<FailedFile>,
) -> SubmitError {
    (
        status,
        Json(SubmitFailure {
            error: error.into(),
            failed_files,
        }),
    )
}

// ==========================================
// Routes
// ==========================================
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // any size up to host memory
        .route("/hash", post(hash_content).layer(DefaultBodyLimit::disable()))
        .route("/cases", post(submit_case))
        .route("/cases/{id}", get(case_status))
        .route("/cases/{id}/manifest", get(case_manifest))
        .route("/verify", post(verify_manifest))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ==========================================
// Handlers
// ==========================================

/// Hashes the raw request body.
async fn hash_content(body: Bytes) -> Json<HashResponse> {
    let size = body.len() as u64;
    let hash = hasher::hash_bytes(&body);
    Json(HashResponse {
        hash: hash.to_string(),
        size,
        size_label: format_file_size(size),
    })
}

/// Validates the form, hashes every file independently, runs the pipeline
/// and stores the result.
async fn submit_case(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitReceipt>), SubmitError> {
    // 1. Form check before any file is touched
    req.form
        .validate()
        .map_err(|e| rejected(StatusCode::BAD_REQUEST, e.to_string(), Vec::new()))?;

    info!(title = %req.form.title, files = req.evidence.len(), "📥 submission received");

    // 2. Hash evidence: one blocking task per file, each writes only its own slot
    let handles: Vec<_> = req
        .evidence
        .into_iter()
        .map(|f| {
            let label = f.path.display().to_string();
            let task = tokio::task::spawn_blocking(move || {
                HashOutcome::for_path(&f.path, f.media_type.as_deref())
            });
            (label, task)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (label, task) in handles {
        match task.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                return Err(rejected(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("hashing task for {} failed: {}", label, e),
                    Vec::new(),
                ))
            }
        }
    }

    // 3. Unreadable files leave the evidence list but stay in the report
    let (items, failures) = evidence::partition_outcomes(outcomes);
    for (filename, error) in &failures {
        warn!(filename = %filename, error = %error, "evidence file dropped");
    }
    let failed_files: Vec<FailedFile> = failures
        .into_iter()
        .map(|(filename, error)| FailedFile { filename, error })
        .collect();

    // 4. Case id: bounded retries, the registry lock is held only for the lookup
    let case_id = {
        let registry = state.registry.lock().await;
        registry.fresh_id(generate_case_id, CASE_ID_ATTEMPTS)
    };
    let Some(case_id) = case_id else {
        warn!(attempts = CASE_ID_ATTEMPTS, "no free case id");
        return Err(rejected(
            StatusCode::SERVICE_UNAVAILABLE,
            "no free case id available, try again later",
            failed_files,
        ));
    };

    // 5. Build the case (adds the URL snapshot)
    let case = match req.form.into_case(case_id.clone(), items, Utc::now()) {
        Ok(case) => case,
        Err(e) => return Err(rejected(StatusCode::BAD_REQUEST, e.to_string(), failed_files)),
    };

    // 6. validate → capture → classify → manifest, off the async workers
    let pipeline = state.pipeline.clone();
    let outcome = match tokio::task::spawn_blocking(move || pipeline.process(case)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            return Err(rejected(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Task join error: {}", e),
                failed_files,
            ))
        }
    };

    // 7. Store and answer with the manifest
    match outcome {
        SubmissionState::Success { case, manifest } => {
            let manifest = *manifest;
            let inserted = state.registry.lock().await.insert(*case, manifest.clone());
            if !inserted {
                return Err(rejected(
                    StatusCode::CONFLICT,
                    format!("case id {} already taken", case_id),
                    failed_files,
                ));
            }
            info!(case_id = %case_id, "✅ case stored");
            Ok((
                StatusCode::CREATED,
                Json(SubmitReceipt {
                    case_id,
                    manifest,
                    failed_files,
                }),
            ))
        }
        SubmissionState::Failed { reason, .. } => {
            Err(rejected(StatusCode::UNPROCESSABLE_ENTITY, reason, failed_files))
        }
        other => Err(rejected(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("pipeline stopped in unexpected state {:?}", other),
            failed_files,
        )),
    }
}

async fn case_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CaseStatusView>, ApiError> {
    info!(case_id = %id, "🔍 status lookup");
    let view = state.registry.lock().await.status(&id);
    view.map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("case {} not found", id)))
}

async fn case_manifest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Manifest>, ApiError> {
    let manifest = state.registry.lock().await.manifest(&id).cloned();
    manifest
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("case {} not found", id)))
}

/// Structural check only; see [`crate::verify`].
async fn verify_manifest(body: Bytes) -> Json<VerifyResponse> {
    let text = String::from_utf8_lossy(&body);
    let response = match verify::verify_manifest_str(&text) {
        Verification::Valid => VerifyResponse {
            valid: true,
            reason: None,
        },
        Verification::Invalid(reason) => VerifyResponse {
            valid: false,
            reason: Some(reason),
        },
    };
    Json(response)
}
