//! Evidence intake core for the Sentinel Atlas reporting portal.
//!
//! Hashes evidence, assembles cases, and projects them into signed-looking
//! manifests for authorities. The default signature is a shared-secret
//! placeholder and [`verify`] is a structural check only; neither is a
//! trust guarantee.

pub mod api;
pub mod case;
pub mod classify;
pub mod config;
pub mod evidence;
pub mod fingerprint;
pub mod hasher;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod signer;
pub mod submission;
pub mod verify;

use std::sync::Arc;
use tokio::sync::Mutex;

use classify::{ClassificationService, RuleClassifier};
use config::{Config, SignerKind};
use manifest::ManifestBuilder;
use pipeline::Pipeline;
use registry::CaseRegistry;
use signer::{Ed25519ManifestSigner, ManifestSigner, SharedSecretSigner};

/// Picks the signer the config asks for.
pub fn signer_from_config(config: &Config) -> anyhow::Result<Arc<dyn ManifestSigner>> {
    let signer: Arc<dyn ManifestSigner> = match config.signer {
        SignerKind::Placeholder => Arc::new(SharedSecretSigner::new(config.signing_secret.clone())),
        SignerKind::Ed25519 => Arc::new(Ed25519ManifestSigner::load_or_generate(&config.key_path)?),
    };
    Ok(signer)
}

/// Wires classifier, signer, pipeline and an empty registry.
pub fn build_state(config: &Config) -> anyhow::Result<api::AppState> {
    let classifier: Arc<dyn ClassificationService> = Arc::new(RuleClassifier);
    let signer = signer_from_config(config)?;
    let builder = ManifestBuilder::new(
        classifier.clone(),
        signer,
        config.default_jurisdiction.clone(),
        config.verification_base_url.clone(),
    );

    Ok(api::AppState {
        pipeline: Arc::new(Pipeline::standard(builder, classifier)),
        registry: Arc::new(Mutex::new(CaseRegistry::new())),
    })
}
