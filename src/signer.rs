use chrono::{DateTime, SecondsFormat, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::hasher::{self, ContentHash};

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("key file {path}: {source}")]
    KeyIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {0} does not hold a 32-byte hex Ed25519 secret key")]
    BadKey(String),
}

/// The fixed projection of a case that gets signed: id, aggregate evidence
/// digest and creation time. Nothing else about the case is covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePayload {
    pub case_id: String,
    pub evidence_digest: ContentHash,
    pub created_at: DateTime<Utc>,
}

impl SignaturePayload {
    /// `case_id:evidence_digest:created_at`
    pub fn canonical(&self) -> String {
        format!(
            "{}:{}:{}",
            self.case_id,
            self.evidence_digest,
            self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Produces the `signature` block of a manifest.
pub trait ManifestSigner: Send + Sync {
    fn algorithm(&self) -> &str;
    fn public_key(&self) -> String;
    fn sign(&self, payload: &SignaturePayload) -> String;
}

/// PLACEHOLDER scheme: `sha256(payload ":" shared_secret)`.
///
/// This is not a signature. Anyone holding the secret can forge it, nobody
/// without the secret can check it, and the secret ships with every client.
/// It exists so manifests have a stable, recognisable `signature` block until
/// a real trust model (asymmetric keys plus key distribution) is chosen.
pub struct SharedSecretSigner {
    secret: String,
}

impl SharedSecretSigner {
    pub const ALGORITHM: &'static str = "SHA256-SHARED-SECRET-PLACEHOLDER";
    pub const PUBLIC_KEY: &'static str = "SENTINEL_ATLAS_PUBLIC_KEY";

    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl ManifestSigner for SharedSecretSigner {
    fn algorithm(&self) -> &str {
        Self::ALGORITHM
    }

    fn public_key(&self) -> String {
        Self::PUBLIC_KEY.to_string()
    }

    fn sign(&self, payload: &SignaturePayload) -> String {
        hasher::hash_str(&format!("{}:{}", payload.canonical(), self.secret)).to_string()
    }
}

/// Ed25519 signer over the same canonical payload.
///
/// Opt-in (`SIGNER=ed25519`). The key file holds the hex-encoded 32-byte
/// secret key; the service identity is its verifying key.
pub struct Ed25519ManifestSigner {
    keypair: SigningKey,
}

impl Ed25519ManifestSigner {
    pub const ALGORITHM: &'static str = "Ed25519";

    pub fn generate() -> Self {
        Self {
            keypair: SigningKey::generate(&mut OsRng),
        }
    }

    /// Loads the key at `path`, or creates and writes a fresh one.
    pub fn load_or_generate(path: &str) -> Result<Self, SignerError> {
        if Path::new(path).exists() {
            let text = fs::read_to_string(path).map_err(|source| SignerError::KeyIo {
                path: path.to_string(),
                source,
            })?;
            let bytes: [u8; 32] = hex::decode(text.trim())
                .ok()
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| SignerError::BadKey(path.to_string()))?;
            info!(path, "loaded Ed25519 signing key");
            return Ok(Self {
                keypair: SigningKey::from_bytes(&bytes),
            });
        }

        let signer = Self::generate();
        fs::write(path, hex::encode(signer.keypair.to_bytes())).map_err(|source| {
            SignerError::KeyIo {
                path: path.to_string(),
                source,
            }
        })?;
        info!(path, "generated new Ed25519 signing key");
        Ok(signer)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.keypair.verifying_key()
    }

    /// Checks a hex signature against a verifying key. Kept separate from the
    /// manifest verifier, which only checks structure.
    pub fn verify(key: &VerifyingKey, payload: &SignaturePayload, signature_hex: &str) -> bool {
        let Some(bytes) = hex::decode(signature_hex)
            .ok()
            .and_then(|b| <[u8; 64]>::try_from(b).ok())
        else {
            return false;
        };
        let signature = Signature::from_bytes(&bytes);
        key.verify(payload.canonical().as_bytes(), &signature).is_ok()
    }
}

impl ManifestSigner for Ed25519ManifestSigner {
    fn algorithm(&self) -> &str {
        Self::ALGORITHM
    }

    fn public_key(&self) -> String {
        hex::encode(self.verifying_key().to_bytes())
    }

    fn sign(&self, payload: &SignaturePayload) -> String {
        hex::encode(self.keypair.sign(payload.canonical().as_bytes()).to_bytes())
    }
}
