use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::fingerprint;
use crate::hasher::{self, ContentHash, HashError};

/// Coarse evidence category, derived from the declared media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Image,
    Video,
    Audio,
    Document,
    UrlSnapshot,
}

impl EvidenceKind {
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = media_type.to_ascii_lowercase();
        if media_type.starts_with("image/") {
            Self::Image
        } else if media_type.starts_with("video/") {
            Self::Video
        } else if media_type.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Document
        }
    }
}

/// Evidence Item
///
/// One uploaded file (or captured URL) tied to a case.
///
/// Fields are private: an item only comes into existence after its bytes were
/// hashed, and nothing can change it afterwards. The hash carried into the
/// manifest is therefore always the one computed at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    id: Uuid,
    filename: String,
    kind: EvidenceKind,
    media_type: String,
    size: u64,
    hash: ContentHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

impl EvidenceItem {
    /// Builds an item from in-memory bytes (e.g. an HTTP upload body).
    pub fn from_bytes(filename: impl Into<String>, media_type: Option<&str>, bytes: &[u8]) -> Self {
        let filename = filename.into();
        let media_type = media_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_media_type(&filename).to_string());
        let mut item = Self::hashed(filename, media_type, hasher::hash_bytes(bytes), bytes.len() as u64);
        if item.kind == EvidenceKind::Image {
            if let Some(phash) = fingerprint::perceptual_hash_bytes(bytes) {
                item.metadata.insert("phash".into(), Value::String(phash));
            }
        }
        item
    }

    /// Hashes a file on disk. Read failures propagate; no item is produced.
    pub fn from_path(path: &Path, media_type: Option<&str>) -> Result<Self, HashError> {
        let (hash, size) = hasher::hash_file(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_media_type(&filename).to_string());

        let mut item = Self::hashed(filename, media_type, hash, size);
        if item.kind == EvidenceKind::Image {
            // A file that is not actually decodable just carries no phash.
            if let Some(phash) = fingerprint::perceptual_hash_file(path) {
                item.metadata.insert("phash".into(), Value::String(phash));
            }
        }
        Ok(item)
    }

    /// Snapshot of a public link. The fingerprint is the digest of the URL
    /// text itself; no page content is fetched.
    pub fn url_snapshot(url: &str, domain: &str) -> Self {
        let mut item = Self::hashed(
            format!("{}.url", if domain.is_empty() { "link" } else { domain }),
            "text/uri-list".to_string(),
            hasher::hash_str(url),
            url.len() as u64,
        );
        item.kind = EvidenceKind::UrlSnapshot;
        item.url = Some(url.to_string());
        item.metadata.insert("domain".into(), Value::String(domain.to_string()));
        item
    }

    fn hashed(filename: String, media_type: String, hash: ContentHash, size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EvidenceKind::from_media_type(&media_type),
            filename,
            media_type,
            size,
            hash,
            url: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn filename(&self) -> &str {
        &self.filename
    }
    pub fn kind(&self) -> EvidenceKind {
        self.kind
    }
    pub fn media_type(&self) -> &str {
        &self.media_type
    }
    pub fn size(&self) -> u64 {
        self.size
    }
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }
}

/// Per-file result of intake hashing. A failed file is reported, not dropped
/// silently, and never enters the case's evidence list.
#[derive(Debug)]
pub enum HashOutcome {
    Hashed(EvidenceItem),
    Failed { filename: String, error: HashError },
}

impl HashOutcome {
    pub fn for_path(path: &Path, media_type: Option<&str>) -> Self {
        match EvidenceItem::from_path(path, media_type) {
            Ok(item) => Self::Hashed(item),
            Err(error) => Self::Failed {
                filename: path.display().to_string(),
                error,
            },
        }
    }
}

/// Splits outcomes into accepted items and `(filename, message)` failures.
pub fn partition_outcomes(outcomes: Vec<HashOutcome>) -> (Vec<EvidenceItem>, Vec<(String, String)>) {
    let mut items = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            HashOutcome::Hashed(item) => items.push(item),
            HashOutcome::Failed { filename, error } => failures.push((filename, error.to_string())),
        }
    }
    (items, failures)
}

/// Best-effort media type from a file extension.
pub fn guess_media_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Human-readable size, e.g. `2.72 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
