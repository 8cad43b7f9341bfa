//! Structural manifest check.
//!
//! **This does not verify signatures.** A manifest passes when it has a
//! non-empty `signature.value`, a non-empty `caseId` and a non-empty
//! `evidence` array. A forged or tampered manifest with those three fields
//! passes too. Treat a `Valid` result as "complete enough to look at", never
//! as a trust decision.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "lowercase")]
pub enum Verification {
    Valid,
    Invalid(String),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }
}

/// Parses JSON text first; unparseable input is `Invalid`, never an error.
pub fn verify_manifest_str(text: &str) -> Verification {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => verify_manifest_value(&value),
        Err(e) => Verification::Invalid(format!("not valid JSON: {}", e)),
    }
}

pub fn verify_manifest_value(manifest: &Value) -> Verification {
    let non_empty_str = |v: Option<&Value>| v.and_then(Value::as_str).is_some_and(|s| !s.trim().is_empty());

    if !manifest.is_object() {
        return Verification::Invalid("manifest is not a JSON object".into());
    }
    if !non_empty_str(manifest.pointer("/signature/value")) {
        return Verification::Invalid("missing signature.value".into());
    }
    if !non_empty_str(manifest.get("caseId")) {
        return Verification::Invalid("missing caseId".into());
    }
    match manifest.get("evidence").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => Verification::Valid,
        Some(_) => Verification::Invalid("evidence list is empty".into()),
        None => Verification::Invalid("missing evidence list".into()),
    }
}
