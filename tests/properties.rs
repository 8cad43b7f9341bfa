//! End-to-end checks of the hashing / classification / manifest contract.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

use sentinel_atlas_core::{
    case::{Case, CaseStatus},
    classify::{risk_level, RiskLevel, RuleClassifier},
    evidence::EvidenceItem,
    hasher,
    manifest::ManifestBuilder,
    registry::CaseRegistry,
    signer::{Ed25519ManifestSigner, SharedSecretSigner, SignaturePayload},
    verify::{verify_manifest_str, verify_manifest_value},
};

fn tags(t: &[&str]) -> Vec<String> {
    t.iter().map(|s| s.to_string()).collect()
}

fn fixture_case(tags: Vec<String>, description: &str) -> Case {
    let created = Utc.with_ymd_and_hms(2025, 1, 16, 10, 30, 0).unwrap();
    Case {
        id: "SA-2025-0001".into(),
        title: "Fixture case".into(),
        platform: "Facebook".into(),
        url: None,
        date_observed: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap().and_hms_opt(22, 0, 0).unwrap(),
        description: description.into(),
        location: None,
        tags,
        jurisdiction: Some("Germany".into()),
        anonymous: false,
        contact: Some("a@b.org".into()),
        evidence: vec![
            EvidenceItem::from_bytes("one.txt", None, b"first"),
            EvidenceItem::from_bytes("two.txt", None, b"second"),
        ],
        status: CaseStatus::Submitted,
        timeline: vec![],
        created_at: created,
        updated_at: created,
    }
}

fn builder() -> ManifestBuilder {
    ManifestBuilder::new(
        Arc::new(RuleClassifier),
        Arc::new(SharedSecretSigner::new("fixture")),
        "International",
        "https://verify.example.org/cases",
    )
}

#[test]
fn test_hash_determinism_and_distinctness() {
    for fixture in [&b""[..], &b"a"[..], &b"screenshot"[..], &[0u8; 4096][..]] {
        assert_eq!(hasher::hash_bytes(fixture), hasher::hash_bytes(fixture));
    }
    assert_ne!(hasher::hash_bytes(b"evidence-a"), hasher::hash_bytes(b"evidence-b"));
}

#[test]
fn test_risk_table() {
    let calm = "Offensive reply under a post.";
    assert_eq!(risk_level(&tags(&["Threats of Violence"]), calm), RiskLevel::Critical);
    assert_eq!(risk_level(&tags(&["Harassment Campaign"]), calm), RiskLevel::High);
    assert_eq!(risk_level(&tags(&["Other Hate Speech"]), calm), RiskLevel::Medium);
    assert_eq!(risk_level(&[], calm), RiskLevel::Low);
    assert_eq!(risk_level(&[], "a threat to bomb the building"), RiskLevel::Critical);
}

#[test]
fn test_manifest_repeatable() {
    let case = fixture_case(tags(&["Holocaust Denial"]), "Posts denying the Holocaust.");
    let b = builder();
    let now = Utc::now();
    let first = b.build_at(&case, &[], now).unwrap();
    let second = b.build_at(&case, &[], now + Duration::milliseconds(250)).unwrap();

    assert_eq!(first.classification, second.classification);
    assert_eq!(first.incident, second.incident);
    assert_eq!(first.evidence, second.evidence);
    assert_eq!(first.signature, second.signature);
}

#[test]
fn test_manifest_hashes_match_intake() {
    let case = fixture_case(vec![], "Something offensive.");
    let manifest = builder().build(&case, &[]).unwrap();
    assert_eq!(manifest.evidence[0].hash, hasher::hash_bytes(b"first"));
    assert_eq!(manifest.evidence[1].hash, hasher::hash_bytes(b"second"));
}

#[test]
fn test_placeholder_signature_covers_projection() {
    let case = fixture_case(vec![], "Something offensive.");
    let manifest = builder().build(&case, &[]).unwrap();

    let expected = hasher::hash_str(&format!(
        "SA-2025-0001:{}:2025-01-16T10:30:00.000Z:fixture",
        case.evidence_digest()
    ));
    assert_eq!(manifest.signature.value, expected.to_string());

    // changing the evidence changes the signature
    let mut other = case.clone();
    other.evidence.pop();
    assert_ne!(builder().build(&other, &[]).unwrap().signature.value, manifest.signature.value);
}

#[test]
fn test_ed25519_manifest_signature_checks_out() {
    let signer = Arc::new(Ed25519ManifestSigner::generate());
    let b = ManifestBuilder::new(Arc::new(RuleClassifier), signer.clone(), "International", "https://v");
    let case = fixture_case(vec![], "Something offensive.");
    let manifest = b.build(&case, &[]).unwrap();

    let payload = SignaturePayload {
        case_id: case.id.clone(),
        evidence_digest: case.evidence_digest(),
        created_at: case.created_at,
    };
    assert_eq!(manifest.signature.algorithm, "Ed25519");
    assert!(Ed25519ManifestSigner::verify(&signer.verifying_key(), &payload, &manifest.signature.value));
}

#[test]
fn test_verifier_is_structural_only() {
    let case = fixture_case(vec![], "Something offensive.");
    let manifest = builder().build(&case, &[]).unwrap();
    let mut value = serde_json::to_value(&manifest).unwrap();
    assert!(verify_manifest_value(&value).is_valid());

    // a forged signature still passes: nothing cryptographic is checked
    value["signature"]["value"] = json!("forged");
    assert!(verify_manifest_value(&value).is_valid());

    value["signature"].as_object_mut().unwrap().remove("value");
    assert!(!verify_manifest_value(&value).is_valid());
    assert!(!verify_manifest_str("").is_valid());
}

#[test]
fn test_registry_lookup() {
    let case = fixture_case(tags(&["Harassment Campaign"]), "Coordinated replies.");
    let manifest = builder().build(&case, &[]).unwrap();

    let mut registry = CaseRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.insert(case.clone(), manifest.clone()));
    assert!(!registry.insert(case, manifest));
    assert_eq!(registry.len(), 1);

    let view = registry.status(" SA-2025-0001 ").unwrap();
    assert_eq!(view.risk_level, RiskLevel::High);
    assert_eq!(view.jurisdiction, "Germany");
    assert_eq!(view.status_label, "Submitted");
    assert!(registry.manifest("SA-2025-0002").is_none());
}
