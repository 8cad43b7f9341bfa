use anyhow::{bail, Context};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerKind {
    /// Shared-secret digest. Not a real signature.
    Placeholder,
    Ed25519,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub signer: SignerKind,
    pub key_path: String,
    pub signing_secret: String,
    pub default_jurisdiction: String,
    pub verification_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            signer: SignerKind::Placeholder,
            key_path: "sentinel.key".to_string(),
            signing_secret: "sentinel-atlas-shared-secret".to_string(),
            default_jurisdiction: "International".to_string(),
            verification_base_url: "https://verify.sentinel-atlas.org/cases".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT must be a number, got {:?}", p))?,
            None => defaults.port,
        };
        let signer = match lookup("SIGNER").as_deref() {
            None | Some("placeholder") => SignerKind::Placeholder,
            Some("ed25519") => SignerKind::Ed25519,
            Some(other) => bail!("SIGNER must be `placeholder` or `ed25519`, got {:?}", other),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            signer,
            key_path: lookup("KEY_PATH").unwrap_or(defaults.key_path),
            signing_secret: lookup("SIGNING_SECRET").unwrap_or(defaults.signing_secret),
            default_jurisdiction: lookup("DEFAULT_JURISDICTION").unwrap_or(defaults.default_jurisdiction),
            verification_base_url: lookup("VERIFICATION_BASE_URL")
                .unwrap_or(defaults.verification_base_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.signer, SignerKind::Placeholder);
        assert_eq!(config.default_jurisdiction, "International");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("SIGNER", "ed25519"),
            ("DEFAULT_JURISDICTION", "Germany"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.signer, SignerKind::Ed25519);
        assert_eq!(config.default_jurisdiction, "Germany");
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SIGNER", "rsa")])).is_err());
    }
}
