//! Provider credential lookup.
//!
//! Credentials come from a local JSON store file, with environment
//! variables taking precedence. The absence of a credential disables that
//! provider's adapters for the whole session. A malformed or unreadable
//! store is treated as "no credentials configured", never as an error.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Optional API keys for the keyed providers.
///
/// Yahoo needs no credential and is always configured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderCredentialSet {
    /// Finnhub API key
    #[serde(default)]
    pub finnhub: Option<String>,

    /// Alpha Vantage API key
    #[serde(default)]
    pub alpha_vantage: Option<String>,

    /// Financial Modeling Prep API key
    #[serde(default)]
    pub fmp: Option<String>,
}

impl ProviderCredentialSet {
    /// Create an empty credential set (keyed providers disabled).
    pub fn none() -> Self {
        Self::default()
    }

    /// Read credentials from the environment.
    ///
    /// Empty variables count as absent.
    pub fn from_env() -> Self {
        fn non_empty(var: &str) -> Option<String> {
            std::env::var(var).ok().filter(|v| !v.trim().is_empty())
        }

        Self {
            finnhub: non_empty("FINNHUB_API_KEY"),
            alpha_vantage: non_empty("ALPHA_VANTAGE_API_KEY"),
            fmp: non_empty("FMP_API_KEY"),
        }
    }

    /// Read credentials from a JSON store file.
    ///
    /// Any failure (missing file, unreadable file, unparseable JSON) yields
    /// an empty set: all credentials are treated as absent.
    pub fn from_store(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Credential store {} not readable: {}", path.display(), e);
                return Self::none();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(set) => set,
            Err(e) => {
                warn!("Credential store {} malformed: {}", path.display(), e);
                Self::none()
            }
        }
    }

    /// Read the store file, then let environment variables override.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let stored = Self::from_store(path);
        let env = Self::from_env();
        Self {
            finnhub: env.finnhub.or(stored.finnhub),
            alpha_vantage: env.alpha_vantage.or(stored.alpha_vantage),
            fmp: env.fmp.or(stored.fmp),
        }
    }

    /// Number of keyed providers with a configured credential.
    pub fn configured_count(&self) -> usize {
        [&self.finnhub, &self.alpha_vantage, &self.fmp]
            .iter()
            .filter(|key| key.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_has_no_credentials() {
        let set = ProviderCredentialSet::none();
        assert_eq!(set.configured_count(), 0);
    }

    #[test]
    fn test_from_store_missing_file() {
        let set = ProviderCredentialSet::from_store("/nonexistent/credentials.json");
        assert_eq!(set, ProviderCredentialSet::none());
    }

    #[test]
    fn test_from_store_parses_json() {
        let dir = std::env::temp_dir().join("kursblick-cred-test-parse");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("credentials.json");
        std::fs::write(&path, r#"{"finnhub": "fh-key", "fmp": "fmp-key"}"#).unwrap();

        let set = ProviderCredentialSet::from_store(&path);
        assert_eq!(set.finnhub, Some("fh-key".to_string()));
        assert_eq!(set.alpha_vantage, None);
        assert_eq!(set.fmp, Some("fmp-key".to_string()));
        assert_eq!(set.configured_count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_store_malformed_json_yields_empty_set() {
        let dir = std::env::temp_dir().join("kursblick-cred-test-malformed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("credentials.json");
        std::fs::write(&path, "{not valid json").unwrap();

        let set = ProviderCredentialSet::from_store(&path);
        assert_eq!(set, ProviderCredentialSet::none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
