use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use insideview_contracts::models::{ModelRegistry, ModelSelector};

use crate::backend::{DryrunBackend, GeminiBackend, GenerativeBackend};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_S: f64 = 90.0;
const MIN_TIMEOUT_S: f64 = 15.0;
const MAX_TIMEOUT_S: f64 = 300.0;

/// Engine settings. Environment first, CLI flags layered on top.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub request_timeout: Duration,
    pub image_model: Option<String>,
    pub text_model: Option<String>,
    pub dryrun: bool,
    pub events_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_S),
            image_model: None,
            text_model: None,
            dryrun: false,
            events_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("GOOGLE_API_KEY"))
            .or_else(|| lookup("API_KEY"));
        let api_base = lookup("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let timeout_s = lookup("INSIDEVIEW_REQUEST_TIMEOUT")
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(DEFAULT_TIMEOUT_S)
            .clamp(MIN_TIMEOUT_S, MAX_TIMEOUT_S);

        Self {
            api_key,
            api_base,
            request_timeout: Duration::from_secs_f64(timeout_s),
            image_model: lookup("INSIDEVIEW_IMAGE_MODEL"),
            text_model: lookup("INSIDEVIEW_TEXT_MODEL"),
            dryrun: false,
            events_path: None,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn selector(&self) -> ModelSelector {
        if self.dryrun {
            ModelSelector::new(Some(ModelRegistry::dryrun()))
        } else {
            ModelSelector::default()
        }
    }

    /// Backend for this configuration, `None` when no key is available.
    pub fn backend(&self) -> Option<Arc<dyn GenerativeBackend>> {
        if self.dryrun {
            return Some(Arc::new(DryrunBackend::new()));
        }
        GeminiBackend::from_config(self)
            .ok()
            .map(|backend| Arc::new(backend) as Arc<dyn GenerativeBackend>)
    }

    /// Backend for a key supplied at runtime (reconnect).
    pub fn backend_with_key(&self, api_key: &str) -> Option<Arc<dyn GenerativeBackend>> {
        if self.dryrun {
            return Some(Arc::new(DryrunBackend::new()));
        }
        let key = api_key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Arc::new(GeminiBackend::new(
            key,
            &self.api_base,
            self.request_timeout,
        )))
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn key_precedence_prefers_gemini_key() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("API_KEY", "plain"),
            ("GOOGLE_API_KEY", "google"),
            ("GEMINI_API_KEY", "gemini"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("gemini"));

        let fallback = EngineConfig::from_lookup(lookup_from(&[("API_KEY", "plain")]));
        assert_eq!(fallback.api_key.as_deref(), Some("plain"));
    }

    #[test]
    fn missing_values_take_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.api_key, None);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.request_timeout, Duration::from_secs(90));
        assert!(config.backend().is_none());
    }

    #[test]
    fn timeout_is_clamped_and_base_trimmed() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("INSIDEVIEW_REQUEST_TIMEOUT", "2"),
            ("GEMINI_API_BASE", "http://localhost:9000/v1beta/"),
        ]));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.api_base, "http://localhost:9000/v1beta");
    }

    #[test]
    fn dryrun_always_has_a_backend() {
        let config = EngineConfig {
            dryrun: true,
            ..EngineConfig::default()
        };
        assert_eq!(config.backend().map(|backend| backend.name().to_string()), Some("dryrun".to_string()));
        assert!(config.backend_with_key("").is_some());
    }

    #[test]
    fn blank_runtime_key_is_rejected() {
        let config = EngineConfig::default();
        assert!(config.backend_with_key("   ").is_none());
        assert_eq!(
            config.backend_with_key("abc").map(|backend| backend.name().to_string()),
            Some("gemini".to_string())
        );
    }
}
