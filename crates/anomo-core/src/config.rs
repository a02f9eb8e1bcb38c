//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{CoreError, CoreResult};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomoConfig {
    /// Origin the application shell is served from
    pub origin: Url,

    /// Cache worker settings
    pub worker: WorkerConfig,

    /// Push subscription settings
    pub push: PushConfig,

    /// Hosted backend (data store, auth, functions)
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Script path the worker is registered from
    pub script_path: String,

    /// Versioned cache name; bumping it invalidates every cached entry
    pub cache_name: String,

    /// Paths fetched and cached at install time
    pub manifest: Vec<String>,

    /// Shell document served to navigations when offline
    pub shell_path: String,

    /// Icon and badge shown on notifications
    pub notification_icon: String,

    /// Deep link opened by chat notifications
    pub chat_deep_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Public VAPID key the subscription is bound to
    pub vapid_public_key: String,

    /// Base URL of the browser push service issuing endpoints
    pub push_service_url: Url,

    /// Upper bound for each registration, subscription or persistence step
    pub operation_timeout_ms: u64,

    /// Name of the hosted dispatch function
    pub dispatch_function: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL of the hosted backend
    pub url: Url,

    /// Public (anon) API key
    pub api_key: String,

    /// Table holding per-user settings
    pub settings_table: String,
}

impl Default for AnomoConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("https://anomo.world/").expect("static url"),
            worker: WorkerConfig::default(),
            push: PushConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            script_path: "/sw.js".to_string(),
            cache_name: "anomo-cache-v1".to_string(),
            manifest: [
                "/",
                "/index.html",
                "/manifest.json",
                "/icon-192.png",
                "/icon-512.png",
                "/home",
                "/profile",
                "/hashtag",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            shell_path: "/index.html".to_string(),
            notification_icon: "/icon-192.png".to_string(),
            chat_deep_link: "/?chat=open".to_string(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: "BLBz5AjYPvp_UGqEYGlhsC8Gj6FLEbVPtDVFXz_GhQJTss3eKqJBfqeaEaJqXhNFJqEPPF8TxLGW_zGxgKo_Aic"
                .to_string(),
            push_service_url: Url::parse("https://push.anomo.world/wpush/v2/").expect("static url"),
            operation_timeout_ms: 10_000,
            dispatch_function: "send-push-notification".to_string(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:54321/").expect("static url"),
            api_key: String::new(),
            settings_table: "settings".to_string(),
        }
    }
}

impl BackendConfig {
    /// Project URL as a directory, so relative endpoints keep its path.
    pub fn base_url(&self) -> Url {
        let mut url = self.url.clone();
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url
    }
}

impl PushConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl AnomoConfig {
    /// Load configuration from a JSON file, then apply `ANOMO_*` overrides.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");
        let raw = std::fs::read_to_string(path)?;
        let mut config: AnomoConfig = serde_json::from_str(&raw)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `ANOMO_*` overrides applied.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in practice).
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CoreResult<()> {
        if let Some(origin) = lookup("ANOMO_ORIGIN") {
            self.origin = Url::parse(&origin)?;
        }
        if let Some(url) = lookup("ANOMO_BACKEND_URL") {
            self.backend.url = Url::parse(&url)?;
        }
        if let Some(key) = lookup("ANOMO_BACKEND_API_KEY") {
            self.backend.api_key = key;
        }
        if let Some(key) = lookup("ANOMO_VAPID_PUBLIC_KEY") {
            self.push.vapid_public_key = key;
        }
        if let Some(cache_name) = lookup("ANOMO_CACHE_NAME") {
            self.worker.cache_name = cache_name;
        }
        if let Some(timeout) = lookup("ANOMO_PUSH_TIMEOUT_MS") {
            self.push.operation_timeout_ms = timeout
                .parse()
                .map_err(|_| CoreError::config(format!("invalid ANOMO_PUSH_TIMEOUT_MS: {timeout}")))?;
        }
        Ok(())
    }

    /// Reject configurations the worker or manager cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.worker.cache_name.is_empty() {
            return Err(CoreError::config("worker.cache_name must not be empty"));
        }
        if !self.worker.script_path.starts_with('/') {
            return Err(CoreError::config("worker.script_path must be an absolute path"));
        }
        if !self.worker.manifest.iter().any(|p| p == &self.worker.shell_path) {
            return Err(CoreError::config(
                "worker.manifest must include the shell document",
            ));
        }
        if self.push.vapid_public_key.is_empty() {
            return Err(CoreError::config("push.vapid_public_key must not be empty"));
        }
        if self.push.operation_timeout_ms == 0 {
            return Err(CoreError::config("push.operation_timeout_ms must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_client() {
        let config = AnomoConfig::default();
        assert_eq!(config.worker.cache_name, "anomo-cache-v1");
        assert_eq!(config.worker.script_path, "/sw.js");
        assert!(config.worker.manifest.contains(&"/hashtag".to_string()));
        assert_eq!(config.push.operation_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ANOMO_BACKEND_URL", "https://project.example.co/"),
            ("ANOMO_BACKEND_API_KEY", "anon"),
            ("ANOMO_CACHE_NAME", "anomo-cache-v2"),
            ("ANOMO_PUSH_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();

        let mut config = AnomoConfig::default();
        config
            .apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.backend.url.as_str(), "https://project.example.co/");
        assert_eq!(config.backend.api_key, "anon");
        assert_eq!(config.worker.cache_name, "anomo-cache-v2");
        assert_eq!(config.push.operation_timeout_ms, 250);
    }

    #[test]
    fn test_bad_timeout_override() {
        let mut config = AnomoConfig::default();
        let result = config.apply_env_overrides(|k| {
            (k == "ANOMO_PUSH_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_manifest_must_contain_shell() {
        let mut config = AnomoConfig::default();
        config.worker.manifest.retain(|p| p != "/index.html");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_base_url_keeps_project_path() {
        let config = BackendConfig {
            url: Url::parse("https://host.example/project").unwrap(),
            ..BackendConfig::default()
        };
        let base = config.base_url();
        assert_eq!(base.as_str(), "https://host.example/project/");
        assert_eq!(
            base.join("rest/v1/settings").unwrap().as_str(),
            "https://host.example/project/rest/v1/settings"
        );

        let already = BackendConfig::default();
        assert_eq!(already.base_url(), already.url);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "origin": "https://staging.anomo.world/", "worker": {{ "cache_name": "anomo-cache-v3" }} }}"#
        )
        .unwrap();

        let config = AnomoConfig::load(file.path()).unwrap();
        assert_eq!(config.origin.as_str(), "https://staging.anomo.world/");
        assert_eq!(config.worker.cache_name, "anomo-cache-v3");
        assert_eq!(config.worker.shell_path, "/index.html");
    }
}
