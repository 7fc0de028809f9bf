use crate::backend::{BackendKind, BackendPreset};
use crate::error::{RelayError, Result};
use crate::prompt::SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Replaces the built-in persona prompt when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            base_url: None,
            model: None,
            api_key_env: None,
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            timeout_secs: default_timeout_secs(),
            system_prompt: None,
            backend: BackendConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    4096
}

impl AppConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to defaults.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply the backend's address/model environment overrides from the process env.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let preset = self.preset();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = preset.host_env.and_then(|k| non_empty(k)) {
            self.backend.base_url = Some(url);
        }
        if let Some(model) = preset.model_env.and_then(|k| non_empty(k)) {
            self.backend.model = Some(model);
        }
    }

    #[must_use]
    pub fn preset(&self) -> &'static BackendPreset {
        self.backend.kind.preset()
    }

    /// Resolve the effective base URL (config override or backend preset default).
    /// A bare `host:port`, as `OLLAMA_HOST` allows, is taken to be plain http.
    #[must_use]
    pub fn effective_base_url(&self) -> String {
        let url = self
            .backend
            .base_url
            .clone()
            .unwrap_or_else(|| self.preset().base_url.to_string());
        let url = url.trim().trim_end_matches('/');
        if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{url}")
        }
    }

    #[must_use]
    pub fn effective_model(&self) -> String {
        self.backend
            .model
            .clone()
            .unwrap_or_else(|| self.preset().default_model.to_string())
    }

    /// Name of the env var the API key is read from, if this backend takes one.
    #[must_use]
    pub fn api_key_env(&self) -> Option<String> {
        self.backend
            .api_key_env
            .clone()
            .or_else(|| self.preset().api_key_env.map(str::to_string))
    }

    /// Resolve the API key from the configured environment variable.
    ///
    /// Called per request, so a missing key surfaces as a 500 on the call rather
    /// than at startup.
    pub fn resolve_api_key(&self) -> Result<String> {
        let key_env = self.api_key_env().ok_or_else(|| {
            RelayError::config(format!("{} does not use an API key", self.backend.kind))
        })?;

        match std::env::var(&key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(RelayError::config(format!(
                "{key_env} not configured. Please set your API key in .env file."
            ))),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT)
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("zoppler-radar-ai.toml"));

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("zoppler-radar-ai").join("config.toml"));
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("zoppler-radar-ai").join("config.toml"));
        paths.push(home.join(".zoppler-radar-ai.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 9000
timeout_secs = 30

[backend]
kind = "ollama"
base_url = "http://gpu-box:11434/"
model = "qwen2.5:14b"
"#
        )
        .unwrap();

        let config = AppConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.backend.kind, BackendKind::Ollama);
        assert_eq!(config.effective_base_url(), "http://gpu-box:11434");
        assert_eq!(config.effective_model(), "qwen2.5:14b");
        assert_eq!(config.backend.max_tokens, 4096);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = AppConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.backend.kind, BackendKind::Anthropic);
        assert_eq!(config.effective_base_url(), "https://api.anthropic.com");
        assert_eq!(config.effective_model(), "claude-3-5-sonnet-20241022");
        assert_eq!(config.api_key_env().as_deref(), Some("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_unknown_backend_kind_is_rejected() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "[backend]\nkind = \"openai\"").unwrap();
        assert!(matches!(
            AppConfig::load(f.path()),
            Err(RelayError::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides_local_backend() {
        let env: HashMap<&str, &str> = [
            ("OLLAMA_HOST", "http://10.1.2.3:11434"),
            ("OLLAMA_MODEL", "mistral"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.backend.kind = BackendKind::Ollama;
        config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.effective_base_url(), "http://10.1.2.3:11434");
        assert_eq!(config.effective_model(), "mistral");
    }

    #[test]
    fn test_bare_host_port_gets_http_scheme() {
        let mut config = AppConfig::default();
        config.backend.kind = BackendKind::Ollama;
        config.apply_env_with(|k| (k == "OLLAMA_HOST").then(|| "0.0.0.0:11434".to_string()));
        assert_eq!(config.effective_base_url(), "http://0.0.0.0:11434");

        config.backend.base_url = Some("https://gpu-box:11434/".to_string());
        assert_eq!(config.effective_base_url(), "https://gpu-box:11434");
    }

    #[test]
    fn test_env_overrides_ignored_for_hosted_backend() {
        let mut config = AppConfig::default();
        config.apply_env_with(|_| Some("http://elsewhere".to_string()));
        assert_eq!(config.effective_base_url(), "https://api.anthropic.com");
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let mut config = AppConfig::default();
        config.backend.api_key_env = Some("ZOPPLER_CONFIG_TEST_NEVER_SET".to_string());

        let err = config.resolve_api_key().unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));
        assert!(err.to_string().contains("ZOPPLER_CONFIG_TEST_NEVER_SET"));
    }

    #[test]
    fn test_system_prompt_override() {
        let mut config = AppConfig::default();
        assert_eq!(config.system_prompt(), SYSTEM_PROMPT);
        config.system_prompt = Some("Be terse.".to_string());
        assert_eq!(config.system_prompt(), "Be terse.");
    }
}
