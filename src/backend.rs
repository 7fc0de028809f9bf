//! Built-in backend presets.
//!
//! Each preset defines the default address, model and credential variable for
//! one kind of model backend. The config only needs to name the kind; anything
//! it leaves unset falls back to the preset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which model backend the relay talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted Anthropic Messages API.
    #[default]
    Anthropic,
    /// Locally-running Ollama server.
    Ollama,
}

#[derive(Debug, Clone)]
pub struct BackendPreset {
    pub kind: BackendKind,
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub default_model: &'static str,
    /// Env var holding the API key. `None` for backends that need no credential.
    pub api_key_env: Option<&'static str>,
    /// Env var that overrides the base URL at startup.
    pub host_env: Option<&'static str>,
    /// Env var that overrides the model at startup.
    pub model_env: Option<&'static str>,
}

const PRESETS: &[BackendPreset] = &[
    BackendPreset {
        kind: BackendKind::Anthropic,
        display_name: "Anthropic API",
        base_url: "https://api.anthropic.com",
        default_model: "claude-3-5-sonnet-20241022",
        api_key_env: Some("ANTHROPIC_API_KEY"),
        host_env: None,
        model_env: None,
    },
    BackendPreset {
        kind: BackendKind::Ollama,
        display_name: "Ollama",
        base_url: "http://localhost:11434",
        default_model: "llama3.2",
        api_key_env: None,
        host_env: Some("OLLAMA_HOST"),
        model_env: Some("OLLAMA_MODEL"),
    },
];

impl BackendKind {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "anthropic" | "claude" | "hosted" => Some(Self::Anthropic),
            "ollama" | "local" => Some(Self::Ollama),
            _ => None,
        }
    }

    #[must_use]
    pub fn preset(self) -> &'static BackendPreset {
        // PRESETS holds exactly one entry per kind
        match self {
            Self::Anthropic => &PRESETS[0],
            Self::Ollama => &PRESETS[1],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preset().display_name)
    }
}

impl BackendPreset {
    #[must_use]
    pub fn all() -> &'static [BackendPreset] {
        PRESETS
    }
}
