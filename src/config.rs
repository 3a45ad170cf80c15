use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Which hosted provider the relay talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Some(ProviderKind::Anthropic),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-3-sonnet-20240229",
            ProviderKind::OpenAi => "gpt-4-turbo-preview",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::OpenAi => "https://api.openai.com",
        }
    }
}

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Per-provider section of the config file. Unset fields fall back to the
/// provider's defaults in [`Config::provider_settings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
}

/// Fully resolved settings for the active provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Empty when no credential is configured; requests then fail at call time.
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub provider: ProviderKind,
    pub anthropic: ProviderConfig,
    pub openai: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.into(),
            provider: ProviderKind::default(),
            anthropic: ProviderConfig::default(),
            openai: ProviderConfig::default(),
        }
    }
}

impl Config {
    /// Directory: ~/.config/yomiage/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("yomiage");
        p
    }

    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_from(&Self::path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load from `path`, returning defaults if the file is missing or invalid.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Override settings from environment variables. `lookup` is
    /// `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            self.anthropic.api_key = key;
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Some(name) = non_empty("YOMIAGE_PROVIDER") {
            match ProviderKind::parse(&name) {
                Some(kind) => self.provider = kind,
                None => log::warn!(
                    "Unknown YOMIAGE_PROVIDER {name:?}, keeping {}",
                    self.provider.as_str()
                ),
            }
        }
        if let Some(addr) = non_empty("YOMIAGE_ADDR") {
            self.listen_addr = addr;
        }
    }

    fn section(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
        }
    }

    /// Settings of the provider selected by `provider`, with defaults filled in.
    pub fn provider_settings(&self) -> ProviderSettings {
        let kind = self.provider;
        let section = self.section(kind);
        ProviderSettings {
            kind,
            api_key: section.api_key.clone(),
            model: section
                .model
                .clone()
                .unwrap_or_else(|| kind.default_model().to_string()),
            max_tokens: section.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| kind.default_base_url().to_string()),
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.section(self.provider).api_key.is_empty()
    }
}
