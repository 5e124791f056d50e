//! Configuration for the relay
//!
//! Process-wide settings are loaded once at startup, either from the
//! environment or from a TOML file, and then handed to the pipeline builder.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RelayError, Result};

/// Process-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Model identifier used by every agent without its own binding
    pub model: String,

    /// Sampling temperature forwarded to the model
    pub temperature: Option<f32>,

    /// Maximum agent-to-agent transitions per run
    pub max_hops: usize,

    /// Maximum model calls per run
    pub max_turns: usize,

    /// Per-call timeout for tool invokers, in seconds
    pub tool_timeout_secs: u64,

    /// Soft timeout for a whole run, in seconds; 0 disables it
    pub run_timeout_secs: u64,

    /// Log full message dumps at info level
    pub verbose_logging: bool,

    /// Record and export a span trace for each run
    pub tracing_enabled: bool,

    /// API key for the model binding
    pub openai_api_key: Option<String>,

    /// Web search provider settings
    pub search: SearchSettings,

    /// Keyword metrics provider settings
    pub keywords: KeywordSettings,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            max_hops: 6,
            max_turns: 24,
            tool_timeout_secs: 60,
            run_timeout_secs: 300,
            verbose_logging: false,
            tracing_enabled: false,
            openai_api_key: None,
            search: SearchSettings::default(),
            keywords: KeywordSettings::default(),
        }
    }
}

/// Oxylabs realtime search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub geo_location: String,
    pub limit: u32,
    /// How many organic results are rendered for the agent
    pub top_n: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://realtime.oxylabs.io/v1/queries".to_string(),
            username: None,
            password: None,
            geo_location: "United Arab Emirates".to_string(),
            limit: 10,
            top_n: 3,
        }
    }
}

/// DataForSEO Labs keyword settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSettings {
    pub endpoint: String,
    pub login: Option<String>,
    pub password: Option<String>,
    pub location_code: u32,
    pub language_code: String,
}

impl Default for KeywordSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.dataforseo.com/v3/dataforseo_labs/google/keyword_overview/live"
                .to_string(),
            login: None,
            password: None,
            location_code: 2710,
            language_code: "en".to_string(),
        }
    }
}

impl RelayConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Check that every credential and bound needed at runtime is present.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if is_blank(&self.openai_api_key) {
            missing.push("OPENAI_API_KEY");
        }
        if is_blank(&self.search.username) {
            missing.push("OXYLABS_USERNAME");
        }
        if is_blank(&self.search.password) {
            missing.push("OXYLABS_PASSWORD");
        }
        if is_blank(&self.keywords.login) {
            missing.push("DATAFORSEO_LOGIN");
        }
        if is_blank(&self.keywords.password) {
            missing.push("DATAFORSEO_PASSWORD");
        }
        if !missing.is_empty() {
            return Err(RelayError::config(format!(
                "missing credentials: {}",
                missing.join(", ")
            )));
        }
        if self.max_hops == 0 {
            return Err(RelayError::config("max_hops must be at least 1"));
        }
        if self.max_turns == 0 {
            return Err(RelayError::config("max_turns must be at least 1"));
        }
        if self.tool_timeout_secs == 0 {
            return Err(RelayError::config("tool_timeout_secs must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(RelayError::config("model identifier is empty"));
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Configuration builder
pub struct ConfigBuilder {
    config: RelayConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    pub fn max_hops(mut self, hops: usize) -> Self {
        self.config.max_hops = hops;
        self
    }

    pub fn max_turns(mut self, turns: usize) -> Self {
        self.config.max_turns = turns;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Whole-run soft timeout; zero disables it.
    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.config.run_timeout_secs = timeout.as_secs();
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.config.verbose_logging = enabled;
        self
    }

    pub fn tracing(mut self, enabled: bool) -> Self {
        self.config.tracing_enabled = enabled;
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn search_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.search.username = Some(username.into());
        self.config.search.password = Some(password.into());
        self
    }

    pub fn search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.search.endpoint = endpoint.into();
        self
    }

    pub fn keyword_credentials(
        mut self,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.keywords.login = Some(login.into());
        self.config.keywords.password = Some(password.into());
        self
    }

    pub fn keyword_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.keywords.endpoint = endpoint.into();
        self
    }

    pub fn build(self) -> RelayConfig {
        self.config
    }
}

/// Load configuration from environment variables
pub fn from_env() -> RelayConfig {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
///
/// Unparseable numeric values are ignored and the default is kept.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RelayConfig {
    let mut config = RelayConfig::default();

    if let Some(model) = lookup("OPENAI_MODEL") {
        config.model = model;
    }
    if let Some(temp) = lookup("OPENAI_TEMPERATURE").and_then(|v| v.parse::<f32>().ok()) {
        config.temperature = Some(temp);
    }
    config.openai_api_key = lookup("OPENAI_API_KEY").or(config.openai_api_key);

    if let Some(hops) = lookup("AGENTS_MAX_HOPS").and_then(|v| v.parse().ok()) {
        config.max_hops = hops;
    }
    if let Some(turns) = lookup("AGENTS_MAX_TURNS").and_then(|v| v.parse().ok()) {
        config.max_turns = turns;
    }
    if let Some(secs) = lookup("AGENTS_TOOL_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.tool_timeout_secs = secs;
    }
    if let Some(secs) = lookup("AGENTS_RUN_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.run_timeout_secs = secs;
    }
    if let Some(verbose) = lookup("AGENTS_VERBOSE") {
        config.verbose_logging = parse_flag(&verbose);
    }
    if let Some(tracing) = lookup("AGENTS_TRACING") {
        config.tracing_enabled = parse_flag(&tracing);
    }

    config.search.username = lookup("OXYLABS_USERNAME");
    config.search.password = lookup("OXYLABS_PASSWORD");
    config.keywords.login = lookup("DATAFORSEO_LOGIN");
    config.keywords.password = lookup("DATAFORSEO_PASSWORD");

    config
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Load configuration from a TOML file
pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<RelayConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: RelayConfig = toml::from_str(&contents)?;
    Ok(config)
}
