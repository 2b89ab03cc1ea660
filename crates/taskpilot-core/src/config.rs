//! Configuration system for Taskpilot.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Main configuration struct for Taskpilot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Model request limits
    pub limits: LimitsConfig,
    /// Project tracker connection
    pub tracker: TrackerConfig,
    /// Knowledge search settings
    pub knowledge: KnowledgeConfig,
    /// Workday boundaries for the planner
    pub workday: WorkdayConfig,
    /// Provider configurations
    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            limits: LimitsConfig::default(),
            tracker: TrackerConfig::default(),
            knowledge: KnowledgeConfig::default(),
            workday: WorkdayConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default model to use
    pub model: String,
    /// Default provider
    pub provider: String,
    /// Serve canned data instead of calling external services
    pub demo: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            provider: "google".to_string(),
            demo: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum tokens per response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
    /// Error count after which the pipeline aborts a request
    pub error_threshold: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            temperature: 0.1,
            error_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrackerConfig {
    /// Tracker base URL (e.g. https://company.atlassian.net)
    pub base_url: Option<String>,
    /// Account email for basic auth
    pub email: Option<String>,
    /// API token (can be set directly or via environment)
    pub api_token: Option<String>,
    /// Environment variable name for the API token
    pub api_token_env: Option<String>,
}

impl TrackerConfig {
    /// Resolve the base URL from config or the TRACKER_URL variable.
    pub fn resolve_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| std::env::var("TRACKER_URL").ok())
    }

    /// Resolve the account email from config or the TRACKER_EMAIL variable.
    pub fn resolve_email(&self) -> Option<String> {
        self.email
            .clone()
            .or_else(|| std::env::var("TRACKER_EMAIL").ok())
    }

    /// Resolve the API token from config, a named variable, or TRACKER_API_TOKEN.
    pub fn resolve_api_token(&self) -> Option<String> {
        if let Some(ref token) = self.api_token {
            return Some(token.clone());
        }
        if let Some(ref env_var) = self.api_token_env {
            if let Ok(token) = std::env::var(env_var) {
                return Some(token);
            }
        }
        std::env::var("TRACKER_API_TOKEN").ok()
    }

    /// Whether enough is configured to talk to a real tracker.
    pub fn is_configured(&self) -> bool {
        self.resolve_base_url().is_some()
            && self.resolve_email().is_some()
            && self.resolve_api_token().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Number of snippets returned per search
    pub top_k: usize,
    /// Minimum query length in characters
    pub min_query_len: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_query_len: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkdayConfig {
    /// Start of the working day, "HH:MM"
    pub start: String,
    /// End of the working day, "HH:MM"
    pub end: String,
    /// Smallest free block worth reporting, in minutes
    pub min_block_minutes: i64,
}

impl Default for WorkdayConfig {
    fn default() -> Self {
        Self {
            start: "09:00".to_string(),
            end: "18:00".to_string(),
            min_block_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Google (Gemini) configuration
    pub google: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key (can be set directly or via environment)
    pub api_key: Option<String>,
    /// Environment variable name for API key
    pub api_key_env: Option<String>,
    /// Default model for this provider
    pub default_model: Option<String>,
    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Resolve the API key from either direct value or environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }
        if let Some(ref env_var) = self.api_key_env {
            if let Ok(key) = std::env::var(env_var) {
                return Some(key);
            }
        }
        None
    }
}

/// Validation result with multiple issues.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning).collect()
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Field path (e.g., "limits.max_tokens")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        let config_dir = Self::config_dir();
        let project_config = PathBuf::from(".taskpilot/config.toml");

        Figment::new()
            // Default values
            .merge(figment::providers::Serialized::defaults(Config::default()))
            // User config
            .merge(Toml::file(config_dir.join("config.toml")))
            // Project config
            .merge(Toml::file(&project_config))
            // Project local config (gitignored)
            .merge(Toml::file(".taskpilot/config.local.toml"))
            // Environment variables
            .merge(Env::prefixed("TASKPILOT_").split("_"))
            .extract()
    }

    /// Load and validate configuration.
    pub fn load_validated() -> Result<Self, Error> {
        let config = Self::load().map_err(|e| Error::Config(e.to_string()))?;
        let result = config.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.general.model.is_empty() {
            result.add_error("general.model", "Model name cannot be empty");
        }

        if self.general.provider.is_empty() {
            result.add_error("general.provider", "Provider name cannot be empty");
        }

        if self.limits.max_tokens == 0 {
            result.add_error("limits.max_tokens", "max_tokens must be greater than 0");
        }

        if !(0.0..=2.0).contains(&self.limits.temperature) {
            result.add_error("limits.temperature", "temperature must be between 0.0 and 2.0");
        }

        if self.knowledge.top_k == 0 {
            result.add_error("knowledge.top_k", "top_k must be greater than 0");
        }

        if parse_clock(&self.workday.start).is_none() {
            result.add_error("workday.start", "start must be a HH:MM time");
        }

        if parse_clock(&self.workday.end).is_none() {
            result.add_error("workday.end", "end must be a HH:MM time");
        }

        if let (Some(start), Some(end)) =
            (parse_clock(&self.workday.start), parse_clock(&self.workday.end))
        {
            if start >= end {
                result.add_error("workday.end", "end must be after start");
            }
        }

        if self.workday.min_block_minutes <= 0 {
            result.add_error("workday.min_block_minutes", "min_block_minutes must be positive");
        }

        if let Some(ref google) = self.providers.google {
            if google.api_key.as_ref().map(|k| k.is_empty()).unwrap_or(false) {
                result.add_warning("providers.google.api_key", "API key is empty string");
            }
            if let Some(ref base_url) = google.base_url {
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    result.add_error(
                        "providers.google.base_url",
                        "base_url must start with http:// or https://",
                    );
                }
            }
        }

        if let Some(ref base_url) = self.tracker.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                result.add_error(
                    "tracker.base_url",
                    "base_url must start with http:// or https://",
                );
            }
        }

        result
    }

    /// Resolve the Google API key, honoring the GOOGLE_API_KEY fallback.
    pub fn google_api_key(&self) -> Option<String> {
        self.providers
            .google
            .as_ref()
            .and_then(|p| p.resolve_api_key())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
    }

    /// Whether the copilot should run against canned data.
    ///
    /// Demo mode is either requested explicitly or implied by the absence
    /// of a model API key.
    pub fn demo_mode(&self) -> bool {
        self.general.demo || self.google_api_key().is_none()
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("taskpilot"))
            .unwrap_or_else(|| PathBuf::from("~/.config/taskpilot"))
    }
}

/// Parse a "HH:MM" clock string into minutes since midnight.
pub fn parse_clock(s: &str) -> Option<i64> {
    let (h, m) = s.split_once(':')?;
    let h: i64 = h.parse().ok()?;
    let m: i64 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_ok(), "Default config should be valid: {:?}", result.issues);
    }

    #[test]
    fn test_invalid_max_tokens() {
        let mut config = Config::default();
        config.limits.max_tokens = 0;
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "limits.max_tokens"));
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = Config::default();
        config.limits.temperature = 3.5;
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "limits.temperature"));
    }

    #[test]
    fn test_workday_end_before_start() {
        let mut config = Config::default();
        config.workday.start = "18:00".to_string();
        config.workday.end = "09:00".to_string();
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "workday.end"));
    }

    #[test]
    fn test_bad_tracker_url() {
        let mut config = Config::default();
        config.tracker.base_url = Some("company.atlassian.net".to_string());
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "tracker.base_url"));
    }

    #[test]
    fn test_empty_api_key_is_warning() {
        let mut config = Config::default();
        config.providers.google = Some(ProviderConfig {
            api_key: Some(String::new()),
            ..Default::default()
        });
        let result = config.validate();
        assert!(result.is_ok()); // Warnings don't fail validation
        assert!(result.warnings().iter().any(|e| e.field == "providers.google.api_key"));
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("09:00"), Some(540));
        assert_eq!(parse_clock("18:30"), Some(1110));
        assert_eq!(parse_clock("24:00"), None);
        assert_eq!(parse_clock("nine"), None);
    }
}
