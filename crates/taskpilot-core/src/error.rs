//! Error types for Taskpilot.
//!
//! Structured errors that carry context and recovery suggestions so the
//! CLI can turn failures into friendly guidance instead of stack traces.

use thiserror::Error;

/// Result type alias using the Taskpilot error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Taskpilot.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Integration error with structured details
    #[error("{0}")]
    Integration(#[from] IntegrationError),

    /// Tool execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// Response validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some("Check your config file at ~/.config/taskpilot/config.toml"),
            Error::Integration(e) => e.recovery_suggestion(),
            Error::Tool(_) => Some("Run 'taskpilot doctor' to check integration health"),
            _ => None,
        }
    }

    /// Create a provider-not-configured error.
    pub fn provider_not_configured(provider: &str) -> Self {
        Error::Integration(IntegrationError::NotConfigured {
            service: provider.to_string(),
            env_var: match provider {
                "google" => Some("GOOGLE_API_KEY".to_string()),
                "tracker" => Some("TRACKER_API_TOKEN".to_string()),
                _ => None,
            },
        })
    }
}

/// Errors from the external services Taskpilot talks to: the hosted
/// model API, the project tracker, and the knowledge index.
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// Service not configured
    #[error("Service '{service}' is not configured")]
    NotConfigured {
        service: String,
        env_var: Option<String>,
    },

    /// Authentication failed
    #[error("Authentication failed for {service}: {message}")]
    AuthenticationFailed { service: String, message: String },

    /// API request failed
    #[error("API request to {service} failed: {status} - {message}")]
    ApiError {
        service: String,
        status: u16,
        message: String,
    },

    /// Project not found in the tracker
    #[error("Project '{name}' not found in the tracker")]
    ProjectNotFound { name: String },

    /// Knowledge index has no documents
    #[error("Knowledge index is empty")]
    IndexEmpty,

    /// Timeout
    #[error("Request to {service} timed out after {seconds}s")]
    Timeout { service: String, seconds: u64 },

    /// Network error
    #[error("Network error connecting to {service}: {message}")]
    NetworkError { service: String, message: String },
}

impl IntegrationError {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            IntegrationError::NotConfigured {
                env_var: Some(_), ..
            } => Some("Set the API key environment variable or enable demo mode"),
            IntegrationError::NotConfigured { .. } => {
                Some("Configure the service in ~/.config/taskpilot/config.toml")
            }
            IntegrationError::AuthenticationFailed { .. } => {
                Some("Check that your API credentials are valid and not expired")
            }
            IntegrationError::ApiError { status: 429, .. } => {
                Some("You've hit rate limits. Wait a moment and try again")
            }
            IntegrationError::ApiError {
                status: 500..=599, ..
            } => Some("The service is having issues. Try again later"),
            IntegrationError::ApiError { .. } => None,
            IntegrationError::ProjectNotFound { .. } => {
                Some("Check the project name or key and try again")
            }
            IntegrationError::IndexEmpty => {
                Some("Seed the knowledge index before searching it")
            }
            IntegrationError::Timeout { .. } => {
                Some("Try a simpler request or check your network connection")
            }
            IntegrationError::NetworkError { .. } => Some("Check your internet connection"),
        }
    }

    /// Create an API error from status code and message.
    pub fn api_error(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        IntegrationError::ApiError {
            service: service.into(),
            status,
            message: message.into(),
        }
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_not_configured() {
        let err = Error::provider_not_configured("google");
        assert!(err.to_string().contains("google"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_api_error() {
        let err = IntegrationError::api_error("tracker", 429, "Rate limited");
        assert!(err.to_string().contains("429"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_project_not_found() {
        let err = IntegrationError::ProjectNotFound {
            name: "Zephyr".to_string(),
        };
        assert!(err.to_string().contains("Zephyr"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_format_with_suggestion() {
        let err = Error::Config("missing model".to_string());
        let formatted = format_error_with_suggestion(&err);
        assert!(formatted.contains("Suggestion:"));
    }
}
