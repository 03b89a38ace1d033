//! Configuration management
//!
//! Settings are resolved with the following precedence:
//! 1. Environment variables
//! 2. campaign-gateway.toml configuration file
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the configuration file is expanded from the
//! environment.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// WhatsApp Cloud API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Pre-shared token echoed during the Meta webhook handshake
    pub verify_token: String,

    /// Bearer token for the Graph API send endpoint
    pub access_token: String,

    /// Phone number id the business messages are sent from
    pub phone_number_id: String,

    /// App secret for X-Hub-Signature-256 verification (optional)
    pub app_secret: Option<String>,

    /// Graph API base URL override (for testing or custom endpoints)
    pub graph_base_url: Option<String>,

    /// Port for the webhook server
    #[serde(default = "default_webhook_port")]
    pub port: u16,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            verify_token: String::new(),
            access_token: String::new(),
            phone_number_id: String::new(),
            app_secret: None,
            graph_base_url: None,
            port: default_webhook_port(),
        }
    }
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL override (for testing or custom endpoints)
    pub base_url: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Generation API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for the HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins; empty means permissive
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            allowed_origins: None,
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Server host
    #[serde(default = "default_dashboard_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: default_dashboard_host(),
            port: default_dashboard_port(),
        }
    }
}

/// Survey configuration
///
/// The question list is injected into the engine from here; it is fixed for
/// the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Ordered question sequence
    #[serde(default = "default_questions")]
    pub questions: Vec<String>,

    /// Message sent after the last answer is recorded
    #[serde(default = "default_completion_message")]
    pub completion_message: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            completion_message: default_completion_message(),
        }
    }
}

fn default_webhook_port() -> u16 {
    3000
}

fn default_api_port() -> u16 {
    4000
}

fn default_dashboard_host() -> String {
    "127.0.0.1".to_string()
}

fn default_dashboard_port() -> u16 {
    8080
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_db_path() -> String {
    "data/campaign-gateway.db".to_string()
}

fn default_questions() -> Vec<String> {
    [
        "Hi! Thanks for reaching out. To get started, what's your name?",
        "What's the name of your business?",
        "Which products or services do you sell?",
        "What's your approximate monthly marketing budget?",
        "Which city or region do you mainly serve?",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_completion_message() -> String {
    "That's everything we needed - thank you! Our team will be in touch shortly.".to_string()
}

/// Main configuration for campaign-gateway
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// WhatsApp Cloud API settings
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Gemini settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Generation API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Dashboard settings
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Survey settings
    #[serde(default)]
    pub survey: SurveyConfig,
}

impl Config {
    /// Expand `${VAR_NAME}` sequences from the environment.
    ///
    /// Unknown variables expand to the empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'

                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(chars.next().unwrap());
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file.
    ///
    /// `${VAR_NAME}` in the file is expanded from the environment first;
    /// explicit environment variables still override file values afterwards.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let expanded_content = Self::expand_env_vars(&toml_content);

        let mut config: Config = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from the default locations.
    ///
    /// Tries `./campaign-gateway.toml`, then falls back to environment
    /// variables only.
    pub fn load() -> crate::Result<Self> {
        if Path::new("campaign-gateway.toml").exists() {
            return Self::from_toml_file("campaign-gateway.toml");
        }

        Self::from_env()
    }

    /// Override file-provided settings from the environment.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.verify_token = token;
        }
        if let Ok(token) = std::env::var("WHATSAPP_ACCESS_TOKEN") {
            self.whatsapp.access_token = token;
        }
        if let Ok(id) = std::env::var("WHATSAPP_PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = id;
        }
        if let Ok(secret) = std::env::var("WHATSAPP_APP_SECRET") {
            if !secret.is_empty() {
                self.whatsapp.app_secret = Some(secret);
            }
        }
        if let Ok(port) = std::env::var("WEBHOOK_PORT") {
            if let Ok(p) = port.parse() {
                self.whatsapp.port = p;
            }
        }

        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.is_empty() {
                self.gemini.model = model;
            }
        }
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            if !base_url.is_empty() {
                self.gemini.base_url = Some(base_url);
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            self.storage.db_path = path;
        }

        if let Ok(port) = std::env::var("API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
        if let Ok(origins) = std::env::var("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins =
                Some(origins.split(',').map(|s| s.trim().to_string()).collect());
        }

        if let Ok(host) = std::env::var("DASHBOARD_HOST") {
            self.dashboard.host = host;
        }
        if let Ok(port) = std::env::var("DASHBOARD_PORT") {
            if let Ok(p) = port.parse() {
                self.dashboard.port = p;
            }
        }
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();

        if config.whatsapp.verify_token.is_empty() {
            return Err(Error::Config("WHATSAPP_VERIFY_TOKEN not set".to_string()));
        }
        if config.whatsapp.access_token.is_empty() {
            return Err(Error::Config("WHATSAPP_ACCESS_TOKEN not set".to_string()));
        }
        if config.whatsapp.phone_number_id.is_empty() {
            return Err(Error::Config(
                "WHATSAPP_PHONE_NUMBER_ID not set".to_string(),
            ));
        }
        if config.gemini.api_key.is_empty() {
            return Err(Error::Config("GEMINI_API_KEY not set".to_string()));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_config_default() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!(config.api_key.is_empty());
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_survey_config_default() {
        let config = SurveyConfig::default();
        assert_eq!(config.questions.len(), 5);
        assert!(!config.completion_message.is_empty());
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.db_path, "data/campaign-gateway.db");
    }

    #[test]
    fn test_port_defaults() {
        let config = Config::default();
        assert_eq!(config.whatsapp.port, 3000);
        assert_eq!(config.api.port, 4000);
        assert_eq!(config.dashboard.port, 8080);
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("CG_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${CG_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${CG_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("CG_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        let result = Config::expand_env_vars("no_vars_here");
        assert_eq!(result, "no_vars_here");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[whatsapp]
verify_token = "shared-secret"
access_token = "EAAB..."
phone_number_id = "1055123456"
port = 3100

[gemini]
api_key = "test_key"
model = "gemini-2.5-pro"

[storage]
db_path = "/tmp/cg.db"

[api]
port = 4100

[dashboard]
host = "0.0.0.0"
port = 8081

[survey]
questions = ["One?", "Two?"]
completion_message = "Done."
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.whatsapp.verify_token, "shared-secret");
        assert_eq!(config.whatsapp.port, 3100);
        assert_eq!(config.gemini.model, "gemini-2.5-pro");
        assert_eq!(config.storage.db_path, "/tmp/cg.db");
        assert_eq!(config.api.port, 4100);
        assert_eq!(config.dashboard.host, "0.0.0.0");
        assert_eq!(config.survey.questions, vec!["One?", "Two?"]);
        assert_eq!(config.survey.completion_message, "Done.");
    }

    #[test]
    fn test_from_toml_file_expands_env_vars() {
        unsafe {
            std::env::set_var("CG_FILE_TEST_TOKEN", "from-env");
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"[whatsapp]\nverify_token = \"${CG_FILE_TEST_TOKEN}\"\naccess_token = \"a\"\nphone_number_id = \"p\"\n",
        )
        .unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.whatsapp.verify_token, "from-env");

        unsafe {
            std::env::remove_var("CG_FILE_TEST_TOKEN");
        }
    }

    #[test]
    fn test_toml_config_defaults_for_missing_sections() {
        let config: Config = toml::from_str("[whatsapp]\nverify_token = \"t\"\naccess_token = \"a\"\nphone_number_id = \"p\"\n").unwrap();
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.survey.questions.len(), 5);
    }
}
