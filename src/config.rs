use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Control plane address as `host:port`
    pub server: String,
    /// Basic-auth user for the control plane API
    pub username: String,
    /// Basic-auth password for the control plane API
    pub password: String,
    /// Directory holding the encrypted credentials and the cached key
    pub cred_path: PathBuf,
    #[serde(default = "default_cred_file_name")]
    pub cred_file_name: String,
    #[serde(default = "default_key_file_name")]
    pub key_file_name: String,
    /// Holder under which credentials are registered
    #[serde(default = "default_credential_holder")]
    pub credential_holder: String,
    /// Estimated duration of the common resource load, drives the progress bar only
    #[serde(default = "default_expected_completion_secs")]
    pub expected_completion_secs: u64,
    /// Maximum in-flight credential registrations
    #[serde(default = "default_registration_concurrency")]
    pub registration_concurrency: usize,
    /// Interactive password attempts after the cached key
    #[serde(default = "default_password_attempts")]
    pub password_attempts: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Custom Debug to never leak the API password into logs or error messages.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("cred_path", &self.cred_path)
            .field("cred_file_name", &self.cred_file_name)
            .field("key_file_name", &self.key_file_name)
            .field("credential_holder", &self.credential_holder)
            .field("expected_completion_secs", &self.expected_completion_secs)
            .field("registration_concurrency", &self.registration_concurrency)
            .field("password_attempts", &self.password_attempts)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rotated log files (disabled when unset)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_cred_file_name() -> String {
    "credentials.yaml.enc".to_string()
}

fn default_key_file_name() -> String {
    ".tmp_enc_key".to_string()
}

fn default_credential_holder() -> String {
    "admin".to_string()
}

fn default_expected_completion_secs() -> u64 {
    crate::loader::DEFAULT_EXPECTED_SECS
}

fn default_registration_concurrency() -> usize {
    crate::registrar::DEFAULT_CONCURRENCY
}

fn default_password_attempts() -> u32 {
    crate::gate::DEFAULT_PASSWORD_ATTEMPTS
}

/// `~/.cloud-barista`, falling back to a relative path when no home is known.
pub fn default_cred_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cloud-barista")
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("server", "localhost:1323")?
            .set_default("username", "default")?
            .set_default("password", "default")?
            .set_default("cred_path", default_cred_path().to_string_lossy().to_string())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("TBINIT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TBINIT_SERVER, TBINIT_LOGGING__LEVEL, etc.)
            .add_source(
                Environment::with_prefix("TBINIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Variables shared with the rest of the Tumblebug tooling win over everything
            .set_override_option("server", std::env::var("TUMBLEBUG_SERVER").ok())?
            .set_override_option("username", std::env::var("TB_API_USERNAME").ok())?
            .set_override_option("password", std::env::var("TB_API_PASSWORD").ok())?;

        builder.build()?.try_deserialize()
    }

    /// Path to the encrypted credentials container
    pub fn container_path(&self) -> PathBuf {
        self.cred_path.join(&self.cred_file_name)
    }

    /// Path to the optional cached decryption key
    pub fn key_file_path(&self) -> PathBuf {
        self.cred_path.join(&self.key_file_name)
    }
}

/// Show only the first character of a secret, e.g. `d**********`.
pub fn mask_secret(secret: &str) -> String {
    match secret.chars().next() {
        Some(first) => format!("{first}**********"),
        None => "**********".to_string(),
    }
}
