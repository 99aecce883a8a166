//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RETAIL_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `RETAIL_BASE_URL` - Public URL of the site (decides the secure cookie flag)
//!
//! ## Optional
//! - `RETAIL_HOST` - Bind address (default: 127.0.0.1)
//! - `RETAIL_PORT` - Listen port (default: 3000)
//! - `RETAIL_IMAGE_CONTAINER` - Blob container for product images (default: product-images)
//! - `RETAIL_BLOB_BACKEND` - `local` or `azure` (default: local)
//! - `RETAIL_BLOB_DIR` - Directory for the local backend (default: data/blobs)
//! - `AZURE_STORAGE_ACCOUNT_URL` - Blob service endpoint (required for azure)
//! - `AZURE_STORAGE_SAS_TOKEN` - Account SAS token (required for azure)
//! - `RETAIL_LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default blob container for uploaded product images.
pub const DEFAULT_IMAGE_CONTAINER: &str = "product-images";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct RetailConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: String,
    /// Blob container holding product images
    pub image_container: String,
    /// Where product images are stored
    pub blob: BlobConfig,
    /// Emit JSON log lines instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Blob storage backend selection.
///
/// Implements `Debug` manually to redact the SAS token.
#[derive(Clone)]
pub enum BlobConfig {
    /// Files on local disk, served by this binary under `/blobs`.
    Local {
        /// Root directory; one subdirectory per container.
        root: PathBuf,
    },
    /// Azure Blob Storage.
    Azure {
        /// Blob service endpoint, e.g. `https://account.blob.core.windows.net`
        account_url: url::Url,
        /// Shared access signature query string
        sas_token: SecretString,
    },
}

impl std::fmt::Debug for BlobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { root } => f.debug_struct("Local").field("root", root).finish(),
            Self::Azure { account_url, .. } => f
                .debug_struct("Azure")
                .field("account_url", &account_url.as_str())
                .field("sas_token", &"[REDACTED]")
                .finish(),
        }
    }
}

impl RetailConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("RETAIL_DATABASE_URL")?;
        let host = get_env_or_default("RETAIL_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RETAIL_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("RETAIL_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("RETAIL_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("RETAIL_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let image_container =
            get_env_or_default("RETAIL_IMAGE_CONTAINER", DEFAULT_IMAGE_CONTAINER);
        validate_container_name(&image_container, "RETAIL_IMAGE_CONTAINER")?;
        let blob = BlobConfig::from_env()?;
        let json_logs = get_optional_env("RETAIL_LOG_FORMAT").is_some_and(|f| f == "json");

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            image_container,
            blob,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BlobConfig {
    fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("RETAIL_BLOB_BACKEND", "local").as_str() {
            "local" => Ok(Self::Local {
                root: PathBuf::from(get_env_or_default("RETAIL_BLOB_DIR", "data/blobs")),
            }),
            "azure" => {
                let raw = get_required_env("AZURE_STORAGE_ACCOUNT_URL")?;
                let account_url = url::Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "AZURE_STORAGE_ACCOUNT_URL".to_string(),
                        e.to_string(),
                    )
                })?;
                let sas_token = get_validated_secret("AZURE_STORAGE_SAS_TOKEN")?;
                Ok(Self::Azure {
                    account_url,
                    sas_token,
                })
            }
            other => Err(ConfigError::InvalidEnvVar(
                "RETAIL_BLOB_BACKEND".to_string(),
                format!("expected 'local' or 'azure', got '{other}'"),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Blob container names: 3-63 chars of lowercase letters, digits and single
/// hyphens, starting and ending with a letter or digit.
fn validate_container_name(name: &str, var_name: &str) -> Result<(), ConfigError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid = (3..=63).contains(&name.len())
        && valid_chars
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("'{name}' is not a valid blob container name"),
        ))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a freshly issued token."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> RetailConfig {
        RetailConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: base_url.to_string(),
            image_container: DEFAULT_IMAGE_CONTAINER.to_string(),
            blob: BlobConfig::Local {
                root: PathBuf::from("data/blobs"),
            },
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-sas-token-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_sas_token() {
        let sas = "sv=2022-11-02&ss=b&srt=co&sp=rwdlac&se=2030-01-01T00:00:00Z&sig=Q7fJx2Lk9PzR4mWv";
        assert!(validate_secret_strength(sas, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_container_name() {
        assert!(validate_container_name("product-images", "X").is_ok());
        assert!(validate_container_name("abc", "X").is_ok());
        assert!(validate_container_name("ab", "X").is_err());
        assert!(validate_container_name("Product-Images", "X").is_err());
        assert!(validate_container_name("-images", "X").is_err());
        assert!(validate_container_name("product--images", "X").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config("http://localhost:3000").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure() {
        assert!(!test_config("http://localhost:3000").is_secure());
        assert!(test_config("https://shop.example.org").is_secure());
    }

    #[test]
    fn test_blob_config_debug_redacts_token() {
        let config = BlobConfig::Azure {
            account_url: url::Url::parse("https://acct.blob.core.windows.net").unwrap(),
            sas_token: SecretString::from("sig=super_secret_signature"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("acct.blob.core.windows.net"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_signature"));
    }
}
