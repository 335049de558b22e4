//! Configuration types for segment-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Local storage roots
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root under which each run creates its own staging area (default: "./staging")
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Directory holding assembled documents, one per title (default: "./documents")
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            documents_dir: default_documents_dir(),
        }
    }
}

/// Remote fetching behaviour (timeouts, concurrency, retries)
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Hard deadline for the content extraction stage (default: 15 seconds)
    #[serde(default = "default_extraction_timeout", with = "duration_serde")]
    pub extraction_timeout: Duration,

    /// Per-image request timeout (default: 60 seconds)
    #[serde(default = "default_image_timeout", with = "duration_serde")]
    pub image_timeout: Duration,

    /// Page images fetched in parallel within one segment (default: 4)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Pipelines allowed to run at once across all requests (default: 4)
    #[serde(default = "default_max_concurrent_pipelines")]
    pub max_concurrent_pipelines: usize,

    /// User-Agent sent with every outbound request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Retry policy for transient failures of a single image
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: default_extraction_timeout(),
            image_timeout: default_image_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            max_concurrent_pipelines: default_max_concurrent_pipelines(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Reader page location and markup conventions for [`HttpPageExtractor`]
///
/// [`HttpPageExtractor`]: crate::extractor::HttpPageExtractor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Reader page URL with `{work}` and `{segment}` placeholders
    #[serde(default = "default_page_url_template")]
    pub page_url_template: String,

    /// CSS class carried by every page image on the reader page
    #[serde(default = "default_image_class")]
    pub image_class: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            page_url_template: default_page_url_template(),
            image_class: default_image_class(),
        }
    }
}

/// Main configuration for the segment pipeline and its API
///
/// Storage and fetch settings are flattened so the JSON format stays shallow:
///
/// ```json
/// { "staging_dir": "staging", "extraction_timeout": 15, "persistence": { ... } }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Staging and document directories
    #[serde(flatten)]
    pub storage: StorageConfig,

    /// Timeouts, concurrency and retries for outbound requests
    #[serde(flatten)]
    pub fetch: FetchConfig,

    /// Reader page conventions
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Segment state store settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let rate_limit = &self.server.api.rate_limit;
        if rate_limit.limit == 0 {
            return Err(Error::Config {
                message: "rate limit must admit at least one request per interval".into(),
                key: Some("rate_limit.limit".into()),
            });
        }
        if rate_limit.interval.is_zero() {
            return Err(Error::Config {
                message: "rate limit interval must be greater than zero".into(),
                key: Some("rate_limit.interval".into()),
            });
        }
        if self.fetch.max_concurrent_fetches == 0 {
            return Err(Error::Config {
                message: "at least one concurrent image fetch is required".into(),
                key: Some("max_concurrent_fetches".into()),
            });
        }
        if self.fetch.max_concurrent_pipelines == 0 {
            return Err(Error::Config {
                message: "at least one concurrent pipeline is required".into(),
                key: Some("max_concurrent_pipelines".into()),
            });
        }
        let multiplier = self.fetch.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::Config {
                message: format!(
                    "backoff multiplier must be a finite number of at least 1, got {}",
                    multiplier
                ),
                key: Some("retry.backoff_multiplier".into()),
            });
        }
        if !self.extractor.page_url_template.contains("{work}") {
            return Err(Error::Config {
                message: "page_url_template must contain a {work} placeholder".into(),
                key: Some("extractor.page_url_template".into()),
            });
        }
        Ok(())
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./segment-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Shared secret for the admin routes, compared against `X-Admin-Access-Token`
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            admin_token: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Per-client sliding window rate limiting for segment acquisition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests admitted per client within one window (default: 1)
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Window length (default: 5 seconds)
    #[serde(default = "default_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Client keys that are never throttled
    #[serde(default)]
    pub exempt_clients: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: default_limit(),
            interval: default_interval(),
            exempt_clients: vec![],
        }
    }
}

// Default value functions
fn default_staging_dir() -> PathBuf {
    PathBuf::from("staging")
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("documents")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("segment-dl.db")
}

fn default_extraction_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_image_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_max_concurrent_pipelines() -> usize {
    4
}

fn default_user_agent() -> String {
    format!("segment-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_page_url_template() -> String {
    "https://rawkuma.com/{work}-chapter-{segment}/".into()
}

fn default_image_class() -> String {
    "ts-main-image".into()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_limit() -> u32 {
    1
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
