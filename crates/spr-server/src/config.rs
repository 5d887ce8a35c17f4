//! Configuration management

use serde::{Deserialize, Serialize};
use spr_store::StoreConfig;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default wall-clock bound on one resolution request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default search backend base URL.
pub const DEFAULT_SEARCH_HOST: &str = "http://localhost:9200";

/// Default search index holding the bibliographic blocking fields.
pub const DEFAULT_SEARCH_INDEX: &str = "crossref";

/// Default number of records per bulk indexing request.
pub const DEFAULT_INDEXING_BATCH_SIZE: usize = 500;

/// Default number of candidates requested per blocking query.
pub const DEFAULT_BLOCK_SIZE: usize = 4;

/// Default similarity ratio under which a candidate is rejected.
pub const DEFAULT_VALIDATION_THRESHOLD: f64 = 0.7;

/// Default Crossref REST API base URL.
pub const DEFAULT_CROSSREF_BASE_URL: &str = "https://api.crossref.org";

/// Default directory receiving incremental dump archives.
pub const DEFAULT_CROSSREF_DUMP_PATH: &str = "data/crossref";

/// Default wall-clock time (UTC, `HH:MM`) of the daily update run.
pub const DEFAULT_DAILY_UPDATE_TIME: &str = "00:00";

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub search: SearchConfig,
    pub matching: MatchingConfig,
    pub crossref_feed: CrossrefFeedConfig,
    pub grobid: GrobidConfig,
    pub cors: CorsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

/// Search backend contract configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the Elasticsearch-compatible backend
    pub host: String,
    /// Index holding the blocking fields (DOI, title, first author, journal)
    pub index: String,
    /// Records per `_bulk` request when the loader forwards pages for indexing
    pub indexing_batch_size: usize,
}

/// Candidate blocking and post-validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Candidates retrieved per blocking query
    pub block_size: usize,
    /// Similarity ratio under which post-validation rejects a candidate
    pub validation_threshold: f64,
}

/// Crossref change-feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossrefFeedConfig {
    /// Whether the daily scheduler starts with the server
    pub enabled: bool,
    pub base_url: String,
    /// Directory receiving per-run archive files
    pub dump_path: String,
    /// Remove a run's archive directory once its tasks have drained
    pub clean_archives: bool,
    /// Contact address for the polite request pool
    pub mailto: Option<String>,
    /// Crossref Metadata Plus token
    pub token: Option<String>,
    /// Top-level fields stripped from each record before storage
    pub ignore_fields: Vec<String>,
    /// `HH:MM` (UTC) start of the daily update run
    pub daily_update_time: String,
}

/// External reference-parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrobidConfig {
    /// Base URL of the GROBID service; `None` disables citation pre-parsing
    pub host: Option<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("SPR_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("SPR_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("SPR_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
                request_timeout_secs: std::env::var("SPR_REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            store: StoreConfig::from_env(),
            search: SearchConfig {
                host: std::env::var("SEARCH_HOST")
                    .unwrap_or_else(|_| DEFAULT_SEARCH_HOST.to_string()),
                index: std::env::var("SEARCH_INDEX")
                    .unwrap_or_else(|_| DEFAULT_SEARCH_INDEX.to_string()),
                indexing_batch_size: std::env::var("SEARCH_INDEXING_BATCH_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_INDEXING_BATCH_SIZE),
            },
            matching: MatchingConfig {
                block_size: std::env::var("MATCHING_BLOCK_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_BLOCK_SIZE),
                validation_threshold: std::env::var("MATCHING_VALIDATION_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_VALIDATION_THRESHOLD),
            },
            crossref_feed: CrossrefFeedConfig {
                enabled: std::env::var("CROSSREF_FEED_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
                base_url: std::env::var("CROSSREF_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_CROSSREF_BASE_URL.to_string()),
                dump_path: std::env::var("CROSSREF_DUMP_PATH")
                    .unwrap_or_else(|_| DEFAULT_CROSSREF_DUMP_PATH.to_string()),
                clean_archives: std::env::var("CROSSREF_CLEAN_ARCHIVES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
                mailto: std::env::var("CROSSREF_MAILTO").ok(),
                token: std::env::var("CROSSREF_TOKEN").ok(),
                ignore_fields: std::env::var("CROSSREF_IGNORE_FIELDS")
                    .unwrap_or_else(|_| "reference,abstract".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                daily_update_time: std::env::var("CROSSREF_DAILY_UPDATE_TIME")
                    .unwrap_or_else(|_| DEFAULT_DAILY_UPDATE_TIME.to_string()),
            },
            grobid: GrobidConfig {
                host: std::env::var("GROBID_HOST").ok().filter(|s| !s.is_empty()),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                allow_credentials: std::env::var("CORS_ALLOW_CREDENTIALS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        self.store
            .validate()
            .map_err(|e| anyhow::anyhow!("Store configuration invalid: {}", e))?;

        if self.search.host.is_empty() {
            anyhow::bail!("Search host cannot be empty");
        }

        if self.search.index.is_empty() {
            anyhow::bail!("Search index cannot be empty");
        }

        if self.matching.block_size == 0 {
            anyhow::bail!("Matching block size must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.matching.validation_threshold) {
            anyhow::bail!(
                "Validation threshold must be within [0, 1], got {}",
                self.matching.validation_threshold
            );
        }

        parse_daily_time(&self.crossref_feed.daily_update_time).map_err(|e| {
            anyhow::anyhow!(
                "Invalid daily update time '{}': {}",
                self.crossref_feed.daily_update_time,
                e
            )
        })?;

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            store: StoreConfig::default(),
            search: SearchConfig {
                host: DEFAULT_SEARCH_HOST.to_string(),
                index: DEFAULT_SEARCH_INDEX.to_string(),
                indexing_batch_size: DEFAULT_INDEXING_BATCH_SIZE,
            },
            matching: MatchingConfig {
                block_size: DEFAULT_BLOCK_SIZE,
                validation_threshold: DEFAULT_VALIDATION_THRESHOLD,
            },
            crossref_feed: CrossrefFeedConfig {
                enabled: false,
                base_url: DEFAULT_CROSSREF_BASE_URL.to_string(),
                dump_path: DEFAULT_CROSSREF_DUMP_PATH.to_string(),
                clean_archives: false,
                mailto: None,
                token: None,
                ignore_fields: vec!["reference".to_string(), "abstract".to_string()],
                daily_update_time: DEFAULT_DAILY_UPDATE_TIME.to_string(),
            },
            grobid: GrobidConfig { host: None },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: false,
            },
        }
    }
}

/// Parse a `HH:MM` wall-clock time into `(hour, minute)`.
pub fn parse_daily_time(value: &str) -> anyhow::Result<(u32, u32)> {
    if value.len() != 5 || value.as_bytes().get(2) != Some(&b':') {
        anyhow::bail!("expected HH:MM");
    }
    let hour: u32 = value[0..2].parse().map_err(|_| anyhow::anyhow!("expected HH:MM"))?;
    let minute: u32 = value[3..5].parse().map_err(|_| anyhow::anyhow!("expected HH:MM"))?;
    if hour > 23 || minute > 59 {
        anyhow::bail!("hour must be 00-23 and minute 00-59");
    }
    Ok((hour, minute))
}
