//! Client configuration
//!
//! Everything a [`FeedClient`](crate::http::FeedClient) needs besides the
//! credentials, loadable from YAML.

use crate::error::{Error, Result};
use crate::expand::ExpandConfig;
use crate::http::RateGovernorConfig;
use crate::pagination::{PagingOptions, DEFAULT_RETRY_LIMIT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default service domain
pub const DEFAULT_DOMAIN: &str = "parler.com";

/// Default browser identity sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/83.0.4103.116 Safari/537.36";

// ============================================================================
// Client Config
// ============================================================================

/// Configuration for the feed client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service domain, used for `Origin` and `Referrer`
    #[serde(default = "default_domain")]
    pub domain: String,

    /// API base URL; derived from the domain when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Consecutive fetch failures tolerated per page
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Keep paging past the server's last-page flag
    #[serde(default)]
    pub ignore_last: bool,

    /// Cursor to start paged exports from
    #[serde(default)]
    pub start_key: Option<String>,

    /// Cursor at which paged exports stop
    #[serde(default)]
    pub end_key: Option<String>,

    /// Page size for every resource, overriding per-resource defaults
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Which reference fields to expand
    #[serde(default)]
    pub expand_fields: ExpandConfig,

    /// Never add random jitter to backoff waits
    #[serde(default)]
    pub disable_jitter: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Pacing and backoff
    #[serde(default)]
    pub rate_limit: RateGovernorConfig,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

fn default_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            base_url: None,
            user_agent: default_user_agent(),
            retry_limit: default_retry_limit(),
            ignore_last: false,
            start_key: None,
            end_key: None,
            page_size: None,
            expand_fields: ExpandConfig::none(),
            disable_jitter: false,
            timeout_secs: default_timeout(),
            rate_limit: RateGovernorConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Resolved API base URL, always ending in `/`
    pub fn api_url(&self) -> String {
        match &self.base_url {
            Some(url) if url.ends_with('/') => url.clone(),
            Some(url) => format!("{url}/"),
            None => format!("https://api.{}/", self.domain),
        }
    }

    /// Web origin of the service
    pub fn origin(&self) -> String {
        format!("https://{}", self.domain)
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Governor settings with the client-level jitter switch applied
    pub fn governor_config(&self) -> RateGovernorConfig {
        let mut config = self.rate_limit.clone();
        config.disable_jitter |= self.disable_jitter;
        config
    }

    /// Paging options for exports started with this config
    pub fn paging_options(&self) -> Result<PagingOptions> {
        let mut options = PagingOptions::new()
            .with_retry_limit(self.retry_limit)
            .with_ignore_last(self.ignore_last);

        if let Some(key) = non_empty(&self.start_key) {
            options = options.with_start_key(key)?;
        }
        if let Some(key) = non_empty(&self.end_key) {
            options = options.with_end_key(key)?;
        }

        Ok(options)
    }

    /// Check the config before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            return Err(Error::invalid_value("domain", "cannot be empty"));
        }

        url::Url::parse(&self.api_url())?;

        if self.page_size == Some(0) {
            return Err(Error::invalid_value("page_size", "must be greater than zero"));
        }

        let rate = &self.rate_limit;
        if !(0.0..=1.0).contains(&rate.jitter_ratio) {
            return Err(Error::invalid_value(
                "rate_limit.jitter_ratio",
                format!("{} is outside [0, 1]", rate.jitter_ratio),
            ));
        }

        self.paging_options().map(|_| ())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the service domain
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = domain.into();
        self
    }

    /// Set the API base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the retry limit
    pub fn retry_limit(mut self, limit: u32) -> Self {
        self.config.retry_limit = limit;
        self
    }

    /// Ignore the server's last-page flag
    pub fn ignore_last(mut self, ignore: bool) -> Self {
        self.config.ignore_last = ignore;
        self
    }

    /// Set the start key
    pub fn start_key(mut self, key: impl Into<String>) -> Self {
        self.config.start_key = Some(key.into());
        self
    }

    /// Set the end key
    pub fn end_key(mut self, key: impl Into<String>) -> Self {
        self.config.end_key = Some(key.into());
        self
    }

    /// Override every resource's page size
    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = Some(size);
        self
    }

    /// Set the expansion field selection
    pub fn expand(mut self, fields: ExpandConfig) -> Self {
        self.config.expand_fields = fields;
        self
    }

    /// Disable backoff jitter
    pub fn disable_jitter(mut self) -> Self {
        self.config.disable_jitter = true;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs();
        self
    }

    /// Set the governor configuration
    pub fn rate_limit(mut self, config: RateGovernorConfig) -> Self {
        self.config.rate_limit = config;
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a client config from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!("Config file '{}' not found", path.display()))
        } else {
            Error::Io(e)
        }
    })?;

    load_config_from_str(&content)
}

/// Parse and validate a client config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<ClientConfig> {
    let config: ClientConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse client config YAML: {e}")))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.domain, "parler.com");
        assert_eq!(config.api_url(), "https://api.parler.com/");
        assert_eq!(config.origin(), "https://parler.com");
        assert_eq!(config.retry_limit, 10);
        assert!(config.expand_fields.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder()
            .domain("example.org")
            .base_url("http://localhost:9000")
            .retry_limit(3)
            .page_size(50)
            .disable_jitter()
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.api_url(), "http://localhost:9000/");
        assert_eq!(config.origin(), "https://example.org");
        assert_eq!(config.page_size, Some(50));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.governor_config().disable_jitter);
    }

    #[test]
    fn test_paging_options_from_keys() {
        let config = ClientConfig::builder()
            .start_key("2020-06-01T00:00:00.000Z#3")
            .end_key("2020-07-01T00:00:00Z")
            .ignore_last(true)
            .retry_limit(4)
            .build();

        let options = config.paging_options().unwrap();
        assert_eq!(options.retry_limit, 4);
        assert!(options.ignore_last);
        assert_eq!(options.start.unwrap().sequence(), Some(3));
        assert!(options.end.is_some());
    }

    #[test]
    fn test_empty_keys_are_unset() {
        let config = ClientConfig::builder().start_key("").build();
        assert!(config.paging_options().unwrap().start.is_none());
    }

    #[test]
    fn test_validate_rejects_malformed_key() {
        let config = ClientConfig::builder().end_key("last tuesday").build();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "end_key"));
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let config = ClientConfig::builder().page_size(0).build();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_load_from_str() {
        let yaml = r"
domain: example.org
retry_limit: 2
page_size: 25
expand_fields:
  creator: true
  links: false
rate_limit:
  min_interval_ms: 250
";
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.domain, "example.org");
        assert_eq!(config.retry_limit, 2);
        assert_eq!(config.page_size, Some(25));
        assert!(config.expand_fields.is_enabled("creator"));
        assert!(!config.expand_fields.is_enabled("links"));
        assert_eq!(config.rate_limit.min_interval_ms, 250);
        assert_eq!(config.rate_limit.max_backoff_ms, 300_000);
    }

    #[test]
    fn test_load_from_str_validates() {
        let err = load_config_from_str("start_key: nope\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "domain: files.example\nignore_last: true").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.domain, "files.example");
        assert!(config.ignore_last);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
