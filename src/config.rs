//! Tunables for the transfer engine (SPEC_FULL.md §3, §6).
//!
//! Collected in one place rather than read ad hoc through the call graph; construct once
//! via [`Config::builder`] (or just `Config::default()`) before [`crate::ClientBuilder::authorize`].

use std::time::Duration;

/// `X-Bz-Test-Mode` fault-injection markers the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    FailSomeUploads,
    ExpireSomeAccountAuthorizationTokens,
    ForceCapExceeded,
}

impl TestMode {
    pub fn as_header_value(self) -> &'static str {
        match self {
            TestMode::FailSomeUploads => "fail_some_uploads",
            TestMode::ExpireSomeAccountAuthorizationTokens => "expire_some_account_authorization_tokens",
            TestMode::ForceCapExceeded => "force_cap_exceeded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Retries per policy (auth, hash). 0 disables retrying.
    pub retry_count: u32,
    /// Bulkhead cap for concurrent upload operations.
    pub upload_connections: u32,
    /// Bulkhead cap for concurrent download operations.
    pub download_connections: u32,
    /// Byte threshold to switch to the chunked upload path. 0 ⇒ use the effective part size.
    pub upload_cutoff_size: u64,
    /// Planned upload part size. 0 ⇒ use the account's recommended part size.
    pub upload_part_size: u64,
    /// Byte threshold to switch to the ranged download path. 0 ⇒ use the effective part size.
    pub download_cutoff_size: u64,
    /// Planned download part size. 0 ⇒ use the account's recommended part size.
    pub download_part_size: u64,
    /// Service-injected fault marker forwarded verbatim as `X-Bz-Test-Mode`.
    pub test_mode: Option<TestMode>,
    /// TTL for cached upload/part URLs, independent of any error-triggered eviction.
    pub url_cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_count: 3,
            upload_connections: 1,
            download_connections: 1,
            upload_cutoff_size: 0,
            upload_part_size: 0,
            download_cutoff_size: 0,
            download_part_size: 0,
            test_mode: None,
            url_cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder(Config::default())
    }
}

/// Fluent builder mirroring the teacher's `ClientBuilder` setter style.
#[derive(Debug, Clone)]
pub struct ConfigBuilder(Config);

impl ConfigBuilder {
    pub fn retry_count(mut self, n: u32) -> Self {
        self.0.retry_count = n;
        self
    }

    pub fn upload_connections(mut self, n: u32) -> Self {
        self.0.upload_connections = n.max(1);
        self
    }

    pub fn download_connections(mut self, n: u32) -> Self {
        self.0.download_connections = n.max(1);
        self
    }

    pub fn upload_cutoff_size(mut self, n: u64) -> Self {
        self.0.upload_cutoff_size = n;
        self
    }

    pub fn upload_part_size(mut self, n: u64) -> Self {
        self.0.upload_part_size = n;
        self
    }

    pub fn download_cutoff_size(mut self, n: u64) -> Self {
        self.0.download_cutoff_size = n;
        self
    }

    pub fn download_part_size(mut self, n: u64) -> Self {
        self.0.download_part_size = n;
        self
    }

    pub fn test_mode(mut self, mode: TestMode) -> Self {
        self.0.test_mode = Some(mode);
        self
    }

    pub fn url_cache_ttl(mut self, ttl: Duration) -> Self {
        self.0.url_cache_ttl = ttl;
        self
    }

    pub fn build(self) -> Config {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.retry_count, 3);
        assert_eq!(cfg.upload_connections, 1);
        assert_eq!(cfg.download_connections, 1);
        assert_eq!(cfg.url_cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn builder_floors_connections_at_one() {
        let cfg = Config::builder().upload_connections(0).build();
        assert_eq!(cfg.upload_connections, 1);
    }
}
