// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Scraper configuration.
//!
//! Loaded from environment variables with sensible defaults; the binary
//! overrides individual fields from its command line.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://cyberleninka.ru";
pub const DEFAULT_CACHE_DIR: &str = "cache/cyberleninka";

/// Search results stay fresh for a day.
pub const SEARCH_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Extracted article text changes rarely, keep it for a week.
pub const TEXT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Root of the remote site, without a trailing slash
    pub base_url: String,
    /// Directory holding one JSON envelope per cache key
    pub cache_dir: PathBuf,
    pub search_ttl: Duration,
    pub text_ttl: Duration,
    /// Total tries per logical request, including the first
    pub max_attempts: u32,
    /// Delay before attempt `n` is `base_delay * n` plus jitter
    pub base_delay: Duration,
    /// Upper bound of the uniform random jitter added to each delay
    pub jitter: Duration,
    pub request_timeout: Duration,
    /// HTML bodies shorter than this (after trimming) count as blocked
    pub min_html_body: usize,
}

impl ScraperConfig {
    /// Builds a config from the environment.
    ///
    /// # Environment Variables
    /// - `CYBERLENINKA_BASE_URL` - site root (default: https://cyberleninka.ru)
    /// - `CYBERLENINKA_CACHE_DIR` - cache directory (default: cache/cyberleninka)
    /// - `CYBERLENINKA_MAX_ATTEMPTS` - tries per request (default: 3)
    /// - `CYBERLENINKA_RETRY_DELAY_SECS` - base retry delay (default: 2)
    /// - `CYBERLENINKA_TIMEOUT_SECS` - per request socket timeout (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_url: env::var("CYBERLENINKA_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            cache_dir: env::var("CYBERLENINKA_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_attempts: env::var("CYBERLENINKA_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
            base_delay: env::var("CYBERLENINKA_RETRY_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.base_delay),
            request_timeout: env::var("CYBERLENINKA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            ..defaults
        }
    }

    /// Same config pointed at another site root (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Removes all sleeping between attempts. Used by tests.
    pub fn without_delays(mut self) -> Self {
        self.base_delay = Duration::ZERO;
        self.jitter = Duration::ZERO;
        self
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            search_ttl: SEARCH_TTL,
            text_ttl: TEXT_TTL,
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            jitter: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            min_html_body: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ScraperConfig::default();
        assert_eq!(config.base_url, "https://cyberleninka.ru");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay, Duration::from_secs(2));
        assert_eq!(config.search_ttl, Duration::from_secs(86_400));
        assert_eq!(config.text_ttl, Duration::from_secs(604_800));
        assert_eq!(config.min_html_body, 100);
    }

    #[test]
    fn test_builder_helpers() {
        let config = ScraperConfig::default()
            .with_base_url("http://127.0.0.1:8080/")
            .with_cache_dir("/tmp/leninka")
            .without_delays();

        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/leninka"));
        assert_eq!(config.base_delay, Duration::ZERO);
        assert_eq!(config.jitter, Duration::ZERO);
    }
}
