// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! On-disk memoization of scrape results.
//!
//! Each key maps to `<cache_dir>/<sha256(key)>.json` holding
//! `{"timestamp": <epoch seconds>, "data": <value>}`. Entries older than
//! the store's TTL read as absent; stale files are left in place and get
//! overwritten by the next `put`.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};


/// Key/value memo used by the scraper. Never fails towards the caller.
pub trait CacheStore: Send + Sync {
    /// Fresh value for `key`, or `None` on miss, staleness or corruption.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`. Failures are logged and swallowed.
    fn put(&self, key: &str, value: &Value);
}

/// Source of "now" in epoch seconds, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    timestamp: f64,
    data: Value,
}

/// Filesystem-backed [`CacheStore`] with a single TTL.
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::with_clock(dir, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            clock,
        }
    }

    /// File backing `key`. The name is a hex sha256 of the key so any
    /// query text is safe to use.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value: Value = serde_json::from_str(&raw)?;
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_f64)
            .ok_or(CacheError::Malformed("missing timestamp"))?;
        let data = value
            .get("data")
            .cloned()
            .ok_or(CacheError::Malformed("missing data"))?;

        let age = self.clock.now() - timestamp;
        if age > self.ttl.as_secs_f64() {
            debug!(key, age_secs = age, "cache entry is stale");
            return Ok(None);
        }
        Ok(Some(data))
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let envelope = Envelope {
            timestamp: self.clock.now(),
            data: value.clone(),
        };

        // write-then-rename so readers never see a half-written file
        let tmp = path.with_extension(format!("json.{}.tmp", fastrand::u32(..)));
        fs::write(&tmp, serde_json::to_vec(&envelope)?)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl CacheStore for DiskCache {
    fn get(&self, key: &str) -> Option<Value> {
        match self.read(key) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key, error = %e, "unreadable cache entry, treating as miss");
                None
            }
        }
    }

    fn put(&self, key: &str, value: &Value) {
        match self.write(key, value) {
            Ok(()) => debug!(key, "cached"),
            Err(e) => warn!(key, error = %e, "failed to write cache entry"),
        }
    }
}
