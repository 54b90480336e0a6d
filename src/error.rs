// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Error types for the scraper.
//!
//! Nothing here ever reaches a collaborator-facing call: the public
//! operations on [`crate::CyberleninkaScraper`] log these and degrade to
//! empty results. The `try_*` variants return them as-is.

use thiserror::Error;

/// A single logical request that could not be completed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Page came back 200 but is a bot-check page.
    #[error("captcha page returned by {0}")]
    Captcha(String),

    /// HTML declared but the body is too short to be a real page.
    #[error("suspiciously short html body ({len} bytes) from {url}")]
    ShortBody { len: usize, url: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Number of attempts that were made, if retries were exhausted.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            FetchError::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// Reading or writing one cache envelope failed.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed cache envelope: {0}")]
    Malformed(&'static str),
}

/// Failure of a whole scraper operation.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Markup did not contain anything we recognise as a results list.
    #[error("no results container found on {0}")]
    NoResultsContainer(String),

    /// A results container was found but nothing in it looks like an entry.
    #[error("results container on {0} holds no recognisable entries")]
    NoEntries(String),

    #[error("no article content found on {0}")]
    NoContent(String),

    #[error("service at {0} is unavailable")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_keeps_last_cause() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Box::new(FetchError::Captcha("https://example.org/search".into())),
        };

        assert_eq!(err.attempts(), Some(3));
        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("captcha"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn scrape_error_is_transparent_over_fetch() {
        let err: ScrapeError = FetchError::InvalidUrl("::".into()).into();
        assert_eq!(err.to_string(), "invalid url: ::");
    }
}
