// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Request executor: one logical GET/POST against a flaky, bot-shy site.
//!
//! Every attempt sleeps `base_delay * attempt` plus jitter, picks a fresh
//! user agent and sends a full browser-like header set. A 200 response
//! still fails the attempt when it is a captcha page or an implausibly
//! short HTML body.

use crate::config::ScraperConfig;
use crate::error::FetchError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

const CAPTCHA_MARKER: &str = "captcha";

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 12_5_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// A response that passed status and anti-bot checks.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Page {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }
}

/// Shared HTTP session plus retry policy. Holds no per-request state, so
/// concurrent calls cannot clobber each other's headers.
#[derive(Clone)]
pub struct RequestExecutor {
    client: Client,
    base_url: String,
    max_attempts: u32,
    base_delay: Duration,
    jitter: Duration,
    min_html_body: usize,
}

impl RequestExecutor {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            jitter: config.jitter,
            min_html_body: config.min_html_body,
        })
    }

    pub async fn get(&self, url: &str) -> Result<Page, FetchError> {
        self.execute(url, Method::GET, &[]).await
    }

    /// Runs one logical request, retrying on any failure until
    /// `max_attempts` tries have been made.
    ///
    /// GET sends `params` as the query string, POST as a form body.
    pub async fn execute(
        &self,
        url: &str,
        method: Method,
        params: &[(&str, String)],
    ) -> Result<Page, FetchError> {
        let mut last = None;

        for attempt in 1..=self.max_attempts {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                sleep(delay).await;
            }

            match self.attempt(url, method.clone(), params).await {
                Ok(page) => {
                    debug!(url, attempt, status = page.status, bytes = page.body.len(), "fetched");
                    return Ok(page);
                }
                Err(e) => {
                    warn!(url, attempt, max = self.max_attempts, error = %e, "request attempt failed");
                    last = Some(e);
                }
            }
        }

        error!(url, attempts = self.max_attempts, "all request attempts failed");
        Err(FetchError::Exhausted {
            attempts: self.max_attempts,
            last: Box::new(last.unwrap_or_else(|| FetchError::InvalidUrl(url.to_string()))),
        })
    }

    fn delay_before(&self, attempt: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(fastrand::u64(0..=jitter_ms))
        };
        self.base_delay * attempt + jitter
    }

    async fn attempt(
        &self,
        url: &str,
        method: Method,
        params: &[(&str, String)],
    ) -> Result<Page, FetchError> {
        let target = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let headers = self.browser_headers(target.path().contains("/search"));

        let mut request = self.client.request(method.clone(), target).headers(headers);
        if !params.is_empty() {
            request = if method == Method::GET {
                request.query(params)
            } else {
                request.form(params)
            };
        }

        let response = request.send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await?.to_vec();

        let page = Page {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        };
        self.check_soft_failure(&page)?;
        Ok(page)
    }

    /// 200 responses that are really block pages.
    fn check_soft_failure(&self, page: &Page) -> Result<(), FetchError> {
        let is_pdf = page
            .content_type
            .as_deref()
            .map(|ct| ct.contains("pdf"))
            .unwrap_or(false);
        if is_pdf {
            return Ok(());
        }

        let text = page.text();
        if text.to_lowercase().contains(CAPTCHA_MARKER) {
            return Err(FetchError::Captcha(page.url.clone()));
        }

        let len = text.trim().len();
        if page.is_html() && len < self.min_html_body {
            return Err(FetchError::ShortBody {
                len,
                url: page.url.clone(),
            });
        }
        Ok(())
    }

    /// Fresh header set for one attempt, with a randomly chosen user agent.
    fn browser_headers(&self, same_origin: bool) -> HeaderMap {
        let user_agent = USER_AGENTS[fastrand::usize(..USER_AGENTS.len())];
        let referer = format!("{}/", self.base_url);

        let pairs: [(&'static str, &str); 13] = [
            ("user-agent", user_agent),
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
            ("accept-language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
            ("cache-control", "max-age=0"),
            ("sec-ch-ua", "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\""),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", "\"Windows\""),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", if same_origin { "same-origin" } else { "none" }),
            ("sec-fetch-user", "?1"),
            ("upgrade-insecure-requests", "1"),
            ("referer", referer.as_str()),
        ];

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> RequestExecutor {
        RequestExecutor::new(&ScraperConfig::default().with_base_url("https://example.org")).unwrap()
    }

    fn page(content_type: &str, body: &str) -> Page {
        Page {
            url: "https://example.org/search".into(),
            status: 200,
            content_type: Some(content_type.into()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn delay_grows_with_attempt_number() {
        let ex = executor();
        for attempt in 1..=3 {
            let d = ex.delay_before(attempt);
            assert!(d >= Duration::from_secs(2) * attempt);
            assert!(d <= Duration::from_secs(2) * attempt + Duration::from_secs(1));
        }
    }

    #[test]
    fn captcha_page_is_a_soft_failure() {
        let ex = executor();
        let body = format!("<html><body>{}Please solve the CAPTCHA</body></html>", "x".repeat(200));
        assert!(matches!(
            ex.check_soft_failure(&page("text/html; charset=utf-8", &body)),
            Err(FetchError::Captcha(_))
        ));
    }

    #[test]
    fn short_html_is_a_soft_failure_but_short_json_is_not() {
        let ex = executor();
        assert!(matches!(
            ex.check_soft_failure(&page("text/html", "<html></html>")),
            Err(FetchError::ShortBody { len: 13, .. })
        ));
        assert!(ex.check_soft_failure(&page("application/json", "{}")).is_ok());
    }

    #[test]
    fn headers_look_like_a_browser() {
        let ex = executor();
        let h = ex.browser_headers(true);
        let ua = h.get("user-agent").unwrap().to_str().unwrap();
        assert!(USER_AGENTS.contains(&ua));
        assert_eq!(h.get("sec-fetch-site").unwrap(), "same-origin");
        assert_eq!(h.get("referer").unwrap(), "https://example.org/");
        assert_eq!(ex.browser_headers(false).get("sec-fetch-site").unwrap(), "none");
    }
}
