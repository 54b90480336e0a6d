// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! The CyberLeninka client handed to collaborators.
//!
//! Public operations never fail: they log the cause and return an empty
//! value. Each has a `try_*` twin returning [`crate::error::Result`] for
//! callers that need to tell "no matches" apart from "scraper broken".

use crate::article::{article_slug, ArticleRecord, SearchQuery};
use crate::cache::{CacheStore, DiskCache};
use crate::config::ScraperConfig;
use crate::error::{FetchError, Result, ScrapeError};
use crate::extract;
use crate::fetch::{Page, RequestExecutor};
use crate::locator::{find_article_nodes, find_results_container, log_page_structure, Located};
use reqwest::Url;
use scraper::Html;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct CyberleninkaScraper {
    config: ScraperConfig,
    executor: RequestExecutor,
    search_cache: Arc<dyn CacheStore>,
    text_cache: Arc<dyn CacheStore>,
}

impl CyberleninkaScraper {
    /// Scraper with on-disk caches under `config.cache_dir`.
    pub fn new(config: ScraperConfig) -> std::result::Result<Self, FetchError> {
        let search_cache = Arc::new(DiskCache::new(&config.cache_dir, config.search_ttl));
        let text_cache = Arc::new(DiskCache::new(&config.cache_dir, config.text_ttl));
        Self::with_caches(config, search_cache, text_cache)
    }

    /// Scraper with caller-provided stores (fakes in tests, shared stores
    /// across instances).
    pub fn with_caches(
        config: ScraperConfig,
        search_cache: Arc<dyn CacheStore>,
        text_cache: Arc<dyn CacheStore>,
    ) -> std::result::Result<Self, FetchError> {
        let executor = RequestExecutor::new(&config)?;
        info!(base_url = %config.base_url, cache_dir = %config.cache_dir.display(), "scraper ready");
        Ok(Self {
            config,
            executor,
            search_cache,
            text_cache,
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    fn article_url(&self, article_id: &str) -> String {
        format!("{}/article/{}", self.config.base_url, article_slug(article_id))
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url)
    }

    /// Probes the site root.
    pub async fn check_availability(&self) -> bool {
        match self.executor.get(&self.config.base_url).await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "service unavailable");
                false
            }
        }
    }

    pub async fn search_articles(&self, query: &SearchQuery) -> Vec<ArticleRecord> {
        match self.try_search_articles(query).await {
            Ok(records) => records,
            Err(e) => {
                error!(query = %query.query, error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// Availability probe, cache, fetch, locate, extract, filter, cache.
    ///
    /// A page that explicitly reports no results is `Ok(vec![])`; markup
    /// we cannot make sense of is `Err(NoResultsContainer)` or
    /// `Err(NoEntries)`.
    pub async fn try_search_articles(&self, query: &SearchQuery) -> Result<Vec<ArticleRecord>> {
        info!(query = %query.query, page = query.page, limit = query.limit, "searching");

        if !self.check_availability().await {
            return Err(ScrapeError::Unavailable(self.config.base_url.clone()));
        }

        let key = query.cache_key();
        if let Some(cached) = self.search_cache.get(&key) {
            match serde_json::from_value::<Vec<ArticleRecord>>(cached) {
                Ok(records) => {
                    info!(count = records.len(), "returning cached results");
                    return Ok(records);
                }
                Err(e) => warn!(key = %key, error = %e, "cached results have wrong shape, refetching"),
            }
        }

        let url = self.search_url();
        let params = query.params();
        debug!(url = %url, ?params, "search request");
        let page = self.executor.execute(&url, reqwest::Method::GET, &params).await?;

        let records = parse_results(&page, query)?;
        info!(count = records.len(), "articles found");

        // empty results are never cached so a bad parse can be retried
        if !records.is_empty() {
            match serde_json::to_value(&records) {
                Ok(value) => self.search_cache.put(&key, &value),
                Err(e) => warn!(error = %e, "could not serialize results for cache"),
            }
        }
        Ok(records)
    }

    /// Plain text of an article, `""` when it cannot be obtained.
    pub async fn get_full_text(&self, article_id: &str) -> String {
        match self.try_get_full_text(article_id).await {
            Ok(text) => text,
            Err(e) => {
                error!(article_id, error = %e, "failed to get article text");
                String::new()
            }
        }
    }

    pub async fn try_get_full_text(&self, article_id: &str) -> Result<String> {
        let key = format!("full_text|{}", article_slug(article_id));
        if let Some(Value::String(text)) = self.text_cache.get(&key) {
            if !text.is_empty() {
                debug!(article_id, "returning cached text");
                return Ok(text);
            }
        }

        let url = self.article_url(article_id);
        let page = self.executor.get(&url).await?;
        let document = Html::parse_document(&page.text());
        let text = extract::extract_full_text(&document).ok_or(ScrapeError::NoContent(url))?;

        self.text_cache.put(&key, &Value::String(text.clone()));
        Ok(text)
    }

    pub async fn get_article_pdf(&self, article_id: &str) -> Option<Vec<u8>> {
        match self.try_get_article_pdf(article_id).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!(article_id, error = %e, "failed to download pdf");
                None
            }
        }
    }

    pub async fn try_get_article_pdf(&self, article_id: &str) -> Result<Vec<u8>> {
        let url = self.article_url(article_id);
        let page = self.executor.get(&url).await?;
        let base = Url::parse(&page.url).map_err(|_| FetchError::InvalidUrl(page.url.clone()))?;

        // parsed tree is not Send, keep it out of the next await
        let pdf_url = {
            let document = Html::parse_document(&page.text());
            extract::find_pdf_link(&document, &base)
        }
        .ok_or(ScrapeError::NoContent(url))?;
        debug!(pdf_url = %pdf_url, "downloading pdf");

        let pdf = self.executor.get(&pdf_url).await?;
        Ok(pdf.body)
    }

    /// Number of result pages for `query`, 1 on any failure.
    pub async fn get_total_pages(&self, query: &str) -> u32 {
        let params = [("q", query.to_string())];
        match self.executor.execute(&self.search_url(), reqwest::Method::GET, &params).await {
            Ok(page) => extract::total_pages(&Html::parse_document(&page.text())),
            Err(e) => {
                error!(query, error = %e, "failed to read pagination");
                1
            }
        }
    }

    pub async fn get_categories(&self) -> Vec<String> {
        match self.executor.get(&self.config.base_url).await {
            Ok(page) => extract::site_categories(&Html::parse_document(&page.text())),
            Err(e) => {
                error!(error = %e, "failed to list categories");
                Vec::new()
            }
        }
    }

    pub async fn extract_keywords(&self, article_id: &str) -> Vec<String> {
        match self.executor.get(&self.article_url(article_id)).await {
            Ok(page) => {
                let keywords = extract::keywords(&Html::parse_document(&page.text()));
                info!(article_id, count = keywords.len(), "keywords extracted");
                keywords
            }
            Err(e) => {
                error!(article_id, error = %e, "failed to extract keywords");
                Vec::new()
            }
        }
    }

    pub async fn find_references(&self, article_id: &str) -> Vec<String> {
        let text = self.get_full_text(article_id).await;
        if text.is_empty() {
            warn!(article_id, "no text to look for references in");
            return Vec::new();
        }
        let refs = extract::references(&text);
        info!(article_id, count = refs.len(), "references found");
        refs
    }

    pub async fn get_article(&self, article_id: &str) -> Option<ArticleRecord> {
        let url = self.article_url(article_id);
        let page = match self.executor.get(&url).await {
            Ok(page) => page,
            Err(e) => {
                error!(article_id, error = %e, "failed to fetch article");
                return None;
            }
        };

        let id = format!("cyberleninka_{}", article_slug(article_id));
        let record = extract::article_page(&Html::parse_document(&page.text()), id, &url);
        if record.is_none() {
            warn!(article_id, "article page has no title");
        }
        record
    }
}

/// Locate, truncate to `limit`, extract, filter.
fn parse_results(page: &Page, query: &SearchQuery) -> Result<Vec<ArticleRecord>> {
    let base = Url::parse(&page.url).map_err(|_| FetchError::InvalidUrl(page.url.clone()))?;
    let document = Html::parse_document(&page.text());

    let container = match find_results_container(&document) {
        Located::Found(node) => node,
        Located::NoResults => return Ok(Vec::new()),
        Located::Unrecognised => return Err(ScrapeError::NoResultsContainer(page.url.clone())),
    };

    let nodes = find_article_nodes(&container);
    if nodes.is_empty() {
        log_page_structure(&document);
        return Err(ScrapeError::NoEntries(page.url.clone()));
    }
    debug!(candidates = nodes.len(), "article nodes located");

    let records = nodes
        .iter()
        .take(query.limit)
        .filter_map(|node| {
            let record = extract::extract_record(node, &base);
            if record.is_none() {
                debug!("dropping entry without a title");
            }
            record
        })
        .filter(|record| record.matches_categories(&query.categories))
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: String) -> Page {
        Page {
            url: "https://cyberleninka.ru/search?q=x".into(),
            status: 200,
            content_type: Some("text/html".into()),
            body: body.into_bytes(),
        }
    }

    fn results(n: usize, cats: &str) -> String {
        let items: String = (0..n)
            .map(|i| {
                format!(
                    r#"<li><h2 class="title"><a href="/article/n/a{i}">Article {i}</a></h2>
                       <span class="year">20{i:02}</span><div class="tags"><a>{cats}</a></div></li>"#
                )
            })
            .collect();
        format!(r#"<html><body><div class="articles"><ul class="list">{items}</ul></div></body></html>"#)
    }

    #[test]
    fn limit_applies_before_extraction() {
        let q = SearchQuery::new("x").limit(3);
        let records = parse_results(&page(results(8, "ai")), &q).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].title, "Article 2");
        assert_eq!(records[0].url.as_deref(), Some("https://cyberleninka.ru/article/n/a0"));
    }

    #[test]
    fn category_filter_drops_non_overlapping_records() {
        let q = SearchQuery::new("x").categories(["nlp", "vision"]);
        assert!(parse_results(&page(results(2, "AI")), &q).unwrap().is_empty());
        assert_eq!(parse_results(&page(results(2, "NLP")), &q).unwrap().len(), 2);
    }

    #[test]
    fn no_results_page_is_ok_but_drifted_markup_is_err() {
        let q = SearchQuery::new("x");
        let empty = page("<html><body><p>Ничего не найдено</p></body></html>".into());
        assert!(parse_results(&empty, &q).unwrap().is_empty());

        let drifted = page("<html><body><p>Totally different page</p></body></html>".into());
        assert!(matches!(parse_results(&drifted, &q), Err(ScrapeError::NoResultsContainer(_))));
    }

    #[test]
    fn empty_results_container_is_a_parse_failure() {
        let q = SearchQuery::new("x");
        let hollow = page(r#"<html><body><div class="articles"><div class="list"></div></div></body></html>"#.into());
        assert!(matches!(parse_results(&hollow, &q), Err(ScrapeError::NoEntries(_))));
    }

    #[test]
    fn nested_tag_lists_do_not_eat_the_limit() {
        let items: String = (0..8)
            .map(|i| {
                format!(
                    r#"<li><h2 class="title"><a href="/article/n/a{i}">Article {i}</a></h2>
                       <ul class="tags"><li>AI</li><li>NLP</li></ul></li>"#
                )
            })
            .collect();
        let body = format!(r#"<html><body><div class="articles"><ul class="list">{items}</ul></div></body></html>"#);
        let records = parse_results(&page(body), &SearchQuery::new("x").limit(5)).unwrap();
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Article 0", "Article 1", "Article 2", "Article 3", "Article 4"]);
        assert_eq!(records[0].categories, vec!["AI", "NLP"]);
    }
}
