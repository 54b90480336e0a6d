// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Article records and search parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SOURCE_TAG: &str = "cyberleninka";
const ID_PREFIX: &str = "cyberleninka_";

/// One article as scraped from a results page or an article page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub source: String,
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            authors: Vec::new(),
            year: None,
            abstract_text: None,
            url: None,
            categories: Vec::new(),
            source: SOURCE_TAG.to_string(),
        }
    }

    /// Case-insensitive set intersection against the requested categories.
    /// An empty filter lets everything through.
    pub fn matches_categories(&self, filter: &[String]) -> bool {
        if filter.is_empty() {
            return true;
        }
        let wanted: HashSet<String> = filter.iter().map(|c| c.to_lowercase()).collect();
        self.categories
            .iter()
            .any(|c| wanted.contains(&c.to_lowercase()))
    }
}

/// Builds `cyberleninka_<slug>` from an article URL's last path segment.
pub fn article_id_from_url(url: &str) -> Option<String> {
    let slug = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()?;
    if slug.is_empty() || slug.contains(':') {
        return None;
    }
    Some(format!("{ID_PREFIX}{slug}"))
}

/// Accepts both `cyberleninka_<slug>` and the bare slug.
pub fn article_slug(article_id: &str) -> &str {
    article_id.strip_prefix(ID_PREFIX).unwrap_or(article_id)
}

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub limit: usize,
    pub page: u32,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub categories: Vec<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 10,
            page: 1,
            year_from: None,
            year_to: None,
            categories: Vec::new(),
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn years(mut self, from: Option<i32>, to: Option<i32>) -> Self {
        self.year_from = from;
        self.year_to = to;
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Deterministic cache key covering every parameter.
    ///
    /// Categories are lowercased, sorted and deduplicated since the filter
    /// treats them as a case-insensitive set. Fields are JSON-encoded so
    /// separators inside the query or a category cannot alias another key.
    pub fn cache_key(&self) -> String {
        let mut cats: Vec<String> = self.categories.iter().map(|c| c.to_lowercase()).collect();
        cats.sort();
        cats.dedup();

        let fields = serde_json::json!({
            "q": self.query,
            "limit": self.limit,
            "page": self.page,
            "from": self.year_from,
            "to": self.year_to,
            "cats": cats,
        });
        format!("search|{fields}")
    }

    /// Query string pairs for the site's `/search` endpoint.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.query.clone()), ("page", self.page.to_string())];
        if let Some(from) = self.year_from {
            params.push(("year_from", from.to_string()));
        }
        if let Some(to) = self.year_to {
            params.push(("year_to", to.to_string()));
        }
        params
    }
}
