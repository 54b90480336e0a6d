// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Field and page extraction on top of the locator.
//!
//! Each field has its own short list of selector/regex attempts and may be
//! missing without failing the record. Only the title is mandatory.

use crate::article::{article_id_from_url, ArticleRecord};
use crate::locator::{find_year, Node};
use regex::Regex;
use reqwest::Url;
use scraper::Html;
use std::collections::BTreeSet;
use std::sync::OnceLock;

const TITLE_SELECTORS: &str = "h1, h2, h3, h4, .title, [itemprop=\"name\"]";
const AUTHOR_SELECTORS: &str = "[itemprop=\"author\"], .authors, .author, .authors-list";
const ABSTRACT_SELECTORS: &str = "[itemprop=\"description\"], .abstract, .summary, .description";
const CATEGORY_SELECTORS: &str = "[itemprop=\"about\"], .categories, .tags, .subjects";

const CONTENT_SELECTORS: &[&str] = &[
    "div[itemprop=\"articleBody\"]",
    ".ocr",
    ".article-text",
    "#article-text",
    ".paper-text",
    "[role=\"main\"] article",
    ".content article",
];
const PARAGRAPHS: &str = "p, h1, h2, h3, h4, h5, h6";
const NOISE: &str = "script, style, .advertisement, .banner, .share-buttons";
const PAGE_CHROME: &str = "script, style, .advertisement, .banner, .share-buttons, header, footer, nav";

const PDF_SELECTORS: &[&str] = &["a[href$=\".pdf\"]", ".download-pdf", ".article-download a"];
const PAGINATION_SELECTORS: &[&str] = &[".pagination", ".pages", ".page-numbers"];
const SITE_CATEGORY_SELECTORS: &[&str] = &[".categories a", ".subjects a", ".topics a"];
const KEYWORD_SELECTORS: &[&str] = &["[itemprop=\"keywords\"]", ".keywords", ".article-tags", ".tags"];
const KEYWORD_LABELS: &[&str] = &["ключевые слова:", "keywords:", "tags:"];

macro_rules! lazy_regex {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).expect("valid regex"))
        }
    };
}

lazy_regex!(author_label, r"(?i)^(автор[ыа]?|authors?):\s*");
lazy_regex!(category_label, r"(?i)^(категори[яи]|categor(y|ies)):\s*");

/// Builds a record from one result entry; `None` when no title is found.
pub fn extract_record(node: &Node<'_>, page_url: &Url) -> Option<ArticleRecord> {
    let heading = node.find(TITLE_SELECTORS);
    let link = heading
        .and_then(|h| h.find("a[href]").or_else(|| h.closest("a[href]")))
        .or_else(|| node.find("a[href]"));

    let title = heading
        .map(|h| h.text())
        .filter(|t| !t.is_empty())
        .or_else(|| link.map(|l| l.text()).filter(|t| !t.is_empty()))?;

    let url = link
        .and_then(|l| l.attr("href"))
        .and_then(|href| page_url.join(href).ok())
        .map(|u| u.to_string());

    let mut record = ArticleRecord::new(title);
    record.id = url.as_deref().and_then(article_id_from_url);
    record.url = url;
    record.authors = extract_authors(node);
    record.year = extract_year(node);
    record.abstract_text = extract_abstract(node);
    record.categories = extract_categories(node);
    Some(record)
}

pub fn extract_authors(node: &Node<'_>) -> Vec<String> {
    let Some(block) = node.find(AUTHOR_SELECTORS) else {
        return Vec::new();
    };

    let authors: Vec<String> = block
        .find_all("a, span")
        .iter()
        .map(|n| n.text())
        .filter(|name| {
            let lower = name.to_lowercase();
            !name.is_empty() && !lower.contains("автор") && !lower.contains("author")
        })
        .collect();
    if !authors.is_empty() {
        return authors;
    }

    split_list(&author_label().replace(&block.text(), ""))
}

pub fn extract_year(node: &Node<'_>) -> Option<i32> {
    let year_block = node
        .find_all("[class]")
        .into_iter()
        .find(|n| n.classes().iter().any(|c| c.to_lowercase().contains("year")));

    year_block
        .and_then(|b| find_year(&b.text()))
        .or_else(|| find_year(&node.text()))
}

pub fn extract_abstract(node: &Node<'_>) -> Option<String> {
    node.find(ABSTRACT_SELECTORS)
        .map(|n| n.text())
        .filter(|t| !t.is_empty())
}

pub fn extract_categories(node: &Node<'_>) -> Vec<String> {
    let Some(block) = node.find(CATEGORY_SELECTORS) else {
        return Vec::new();
    };

    let mut categories: Vec<String> = Vec::new();
    for name in block.find_all("a, span, li").iter().map(|n| n.text()) {
        if !name.is_empty() && !categories.contains(&name) {
            categories.push(name);
        }
    }
    if !categories.is_empty() {
        return categories;
    }

    split_list(&category_label().replace(&block.text(), ""))
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Article body as paragraphs separated by blank lines.
pub fn extract_full_text(document: &Html) -> Option<String> {
    let root = Node::root(document);

    for selector in CONTENT_SELECTORS {
        if let Some(content) = root.find(selector) {
            let paragraphs = paragraphs(&content, NOISE);
            if !paragraphs.is_empty() {
                return Some(paragraphs.join("\n\n"));
            }
        }
    }

    // no known body container, take whatever the page has
    let main = root
        .find("main")
        .or_else(|| root.find("article"))
        .or_else(|| root.find("body"))?;
    let paragraphs = paragraphs(&main, PAGE_CHROME);
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

fn paragraphs(content: &Node<'_>, skip_inside: &str) -> Vec<String> {
    content
        .find_all(PARAGRAPHS)
        .iter()
        .filter(|p| p.closest(skip_inside).is_none())
        .map(|p| p.text())
        .filter(|t| t.chars().count() > 10)
        .collect()
}

/// Absolute URL of the article's PDF, if the page links one.
pub fn find_pdf_link(document: &Html, page_url: &Url) -> Option<String> {
    let root = Node::root(document);
    PDF_SELECTORS
        .iter()
        .filter_map(|selector| root.find(selector))
        .find_map(|n| n.attr("href"))
        .and_then(|href| page_url.join(href).ok())
        .map(|u| u.to_string())
}

/// Highest page number in the pager, 1 when there is none.
pub fn total_pages(document: &Html) -> u32 {
    let root = Node::root(document);
    for selector in PAGINATION_SELECTORS {
        if let Some(pager) = root.find(selector) {
            let max = pager
                .find_all("a")
                .iter()
                .filter_map(|a| a.text().parse::<u32>().ok())
                .max();
            if let Some(max) = max {
                return max;
            }
        }
    }
    1
}

/// Category names linked from the site's front page.
pub fn site_categories(document: &Html) -> Vec<String> {
    let root = Node::root(document);
    let categories: BTreeSet<String> = SITE_CATEGORY_SELECTORS
        .iter()
        .flat_map(|selector| root.find_all(selector))
        .map(|n| n.text())
        .filter(|c| !c.is_empty())
        .collect();
    categories.into_iter().collect()
}

lazy_regex!(keywords_ru, r"(?i)Ключевые слова:?\s*([^.]+)");
lazy_regex!(keywords_en, r"(?i)Keywords:?\s*([^.]+)");
lazy_regex!(tags_ru, r"(?i)Теги:?\s*([^.]+)");

pub fn keywords(document: &Html) -> Vec<String> {
    let root = Node::root(document);
    let mut found = BTreeSet::new();

    if let Some(block) = KEYWORD_SELECTORS.iter().find_map(|s| root.find(s)) {
        for fragment in block.strings() {
            let keyword = fragment.trim().trim_matches(',').trim();
            if !keyword.is_empty() && !KEYWORD_LABELS.contains(&keyword.to_lowercase().as_str()) {
                found.insert(keyword.to_string());
            }
        }
    }

    if found.is_empty() {
        let text = root.text();
        let hit = [keywords_ru(), keywords_en(), tags_ru()]
            .iter()
            .find_map(|re| re.captures(&text));
        if let Some(caps) = hit {
            found.extend(split_list(&caps[1]));
        }
    }

    found.into_iter().collect()
}

lazy_regex!(numbered_ref, r"\d+\.\s+[А-Я][^.]+\.");
lazy_regex!(initials_ref, r"[А-Я][а-я]+\s+[А-Я]\.\s*[А-Я]\.");
lazy_regex!(bracketed_ref, r"\[(\d+)\]\s*([^\[]+)");
lazy_regex!(year_title_ref, r"\b(\d{4})\s*([A-ZА-Я][^.]+\.)");
lazy_regex!(
    author_year_ref,
    r"([A-ZА-Я][a-zа-я]+(?:\s+(?:et\.?\s+al\.?|and|&)\s+[A-ZА-Я][a-zа-я]+)?)\s+\((\d{4})\)"
);

/// Bibliography entries from an article's full text.
pub fn references(text: &str) -> Vec<String> {
    let Some(start) = first_bibliography_header(text) else {
        return Vec::new();
    };
    let tail = text[start..].trim();

    let mut refs: Vec<String> = Vec::new();
    for re in [numbered_ref(), initials_ref(), bracketed_ref(), year_title_ref(), author_year_ref()] {
        for m in re.find_iter(tail) {
            let r = m.as_str().trim();
            if r.chars().count() > 10 && !refs.iter().any(|x| x == r) {
                refs.push(r.to_string());
            }
        }
    }

    if refs.is_empty() {
        refs = tail
            .lines()
            .map(str::trim)
            .filter(|l| l.chars().count() > 10)
            .filter(|l| {
                let lower = l.to_lowercase();
                !["список", "литература", "references"].iter().any(|h| lower.starts_with(h))
            })
            .map(str::to_string)
            .collect();
    }
    refs
}

fn bibliography_headers() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            "Список литературы",
            "Литература",
            "Библиографический список",
            "Библиография",
            "References",
            "Bibliography",
        ]
        .iter()
        .filter_map(|h| Regex::new(&format!("(?i){h}:?")).ok())
        .collect()
    })
}

/// End of the first header found, trying headers in priority order.
fn first_bibliography_header(text: &str) -> Option<usize> {
    bibliography_headers()
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.end())
}

/// Record for a standalone article page.
pub fn article_page(document: &Html, article_id: String, url: &str) -> Option<ArticleRecord> {
    let root = Node::root(document);
    let title = root
        .find("h1, [itemprop=\"name\"]")
        .map(|n| n.text())
        .filter(|t| !t.is_empty())?;

    let mut record = ArticleRecord::new(title);
    record.id = Some(article_id);
    record.url = Some(url.to_string());
    record.authors = extract_authors(&root);
    record.year = find_year(&root.text());
    record.abstract_text = extract_abstract(&root);
    record.categories = extract_categories(&root);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://cyberleninka.ru/search?q=x").unwrap()
    }

    fn entry(html: &str) -> Html {
        Html::parse_fragment(html)
    }

    #[test]
    fn full_entry_is_extracted() {
        let html = entry(
            r#"<li>
                 <h2 class="title"><a href="/article/n/deep-nets">Deep nets for text</a></h2>
                 <span class="author">Иванов И.И., Петров П.П.</span>
                 <span class="span-block">Журнал. <span class="year">2019</span></span>
                 <div class="abstract">We study   things.</div>
                 <ul class="tags"><li>AI</li><li>NLP</li></ul>
               </li>"#,
        );
        let node = Node::root(&html).find("li").unwrap();
        let r = extract_record(&node, &base()).unwrap();

        assert_eq!(r.title, "Deep nets for text");
        assert_eq!(r.url.as_deref(), Some("https://cyberleninka.ru/article/n/deep-nets"));
        assert_eq!(r.id.as_deref(), Some("cyberleninka_deep-nets"));
        assert_eq!(r.authors, vec!["Иванов И.И.", "Петров П.П."]);
        assert_eq!(r.year, Some(2019));
        assert_eq!(r.abstract_text.as_deref(), Some("We study things."));
        assert_eq!(r.categories, vec!["AI", "NLP"]);
        assert_eq!(r.source, "cyberleninka");
    }

    #[test]
    fn missing_fields_are_tolerated_but_title_is_not() {
        let html = entry(r#"<div class="item"><a href="/article/n/x">Only a link</a></div>"#);
        let node = Node::root(&html).find(".item").unwrap();
        let r = extract_record(&node, &base()).unwrap();
        assert_eq!(r.title, "Only a link");
        assert!(r.authors.is_empty());
        assert_eq!(r.year, None);
        assert_eq!(r.abstract_text, None);

        let html = entry(r#"<div class="item"><p>2020, but nothing else</p></div>"#);
        let node = Node::root(&html).find(".item").unwrap();
        assert!(extract_record(&node, &base()).is_none());
    }

    #[test]
    fn author_block_without_children_is_split_on_commas() {
        let html = entry(r#"<div class="authors">Authors: Smith J., Doe A.</div>"#);
        let root = Node::root(&html);
        assert_eq!(extract_authors(&root), vec!["Smith J.", "Doe A."]);
    }

    #[test]
    fn category_label_is_stripped() {
        let html = entry(r#"<div class="categories">Categories: Physics, Math</div>"#);
        assert_eq!(extract_categories(&Node::root(&html)), vec!["Physics", "Math"]);
    }

    #[test]
    fn full_text_prefers_article_body_and_drops_noise() {
        let html = Html::parse_document(
            r#"<html><body><nav><p>Navigation text here</p></nav>
               <div itemprop="articleBody">
                 <h2>Introduction part</h2>
                 <p>short</p>
                 <p>First real paragraph of text.</p>
                 <div class="share-buttons"><p>Share this on networks</p></div>
               </div></body></html>"#,
        );
        assert_eq!(
            extract_full_text(&html).as_deref(),
            Some("Introduction part\n\nFirst real paragraph of text.")
        );
    }

    #[test]
    fn full_text_falls_back_to_main_content() {
        let html = Html::parse_document(
            r#"<html><body><header><p>Site header paragraph</p></header>
               <main><p>Body paragraph number one.</p></main></body></html>"#,
        );
        assert_eq!(extract_full_text(&html).as_deref(), Some("Body paragraph number one."));

        let empty = Html::parse_document("<html><body><p>tiny</p></body></html>");
        assert_eq!(extract_full_text(&empty), None);
    }

    #[test]
    fn pdf_link_is_resolved() {
        let html = Html::parse_document(
            r#"<html><body><a class="download-pdf" href="/article/n/x/pdf">PDF</a></body></html>"#,
        );
        let page = Url::parse("https://cyberleninka.ru/article/n/x").unwrap();
        assert_eq!(
            find_pdf_link(&html, &page).as_deref(),
            Some("https://cyberleninka.ru/article/n/x/pdf")
        );
    }

    #[test]
    fn pagination_takes_max_number() {
        let html = Html::parse_document(
            r#"<html><body><ul class="pagination"><a>1</a><a>2</a><a>17</a><a>next</a></ul></body></html>"#,
        );
        assert_eq!(total_pages(&html), 17);
        assert_eq!(total_pages(&Html::parse_document("<p>none</p>")), 1);
    }

    #[test]
    fn site_categories_are_sorted_and_unique() {
        let html = Html::parse_document(
            r#"<div class="categories"><a>Physics</a><a>Biology</a></div>
               <div class="topics"><a>Physics</a></div>"#,
        );
        assert_eq!(site_categories(&html), vec!["Biology", "Physics"]);
    }

    #[test]
    fn keywords_from_block_and_from_text() {
        let html = Html::parse_document(
            r#"<div class="keywords"><span>Keywords:</span><a>нейросети</a>, <a>NLP</a></div>"#,
        );
        assert_eq!(keywords(&html), vec!["NLP", "нейросети"]);

        let html = Html::parse_document("<p>Ключевые слова: зерно, урожай. Далее текст</p>");
        assert_eq!(keywords(&html), vec!["зерно", "урожай"]);
    }

    #[test]
    fn references_after_header() {
        let text = "Intro paragraph.\n\nСписок литературы\n\n\
                    1. Иванов И. И. Основы анализа данных. М., 2010.\n\n\
                    [2] Smith J. Deep learning basics\n\n";
        let refs = references(text);
        assert!(refs.iter().any(|r| r.starts_with("1. Иванов")));
        assert!(refs.iter().any(|r| r.starts_with("[2] Smith J")));

        assert!(references("plain text without any list").is_empty());
    }

    #[test]
    fn article_page_needs_a_title() {
        let html = Html::parse_document(
            r#"<html><body><h1>Page title</h1><div class="authors">A. One, B. Two</div>
               <p>Published 2015</p></body></html>"#,
        );
        let r = article_page(&html, "cyberleninka_x".into(), "https://c/article/n/x").unwrap();
        assert_eq!(r.title, "Page title");
        assert_eq!(r.authors, vec!["A. One", "B. Two"]);
        assert_eq!(r.year, Some(2015));

        let none = Html::parse_document("<html><body><p>no title</p></body></html>");
        assert!(article_page(&none, "x".into(), "u").is_none());
    }
}
