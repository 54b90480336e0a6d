// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Content locator: finds the results list and the article entries in
//! markup we do not control.
//!
//! Both lookups try an ordered selector list first (first match wins) and
//! fall back to structural heuristics when the markup has drifted.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Known results-area selectors, most specific first.
pub const RESULTS_SELECTORS: &[&str] = &[
    ".articles > .list",
    "#search-results .list",
    ".search-results > ul",
    ".search-results",
    ".articles-list > .list",
    ".articles > ul",
    "main .items",
    ".search-results-list",
    "[data-target=\"search-results\"]",
    ".publications-list",
    "#publications",
    ".article-list",
    ".search-list",
];

/// Known per-entry selectors inside a results area.
pub const ARTICLE_SELECTORS: &[&str] = &[
    "article",
    ".article",
    ".publication",
    ".search-result",
    ".search-item",
    ".item",
    "[itemtype=\"http://schema.org/ScholarlyArticle\"]",
    ".article-info",
    ".article-block",
    ".article-preview",
];

const NO_RESULTS_PHRASES: &[&str] = &[
    "ничего не найдено",
    "нет результатов",
    "no results",
    "not found",
    "по вашему запросу",
];

const BLOCK_TAGS: &[&str] = &["div", "ul", "ol", "section", "main"];
const ENTRY_TAGS: &[&str] = &["div", "article", "section", "li"];
const LIST_TAGS: &[&str] = &["ul", "ol"];
const HEADING: &str = "h1, h2, h3, h4, .title, .heading";

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"))
}

fn author_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)автор|author").expect("valid author regex"))
}

/// First 4-digit year between 1900 and 2099 in `text`.
pub fn find_year(text: &str) -> Option<i32> {
    year_regex().find(text).and_then(|m| m.as_str().parse().ok())
}

/// Thin view over a parsed element: the only capabilities the
/// heuristics need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    pub fn root(document: &'a Html) -> Self {
        Node(document.root_element())
    }

    /// First descendant matching `selector`. Unparseable selectors match
    /// nothing.
    pub fn find(&self, selector: &str) -> Option<Node<'a>> {
        let selector = Selector::parse(selector).ok()?;
        self.0.select(&selector).next().map(Node)
    }

    pub fn find_all(&self, selector: &str) -> Vec<Node<'a>> {
        match Selector::parse(selector) {
            Ok(selector) => self.0.select(&selector).map(Node).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// All text below this node, whitespace collapsed.
    pub fn text(&self) -> String {
        self.0.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
    }

    /// Text fragments one by one, trimmed, empties dropped.
    pub fn strings(&self) -> Vec<String> {
        self.0
            .text()
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    pub fn tag(&self) -> &'a str {
        self.0.value().name()
    }

    pub fn classes(&self) -> Vec<&'a str> {
        self.0.value().classes().collect()
    }

    /// Nearest ancestor matching `selector`.
    pub fn closest(&self, selector: &str) -> Option<Node<'a>> {
        let selector = Selector::parse(selector).ok()?;
        self.0
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| selector.matches(a))
            .map(Node)
    }

    fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.0.children().filter_map(ElementRef::wrap).map(Node)
    }

    fn descendants(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.0.descendants().skip(1).filter_map(ElementRef::wrap).map(Node)
    }

    fn contains_node(&self, other: &Node<'a>) -> bool {
        other.0.ancestors().any(|a| a.id() == self.0.id())
    }
}

/// Outcome of looking for the results area.
#[derive(Debug)]
pub enum Located<'a> {
    Found(Node<'a>),
    /// Page says there is nothing to show.
    NoResults,
    /// Neither a container nor a "no results" message. Markup drifted.
    Unrecognised,
}

pub fn find_results_container(document: &Html) -> Located<'_> {
    let root = Node::root(document);

    for selector in RESULTS_SELECTORS {
        if let Some(node) = root.find(selector) {
            debug!(selector, "results container matched");
            return Located::Found(node);
        }
    }

    // structural fallback: blocks with article-ish children
    for block in root.descendants().filter(|n| BLOCK_TAGS.contains(&n.tag())) {
        let has_article_tag = block.find("article").is_some();
        let has_article_class = block.descendants().any(|child| {
            child.classes().iter().any(|c| {
                let c = c.to_lowercase();
                c.contains("article") || c.contains("publication")
            })
        });
        if has_article_tag || has_article_class {
            debug!(tag = block.tag(), classes = ?block.classes(), "results container found by structure");
            return Located::Found(block);
        }
    }

    let page_text = root.text().to_lowercase();
    if NO_RESULTS_PHRASES.iter().any(|p| page_text.contains(p)) {
        info!("page reports no results");
        return Located::NoResults;
    }

    log_page_structure(document);
    Located::Unrecognised
}

/// Entry nodes inside a results container.
pub fn find_article_nodes<'a>(container: &Node<'a>) -> Vec<Node<'a>> {
    for selector in ARTICLE_SELECTORS {
        let nodes = container.find_all(selector);
        if !nodes.is_empty() {
            debug!(selector, count = nodes.len(), "article nodes matched");
            return nodes;
        }
    }

    // a bare list: its own items are the entries, nested lists are fields
    if LIST_TAGS.contains(&container.tag()) {
        let items: Vec<Node<'a>> = container.children().filter(|n| n.tag() == "li").collect();
        if !items.is_empty() {
            debug!(count = items.len(), "article nodes are list items");
            return items;
        }
    }

    // heading plus (author mention or year), both required
    let candidates: Vec<Node<'a>> = container
        .descendants()
        .filter(|n| ENTRY_TAGS.contains(&n.tag()))
        .filter(|n| looks_like_entry(n))
        .collect();

    // keep the innermost match so wrappers don't swallow their entries
    let nodes: Vec<Node<'a>> = candidates
        .iter()
        .filter(|c| !candidates.iter().any(|o| o != *c && c.contains_node(o)))
        .copied()
        .collect();

    debug!(count = nodes.len(), "article nodes found by structure");
    nodes
}

fn looks_like_entry(node: &Node<'_>) -> bool {
    if node.find(HEADING).is_none() {
        return false;
    }
    let text = node.text();
    author_regex().is_match(&text) || year_regex().is_match(&text)
}

/// Dumps enough of the page to update selectors by hand.
pub fn log_page_structure(document: &Html) {
    let root = Node::root(document);
    let title = root.find("title").map(|t| t.text()).unwrap_or_default();
    let body_classes = root.find("body").map(|b| b.classes().join(" ")).unwrap_or_default();
    let blocks: Vec<String> = root
        .descendants()
        .filter(|n| ["main", "div", "ul"].contains(&n.tag()) && !n.classes().is_empty())
        .take(40)
        .map(|n| format!("{}.{}#{}", n.tag(), n.classes().join("."), n.attr("id").unwrap_or("")))
        .collect();

    warn!(title = %title, body_classes = %body_classes, blocks = ?blocks, "unrecognised results page structure");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><head><title>t</title></head><body>{body}</body></html>"))
    }

    #[test]
    fn first_matching_selector_wins_by_position() {
        // only the second selector in the list matches
        let html = doc(r#"<div id="search-results"><div class="list"><article>A</article></div></div>"#);
        match find_results_container(&html) {
            Located::Found(node) => {
                assert_eq!(node.tag(), "div");
                assert_eq!(node.classes(), vec!["list"]);
            }
            other => panic!("expected container, got {other:?}"),
        }
    }

    #[test]
    fn earlier_selector_beats_later_one() {
        let html = doc(
            r#"<ul class="search-list"><li>x</li></ul>
               <div class="articles"><div class="list" id="primary"></div></div>"#,
        );
        let Located::Found(node) = find_results_container(&html) else {
            panic!("expected container");
        };
        assert_eq!(node.attr("id"), Some("primary"));
    }

    #[test]
    fn structural_fallback_finds_publication_blocks() {
        let html = doc(r#"<section id="wrap"><div class="pub-publication-card"><h3>T</h3></div></section>"#);
        let Located::Found(node) = find_results_container(&html) else {
            panic!("expected container");
        };
        assert_eq!(node.attr("id"), Some("wrap"));
    }

    #[test]
    fn no_results_phrase_is_distinguished_from_parse_failure() {
        let empty = doc("<p>По вашему запросу ничего не найдено</p>");
        assert!(matches!(find_results_container(&empty), Located::NoResults));

        let drifted = doc("<p>Something entirely different</p>");
        assert!(matches!(find_results_container(&drifted), Located::Unrecognised));
    }

    #[test]
    fn article_selectors_are_tried_in_order() {
        let html = doc(r#"<div class="box"><div class="item">1</div><div class="item">2</div></div>"#);
        let container = Node::root(&html).find(".box").unwrap();
        let nodes = find_article_nodes(&container);
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.classes() == vec!["item"]));
    }

    #[test]
    fn heuristic_requires_heading_and_author_or_year() {
        let html = doc(
            r#"<div class="box">
                 <div><h2>Has year</h2><span>2019</span></div>
                 <div><h2>Has author</h2><span>Author: Ivanov</span></div>
                 <div><h2>Heading only</h2><span>nothing</span></div>
                 <div><span>2020, no heading</span></div>
               </div>"#,
        );
        let container = Node::root(&html).find(".box").unwrap();
        let titles: Vec<String> = find_article_nodes(&container)
            .iter()
            .map(|n| n.find("h2").unwrap().text())
            .collect();
        assert_eq!(titles, vec!["Has year", "Has author"]);
    }

    #[test]
    fn heuristic_prefers_innermost_entries() {
        let html = doc(
            r#"<div class="box"><div class="wrap">
                 <div><h3>One</h3>2001</div>
                 <div><h3>Two</h3>2002</div>
               </div></div>"#,
        );
        let container = Node::root(&html).find(".box").unwrap();
        assert_eq!(find_article_nodes(&container).len(), 2);
    }

    #[test]
    fn nested_lists_are_fields_not_entries() {
        let items: String = (0..8)
            .map(|i| format!(r#"<li><h2><a href="/article/n/a{i}">Article {i}</a></h2><ul class="tags"><li>AI</li><li>NLP</li></ul></li>"#))
            .collect();
        let html = doc(&format!(r#"<div class="articles"><ul class="list">{items}</ul></div>"#));
        let Located::Found(container) = find_results_container(&html) else {
            panic!("expected container");
        };
        let nodes = find_article_nodes(&container);
        assert_eq!(nodes.len(), 8);
        assert!(nodes.iter().all(|n| n.find("h2").is_some()));
    }

    #[test]
    fn search_fixture_yields_eight_entries() {
        let html = Html::parse_document(include_str!("../tests/fixtures/search_results.html"));
        let Located::Found(container) = find_results_container(&html) else {
            panic!("expected container");
        };
        assert_eq!(find_article_nodes(&container).len(), 8);
    }

    #[test]
    fn list_items_do_not_shadow_the_heuristic_in_div_containers() {
        let html = doc(
            r#"<div class="box">
                 <nav><ul><li>Home</li><li>About</li></ul></nav>
                 <div><h3>Real entry</h3><span>2020</span></div>
               </div>"#,
        );
        let container = Node::root(&html).find(".box").unwrap();
        let nodes = find_article_nodes(&container);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].find("h3").unwrap().text(), "Real entry");
    }

    #[test]
    fn year_detection_is_bounded() {
        assert_eq!(find_year("published 2021, vol 3"), Some(2021));
        assert_eq!(find_year("item 1899 then 1999"), Some(1999));
        assert_eq!(find_year("code 21000"), None);
    }

    #[test]
    fn node_capabilities() {
        let html = doc(r#"<div class="a b" id="x"><a href="/p">  Hello
            world </a><span>!</span></div>"#);
        let node = Node::root(&html).find("#x").unwrap();
        assert_eq!(node.text(), "Hello world !");
        assert_eq!(node.strings(), vec!["Hello world", "!"]);
        assert_eq!(node.find("a").and_then(|a| a.attr("href")), Some("/p"));
        assert_eq!(node.find_all("span").len(), 1);
        assert!(node.find("[[bad").is_none());
        assert_eq!(node.classes(), vec!["a", "b"]);
    }
}
