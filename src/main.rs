// CyberLeninka scraper: searches articles, pulls text, PDFs, keywords and references.
// Results are cached on disk so repeated lookups don't hit the site.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use cyberleninka_scraper::{ArticleRecord, CyberleninkaScraper, ScraperConfig, SearchQuery};
use std::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// CL arguments for config
#[derive(Parser, Debug)]
#[command(author, version, about = "CyberLeninka article scraper", long_about = None)]
struct Args {
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    cache_dir: Option<String>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search articles
    Search {
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(long)]
        year_from: Option<i32>,

        #[arg(long)]
        year_to: Option<i32>,

        /// Repeat to keep articles in any of several categories
        #[arg(short, long = "category")]
        categories: Vec<String>,
    },
    /// Print an article's full text
    Text { id: String },
    /// Download an article's PDF
    Pdf {
        id: String,

        #[arg(short, long, default_value = "article.pdf")]
        output: String,
    },
    /// Number of result pages for a query
    Pages { query: String },
    /// Categories listed on the front page
    Categories,
    Keywords { id: String },
    References { id: String },
    /// Metadata of a single article
    Article { id: String },
    /// Check the site responds
    Check,
}

fn print_article(index: usize, article: &ArticleRecord) {
    println!("\n{}", "=".repeat(64));
    println!("[{}] {}", index + 1, article.title);
    println!("{}", "=".repeat(64));
    if let Some(id) = &article.id {
        println!("ID: {}", id);
    }
    if let Some(url) = &article.url {
        println!("URL: {}", url);
    }
    if !article.authors.is_empty() {
        println!("Authors: {}", article.authors.join(", "));
    }
    if let Some(year) = article.year {
        println!("Year: {}", year);
    }
    if !article.categories.is_empty() {
        println!("Categories: {}", article.categories.join(", "));
    }
    if let Some(abstract_text) = &article.abstract_text {
        let preview: String = abstract_text.chars().take(200).collect();
        if preview.len() < abstract_text.len() {
            println!("   \"{}...\"", preview);
        } else {
            println!("   \"{}\"", preview);
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    println!("{}: {}\n", title, items.len());
    for item in items {
        println!("  - {}", item);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "cyberleninka_scraper=debug"
    } else {
        "cyberleninka_scraper=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = ScraperConfig::from_env();
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(cache_dir) = args.cache_dir {
        config = config.with_cache_dir(cache_dir);
    }

    let scraper = CyberleninkaScraper::new(config)?;

    match args.command {
        Command::Search {
            query,
            limit,
            page,
            year_from,
            year_to,
            categories,
        } => {
            println!("{}", "=".repeat(64));
            println!("   CyberLeninka search");
            println!("{}", "=".repeat(64));
            println!("\nQuery: {}", query);
            println!("Page: {}", page);
            println!("Limit: {}", limit);
            if !categories.is_empty() {
                println!("Categories: {}", categories.join(", "));
            }

            let search = SearchQuery::new(query)
                .limit(limit)
                .page(page)
                .years(year_from, year_to)
                .categories(categories);
            let articles = scraper.search_articles(&search).await;

            for (i, article) in articles.iter().enumerate() {
                print_article(i, article);
            }
            println!("\nFound: {}\n", articles.len());
        }
        Command::Text { id } => {
            let text = scraper.get_full_text(&id).await;
            if text.is_empty() {
                return Err(anyhow!("no text found for {}", id));
            }
            println!("{}", text);
        }
        Command::Pdf { id, output } => {
            let pdf = scraper
                .get_article_pdf(&id)
                .await
                .ok_or_else(|| anyhow!("no pdf found for {}", id))?;
            fs::write(&output, &pdf)?;
            println!("SAVED {} bytes to: {}", pdf.len(), output);
        }
        Command::Pages { query } => {
            println!("Pages: {}", scraper.get_total_pages(&query).await);
        }
        Command::Categories => {
            print_list("Categories", &scraper.get_categories().await);
        }
        Command::Keywords { id } => {
            print_list("Keywords", &scraper.extract_keywords(&id).await);
        }
        Command::References { id } => {
            print_list("References", &scraper.find_references(&id).await);
        }
        Command::Article { id } => match scraper.get_article(&id).await {
            Some(article) => print_article(0, &article),
            None => return Err(anyhow!("article {} not found", id)),
        },
        Command::Check => {
            if scraper.check_availability().await {
                println!("Available: {}", scraper.config().base_url);
            } else {
                return Err(anyhow!("{} is not reachable", scraper.config().base_url));
            }
        }
    }

    Ok(())
}
