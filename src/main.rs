mod db;
mod errlog;
mod error;
mod parser;
mod runner;
mod settings;
mod sink;
mod sitemap;
mod urllist;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::errlog::ErrorLog;
use crate::parser::{product_rules, PRODUCT_FIELDS};
use crate::runner::{HttpFetcher, Sinks};
use crate::settings::Settings;
use crate::sink::CsvAppender;

#[derive(Parser)]
#[command(name = "product_scraper", about = "Store product page scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the store sitemap and queue product URLs
    Init {
        /// Sitemap to read instead of the configured one
        #[arg(long)]
        sitemap: Option<String>,
    },
    /// Queue URLs from a list file (url[,marker] per line)
    Import {
        file: PathBuf,
    },
    /// Mark URLs so runs leave them out
    Skip {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Clear the skip marker of URLs
    Unskip {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Scrape every pending URL, one page at a time
    Scrape {
        /// Max pages to scrape (default: all pending)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Also append records to this CSV/TSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Show queue statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(db = %settings.db_path.display(), "Settings loaded");

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init { sitemap } => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let sitemap_url = sitemap.unwrap_or_else(|| settings.sitemap_url.clone());
            let urls = sitemap::fetch_product_urls(&fetcher, &sitemap_url).await?;
            let pages: Vec<(String, Option<String>)> = urls.into_iter().map(|u| (u, None)).collect();
            let inserted = db::insert_pages(&conn, &pages)?;
            println!("Queued {} new product URLs ({} total found)", inserted, pages.len());
        }
        Commands::Import { file } => {
            let pages = urllist::read_url_list(&file)?;
            let inserted = db::insert_pages(&conn, &pages)?;
            println!("Queued {} new URLs from {} ({} listed)", inserted, file.display(), pages.len());
        }
        Commands::Skip { urls } => {
            let n = db::set_marker(&conn, &urls, Some(db::SKIP_MARKER))?;
            println!("Marked {} of {} URLs as skipped", n, urls.len());
        }
        Commands::Unskip { urls } => {
            let n = db::set_marker(&conn, &urls, None)?;
            println!("Cleared {} of {} URLs", n, urls.len());
        }
        Commands::Scrape { limit, csv } => {
            let pages = db::fetch_pending(&conn, limit)?;
            if pages.is_empty() {
                println!("No pending pages. Run 'init' or 'import' first, or everything is scraped.");
                return Ok(());
            }

            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let mut errors = ErrorLog::open(&settings.error_log)?;
            let csv = csv
                .map(|path| CsvAppender::open(path, &PRODUCT_FIELDS))
                .transpose()?;
            if let Some(csv) = &csv {
                info!("Appending records to {}", csv.path().display());
            }
            let mut records = (db::ProductStore::open(&conn, &PRODUCT_FIELDS)?, csv);

            println!("Scraping {} pages...", pages.len());
            let stats = runner::scrape_pages(
                &conn,
                &fetcher,
                pages,
                &PRODUCT_FIELDS,
                &product_rules(),
                Sinks { records: &mut records, failures: &mut errors },
                settings.settle(),
            )
            .await?;
            println!(
                "Done: {} pages ({} ok, {} failed to load), {} field failures logged to {}",
                stats.total,
                stats.ok,
                stats.failed_pages,
                stats.field_failures,
                errors.path().display()
            );
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Total:    {}", s.total);
            println!("Skipped:  {}", s.skipped);
            println!("Visited:  {}", s.visited);
            println!("Pending:  {}", s.pending);
            println!("Products: {}", s.products);
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
