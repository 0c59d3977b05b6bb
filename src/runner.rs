use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::{self, Page};
use crate::errlog::{Failure, FailureSink};
use crate::parser::{extract_into, FieldRule, HtmlDocument};
use crate::sink::RecordSink;

/// Turns a URL into page markup.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP GET with one shared client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Scrape stats returned after completion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub failed_pages: usize,
    pub field_failures: usize,
}

/// Where a run writes.
pub struct Sinks<'a, R: ?Sized, L: ?Sized> {
    pub records: &'a mut R,
    pub failures: &'a mut L,
}

/// Scrape `pages` one after another: load, settle, extract, append, mark visited.
///
/// A page that fails to load is logged and left unvisited. A sink error
/// aborts the run.
pub async fn scrape_pages<F, R, L>(
    conn: &Connection,
    fetcher: &F,
    pages: Vec<Page>,
    schema: &[&'static str],
    rules: &[FieldRule],
    sinks: Sinks<'_, R, L>,
    settle: Duration,
) -> Result<ScrapeStats>
where
    F: Fetcher + ?Sized,
    R: RecordSink + ?Sized,
    L: FailureSink + ?Sized,
{
    let Sinks { records, failures } = sinks;
    let mut stats = ScrapeStats {
        total: pages.len(),
        ..Default::default()
    };

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    for page in pages {
        let markup = match fetcher.fetch(&page.url).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!("Failed to load {}: {:#}", page.url, e);
                failures.record(&Failure::load(&page.url, &e))?;
                stats.failed_pages += 1;
                pb.inc(1);
                continue;
            }
        };
        tokio::time::sleep(settle).await;

        let mut doc = HtmlDocument::parse(page.url.as_str(), &markup);
        let out = extract_into(&mut doc, schema, rules, failures)?;
        debug!(url = %page.url, present = out.record.present(), failed = out.failures.len(), "Record assembled");
        stats.field_failures += out.failures.len();

        records.append(&out.record)?;
        db::mark_visited(conn, page.id)?;
        stats.ok += 1;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Scraped {} pages ({} ok, {} failed to load, {} field failures)",
        stats.total, stats.ok, stats.failed_pages, stats.field_failures
    );
    Ok(stats)
}
