use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::runner::Fetcher;

/// Store product pages, optionally under a locale prefix (`/nl/product/…`).
const PRODUCT_PATTERN: &str =
    r"^https://[^/]+/(?:[a-z]{2}(?:-[a-z]{2})?/)?product/[a-zA-Z0-9][a-zA-Z0-9_-]*/?$";

/// Fetch the store sitemap and return product page URLs in sitemap order.
pub async fn fetch_product_urls<F: Fetcher + ?Sized>(fetcher: &F, sitemap_url: &str) -> Result<Vec<String>> {
    let re = Regex::new(PRODUCT_PATTERN)?;

    info!("Fetching sitemap: {}", sitemap_url);
    let xml = fetcher
        .fetch(sitemap_url)
        .await
        .context("Failed to fetch sitemap")?;

    let all_urls = parse_urlset(&xml)?;
    info!("Total URLs in sitemap: {}", all_urls.len());

    let filtered: Vec<String> = all_urls.into_iter().filter(|url| re.is_match(url)).collect();
    info!("Product pages after filtering: {}", filtered.len());
    Ok(filtered)
}

/// Every `<url><loc>` of the store sitemap, trimmed, in document order.
/// Namespace prefixes on the tags are ignored.
fn parse_urlset(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_url = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => in_url = true,
                b"loc" if in_url => in_loc = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(e)) if in_loc => {
                urls.push(e.unescape()?.trim().to_string());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(urls)
}
