use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::parser::Record;
use crate::sink::RecordSink;

/// Marker value that keeps a queued URL out of every run.
pub const SKIP_MARKER: &str = "x";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            marker     TEXT,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_visited ON pages(visited);
        ",
    )?;
    Ok(())
}

// ── URL queue ──

/// Queues `(url, marker)` pairs in the given order; known URLs are left alone.
pub fn insert_pages(conn: &Connection, pages: &[(String, Option<String>)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO pages (url, marker) VALUES (?1, ?2)")?;
        for (url, marker) in pages {
            count += stmt.execute(rusqlite::params![url, marker])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// Sets (or with `None` clears) the marker of each URL. Returns rows changed.
pub fn set_marker(conn: &Connection, urls: &[String], marker: Option<&str>) -> Result<usize> {
    let mut stmt = conn.prepare("UPDATE pages SET marker = ?1 WHERE url = ?2")?;
    let mut count = 0;
    for url in urls {
        count += stmt.execute(rusqlite::params![marker, url])?;
    }
    Ok(count)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: i64,
    pub url: String,
}

/// Unvisited, unmarked pages in queue order.
pub fn fetch_pending(conn: &Connection, limit: Option<usize>) -> Result<Vec<Page>> {
    let mut sql = String::from(
        "SELECT id, url FROM pages
         WHERE visited = 0 AND (marker IS NULL OR marker != ?1)
         ORDER BY id",
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([SKIP_MARKER], |row| {
            Ok(Page {
                id: row.get(0)?,
                url: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_visited(conn: &Connection, page_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE pages SET visited = 1, visited_at = datetime('now') WHERE id = ?1",
        [page_id],
    )?;
    Ok(())
}

// ── Records ──

/// The `products` table: one TEXT column per schema field.
pub struct ProductStore<'c> {
    conn: &'c Connection,
    insert_sql: String,
}

impl<'c> ProductStore<'c> {
    /// Creates the table with the schema's columns if it is missing.
    pub fn open(conn: &'c Connection, schema: &[&str]) -> Result<Self> {
        let columns: Vec<String> = schema.iter().map(|c| format!("\"{}\"", c)).collect();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS products (
                id         INTEGER PRIMARY KEY,
                {},
                scraped_at TEXT NOT NULL
            );",
            columns
                .iter()
                .map(|c| format!("{} TEXT", c))
                .collect::<Vec<_>>()
                .join(",\n                ")
        ))
        .context("Failed to create products table")?;

        let placeholders: Vec<String> = (1..=schema.len() + 1).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO products ({}, scraped_at) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok(Self { conn, insert_sql })
    }
}

impl RecordSink for ProductStore<'_> {
    fn append(&mut self, record: &Record) -> Result<()> {
        let mut values: Vec<Option<String>> = record.iter().map(|(_, v)| v.map(|v| v.to_cell())).collect();
        values.push(Some(chrono::Utc::now().to_rfc3339()));

        let mut stmt = self.conn.prepare_cached(&self.insert_sql)?;
        stmt.execute(rusqlite::params_from_iter(values.iter()))
            .context("Failed to insert product record")?;
        Ok(())
    }
}

// ── Stats ──

pub struct Stats {
    pub total: i64,
    pub skipped: i64,
    pub visited: i64,
    pub pending: i64,
    pub products: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let (total, skipped, visited): (i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(marker = ?1), 0),
                COALESCE(SUM(visited), 0)
         FROM pages",
        [SKIP_MARKER],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    let pending: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pages WHERE visited = 0 AND (marker IS NULL OR marker != ?1)",
        [SKIP_MARKER],
        |r| r.get(0),
    )?;
    let has_products: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'products'",
        [],
        |r| r.get(0),
    )?;
    let products = if has_products {
        conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))?
    } else {
        0
    };
    Ok(Stats {
        total,
        skipped,
        visited,
        pending,
        products,
    })
}
