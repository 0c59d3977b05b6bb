use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::parser::Record;

/// Persists finished records, one at a time.
pub trait RecordSink {
    fn append(&mut self, record: &Record) -> Result<()>;
}

/// Both sinks, first one first.
impl<A: RecordSink, B: RecordSink> RecordSink for (A, B) {
    fn append(&mut self, record: &Record) -> Result<()> {
        self.0.append(record)?;
        self.1.append(record)
    }
}

impl<S: RecordSink> RecordSink for Option<S> {
    fn append(&mut self, record: &Record) -> Result<()> {
        match self {
            Some(sink) => sink.append(record),
            None => Ok(()),
        }
    }
}

impl RecordSink for Vec<Record> {
    fn append(&mut self, record: &Record) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Spreadsheet file that grows by one row per record.
///
/// `.tsv` paths are tab separated, anything else comma separated. The header
/// row is written when the file is new or empty.
pub struct CsvAppender {
    path: PathBuf,
    file: File,
    sep: char,
}

impl CsvAppender {
    pub fn open(path: impl AsRef<Path>, schema: &[&str]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let sep = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => '\t',
            _ => ',',
        };
        let is_new = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        if is_new {
            let header: Vec<String> = schema.iter().map(|s| s.to_string()).collect();
            write_row(&mut file, &header, sep)
                .with_context(|| format!("Failed to write header to {}", path.display()))?;
        }
        Ok(Self { path, file, sep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvAppender {
    fn append(&mut self, record: &Record) -> Result<()> {
        write_row(&mut self.file, &record.to_cells(), self.sep)
            .with_context(|| format!("Failed to append to {}", self.path.display()))
    }
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV/TSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", sep)?;
        } else {
            first = false;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}
