use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::{ExtractError, FailureKind};

/// One failed rule, or one page that never loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub url: String,
    pub field: String,
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    pub fn field(url: &str, field: impl ToString, err: &ExtractError) -> Self {
        Self {
            url: url.to_string(),
            field: field.to_string(),
            kind: err.kind(),
            detail: err.to_string(),
        }
    }

    pub fn load(url: &str, err: &anyhow::Error) -> Self {
        Self {
            url: url.to_string(),
            field: "(page)".to_string(),
            kind: FailureKind::Load,
            detail: format!("{:#}", err),
        }
    }
}

/// Where failures go.
pub trait FailureSink {
    fn record(&mut self, failure: &Failure) -> Result<()>;
}

impl FailureSink for Vec<Failure> {
    fn record(&mut self, failure: &Failure) -> Result<()> {
        self.push(failure.clone());
        Ok(())
    }
}

/// Append-only text log, one blank-line separated group per failure.
pub struct ErrorLog {
    path: PathBuf,
    file: File,
}

impl ErrorLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open error log {}", path.display()))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FailureSink for ErrorLog {
    fn record(&mut self, failure: &Failure) -> Result<()> {
        write!(
            self.file,
            "URL: {}\nField: {} ({})\nError: {}\n\n",
            failure.url,
            failure.field,
            failure.kind.as_str(),
            failure.detail
        )
        .with_context(|| format!("Failed to append to {}", self.path.display()))
    }
}
