use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::ScanStats;

pub const ELASTIC_MARKER: &str = " [e]";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchResult {
    pub object: String,
    pub elastic: bool,
}

impl MatchResult {
    pub fn direct(object: &str) -> Self {
        Self {
            object: object.to_string(),
            elastic: false,
        }
    }

    pub fn elastic(object: &str) -> Self {
        Self {
            object: object.to_string(),
            elastic: true,
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elastic {
            write!(f, "{}{ELASTIC_MARKER}", self.object)
        } else {
            f.write_str(&self.object)
        }
    }
}

pub fn render(matches: &[MatchResult]) -> String {
    let mut out = String::new();
    for m in matches {
        out.push_str(&m.to_string());
        out.push('\n');
    }
    out
}

/// `objscan_[elastic_]kmalloc_<bucket>[_for_<catalog>].txt`
pub fn output_file_name(ceiling: u64, elastic: bool, catalog: Option<&Path>) -> String {
    let mode = if elastic { "elastic_" } else { "" };
    let suffix = catalog
        .and_then(|p| p.file_name())
        .map(|s| format!("_for_{}", s.to_string_lossy()))
        .unwrap_or_default();
    format!("objscan_{mode}kmalloc_{ceiling}{suffix}.txt")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Stdout,
    File(PathBuf),
}

pub fn write_output(content: &str, sink: &OutputSink) -> Result<()> {
    match sink {
        OutputSink::Stdout => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(content.as_bytes())?;
            lock.flush()?;
        }
        OutputSink::File(path) => write_atomic(path, content)?,
    }
    Ok(())
}

/// Writes through a sibling temp file so a failed run never leaves a
/// truncated result behind.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let mut tmp_os = path.as_os_str().to_os_string();
    tmp_os.push(".tmp");
    let tmp = PathBuf::from(tmp_os);
    std::fs::write(&tmp, content)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err)
            .with_context(|| format!("Failed to move result into place: {}", path.display()));
    }
    Ok(())
}

pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// What a finished run did, for `--summary`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub bucket: u64,
    pub floor: u64,
    pub elastic: bool,
    pub jobs: usize,
    pub catalog: Option<String>,
    pub output: Option<String>,
    pub stats: ScanStats,
    pub content_hash: String,
    pub duration_ms: u64,
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
