use anyhow::{Context, Result};
use log::{LevelFilter, debug};
use std::env;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cli::Cli;
use crate::output::{OutputSink, output_file_name};
use crate::pahole::{PAHOLE_ENV, Pahole};

pub fn resolve_pahole_path(cli: &Cli) -> PathBuf {
    if let Some(p) = cli.pahole.clone() {
        return p;
    }

    if let Ok(p) = env::var(PAHOLE_ENV)
        && !p.is_empty()
    {
        return PathBuf::from(p);
    }

    PathBuf::from("pahole")
}

pub fn resolve_jobs(cli: &Cli) -> usize {
    cli.jobs.unwrap_or_else(num_cpus::get).max(1)
}

pub fn resolve_sink(cli: &Cli, ceiling: u64) -> OutputSink {
    if cli.stdout {
        return OutputSink::Stdout;
    }

    let name = output_file_name(ceiling, cli.elastic, cli.catalog.as_deref());
    match cli.out_dir.as_deref() {
        Some(dir) => OutputSink::File(dir.join(name)),
        None => OutputSink::File(PathBuf::from(name)),
    }
}

pub fn init_logging(level: Option<&str>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        let filter: LevelFilter = level
            .parse()
            .with_context(|| format!("Invalid log level: {level}"))?;
        builder.filter_level(filter);
    }
    builder.format_timestamp(None).format_target(false);
    let _ = builder.try_init();
    Ok(())
}

/// `pahole --sizes` output captured for a single run; removed on drop.
#[derive(Debug)]
pub struct TempCatalog {
    path: PathBuf,
}

impl TempCatalog {
    pub fn create(pahole: &Pahole) -> Result<Self> {
        let dir = temp_catalog_dir()?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let catalog = Self {
            path: dir.join(format!("catalog_{}_{nanos}", std::process::id())),
        };

        debug!("Dumping pahole --sizes to {}", catalog.path.display());
        pahole.dump_sizes(&catalog.path)?;
        Ok(catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempCatalog {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// The user cache directory when it is usable, the system temp dir otherwise.
fn temp_catalog_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::cache_dir().map(|d| d.join("objscan"))
        && std::fs::create_dir_all(&dir).is_ok()
    {
        return Ok(dir);
    }

    let dir = env::temp_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    Ok(dir)
}
