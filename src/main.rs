use anyhow::{Context, Result};
use clap::Parser;
use objscan::bucket::BucketTable;
use objscan::catalog::Scanner;
use objscan::cli::Cli;
use objscan::config::{
    TempCatalog, init_logging, resolve_jobs, resolve_pahole_path, resolve_sink,
};
use objscan::dispatch::{DispatchConfig, dispatch};
use objscan::output::{
    OutputSink, ScanSummary, duration_ms, hash_content, render, write_output,
};
use objscan::pahole::Pahole;
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = init_logging(cli.log_level.as_deref()).and_then(|()| run(&cli));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let start = Instant::now();
    let bucket = BucketTable::default().resolve(cli.size)?;
    let pahole = Pahole::new(resolve_pahole_path(cli));
    let jobs = resolve_jobs(cli);

    let temp = match cli.catalog {
        Some(_) => None,
        None => Some(TempCatalog::create(&pahole)?),
    };
    let catalog_path = cli
        .catalog
        .as_deref()
        .or(temp.as_ref().map(TempCatalog::path))
        .context("No catalog available")?;

    let file = File::open(catalog_path)
        .with_context(|| format!("Failed to open catalog: {}", catalog_path.display()))?;
    let scanner = Scanner::new(&pahole, bucket, cli.elastic).strict(cli.strict);
    let outcome = dispatch(
        &scanner,
        BufReader::new(file),
        DispatchConfig {
            jobs,
            queue_capacity: cli.queue_capacity,
        },
    )?;
    drop(temp);

    let stats = outcome.stats();
    let content = render(&outcome.into_matches());
    let sink = resolve_sink(cli, bucket.ceiling);
    write_output(&content, &sink)?;

    let output = match &sink {
        OutputSink::File(path) => {
            println!("Result in file {}", path.display());
            Some(path.to_string_lossy().to_string())
        }
        OutputSink::Stdout => None,
    };

    if cli.summary {
        let summary = ScanSummary {
            bucket: bucket.ceiling,
            floor: bucket.floor,
            elastic: cli.elastic,
            jobs,
            catalog: cli
                .catalog
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            output,
            stats,
            content_hash: hash_content(&content),
            duration_ms: duration_ms(start.elapsed()),
        };
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
