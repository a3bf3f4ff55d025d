//! Producer/worker fan-out over a catalog.
//!
//! A single producer thread feeds catalog lines into a bounded channel. A
//! rayon pool of `jobs` workers drains it, each appending matches to its own
//! buffer. Closing the channel is the termination signal; a shared flag stops
//! everyone early on a fatal error. Buffers are joined in worker order, so
//! the output of a given run is deterministic per worker partition, and a
//! single worker reproduces catalog order exactly.

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::catalog::{ScanStats, Scanner};
use crate::evaluate::LayoutSource;
use crate::output::MatchResult;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    pub jobs: usize,
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            jobs: num_cpus::get(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Matches and counters produced by one worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerBuffer {
    pub matches: Vec<MatchResult>,
    pub stats: ScanStats,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Indexed by worker id.
    pub partitions: Vec<WorkerBuffer>,
}

impl ScanOutcome {
    pub fn stats(&self) -> ScanStats {
        let mut total = ScanStats::default();
        for p in &self.partitions {
            total.merge(&p.stats);
        }
        total
    }

    /// All matches, worker 0 first.
    pub fn matches(&self) -> impl Iterator<Item = &MatchResult> {
        self.partitions.iter().flat_map(|p| p.matches.iter())
    }

    pub fn into_matches(self) -> Vec<MatchResult> {
        self.partitions
            .into_iter()
            .flat_map(|p| p.matches)
            .collect()
    }
}

type WorkItem = (usize, String);

pub fn dispatch<S, R>(scanner: &Scanner<'_, S>, reader: R, config: DispatchConfig) -> Result<ScanOutcome>
where
    S: LayoutSource + ?Sized,
    R: BufRead + Send,
{
    let jobs = config.jobs.max(1);
    let (tx, rx) = crossbeam_channel::bounded::<WorkItem>(config.queue_capacity.max(1));
    let cancel = AtomicBool::new(false);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("objscan-worker-{i}"))
        .build()
        .context("Failed to build worker pool")?;

    info!(
        "Scanning bucket {} (floor {}) with {jobs} workers",
        scanner.bucket().ceiling,
        scanner.bucket().floor
    );

    let mut slots: Vec<Option<Result<WorkerBuffer>>> = (0..jobs).map(|_| None).collect();
    let receivers: Vec<Receiver<WorkItem>> = (0..jobs).map(|_| rx.clone()).collect();
    drop(rx);

    let produced = std::thread::scope(|s| {
        let cancel = &cancel;
        let producer = std::thread::Builder::new()
            .name("objscan-producer".to_string())
            .spawn_scoped(s, move || produce(reader, tx, cancel))
            .context("Failed to spawn catalog producer")?;

        pool.scope(|ps| {
            for (id, (slot, rx)) in slots.iter_mut().zip(receivers).enumerate() {
                ps.spawn(move |_| {
                    let result = run_worker(id, scanner, rx, cancel);
                    if result.is_err() {
                        cancel.store(true, Ordering::SeqCst);
                    }
                    *slot = Some(result);
                });
            }
        });

        producer
            .join()
            .map_err(|_| anyhow!("Catalog producer panicked"))?
    });

    let mut partitions = Vec::with_capacity(jobs);
    for (id, slot) in slots.into_iter().enumerate() {
        let buffer = slot.ok_or_else(|| anyhow!("Worker {id} did not report"))??;
        partitions.push(buffer);
    }
    produced?;

    let outcome = ScanOutcome { partitions };
    let stats = outcome.stats();
    info!(
        "Scanned {} entries: {} matches ({} elastic), {} failed, {} malformed",
        stats.entries, stats.matches, stats.elastic_matches, stats.failed, stats.malformed
    );
    Ok(outcome)
}

fn produce<R: BufRead>(reader: R, tx: Sender<WorkItem>, cancel: &AtomicBool) -> Result<()> {
    for (idx, line) in reader.lines().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                cancel.store(true, Ordering::SeqCst);
                return Err(err).context("Failed to read catalog");
            }
        };
        // Blocks while the queue is full. Fails only once every worker
        // has gone away.
        if tx.send((idx + 1, line)).is_err() {
            break;
        }
    }
    Ok(())
}

fn run_worker<S: LayoutSource + ?Sized>(
    id: usize,
    scanner: &Scanner<'_, S>,
    rx: Receiver<WorkItem>,
    cancel: &AtomicBool,
) -> Result<WorkerBuffer> {
    let mut buffer = WorkerBuffer::default();
    for (line_no, line) in rx.iter() {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        if let Some(m) = scanner.process_line(line_no, &line, &mut buffer.stats)? {
            buffer.matches.push(m);
        }
    }
    debug!(
        "worker {id}: {} entries, {} matches",
        buffer.stats.entries,
        buffer.matches.len()
    );
    Ok(buffer)
}
