use clap::Parser;
use std::path::PathBuf;

use crate::dispatch::DEFAULT_QUEUE_CAPACITY;

#[derive(Debug, Clone, Parser)]
#[command(name = "objscan")]
#[command(about = "Looks for kernel objects in pahole output that suit a given kmalloc size")]
pub struct Cli {
    #[arg(short, long, value_name = "BYTES")]
    pub size: u64,

    #[arg(short, long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Also report smaller objects ending in a flexible char array
    #[arg(short, long)]
    pub elastic: bool,

    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    #[arg(long)]
    pub stdout: bool,

    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub pahole: Option<PathBuf>,

    #[arg(long)]
    pub strict: bool,

    #[arg(long)]
    pub summary: bool,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// trace, debug, info, warn, error or off (default: RUST_LOG, then warn)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}
