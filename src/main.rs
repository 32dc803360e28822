mod aggregator;
mod error;
mod parallel;

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

/// Report the customers with the highest and lowest total water usage.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to the usage file, one `customer_id;gallons` record per line
    file: PathBuf,

    /// Number of worker threads; 0 processes the file in a single pass
    #[arg(long, default_value_t = 0)]
    workers: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let filename = args.file.to_string_lossy();

    let mut stdout = io::stdout();
    if args.workers == 0 {
        aggregator::UsageAggregator::new()
            .run(&filename, &mut stdout)
            .with_context(|| format!("failed to process {}", args.file.display()))?;
    } else {
        parallel::process_file(&filename, &mut stdout, args.workers)
            .with_context(|| format!("failed to process {}", args.file.display()))?;
    }
    Ok(())
}
