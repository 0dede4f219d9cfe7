// Replicated Suite Runner - run the simulated benchmark across seeds
//
// Usage:
//   cargo run --bin replicated_suite
//   cargo run --bin replicated_suite -- --config scenarios/default.yaml
//   BENCH_REPLICATIONS=5 cargo run --bin replicated_suite -- --output results.json

use std::fs;
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use dlt_bench::dlt_sinks::LoggingEventSink;
use dlt_bench::{BenchConfig, EnvOverrides, ReplicatedSuite};

#[derive(Parser)]
#[command(name = "replicated_suite")]
#[command(about = "Replicated confirmation latency benchmark for simulated ledgers")]
struct Cli {
    /// YAML scenario file; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    replications: Option<usize>,

    #[arg(long)]
    seed_start: Option<u64>,

    /// Operations in the latency scenario
    #[arg(long)]
    iterations: Option<usize>,

    /// Concurrent operations in the throughput scenario
    #[arg(long)]
    batch_size: Option<usize>,

    /// Scalability sweep, e.g. --batch-sizes 10,100,1000
    #[arg(long, value_delimiter = ',')]
    batch_sizes: Option<Vec<usize>>,

    /// Submit latency operations one at a time
    #[arg(long)]
    sequential_latency: bool,

    /// Wait on the real clock instead of the paused runtime clock
    #[arg(long)]
    wall_clock: bool,

    /// Write the aggregated report as JSON
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

type RunError = Box<dyn std::error::Error>;

fn load_config(cli: &Cli) -> Result<BenchConfig, RunError> {
    let mut config = match &cli.config {
        Some(path) => BenchConfig::from_yaml_file(path)?,
        None => BenchConfig::default(),
    };

    config.apply_env(&EnvOverrides::from_env()?);

    if let Some(v) = cli.replications {
        config.replications = v;
    }
    if let Some(v) = cli.seed_start {
        config.seed_start = v;
    }
    if let Some(v) = cli.iterations {
        config.iterations = v;
    }
    if let Some(v) = cli.batch_size {
        config.batch_size = v;
    }
    if let Some(v) = &cli.batch_sizes {
        config.batch_sizes = v.clone();
    }
    if cli.sequential_latency {
        config.sequential_latency = true;
    }
    if cli.wall_clock {
        config.virtual_clock = false;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), RunError> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    let config = load_config(&cli)?;

    println!("Configuration:");
    println!("  Replications: {} (seed start {})", config.replications, config.seed_start);
    println!("  Latency iterations: {}", config.iterations);
    println!("  Throughput batch: {}", config.batch_size);
    println!("  Scalability batches: {:?}", config.batch_sizes);
    println!(
        "  Clock: {}",
        if config.virtual_clock { "virtual" } else { "wall" }
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(config.virtual_clock)
        .build()?;

    let mut suite = ReplicatedSuite::simulated(config)
        .with_sink(Box::new(LoggingEventSink::new(cli.verbose)));

    let report = match runtime.block_on(suite.run()) {
        Ok(report) => report,
        Err(failure) => {
            error!("Replicated suite failed at seed {}: {}", failure.seed, failure.cause);
            if failure.partial.replications() > 0 {
                info!(
                    "Partial results from {} completed replications:",
                    failure.partial.replications()
                );
                failure.partial.print_summary();
            }
            exit(1);
        }
    };

    report.print_summary();

    if let Some(output_path) = cli.output {
        fs::write(&output_path, serde_json::to_string_pretty(&report)?)?;
        println!("Results saved to: {}", output_path.display());
    }

    Ok(())
}
