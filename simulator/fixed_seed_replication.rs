//! Run the suite twice with the same seeds and check the samples match
//!
//! Run with: cargo run --example fixed_seed_replication

use log::info;
use simple_logger::SimpleLogger;

use dlt_bench::{BenchConfig, Network, ReplicatedSuite, ScenarioKey};

fn main() {
    SimpleLogger::new().init().unwrap();

    let config = BenchConfig {
        replications: 3,
        seed_start: 42,
        iterations: 20,
        batch_size: 100,
        batch_sizes: vec![10, 100],
        ..Default::default()
    };

    info!("Running suite twice with seeds starting at {}", config.seed_start);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    let mut first = ReplicatedSuite::simulated(config.clone());
    let first_report = runtime.block_on(first.run()).unwrap();

    let mut second = ReplicatedSuite::simulated(config);
    let second_report = runtime.block_on(second.run()).unwrap();

    for network in Network::ALL {
        let key = ScenarioKey::latency(network);
        let a = first.bag().samples(&key, "avgLatency").unwrap();
        let b = second.bag().samples(&key, "avgLatency").unwrap();
        info!("{} avgLatency per replication: {:?}", network, a);
        assert_eq!(a, b, "Samples differ for {}", network);
    }

    assert_eq!(first_report, second_report, "Reports differ!");
    first_report.print_summary();
    info!("✓ Seed verification passed!");
}
