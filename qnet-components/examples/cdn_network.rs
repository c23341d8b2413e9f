//! Run the default content-delivery scenario and export the results.
//!
//! ```text
//! cargo run -p qnet-components --example cdn_network -- [output_dir]
//! ```
//!
//! Writes `report.json` plus one CSV per station queue-length series into
//! `output_dir` (default `target/cdn_network`). Set `RUST_LOG=debug` to see
//! every user enter and leave the network.

use std::path::PathBuf;

use qnet_components::{ComponentError, NetworkConfig, NetworkSimulation, UserClass};
use qnet_core::init_simulation_logging;
use qnet_metrics::export::{csv::write_series_csv, export_json};

fn main() -> Result<(), ComponentError> {
    init_simulation_logging();

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("target/cdn_network"));
    std::fs::create_dir_all(&output_dir).map_err(qnet_metrics::MetricsError::from)?;

    let config = NetworkConfig {
        seed: 42,
        ..NetworkConfig::default()
    };
    let mut simulation = NetworkSimulation::new(config)?;
    let report = simulation.run()?;

    println!(
        "horizon {:.0}s: {} entered, {} left, {} in flight",
        report.horizon, report.network.entrances, report.network.exits, report.network.in_flight
    );

    println!("\n{:<20} {:>8} {:>10} {:>10} {:>10} {:>8}", "station", "visits", "wait", "service", "queue", "util");
    for station in &report.stations {
        let utilization = station
            .utilization()
            .map_or_else(|| "-".to_string(), |u| format!("{:.0}%", u * 100.0));
        println!(
            "{:<20} {:>8} {:>10.3} {:>10.3} {:>10.3} {:>8}",
            station.name,
            station.summary.count,
            station.summary.mean_wait,
            station.summary.mean_service,
            station.mean_queue_length,
            utilization,
        );
        write_series_csv(
            &station.queue_length,
            output_dir.join(format!("{}_queue.csv", station.name)),
        )?;
    }

    println!();
    for class in UserClass::ALL {
        if let Some(summary) = report.class(class) {
            println!(
                "{:<8} arrivals {:>5}  completed {:>5}  sojourn {:>7.2}s  without pacing {:>7.2}s",
                class.label(),
                summary.arrivals,
                summary.completed,
                summary.mean_sojourn,
                summary.mean_sojourn_excluding_pacing,
            );
        }
    }

    export_json(&report, output_dir.join("report.json"), true)?;
    println!("\nResults written to {}", output_dir.display());
    Ok(())
}
