//! Basic usage of the qnet meta-crate: one short run with a custom VIP mix.

use qnet::prelude::*;

fn main() -> Result<(), ComponentError> {
    init_simulation_logging();

    let mut config = NetworkConfig {
        horizon: 300.0,
        seed: 7,
        ..NetworkConfig::default()
    };
    config.classes.standard.weight = 0.4;
    config.classes.vip.weight = 0.3;
    config.stations.pacing.channels = Some(8);

    let mut simulation = NetworkSimulation::new(config)?;
    let report = simulation.run()?;

    println!("Simulation completed at time: {:.1}s", report.final_time);
    for class in &report.classes {
        println!(
            "{}: {} arrived, {} completed, mean sojourn {:.2}s",
            class.class.label(),
            class.arrivals,
            class.completed,
            class.mean_sojourn
        );
    }
    if let Some(pacing) = report.station(Hop::Pacing.label()) {
        println!("pacing peak queue: {}", pacing.peak_queue_length);
    }
    Ok(())
}
