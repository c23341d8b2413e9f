//! Demonstration of logging in qnet-core.
//!
//! A two-channel server fed by Poisson arrivals. Run with
//! `RUST_LOG=trace` to watch every grant and wake.

use qnet_core::dists::{ArrivalPattern, PoissonArrivals};
use qnet_core::{
    init_detailed_simulation_logging, simulation_span, Capacity, SimError, SimTime, Simulation,
    SlotPool,
};
use std::time::Duration;
use tracing::{debug, info};

fn main() -> Result<(), SimError> {
    init_detailed_simulation_logging();
    let _span = simulation_span("logging_demo").entered();

    let mut sim = Simulation::default();
    let handle = sim.scheduler_handle();
    let server = SlotPool::new(Capacity::bounded(2)?);
    let mut arrivals = PoissonArrivals::new(0.4, 2024)?;

    sim.spawn(async move {
        for request_id in 0..20u32 {
            handle.sleep(arrivals.next_arrival_time()).await;
            let handle_for_request = handle.clone();
            let server = server.clone();
            handle.spawn(async move {
                let arrived = handle_for_request.time();
                let permit = server.acquire().await;
                debug!(
                    request_id,
                    waited = ?handle_for_request.time().duration_since(arrived),
                    "Request started"
                );
                handle_for_request.sleep(Duration::from_millis(700)).await;
                if let Err(e) = server.release(permit) {
                    tracing::error!(error = %e, "Release failed");
                }
                info!(request_id, time = %handle_for_request.time(), "Request completed");
            });
        }
    });

    sim.run_until(SimTime::from_secs(60));
    info!(
        final_time = %sim.time(),
        events = sim.events_processed(),
        "Demo finished"
    );
    Ok(())
}
