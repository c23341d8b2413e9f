//! End-to-end checks on the full content-delivery network.

use std::cell::Cell;
use std::rc::Rc;

use qnet_components::{
    ClassParams, ComponentError, Hop, NetworkConfig, NetworkSimulation, ServiceStation, User,
    UserClass, UserId, ValidationError,
};
use qnet_core::{Executor, SimError, SimTime};

fn short_config(seed: u64) -> NetworkConfig {
    let mut config = NetworkConfig::default();
    config.horizon = 120.0;
    config.seed = seed;
    config
}

#[test]
fn identical_seeds_give_identical_reports() {
    let first = NetworkSimulation::new(short_config(7)).unwrap().run().unwrap();
    let second = NetworkSimulation::new(short_config(7)).unwrap().run().unwrap();
    assert_eq!(first, second);

    let other = NetworkSimulation::new(short_config(8)).unwrap().run().unwrap();
    assert_ne!(first, other);
}

#[test]
fn stations_never_exceed_their_channels() {
    let mut config = short_config(3);
    // Crowd the network so bounded stations actually queue.
    config.mean_interarrival = 0.2;
    let mut simulation = NetworkSimulation::new(config).unwrap();
    let network = simulation.network().clone();
    let steps = Rc::new(Cell::new(0usize));

    let checker = {
        let network = network.clone();
        let steps = steps.clone();
        move |_: &qnet_core::Simulation| {
            steps.set(steps.get() + 1);
            for station in network.stations() {
                if let Some(channels) = station.capacity().channels() {
                    assert!(
                        station.base().in_service() <= channels,
                        "{} over capacity",
                        station.name()
                    );
                }
            }
            let recorder = network.recorder();
            assert_eq!(
                recorder.occupancy(),
                recorder.entrances() - recorder.exits()
            );
        }
    };

    let report = simulation
        .run_with(Executor::timed(SimTime::from_secs(120)).side_effect(checker))
        .unwrap();

    assert!(steps.get() > 0);
    let queued_somewhere = report.stations.iter().any(|s| s.peak_queue_length > 0);
    assert!(queued_somewhere, "load too light to exercise queueing");
    for station in &report.stations {
        assert!(station.queue_length.points().iter().all(|p| p.timestamp <= SimTime::from_secs(120)));
        assert!(station.mean_occupancy <= station.occupancy.max() as f64);
    }
    // The last occupancy point is the live state, idle stations included.
    for station in network.stations() {
        let last = station.occupancy_series().last().map_or(0, |p| p.value);
        assert_eq!(last, station.base().in_service(), "{}", station.name());
    }
}

#[test]
fn visits_are_ordered_and_routes_followed() {
    let mut simulation = NetworkSimulation::new(short_config(11)).unwrap();
    simulation.run().unwrap();
    let network = simulation.network();

    let users = network.users();
    assert!(!users.is_empty());
    for user in users.iter() {
        for visit in user.visits().iter() {
            assert!(visit.enter <= visit.start && visit.start <= visit.end);
        }
        if user.exited().is_none() {
            continue;
        }

        let stations: Vec<&str> = user.visits().iter().map(|v| v.station).collect();
        let route: Vec<&str> = user.class().route().iter().map(|h| h.label()).collect();
        let passes = if user.class().is_segmented() {
            user.segments().len()
        } else {
            1
        };
        assert_eq!(stations, route.repeat(passes), "{user} strayed from its route");
    }
}

#[test]
fn vip_segments_cover_the_file() {
    let mut config = short_config(5);
    config.classes.standard.weight = 0.0;
    config.classes.premium.weight = 0.0;
    config.classes.vip.weight = 1.0;
    let mut simulation = NetworkSimulation::new(config).unwrap();
    let report = simulation.run().unwrap();

    let network = simulation.network();
    let vip = report.class(UserClass::Vip).unwrap();
    assert!(vip.completed > 0);
    assert_eq!(network.arrivals(UserClass::Standard), 0);

    for user in network.users().iter().filter(|u| u.exited().is_some()) {
        let file_size = user.file_size().unwrap();
        let segments = user.segments();
        let total: f64 = segments.iter().sum();
        assert!((total - file_size).abs() < 1e-9);
        assert!(segments.iter().all(|&s| s > 0.0 && s <= 4.0));

        let paced = user.visits().iter().filter(|v| v.station == "pacing").count();
        assert_eq!(paced, segments.len());
    }
    assert!(vip.mean_sojourn_excluding_pacing <= vip.mean_sojourn);
}

#[test]
fn unbounded_delay_stations_never_queue() {
    let mut simulation = NetworkSimulation::new(short_config(13)).unwrap();
    let report = simulation.run().unwrap();

    for hop in [Hop::Input, Hop::InterStage, Hop::Output] {
        let station = report.station(hop.label()).unwrap();
        assert_eq!(station.channels, None);
        assert_eq!(station.peak_queue_length, 0);
        assert_eq!(station.summary.mean_wait, 0.0);
    }
    let pipeline = report.station("pipeline").unwrap();
    assert_eq!(pipeline.channels, Some(4));
    assert!(pipeline.utilization().unwrap() <= 1.0);
}

#[test]
fn invalid_configuration_is_rejected_before_running() {
    let mut config = short_config(1);
    config.classes.premium.weight = 0.9;
    let error = NetworkSimulation::new(config).unwrap_err();
    assert!(matches!(
        error,
        ComponentError::Validation(ValidationError::WeightsDoNotSumToOne { .. })
    ));

    let mut config = short_config(1);
    config.stations.pipeline.channels = None;
    let error = NetworkSimulation::new(config).unwrap_err();
    assert!(matches!(
        error,
        ComponentError::Validation(ValidationError::UnboundedNotAllowed { .. })
    ));

    let mut config = short_config(1);
    config.classes.vip.segment_size = Some(1e-15);
    let error = NetworkSimulation::new(config).unwrap_err();
    assert!(matches!(
        error,
        ComponentError::Validation(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn flow_failure_halts_and_surfaces() {
    let mut simulation = NetworkSimulation::new(short_config(2)).unwrap();
    let network = simulation.network().clone();

    // A VIP user without segment parameters cannot be routed.
    let broken = Rc::new(User::new(
        UserId(u64::MAX),
        UserClass::Vip,
        ClassParams {
            mean_file_size: 10.0,
            mean_transfer_speed: 1.0,
            segment: None,
        },
    ));
    simulation.simulation().spawn(network.clone().flow(broken));

    let error = simulation.run().unwrap_err();
    assert!(matches!(
        error,
        ComponentError::Simulation(SimError::InvalidState(_))
    ));
    assert!(simulation.simulation().time() < SimTime::from_secs(120));
}

#[test]
fn report_serializes_to_json() {
    let mut simulation = NetworkSimulation::new(short_config(4)).unwrap();
    let report = simulation.run().unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["horizon"], 120.0);
    assert_eq!(json["stations"].as_array().unwrap().len(), 7);
    assert_eq!(json["classes"][2]["class"], "vip");
    assert!(json["network"]["occupancy"][0]["time"].is_number());
}
