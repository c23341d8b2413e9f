//! Configuration loaded from JSON drives the same run as the in-code default.

use qnet::prelude::*;

const SCENARIO: &str = r#"{
    "horizon": 90.0,
    "mean_interarrival": 0.5,
    "seed": 21,
    "classes": {
        "standard": { "weight": 0.6, "mean_file_size": 8.0, "mean_transfer_speed": 4.0 },
        "premium": { "weight": 0.2, "mean_file_size": 8.0, "mean_transfer_speed": 8.0 },
        "vip": {
            "weight": 0.2, "mean_file_size": 20.0, "mean_transfer_speed": 10.0,
            "segment_size": 5.0, "pace": 1.5, "credit_cap": 0.5
        }
    },
    "stations": {
        "input": { "service_time": 0.2 },
        "pipeline": { "channels": 2, "service_time": 0.1 },
        "inter_stage": { "service_time": 0.05 },
        "transfer": { "channels": 3 },
        "segmented_transfer": { "channels": 2 },
        "output": { "service_time": 0.1 },
        "pacing": { "channels": 16 }
    }
}"#;

#[test]
fn json_scenario_runs_to_horizon() {
    let config: NetworkConfig = serde_json::from_str(SCENARIO).unwrap();
    assert_eq!(config.file_size_std_dev, 1.0);

    let report = NetworkSimulation::new(config).unwrap().run().unwrap();
    assert_eq!(report.horizon, 90.0);
    assert!(report.final_time <= 90.0);
    assert!(report.network.entrances > 0);
    assert_eq!(
        report.network.entrances,
        report.network.exits + report.network.in_flight
    );
}

#[test]
fn config_survives_a_json_round_trip() {
    let config = NetworkConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back: NetworkConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, back);

    let first = NetworkSimulation::new(config).unwrap().run().unwrap();
    let second = NetworkSimulation::new(back).unwrap().run().unwrap();
    assert_eq!(first, second);
}
