//! Network configuration and validation.
//!
//! [`NetworkConfig`] is the serde-facing shape: plain `f64` seconds and
//! optional channel counts. [`NetworkConfig::validate`] checks every field
//! and converts it into [`NetworkParams`], which carries typed instants,
//! durations and capacities. Nothing runs until validation has passed.

use std::time::Duration;

use qnet_core::{duration_from_secs_f64, Capacity, SimTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ValidationError, ValidationResult};
use crate::routing::Hop;
use crate::user::{ClassParams, SegmentParams, UserClass, MAX_SEGMENTS};

/// Tolerance on the sum of class weights.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

fn default_file_size_std_dev() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Simulated time to run, in seconds.
    pub horizon: f64,
    /// Mean time between arrivals, in seconds.
    pub mean_interarrival: f64,
    #[serde(default)]
    pub seed: u64,
    /// Spread of the normal draw file sizes are folded from.
    #[serde(default = "default_file_size_std_dev")]
    pub file_size_std_dev: f64,
    pub classes: ClassesConfig,
    pub stations: StationsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassesConfig {
    pub standard: ClassConfig,
    pub premium: ClassConfig,
    pub vip: ClassConfig,
}

impl ClassesConfig {
    pub fn get(&self, class: UserClass) -> &ClassConfig {
        match class {
            UserClass::Standard => &self.standard,
            UserClass::Premium => &self.premium,
            UserClass::Vip => &self.vip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    pub weight: f64,
    pub mean_file_size: f64,
    pub mean_transfer_speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_cap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationsConfig {
    pub input: StationConfig,
    pub pipeline: StationConfig,
    pub inter_stage: StationConfig,
    pub transfer: StationConfig,
    pub segmented_transfer: StationConfig,
    pub output: StationConfig,
    pub pacing: StationConfig,
}

impl StationsConfig {
    pub fn get(&self, hop: Hop) -> &StationConfig {
        match hop {
            Hop::Input => &self.input,
            Hop::Pipeline => &self.pipeline,
            Hop::InterStage => &self.inter_stage,
            Hop::Transfer => &self.transfer,
            Hop::SegmentedTransfer => &self.segmented_transfer,
            Hop::Output => &self.output,
            Hop::Pacing => &self.pacing,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_time: Option<f64>,
}

impl StationConfig {
    pub fn bounded(channels: usize) -> Self {
        Self {
            channels: Some(channels),
            service_time: None,
        }
    }

    pub fn with_service_time(mut self, seconds: f64) -> Self {
        self.service_time = Some(seconds);
        self
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            horizon: 600.0,
            mean_interarrival: 1.0,
            seed: 0,
            file_size_std_dev: default_file_size_std_dev(),
            classes: ClassesConfig {
                standard: ClassConfig {
                    weight: 0.5,
                    mean_file_size: 10.0,
                    mean_transfer_speed: 4.0,
                    segment_size: None,
                    pace: None,
                    credit_cap: None,
                },
                premium: ClassConfig {
                    weight: 0.3,
                    mean_file_size: 10.0,
                    mean_transfer_speed: 8.0,
                    segment_size: None,
                    pace: None,
                    credit_cap: None,
                },
                vip: ClassConfig {
                    weight: 0.2,
                    mean_file_size: 40.0,
                    mean_transfer_speed: 10.0,
                    segment_size: Some(4.0),
                    pace: Some(2.0),
                    credit_cap: Some(1.0),
                },
            },
            stations: StationsConfig {
                input: StationConfig::default().with_service_time(0.5),
                pipeline: StationConfig::bounded(4).with_service_time(0.2),
                inter_stage: StationConfig::default().with_service_time(0.1),
                transfer: StationConfig::bounded(4),
                segmented_transfer: StationConfig::bounded(2),
                output: StationConfig::default().with_service_time(0.2),
                pacing: StationConfig::bounded(32),
            },
        }
    }
}

/// Capacity and, for fixed-duration stations, the service time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationParams {
    pub capacity: Capacity,
    pub service_time: Option<Duration>,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkParams {
    pub horizon: SimTime,
    /// Seconds; feeds the Poisson arrival process.
    pub mean_interarrival: f64,
    pub seed: u64,
    pub file_size_std_dev: f64,
    pub weights: [(UserClass, f64); 3],
    pub standard: ClassParams,
    pub premium: ClassParams,
    pub vip: ClassParams,
    pub input: StationParams,
    pub pipeline: StationParams,
    pub inter_stage: StationParams,
    pub transfer: StationParams,
    pub segmented_transfer: StationParams,
    pub output: StationParams,
    pub pacing: StationParams,
}

impl NetworkParams {
    pub fn class(&self, class: UserClass) -> &ClassParams {
        match class {
            UserClass::Standard => &self.standard,
            UserClass::Premium => &self.premium,
            UserClass::Vip => &self.vip,
        }
    }

    pub fn station(&self, hop: Hop) -> &StationParams {
        match hop {
            Hop::Input => &self.input,
            Hop::Pipeline => &self.pipeline,
            Hop::InterStage => &self.inter_stage,
            Hop::Transfer => &self.transfer,
            Hop::SegmentedTransfer => &self.segmented_transfer,
            Hop::Output => &self.output,
            Hop::Pacing => &self.pacing,
        }
    }
}

/// How a station derives its service time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StationKind {
    /// Fixed service time; unbounded allowed.
    Delay,
    /// Fixed service time; bounded only.
    Pipeline,
    /// Service time computed per visit; bounded only.
    Computed,
}

impl StationKind {
    fn of(hop: Hop) -> Self {
        match hop {
            Hop::Input | Hop::InterStage | Hop::Output => StationKind::Delay,
            Hop::Pipeline => StationKind::Pipeline,
            Hop::Transfer | Hop::SegmentedTransfer | Hop::Pacing => StationKind::Computed,
        }
    }
}

impl NetworkConfig {
    /// Check the configuration and convert it to typed parameters.
    ///
    /// # Errors
    ///
    /// The first [`ValidationError`] found, in field order.
    pub fn validate(&self) -> ValidationResult<NetworkParams> {
        let horizon = SimTime::from_secs_f64(positive("horizon", self.horizon)?)
            .map_err(|e| ValidationError::invalid("horizon", e.to_string()))?;
        let mean_interarrival = positive("mean_interarrival", self.mean_interarrival)?;
        let file_size_std_dev = non_negative("file_size_std_dev", self.file_size_std_dev)?;

        let mut weights = [(UserClass::Standard, 0.0); 3];
        for (slot, class) in weights.iter_mut().zip(UserClass::ALL) {
            let field = format!("classes.{}.weight", class.label());
            *slot = (class, non_negative(&field, self.classes.get(class).weight)?);
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ValidationError::WeightsDoNotSumToOne { sum });
        }

        Ok(NetworkParams {
            horizon,
            mean_interarrival,
            seed: self.seed,
            file_size_std_dev,
            weights,
            standard: validate_class(UserClass::Standard, &self.classes.standard)?,
            premium: validate_class(UserClass::Premium, &self.classes.premium)?,
            vip: validate_class(UserClass::Vip, &self.classes.vip)?,
            input: validate_station(Hop::Input, &self.stations.input)?,
            pipeline: validate_station(Hop::Pipeline, &self.stations.pipeline)?,
            inter_stage: validate_station(Hop::InterStage, &self.stations.inter_stage)?,
            transfer: validate_station(Hop::Transfer, &self.stations.transfer)?,
            segmented_transfer: validate_station(
                Hop::SegmentedTransfer,
                &self.stations.segmented_transfer,
            )?,
            output: validate_station(Hop::Output, &self.stations.output)?,
            pacing: validate_station(Hop::Pacing, &self.stations.pacing)?,
        })
    }
}

fn validate_class(class: UserClass, config: &ClassConfig) -> ValidationResult<ClassParams> {
    let prefix = format!("classes.{}", class.label());
    let mean_file_size = positive(&format!("{prefix}.mean_file_size"), config.mean_file_size)?;
    let mean_transfer_speed = positive(
        &format!("{prefix}.mean_transfer_speed"),
        config.mean_transfer_speed,
    )?;

    let segment = if class.is_segmented() {
        let required = |name: &str, value: Option<f64>| {
            value.ok_or_else(|| ValidationError::missing(format!("{prefix}.{name}")))
        };
        let segment_size = positive(
            &format!("{prefix}.segment_size"),
            required("segment_size", config.segment_size)?,
        )?;
        if mean_file_size / segment_size > MAX_SEGMENTS as f64 {
            return Err(ValidationError::invalid(
                format!("{prefix}.segment_size"),
                format!(
                    "splits a mean file of {mean_file_size} into more than {MAX_SEGMENTS} segments"
                ),
            ));
        }
        let pace = seconds(&format!("{prefix}.pace"), required("pace", config.pace)?, true)?;
        let credit_cap = seconds(
            &format!("{prefix}.credit_cap"),
            required("credit_cap", config.credit_cap)?,
            false,
        )?;
        if credit_cap > pace {
            warn!(
                class = class.label(),
                ?pace,
                ?credit_cap,
                "Credit cap exceeds pace; pacing waits will be floored at zero"
            );
        }
        Some(SegmentParams {
            segment_size,
            pace,
            credit_cap,
        })
    } else {
        None
    };

    Ok(ClassParams {
        mean_file_size,
        mean_transfer_speed,
        segment,
    })
}

fn validate_station(hop: Hop, config: &StationConfig) -> ValidationResult<StationParams> {
    let prefix = format!("stations.{}", hop.label());
    let kind = StationKind::of(hop);

    let capacity = match config.channels {
        Some(0) => {
            return Err(ValidationError::invalid(
                format!("{prefix}.channels"),
                "must be at least 1",
            ))
        }
        None if kind != StationKind::Delay => {
            return Err(ValidationError::UnboundedNotAllowed {
                station: hop.label().to_string(),
            })
        }
        channels => Capacity::from_channels(channels)
            .map_err(|e| ValidationError::invalid(format!("{prefix}.channels"), e.to_string()))?,
    };

    let service_time = match (kind, config.service_time) {
        (StationKind::Computed, _) => None,
        (_, Some(secs)) => Some(seconds(&format!("{prefix}.service_time"), secs, true)?),
        (_, None) => return Err(ValidationError::missing(format!("{prefix}.service_time"))),
    };

    Ok(StationParams {
        capacity,
        service_time,
    })
}

fn positive(field: &str, value: f64) -> ValidationResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::invalid(
            field,
            format!("must be a positive finite number, got {value}"),
        ))
    }
}

fn non_negative(field: &str, value: f64) -> ValidationResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::invalid(
            field,
            format!("must be a non-negative finite number, got {value}"),
        ))
    }
}

fn seconds(field: &str, value: f64, strictly_positive: bool) -> ValidationResult<Duration> {
    let value = if strictly_positive {
        positive(field, value)?
    } else {
        non_negative(field, value)?
    };
    duration_from_secs_f64(value).map_err(|e| ValidationError::invalid(field, e.to_string()))
}
