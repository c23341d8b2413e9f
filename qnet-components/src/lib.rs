//! Content-delivery network model built on the qnet kernel
//!
//! This crate provides the domain pieces of the simulator: user classes and
//! their routes, the station variants, configuration with validation, the
//! flow orchestrator and the end-of-run report.

pub mod config;
pub mod error;
pub mod network;
pub mod report;
pub mod routing;
pub mod station;
pub mod user;

pub use config::{
    ClassConfig, ClassesConfig, NetworkConfig, NetworkParams, StationConfig, StationParams,
    StationsConfig,
};
pub use error::{ComponentError, ValidationError, ValidationResult};
pub use network::{Network, NetworkSimulation};
pub use report::{ClassReport, NetworkReport, NetworkSection, StationReport};
pub use routing::{Hop, SEGMENT_ROUTE, WHOLE_FILE_ROUTE};
pub use station::{
    DelayStation, PipelineStation, SegmentPaceStation, SegmentedTransferStation, ServiceStation,
    Station, TransferStation, Visit,
};
pub use user::{
    split_into_segments, ClassParams, SegmentParams, User, UserClass, UserId, UserIdAllocator,
    VisitRecord, MAX_SEGMENTS,
};
