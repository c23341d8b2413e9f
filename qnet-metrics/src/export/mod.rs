//! Export of reports and recorded series
//!
//! JSON for whole reports (anything `Serialize`), CSV for individual series
//! and visit logs so they can be loaded into spreadsheets or pandas.

pub mod csv;
pub mod json;

use crate::error::MetricsError;
use serde::Serialize;
use std::path::Path;

/// Export any serializable value to a JSON file
///
/// # Example
/// ```no_run
/// use qnet_metrics::export::export_json;
/// use qnet_metrics::TimeSeries;
///
/// let series = TimeSeries::new();
/// export_json(&series, "results/series.json", true).unwrap();
/// ```
pub fn export_json<T: Serialize + ?Sized>(
    value: &T,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), MetricsError> {
    json::JsonExporter::new(path.as_ref(), pretty).export(value)
}
