//! JSON export

use crate::error::MetricsError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct JsonExporter {
    path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `pretty` - Whether to pretty-print the JSON
    pub fn new(path: &Path, pretty: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            pretty,
        }
    }

    pub fn export<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), MetricsError> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, value)?;
        writer.flush()?;
        debug!(path = %self.path.display(), "JSON export written");
        Ok(())
    }

    /// Serialize into an arbitrary writer.
    pub fn write_to<W: Write, T: Serialize + ?Sized>(
        &self,
        writer: W,
        value: &T,
    ) -> Result<(), MetricsError> {
        if self.pretty {
            serde_json::to_writer_pretty(writer, value)?;
        } else {
            serde_json::to_writer(writer, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeSeries;
    use qnet_core::SimTime;

    #[test]
    fn test_series_serializes_as_seconds() {
        let mut series = TimeSeries::new();
        series.push(SimTime::from_millis(1500), 3);

        let mut buffer = Vec::new();
        JsonExporter::new(Path::new("unused.json"), false)
            .write_to(&mut buffer, &series)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, r#"[{"time":1.5,"value":3}]"#);
    }

    #[test]
    fn test_json_export_to_file() {
        let temp_file = std::env::temp_dir().join("qnet_test_series.json");
        let series = TimeSeries::new();
        crate::export::export_json(&series, &temp_file, true).unwrap();

        let content = std::fs::read_to_string(&temp_file).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(parsed.as_array().is_some_and(|a| a.is_empty()));

        std::fs::remove_file(&temp_file).ok();
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let path = std::env::temp_dir().join("qnet_no_such_dir").join("out.json");
        let result = crate::export::export_json(&TimeSeries::new(), &path, false);
        assert!(matches!(result, Err(MetricsError::Io(_))));
    }
}
