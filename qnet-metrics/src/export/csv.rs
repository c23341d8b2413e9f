//! CSV export for time series and visit logs

use crate::error::MetricsError;
use crate::station::VisitSample;
use crate::time_series::TimeSeries;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a series as `time,value` rows, time in seconds.
pub fn write_series_csv(series: &TimeSeries, path: impl AsRef<Path>) -> Result<(), MetricsError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_series(&mut writer, series)?;
    writer.flush()?;
    Ok(())
}

pub fn write_series<W: Write>(mut writer: W, series: &TimeSeries) -> Result<(), MetricsError> {
    writeln!(writer, "time,value")?;
    for point in series.points() {
        writeln!(writer, "{},{}", point.timestamp.as_secs_f64(), point.value)?;
    }
    Ok(())
}

/// Write completed visits of one station, one row per visit.
pub fn write_visits_csv(
    station: &str,
    visits: &[VisitSample],
    path: impl AsRef<Path>,
) -> Result<(), MetricsError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_visits(&mut writer, station, visits)?;
    writer.flush()?;
    Ok(())
}

pub fn write_visits<W: Write>(
    mut writer: W,
    station: &str,
    visits: &[VisitSample],
) -> Result<(), MetricsError> {
    writeln!(writer, "station,user,class,enter,start,end,wait,service,sojourn")?;
    let station = escape_csv(station);
    for visit in visits {
        let d = visit.durations();
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{}",
            station,
            visit.user,
            escape_csv(visit.class),
            visit.enter.as_secs_f64(),
            visit.start.as_secs_f64(),
            visit.end.as_secs_f64(),
            d.wait.as_secs_f64(),
            d.service.as_secs_f64(),
            d.sojourn.as_secs_f64(),
        )?;
    }
    Ok(())
}

/// Escape CSV field (add quotes if needed)
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnet_core::SimTime;

    #[test]
    fn test_series_rows() {
        let mut series = TimeSeries::new();
        series.push(SimTime::zero(), 0);
        series.push(SimTime::from_millis(2500), 4);

        let mut buffer = Vec::new();
        write_series(&mut buffer, &series).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "time,value\n0,0\n2.5,4\n");
    }

    #[test]
    fn test_visit_rows() {
        let visits = [VisitSample {
            user: 7,
            class: "vip",
            enter: SimTime::from_secs(1),
            start: SimTime::from_secs(2),
            end: SimTime::from_secs(4),
        }];
        let mut buffer = Vec::new();
        write_visits(&mut buffer, "pacing, main", &visits).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row, "\"pacing, main\",7,vip,1,2,4,1,2,3");
    }

    #[test]
    fn test_series_csv_file() {
        let temp_file = std::env::temp_dir().join("qnet_test_series.csv");
        write_series_csv(&TimeSeries::new(), &temp_file).unwrap();
        assert_eq!(std::fs::read_to_string(&temp_file).unwrap(), "time,value\n");
        std::fs::remove_file(&temp_file).ok();
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
    }
}
