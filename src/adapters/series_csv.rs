//! Gross value series as CSV: a `date` column plus one column per run.

use crate::domain::error::EodError;
use crate::ports::report_port::{NamedSeries, ReportPort};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub struct CsvSeriesAdapter;

impl CsvSeriesAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvSeriesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvSeriesAdapter {
    fn write(&self, series: &[NamedSeries], output_path: &Path) -> Result<(), EodError> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(output_path).map_err(csv_error)?;

        let mut header = vec!["date".to_string()];
        header.extend(series.iter().map(|s| s.name.clone()));
        wtr.write_record(&header).map_err(csv_error)?;

        let columns: Vec<BTreeMap<NaiveDate, f64>> = series
            .iter()
            .map(|s| s.points.iter().map(|p| (p.date, p.equity)).collect())
            .collect();
        let dates: BTreeSet<NaiveDate> = columns.iter().flat_map(|c| c.keys().copied()).collect();

        for date in dates {
            let mut row = vec![date.to_string()];
            // Empty cell where a run has no value on this date.
            row.extend(
                columns
                    .iter()
                    .map(|c| c.get(&date).map(|v| format!("{v:.2}")).unwrap_or_default()),
            );
            wtr.write_record(&row).map_err(csv_error)?;
        }

        wtr.flush()?;
        tracing::info!(path = %output_path.display(), "series written");
        Ok(())
    }
}

fn csv_error(err: csv::Error) -> EodError {
    EodError::Io(std::io::Error::other(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::EquityPoint;
    use tempfile::tempdir;

    fn point(day: u32, equity: f64) -> EquityPoint {
        EquityPoint {
            date: NaiveDate::from_ymd_opt(2022, 3, day).unwrap(),
            equity,
        }
    }

    #[test]
    fn writes_one_column_per_series() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.csv");
        let series = vec![
            NamedSeries {
                name: "A".into(),
                points: vec![point(1, 100.0), point(2, 101.5)],
            },
            NamedSeries {
                name: "B".into(),
                points: vec![point(2, 99.0), point(3, 98.25)],
            },
        ];
        CsvSeriesAdapter::new().write(&series, &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "date,A,B",
                "2022-03-01,100.00,",
                "2022-03-02,101.50,99.00",
                "2022-03-03,,98.25",
            ]
        );
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/nested/series.csv");
        CsvSeriesAdapter::new().write(&[], &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "date");
    }
}
