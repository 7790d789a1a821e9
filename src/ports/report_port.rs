//! Report output port trait.

use crate::domain::error::EodError;
use crate::domain::evaluation::EquityPoint;
use std::path::Path;

/// Gross value series of one strategy run, labelled for output.
#[derive(Debug, Clone)]
pub struct NamedSeries {
    pub name: String,
    pub points: Vec<EquityPoint>,
}

/// Port for writing the gross value series of one or more runs.
pub trait ReportPort {
    fn write(&self, series: &[NamedSeries], output_path: &Path) -> Result<(), EodError>;
}
