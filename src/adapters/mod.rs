//! Concrete adapter implementations for ports.

pub mod chart_svg;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_cache;
pub mod marketstack_adapter;
pub mod provider;
pub mod series_csv;
