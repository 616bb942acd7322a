use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dashboard::AggregateSettings;
use crate::data::geo::CityCoordinates;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "skyfare.json";

/// Startup configuration. Every field is optional in the file.
///
/// ```json
/// {
///   "data_path": "airline_cleaned.csv",
///   "top_routes": 15,
///   "price_histogram_bins": 40,
///   "city_coordinates": { "Delhi": { "lat": 28.7041, "lon": 77.1025 } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub top_routes: usize,
    pub price_histogram_bins: usize,
    pub city_coordinates: CityCoordinates,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let settings = AggregateSettings::default();
        Self {
            data_path: PathBuf::from("airline_cleaned.csv"),
            top_routes: settings.top_routes,
            price_histogram_bins: settings.price_histogram_bins,
            city_coordinates: settings.city_coordinates,
        }
    }
}

impl DashboardConfig {
    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn aggregate_settings(&self) -> AggregateSettings {
        AggregateSettings {
            top_routes: self.top_routes,
            price_histogram_bins: self.price_histogram_bins,
            city_coordinates: self.city_coordinates.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.top_routes, 15);
        assert_eq!(config.city_coordinates.len(), 6);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "data_path": "fares.parquet", "top_routes": 5,
                 "city_coordinates": {{ "Pune": {{ "lat": 18.52, "lon": 73.85 }} }} }}"#
        )
        .unwrap();

        let config = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(config.data_path, PathBuf::from("fares.parquet"));
        assert_eq!(config.top_routes, 5);
        assert_eq!(config.price_histogram_bins, 40);

        let settings = config.aggregate_settings();
        assert!(settings.city_coordinates.lookup("Pune").is_some());
        assert!(settings.city_coordinates.lookup("Delhi").is_none());
    }

    #[test]
    fn unknown_field_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "dataPath": "x.csv" }}"#).unwrap();
        let err = DashboardConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }
}
