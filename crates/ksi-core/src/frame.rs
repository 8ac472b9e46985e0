//! Feature frames: the tabular input the scoring artifact consumes.
//!
//! One frame per route, one row per sample cell. Every row carries the same
//! weather snapshot broadcast across the route plus the decoded center of the
//! cell. Column order is dictated by an external schema file (the same file
//! the model was trained against), never hardcoded here.

use std::path::Path;

use crate::error::ModelLoadError;
use crate::models::{RouteCandidate, WeatherSnapshot};

/// A column the schema file may name. The string forms are the training
/// dataset's column headers, so casing is inconsistent on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureColumn {
    Month,
    Day,
    TempC,
    DewpointC,
    Humidity,
    WindKph,
    VisKm,
    PressureMb,
    Hour,
    Latitude,
    Longitude,
}

impl FeatureColumn {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Month" => Self::Month,
            "Day" => Self::Day,
            "temp_c" => Self::TempC,
            "dewpoint_c" => Self::DewpointC,
            "humidity" => Self::Humidity,
            "wind_kph" => Self::WindKph,
            "vis_km" => Self::VisKm,
            "pressure_mb" => Self::PressureMb,
            "Hour" => Self::Hour,
            "Latitude" => Self::Latitude,
            "Longitude" => Self::Longitude,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Month => "Month",
            Self::Day => "Day",
            Self::TempC => "temp_c",
            Self::DewpointC => "dewpoint_c",
            Self::Humidity => "humidity",
            Self::WindKph => "wind_kph",
            Self::VisKm => "vis_km",
            Self::PressureMb => "pressure_mb",
            Self::Hour => "Hour",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
        }
    }

    fn value(self, snapshot: &WeatherSnapshot, lat: f64, lon: f64) -> f64 {
        match self {
            Self::Month => snapshot.month as f64,
            Self::Day => snapshot.day as f64,
            Self::TempC => snapshot.temp_c,
            Self::DewpointC => snapshot.dewpoint_c,
            Self::Humidity => snapshot.humidity,
            Self::WindKph => snapshot.wind_kph,
            Self::VisKm => snapshot.vis_km,
            Self::PressureMb => snapshot.pressure_mb,
            Self::Hour => snapshot.hour as f64,
            Self::Latitude => lat,
            Self::Longitude => lon,
        }
    }
}

/// Ordered column schema, loaded from a JSON array of column names.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    /// Load the schema file the model was trained with. An unrecognized
    /// column name is a startup error, not a scoring-time one.
    pub fn from_file(path: &Path) -> Result<Self, ModelLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let names: Vec<String> =
            serde_json::from_str(&text).map_err(|source| ModelLoadError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_names(&names)
    }

    pub fn from_names(names: &[String]) -> Result<Self, ModelLoadError> {
        let columns = names
            .iter()
            .map(|name| {
                FeatureColumn::from_name(name)
                    .ok_or_else(|| ModelLoadError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Tabular scoring input: row-major values in schema column order.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub rows: Vec<Vec<f64>>,
    pub width: usize,
}

impl FeatureFrame {
    pub fn empty(schema: &FeatureSchema) -> Self {
        Self {
            rows: Vec::new(),
            width: schema.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cross-join the snapshot with a route's sample cells.
///
/// An absent snapshot or an empty key set is an expected outcome, not an
/// error: it yields a zero-row frame and the route is later reported as
/// "not available".
pub fn build_frame(
    route: &RouteCandidate,
    snapshot: Option<&WeatherSnapshot>,
    schema: &FeatureSchema,
) -> FeatureFrame {
    let Some(snapshot) = snapshot else {
        return FeatureFrame::empty(schema);
    };

    let rows = route
        .sample_keys
        .iter()
        .map(|key| {
            let (lat, lon) = key.decode();
            schema
                .columns()
                .iter()
                .map(|column| column.value(snapshot, lat, lon))
                .collect()
        })
        .collect();

    FeatureFrame {
        rows,
        width: schema.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::SpatialKey;
    use std::collections::BTreeSet;

    fn test_schema() -> FeatureSchema {
        let names: Vec<String> = [
            "Month",
            "Day",
            "temp_c",
            "dewpoint_c",
            "humidity",
            "wind_kph",
            "vis_km",
            "pressure_mb",
            "Hour",
            "Latitude",
            "Longitude",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        FeatureSchema::from_names(&names).unwrap()
    }

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            temp_c: -3.5,
            dewpoint_c: -7.0,
            humidity: 77.0,
            wind_kph: 24.0,
            vis_km: 9.7,
            pressure_mb: 1016.0,
            month: 1,
            day: 14,
            hour: 18,
        }
    }

    fn route_with_keys(keys: &[(f64, f64)]) -> RouteCandidate {
        RouteCandidate {
            distance_km: 12.4,
            duration_label: "18 mins".to_string(),
            geometry: String::new(),
            sample_keys: keys
                .iter()
                .map(|&(lat, lon)| SpatialKey::encode(lat, lon, 5))
                .collect(),
        }
    }

    #[test]
    fn one_row_per_key_in_schema_order() {
        let schema = test_schema();
        let route = route_with_keys(&[(43.65, -79.38), (43.70, -79.40), (43.75, -79.30)]);
        let frame = build_frame(&route, Some(&snapshot()), &schema);

        assert_eq!(frame.rows.len(), route.sample_keys.len());
        for row in &frame.rows {
            assert_eq!(row.len(), schema.len());
            // Broadcast weather columns are identical across rows.
            assert_eq!(row[0], 1.0); // Month
            assert_eq!(row[2], -3.5); // temp_c
            assert_eq!(row[8], 18.0); // Hour
            // Position columns come from the cell, not the snapshot.
            assert!(row[9] > 43.0 && row[9] < 44.0);
            assert!(row[10] < -79.0 && row[10] > -80.0);
        }
    }

    #[test]
    fn absent_snapshot_yields_empty_frame() {
        let schema = test_schema();
        let route = route_with_keys(&[(43.65, -79.38)]);
        let frame = build_frame(&route, None, &schema);
        assert!(frame.is_empty());
        assert_eq!(frame.width, schema.len());
    }

    #[test]
    fn no_keys_yields_empty_frame() {
        let schema = test_schema();
        let route = RouteCandidate {
            distance_km: 1.0,
            duration_label: "2 mins".to_string(),
            geometry: String::new(),
            sample_keys: BTreeSet::new(),
        };
        let frame = build_frame(&route, Some(&snapshot()), &schema);
        assert!(frame.is_empty());
    }

    #[test]
    fn unknown_column_is_rejected_at_load() {
        let names = vec!["Month".to_string(), "weekday".to_string()];
        assert!(matches!(
            FeatureSchema::from_names(&names),
            Err(ModelLoadError::UnknownColumn(_))
        ));
    }
}
