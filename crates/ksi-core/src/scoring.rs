//! Risk scoring: artifact loading and per-route isolated evaluation.
//!
//! The artifact is trained and serialized elsewhere; to this crate it is a
//! black box behind [`RiskModel`]: frame in, scalar in [0, 1] out. The
//! concrete [`LinearRiskModel`] is a logistic model whose weights are keyed
//! by the same column names as the feature schema.

use std::path::Path;

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{ModelLoadError, ScoringError};
use crate::frame::{build_frame, FeatureFrame, FeatureSchema};
use crate::models::{RouteCandidate, RouteScore, WeatherSnapshot};

/// A loaded scoring artifact.
///
/// Implementations must be pure and cheap to call concurrently; the artifact
/// is loaded once per process and shared read-only across sessions.
pub trait RiskModel: Send + Sync {
    /// Evaluate one route's frame into a scalar risk in [0, 1].
    fn score_frame(&self, frame: &FeatureFrame) -> Result<f64, ScoringError>;

    /// City-wide baseline the per-route score is compared against.
    fn city_average(&self) -> f64;
}

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    weights: HashMap<String, f64>,
    intercept: f64,
    city_average: f64,
}

/// Logistic risk model: per-row probability, averaged over the route.
#[derive(Debug, Clone)]
pub struct LinearRiskModel {
    /// Aligned with the schema's column order at load time.
    weights: Vec<f64>,
    intercept: f64,
    city_average: f64,
}

impl LinearRiskModel {
    /// Deserialize the artifact and align its weights with the schema.
    ///
    /// Fails fatally at startup: a model that cannot be loaded means no
    /// route can ever be scored.
    pub fn load(path: &Path, schema: &FeatureSchema) -> Result<Self, ModelLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let artifact: ArtifactFile =
            serde_json::from_str(&text).map_err(|source| ModelLoadError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let weights = schema
            .columns()
            .iter()
            .map(|column| {
                artifact
                    .weights
                    .get(column.name())
                    .copied()
                    .ok_or_else(|| ModelLoadError::MissingWeight(column.name().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            weights,
            intercept: artifact.intercept,
            city_average: artifact.city_average,
        })
    }

    /// Build an artifact directly, mainly for tests and fixtures.
    pub fn from_parts(weights: Vec<f64>, intercept: f64, city_average: f64) -> Self {
        Self {
            weights,
            intercept,
            city_average,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RiskModel for LinearRiskModel {
    fn score_frame(&self, frame: &FeatureFrame) -> Result<f64, ScoringError> {
        if frame.is_empty() {
            return Err(ScoringError::EmptyFrame);
        }
        if frame.width != self.weights.len() {
            return Err(ScoringError::ColumnMismatch {
                got: frame.width,
                expected: self.weights.len(),
            });
        }

        let mut total = 0.0;
        for row in &frame.rows {
            let logit: f64 = row
                .iter()
                .zip(&self.weights)
                .map(|(value, weight)| value * weight)
                .sum::<f64>()
                + self.intercept;
            total += sigmoid(logit);
        }

        let score = total / frame.rows.len() as f64;
        if score.is_finite() {
            Ok(score)
        } else {
            Err(ScoringError::NonFinite)
        }
    }

    fn city_average(&self) -> f64 {
        self.city_average
    }
}

/// Score every route independently.
///
/// Each route gets its own frame build and model call; a failure downgrades
/// that one route to `score: None` with a single warning, and the loop moves
/// on. Nothing propagates out of here.
pub fn score_routes<M: RiskModel + ?Sized>(
    model: &M,
    routes: Vec<RouteCandidate>,
    snapshot: Option<&WeatherSnapshot>,
    schema: &FeatureSchema,
) -> Vec<RouteScore> {
    routes
        .into_iter()
        .enumerate()
        .map(|(i, route)| {
            let frame = build_frame(&route, snapshot, schema);
            let score = match model.score_frame(&frame) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!("route {} not scored: {err}", i + 1);
                    None
                }
            };
            RouteScore { route, score }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::SpatialKey;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            temp_c: 2.0,
            dewpoint_c: -1.0,
            humidity: 80.0,
            wind_kph: 15.0,
            vis_km: 10.0,
            pressure_mb: 1012.0,
            month: 11,
            day: 3,
            hour: 8,
        }
    }

    fn schema() -> FeatureSchema {
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

    fn route(keys: &[(f64, f64)]) -> RouteCandidate {
        RouteCandidate {
            distance_km: 10.0,
            duration_label: "15 mins".to_string(),
            geometry: String::new(),
            sample_keys: keys
                .iter()
                .map(|&(lat, lon)| SpatialKey::encode(lat, lon, 5))
                .collect(),
        }
    }

    fn model() -> LinearRiskModel {
        LinearRiskModel::from_parts(vec![0.0; 11], -2.0, 0.05)
    }

    #[test]
    fn score_is_mean_of_row_probabilities() {
        // All-zero weights make every row sigmoid(intercept).
        let m = model();
        let frame = build_frame(
            &route(&[(43.6, -79.4), (43.7, -79.3)]),
            Some(&snapshot()),
            &schema(),
        );
        let score = m.score_frame(&frame).unwrap();
        let expected = 1.0 / (1.0 + 2.0_f64.exp());
        assert!((score - expected).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn empty_frame_is_a_scoring_error() {
        let m = model();
        let frame = FeatureFrame::empty(&schema());
        assert!(matches!(
            m.score_frame(&frame),
            Err(ScoringError::EmptyFrame)
        ));
    }

    #[test]
    fn one_failing_route_does_not_affect_siblings() {
        let m = model();
        let good = route(&[(43.6, -79.4)]);
        let bad = route(&[]); // no sample keys: empty frame, will not score
        let scores = score_routes(&m, vec![good.clone(), bad, good], Some(&snapshot()), &schema());

        assert_eq!(scores.len(), 3);
        assert!(scores[0].score.is_some());
        assert!(scores[1].score.is_none());
        assert!(scores[2].score.is_some());
        assert_eq!(scores[0].score, scores[2].score);
    }

    #[test]
    fn absent_snapshot_scores_every_route_absent() {
        let m = model();
        let routes = vec![route(&[(43.6, -79.4)]), route(&[(43.7, -79.3)])];
        let scores = score_routes(&m, routes, None, &schema());
        assert!(scores.iter().all(|s| s.score.is_none()));
    }

    #[test]
    fn missing_weight_fails_at_load() {
        let schema = schema();
        let dir = std::env::temp_dir().join("ksi-model-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model.json");
        std::fs::write(
            &path,
            r#"{"weights": {"Month": 0.1}, "intercept": -2.0, "city_average": 0.05}"#,
        )
        .unwrap();
        assert!(matches!(
            LinearRiskModel::load(&path, &schema),
            Err(ModelLoadError::MissingWeight(_))
        ));
    }
}
