//! Core data models for the risk pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::InvalidLocationCode;
use crate::spatial::SpatialKey;

/// Single current-hour weather observation, shared by every route in a run.
///
/// Field names follow the upstream weather payload; month/day/hour are
/// derived from the observation timestamp, not from the request clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temp_c: f64,
    pub dewpoint_c: f64,
    pub humidity: f64,
    pub wind_kph: f64,
    pub vis_km: f64,
    pub pressure_mb: f64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

/// One route option returned by the routing collaborator, reduced to the
/// fields the pipeline needs. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub distance_km: f64,
    pub duration_label: String,
    /// Encoded overview polyline, kept opaque for map rendering.
    pub geometry: String,
    /// Deduplicated, lexicographically sorted sample cells.
    pub sample_keys: BTreeSet<SpatialKey>,
}

/// Per-route scoring outcome. `None` means the frame could not be built or
/// the scorer failed for this route; siblings are unaffected.
#[derive(Debug, Clone)]
pub struct RouteScore {
    pub route: RouteCandidate,
    pub score: Option<f64>,
}

/// Validated six-character location code (letter-digit alternating, e.g. "M6S5A2").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationCode(String);

impl LocationCode {
    /// Parse user input. Uppercases before validation, so "m6s5a2" is accepted.
    pub fn parse(input: &str) -> Result<Self, InvalidLocationCode> {
        let code = input.trim().to_ascii_uppercase();
        let ok = code.len() == 6
            && code.chars().enumerate().all(|(i, c)| {
                if i % 2 == 0 {
                    c.is_ascii_uppercase()
                } else {
                    c.is_ascii_digit()
                }
            });
        if ok {
            Ok(Self(code))
        } else {
            Err(InvalidLocationCode(input.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
