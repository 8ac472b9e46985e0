//! Final report assembly: weather header plus one line per route.
//!
//! Route order is preserved from the routing collaborator (assumed
//! best-first). A route that could not be scored is listed explicitly as
//! "not available", never dropped.

use std::fmt::Write as _;

use crate::models::{RouteScore, WeatherSnapshot};

/// Structured result of one pipeline run, ready for delivery.
#[derive(Debug)]
pub struct RiskReport {
    pub weather: Option<WeatherSnapshot>,
    pub routes: Vec<RouteScore>,
    /// City-wide baseline from the scoring artifact.
    pub city_average: f64,
}

impl RiskReport {
    /// Render the report as the delivery caption/text.
    pub fn render(&self) -> String {
        let mut out = String::new();

        match &self.weather {
            Some(w) => {
                let _ = writeln!(
                    out,
                    "Current Weather: Temperature {} °C, Humidity {} %, Wind {} kph, \
                     Dewpoint {} °C, Visibility {} km, Pressure {} mBar",
                    w.temp_c, w.humidity, w.wind_kph, w.dewpoint_c, w.vis_km, w.pressure_mb
                );
            }
            None => {
                let _ = writeln!(out, "Current Weather: unavailable");
            }
        }

        for (i, scored) in self.routes.iter().enumerate() {
            let _ = write!(
                out,
                "Route {}: {} km, {}",
                i + 1,
                scored.route.distance_km,
                scored.route.duration_label
            );
            match scored.score {
                Some(score) => {
                    let _ = writeln!(
                        out,
                        " — risk {:.2}% ({})",
                        score * 100.0,
                        compare_to_baseline(score, self.city_average)
                    );
                }
                None => {
                    let _ = writeln!(out, " — risk not available");
                }
            }
        }

        out.trim_end().to_string()
    }
}

/// Express a score as a signed percentage deviation from the city baseline.
fn compare_to_baseline(score: f64, city_average: f64) -> String {
    if city_average <= 0.0 {
        return "no city baseline".to_string();
    }
    let diff = ((score - city_average) / city_average * 100.0).round() as i64;
    if diff > 0 {
        format!("higher than city average by {diff}%")
    } else if diff < 0 {
        format!("lower than city average by {}%", -diff)
    } else {
        "equal to the city average".to_string()
    }
}
