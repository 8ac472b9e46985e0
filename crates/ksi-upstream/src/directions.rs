//! Directions API client: route alternatives and the static map renderer.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use ksi_core::UpstreamError;

const SERVICE: &str = "directions";
const MAP_COLORS: [&str; 3] = ["0xFF0000FF", "0x00AA00FF", "0x0000FFFF"];

/// One route alternative as the upstream returns it: distance, a duration
/// label, and the encoded overview geometry. Sampling happens downstream.
#[derive(Debug, Clone)]
pub struct RouteLeg {
    pub distance_km: f64,
    pub duration_label: String,
    pub geometry: String,
}

/// HTTP client for a Google-Directions-style routing service.
pub struct DirectionsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    legs: Vec<ApiLeg>,
    overview_polyline: ApiPolyline,
}

#[derive(Debug, Deserialize)]
struct ApiPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    distance: ApiValue,
    duration: ApiText,
}

#[derive(Debug, Deserialize)]
struct ApiValue {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct ApiText {
    text: String,
}

impl DirectionsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Fetch up to `max_routes` alternatives, preserving upstream order
    /// (assumed best-first).
    pub async fn get_routes(
        &self,
        origin: &str,
        destination: &str,
        max_routes: usize,
    ) -> Result<Vec<RouteLeg>, UpstreamError> {
        let url = format!("{}/maps/api/directions/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("origin", origin),
                ("destination", destination),
                ("alternatives", "true"),
                ("units", "metric"),
                ("key", &self.api_key),
            ])
            .send()
            .await
            .map_err(|err| UpstreamError::Request(err.to_string()))?;

        let payload: DirectionsResponse = response
            .json()
            .await
            .map_err(|err| UpstreamError::Request(err.to_string()))?;

        if payload.status != "OK" {
            let status = match payload.error_message {
                Some(message) => format!("{}: {}", payload.status, message),
                None => payload.status,
            };
            return Err(UpstreamError::Status {
                service: SERVICE,
                status,
            });
        }

        payload
            .routes
            .into_iter()
            .take(max_routes)
            .map(|route| {
                let leg = route
                    .legs
                    .into_iter()
                    .next()
                    .ok_or(UpstreamError::MalformedResponse {
                        service: SERVICE,
                        field: "routes[].legs",
                    })?;
                Ok(RouteLeg {
                    distance_km: (leg.distance.value / 1000.0 * 10.0).round() / 10.0,
                    duration_label: leg.duration.text,
                    geometry: route.overview_polyline.points,
                })
            })
            .collect()
    }

    /// Render a static map with start/destination markers and the route
    /// geometries. Best-effort: callers fall back to text on failure.
    pub async fn static_map(
        &self,
        origin: &str,
        destination: &str,
        geometries: &[String],
    ) -> Result<Vec<u8>, UpstreamError> {
        let url = format!("{}/maps/api/staticmap", self.base_url);
        let mut query: Vec<(String, String)> = vec![
            ("size".to_string(), "640x400".to_string()),
            ("markers".to_string(), format!("label:S|{origin}")),
            ("markers".to_string(), format!("label:D|{destination}")),
        ];
        for (geometry, color) in geometries.iter().zip(MAP_COLORS.iter().cycle()) {
            query.push((
                "path".to_string(),
                format!("color:{color}|weight:5|enc:{geometry}"),
            ));
        }
        query.push(("key".to_string(), self.api_key.clone()));

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|err| UpstreamError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                service: "staticmap",
                status: response.status().to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| UpstreamError::Request(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}
