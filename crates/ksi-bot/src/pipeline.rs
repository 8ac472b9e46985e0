//! The route risk pipeline: routing -> sampling -> weather -> frames ->
//! scoring -> report.
//!
//! Failure handling follows three tiers. A routing failure aborts the run
//! (there is nothing to score). A weather failure degrades it: the run
//! completes with every route marked unavailable. A decode or scoring
//! failure is confined to its own route.

use std::sync::Arc;

use ksi_core::{
    sample_keys, score_routes, FeatureSchema, RiskModel, RiskReport, RouteCandidate,
    UpstreamError, WeatherSnapshot,
};
use ksi_upstream::RouteLeg;

/// Routing collaborator seam, mockable in tests.
pub trait RouteSource: Send + Sync {
    fn get_routes(
        &self,
        origin: &str,
        destination: &str,
        max_routes: usize,
    ) -> impl std::future::Future<Output = Result<Vec<RouteLeg>, UpstreamError>> + Send;
}

/// Weather collaborator seam.
pub trait WeatherSource: Send + Sync {
    fn fetch_current_snapshot(
        &self,
    ) -> impl std::future::Future<Output = Result<WeatherSnapshot, UpstreamError>> + Send;
}

impl RouteSource for ksi_upstream::DirectionsClient {
    async fn get_routes(
        &self,
        origin: &str,
        destination: &str,
        max_routes: usize,
    ) -> Result<Vec<RouteLeg>, UpstreamError> {
        ksi_upstream::DirectionsClient::get_routes(self, origin, destination, max_routes).await
    }
}

impl WeatherSource for ksi_upstream::WeatherClient {
    async fn fetch_current_snapshot(&self) -> Result<WeatherSnapshot, UpstreamError> {
        ksi_upstream::WeatherClient::fetch_current_snapshot(self).await
    }
}

impl<T: RouteSource> RouteSource for Arc<T> {
    async fn get_routes(
        &self,
        origin: &str,
        destination: &str,
        max_routes: usize,
    ) -> Result<Vec<RouteLeg>, UpstreamError> {
        (**self).get_routes(origin, destination, max_routes).await
    }
}

impl<T: WeatherSource> WeatherSource for Arc<T> {
    async fn fetch_current_snapshot(&self) -> Result<WeatherSnapshot, UpstreamError> {
        (**self).fetch_current_snapshot().await
    }
}

/// One pipeline instance per process; the model and schema are loaded once
/// and shared read-only across sessions.
pub struct Pipeline<R, W> {
    routes: R,
    weather: W,
    model: Arc<dyn RiskModel>,
    schema: Arc<FeatureSchema>,
    max_routes: usize,
    sample_stride: usize,
    geohash_precision: usize,
}

impl<R: RouteSource, W: WeatherSource> Pipeline<R, W> {
    pub fn new(
        routes: R,
        weather: W,
        model: Arc<dyn RiskModel>,
        schema: Arc<FeatureSchema>,
        max_routes: usize,
        sample_stride: usize,
        geohash_precision: usize,
    ) -> Self {
        Self {
            routes,
            weather,
            model,
            schema,
            max_routes,
            sample_stride,
            geohash_precision,
        }
    }

    /// Run the full pipeline for one origin/destination pair.
    ///
    /// Errors only on routing failure; everything downstream degrades.
    pub async fn run(&self, origin: &str, destination: &str) -> Result<RiskReport, UpstreamError> {
        let legs = self
            .routes
            .get_routes(origin, destination, self.max_routes)
            .await?;
        tracing::info!("{} route(s) for {origin} -> {destination}", legs.len());

        let candidates: Vec<RouteCandidate> = legs
            .into_iter()
            .enumerate()
            .map(|(i, leg)| self.to_candidate(i, leg))
            .collect();

        // Fetched exactly once, before any frame is built.
        let snapshot = match self.weather.fetch_current_snapshot().await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!("weather unavailable, routes will not be scored: {err}");
                None
            }
        };

        let routes = score_routes(
            self.model.as_ref(),
            candidates,
            snapshot.as_ref(),
            &self.schema,
        );

        Ok(RiskReport {
            weather: snapshot,
            routes,
            city_average: self.model.city_average(),
        })
    }

    /// Decode and sample one route. A malformed geometry downgrades to an
    /// empty sample set (the route stays listed, scored as unavailable).
    fn to_candidate(&self, index: usize, leg: RouteLeg) -> RouteCandidate {
        let keys = match ksi_core::decode_polyline(&leg.geometry) {
            Ok(points) => sample_keys(&points, self.sample_stride, self.geohash_precision),
            Err(err) => {
                tracing::warn!("route {} geometry not decodable: {err}", index + 1);
                Default::default()
            }
        };
        RouteCandidate {
            distance_km: leg.distance_km,
            duration_label: leg.duration_label,
            geometry: leg.geometry,
            sample_keys: keys,
        }
    }
}
