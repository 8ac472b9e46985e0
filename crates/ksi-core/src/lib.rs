pub mod error;
pub mod frame;
pub mod models;
pub mod report;
pub mod scoring;
pub mod session;
pub mod spatial;

pub use error::{
    DecodeError, InvalidLocationCode, ModelLoadError, ScoringError, UpstreamError,
};
pub use frame::{build_frame, FeatureColumn, FeatureFrame, FeatureSchema};
pub use models::{LocationCode, RouteCandidate, RouteScore, WeatherSnapshot};
pub use report::RiskReport;
pub use scoring::{score_routes, LinearRiskModel, RiskModel};
pub use session::{SessionAction, SessionPolicy, SessionState};
pub use spatial::{decode_polyline, sample_keys, SpatialKey};
