//! Bot configuration from environment.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub gmaps_api_key: String,
    pub weather_api_key: String,
    pub secret: String,
    pub max_routes: usize,
    pub sample_stride: usize,
    pub geohash_precision: usize,
    pub max_auth_tries: u32,
    pub model_path: String,
    pub columns_path: String,
    pub weather_location: String,
    pub gmaps_base_url: String,
    pub weather_base_url: String,
    pub telegram_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN env var not set")?,
            gmaps_api_key: env::var("GMAPS_API_KEY").context("GMAPS_API_KEY env var not set")?,
            weather_api_key: env::var("WEATHER_API_KEY")
                .context("WEATHER_API_KEY env var not set")?,
            secret: env::var("KSI_SECRET").context("KSI_SECRET env var not set")?,
            max_routes: parse_or("KSI_MAX_ROUTES", 3),
            sample_stride: parse_or("KSI_SAMPLE_STRIDE", ksi_core::spatial::DEFAULT_STRIDE),
            geohash_precision: parse_or(
                "KSI_GEOHASH_PRECISION",
                ksi_core::spatial::DEFAULT_PRECISION,
            ),
            max_auth_tries: parse_or("KSI_MAX_AUTH_TRIES", 5),
            model_path: env::var("KSI_MODEL_PATH")
                .unwrap_or_else(|_| "model/model.json".to_string()),
            columns_path: env::var("KSI_COLUMNS_PATH")
                .unwrap_or_else(|_| "model/columns.json".to_string()),
            weather_location: env::var("KSI_WEATHER_LOCATION")
                .unwrap_or_else(|_| "Toronto".to_string()),
            gmaps_base_url: env::var("GMAPS_BASE_URL")
                .unwrap_or_else(|_| "https://maps.googleapis.com".to_string()),
            weather_base_url: env::var("WEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.weatherapi.com".to_string()),
            telegram_base_url: env::var("TELEGRAM_BASE_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
