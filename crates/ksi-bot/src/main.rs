//! Route KSI risk bot - scores route alternatives by expected severe-injury risk

mod config;
mod dispatch;
mod pipeline;
mod state;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ksi_core::{FeatureSchema, LinearRiskModel, SessionPolicy};
use ksi_upstream::{BotClient, DirectionsClient, WeatherClient};

use crate::config::Config;
use crate::dispatch::App;
use crate::pipeline::Pipeline;
use crate::state::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ksi_bot=debug".parse()?),
        )
        .init();

    tracing::info!("Starting KSI risk bot...");

    let config = Config::from_env()?;

    // The scoring artifact loads once and is shared read-only; without it no
    // route can ever be scored, so failure here is fatal.
    let schema = Arc::new(
        FeatureSchema::from_file(Path::new(&config.columns_path))
            .context("loading column schema")?,
    );
    let model = Arc::new(
        LinearRiskModel::load(Path::new(&config.model_path), &schema)
            .context("loading scoring artifact")?,
    );
    tracing::info!(
        "model loaded ({} columns, city average {:.4})",
        schema.len(),
        ksi_core::RiskModel::city_average(model.as_ref())
    );

    let directions = Arc::new(DirectionsClient::new(
        &config.gmaps_base_url,
        &config.gmaps_api_key,
    ));
    let weather = Arc::new(WeatherClient::new(
        &config.weather_base_url,
        &config.weather_api_key,
        &config.weather_location,
    ));

    let app = Arc::new(App {
        sessions: SessionStore::new(),
        policy: SessionPolicy {
            secret: config.secret.clone(),
            max_auth_tries: config.max_auth_tries,
        },
        directions: directions.clone(),
        pipeline: Pipeline::new(
            directions,
            weather,
            model,
            schema,
            config.max_routes,
            config.sample_stride,
            config.geohash_precision,
        ),
        bot: BotClient::new(&config.telegram_base_url, &config.bot_token),
    });

    tracing::info!("Bot started. Waiting for updates...");
    poll_updates(app).await
}

/// Long-poll loop. Each update gets its own task so one session's pipeline
/// run never blocks the others.
async fn poll_updates(app: Arc<App>) -> Result<()> {
    let mut offset = 0i64;
    loop {
        match app.bot.get_updates(offset).await {
            Ok((messages, next_offset)) => {
                offset = next_offset;
                for message in messages {
                    tokio::spawn(dispatch::handle_message(app.clone(), message));
                }
            }
            Err(err) => {
                tracing::warn!("update poll failed: {err}");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
