//! Update dispatch: drive one session's state machine per incoming message.

use std::sync::Arc;

use ksi_core::{SessionAction, SessionPolicy};
use ksi_upstream::{BotClient, DirectionsClient, IncomingMessage, WeatherClient};

use crate::pipeline::Pipeline;
use crate::state::SessionStore;

pub struct App {
    pub sessions: SessionStore,
    pub policy: SessionPolicy,
    pub directions: Arc<DirectionsClient>,
    pub pipeline: Pipeline<Arc<DirectionsClient>, Arc<WeatherClient>>,
    pub bot: BotClient,
}

/// Handle one message end to end.
///
/// The session lock is held for the whole transition, pipeline run included:
/// a session processes one input at a time, while other sessions keep being
/// served on their own tasks.
pub async fn handle_message(app: Arc<App>, incoming: IncomingMessage) {
    tracing::debug!(
        "update {} for chat {}",
        incoming.update_id,
        incoming.chat_id
    );
    let session = app.sessions.session(incoming.chat_id);
    let mut session = session.lock().await;

    let action = match incoming.text.trim() {
        "/start" => session.handle_start(),
        "/cancel" => session.handle_cancel(),
        text => session.handle_message(text, &app.policy),
    };

    match action {
        SessionAction::Ignore => {
            tracing::debug!("dropping input from locked session {}", incoming.chat_id);
        }
        SessionAction::Reply(text) => {
            reply(&app, incoming.chat_id, &text).await;
        }
        SessionAction::RunPipeline { start, dest } => {
            reply(&app, incoming.chat_id, "⏳ Calculating routes, please wait…").await;
            run_and_deliver(&app, incoming.chat_id, start.as_str(), dest.as_str()).await;
        }
    }
}

async fn run_and_deliver(app: &App, chat_id: i64, start: &str, dest: &str) {
    let report = match app.pipeline.run(start, dest).await {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!("pipeline aborted for {chat_id}: {err}");
            reply(
                app,
                chat_id,
                &format!("❌ Could not fetch routes: {err}\nSend me your start point Postal Code to try again"),
            )
            .await;
            return;
        }
    };

    let caption = report.render();

    // Map rendering is best-effort; the text report is never lost to it.
    let geometries: Vec<String> = report
        .routes
        .iter()
        .map(|scored| scored.route.geometry.clone())
        .collect();
    match app.directions.static_map(start, dest, &geometries).await {
        Ok(image) => {
            if let Err(err) = app.bot.send_photo(chat_id, image, &caption).await {
                tracing::warn!("photo delivery failed for {chat_id}: {err}");
                reply(app, chat_id, &caption).await;
            }
        }
        Err(err) => {
            tracing::warn!("static map unavailable for {chat_id}: {err}");
            reply(app, chat_id, &format!("{caption}\n(map unavailable)")).await;
        }
    }
}

async fn reply(app: &App, chat_id: i64, text: &str) {
    if let Err(err) = app.bot.send_message(chat_id, text).await {
        tracing::warn!("reply delivery failed for {chat_id}: {err}");
    }
}
