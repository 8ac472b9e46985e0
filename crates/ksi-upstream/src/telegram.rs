//! Delivery channel client (Telegram Bot API, long polling).
//!
//! Kept deliberately narrow: the core never sees this type, it only hands
//! over text and image bytes addressed to a chat id.

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// One incoming text message.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub chat_id: i64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// Extract text messages and the next poll offset from a batch of updates.
/// Non-text updates are skipped but still advance the offset.
fn drain_updates(updates: Vec<Update>, offset: i64) -> (Vec<IncomingMessage>, i64) {
    let mut next_offset = offset;
    let mut messages = Vec::new();
    for update in updates {
        next_offset = next_offset.max(update.update_id + 1);
        if let Some(message) = update.message {
            if let Some(text) = message.text {
                messages.push(IncomingMessage {
                    update_id: update.update_id,
                    chat_id: message.chat.id,
                    text,
                });
            }
        }
    }
    (messages, next_offset)
}

pub struct BotClient {
    client: Client,
    base_url: String,
    token: String,
}

impl BotClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            // Long-poll timeout plus headroom.
            client: Client::builder()
                .timeout(Duration::from_secs(40))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Long-poll for updates past `offset`. Non-text updates are skipped
    /// but still advance the offset.
    pub async fn get_updates(&self, offset: i64) -> Result<(Vec<IncomingMessage>, i64)> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset.to_string()), ("timeout", "30".to_string())])
            .send()
            .await
            .context("Failed to poll for updates")?;

        let payload: UpdatesResponse = response
            .json()
            .await
            .context("Failed to parse updates response")?;
        if !payload.ok {
            anyhow::bail!("getUpdates returned ok=false");
        }

        Ok(drain_updates(payload.result, offset))
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .context("Failed to send message")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("sendMessage failed: {} {}", status, body);
        }
        Ok(())
    }

    /// Send a photo with a caption.
    pub async fn send_photo(&self, chat_id: i64, image: Vec<u8>, caption: &str) -> Result<()> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part(
                "photo",
                Part::bytes(image)
                    .file_name("routes.png")
                    .mime_str("image/png")
                    .context("Invalid photo part")?,
            );

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .context("Failed to send photo")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("sendPhoto failed: {} {}", status, body);
        }
        Ok(())
    }
}
