//! Telegram channel: long-poll getUpdates, sendMessage and editMessageText
//! via Bot API.

use crate::channels::inbound::InboundMessage;
use crate::channels::transport::{Formatting, MessageId, Transport};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// Telegram update payload (getUpdates result item or webhook POST body).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
    /// Unix timestamp (seconds) the message was sent.
    pub date: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Telegram channel connector: long-polls for updates and delivers replies
/// via sendMessage/editMessageText.
pub struct TelegramChannel {
    id: String,
    api_base: String,
    token: Option<String>,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: Option<String>) -> Self {
        Self {
            id: "telegram".to_string(),
            api_base: telegram_api_base(),
            token,
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the getUpdates long-poll loop and forward messages to the
    /// dispatch loop. Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), String> {
        let token = self.token.as_ref().ok_or("telegram bot token not configured")?;
        let url = format!(
            "{}/bot{}/getUpdates?timeout={}",
            self.api_base, token, LONG_POLL_TIMEOUT
        );
        let url = if let Some(off) = offset {
            format!("{}&offset={}", url, off)
        } else {
            url
        };
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("getUpdates failed: {} {}", status, body));
        }
        let data: GetUpdatesResponse = res.json().await.map_err(|e| e.to_string())?;
        if !data.ok {
            return Err("getUpdates returned ok: false".to_string());
        }
        let next_offset = data
            .result
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    /// Set webhook URL (and optional secret). When set, Telegram POSTs updates
    /// to the URL instead of getUpdates.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), String> {
        let token = self.token.as_ref().ok_or("telegram bot token not configured")?;
        let api_url = format!("{}/bot{}/setWebhook", self.api_base, token);
        let mut body = serde_json::json!({ "url": url });
        if let Some(s) = secret {
            body["secret_token"] = serde_json::Value::String(s.to_string());
        }
        let res = self
            .client
            .post(&api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("setWebhook failed: {} {}", status, body));
        }
        Ok(())
    }

    /// Remove webhook so the bot can use getUpdates again.
    pub async fn delete_webhook(&self) -> Result<(), String> {
        let token = self.token.as_ref().ok_or("telegram bot token not configured")?;
        let url = format!("{}/bot{}/deleteWebhook", self.api_base, token);
        let res = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("deleteWebhook failed: {} {}", status, body));
        }
        Ok(())
    }

    /// Send a text message to a chat via sendMessage; returns the created
    /// message id so progress updates can edit it in place.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        formatting: Formatting,
    ) -> Result<MessageId, String> {
        let token = self.token.as_ref().ok_or("telegram bot token not configured")?;
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": text });
        if formatting == Formatting::Html {
            body["parse_mode"] = serde_json::Value::String("HTML".to_string());
        }
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("sendMessage failed: {} {}", status, body));
        }
        let data: SendMessageResponse = res.json().await.map_err(|e| e.to_string())?;
        if !data.ok {
            return Err("sendMessage returned ok: false".to_string());
        }
        data.result
            .map(|m| m.message_id)
            .ok_or_else(|| "sendMessage response missing result".to_string())
    }

    /// Edit a previously sent message in place via editMessageText.
    pub async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), String> {
        let token = self.token.as_ref().ok_or("telegram bot token not configured")?;
        let url = format!("{}/bot{}/editMessageText", self.api_base, token);
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if formatting == Formatting::Html {
            body["parse_mode"] = serde_json::Value::String("HTML".to_string());
        }
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("editMessageText failed: {} {}", status, body));
        }
        Ok(())
    }
}

/// Build an InboundMessage from a Telegram update, if it carries routable text.
pub(crate) fn inbound_from_update(update: &TelegramUpdate) -> Option<InboundMessage> {
    let msg = update.message.as_ref()?;
    let text = msg.text.as_ref()?;
    let from = msg.from.as_ref()?;
    Some(InboundMessage {
        chat_id: msg.chat.id,
        sender_id: from.id,
        text: text.clone(),
        timestamp: msg.date,
    })
}

async fn run_get_updates_loop(
    channel: Arc<TelegramChannel>,
    inbound_tx: mpsc::Sender<InboundMessage>,
) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                offset = next;
                for u in updates {
                    let Some(inbound) = inbound_from_update(&u) else {
                        continue;
                    };
                    if inbound_tx.send(inbound).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl Transport for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        formatting: Formatting,
    ) -> Result<MessageId, String> {
        TelegramChannel::send_message(self, chat_id, text, formatting).await
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), String> {
        TelegramChannel::edit_message(self, chat_id, message_id, text, formatting).await
    }
}

/// Resolve Telegram bot API base URL (for tests or custom endpoints).
fn telegram_api_base() -> String {
    std::env::var("TELEGRAM_API_BASE").unwrap_or_else(|_| TELEGRAM_API_BASE.to_string())
}
