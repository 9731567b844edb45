use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::{InboundMessage, OutboundMessage, ReplySink};
use crate::config::{DEFAULT_TELEGRAM_URL, http_client};
use crate::error::{Error, Result};

const POLL_TIMEOUT_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);
const BOT_COMMAND: &str = "bot_command";

/// Telegram Bot API client: long-polls `getUpdates` and replies with `sendMessage`.
#[derive(Clone)]
pub struct Telegram {
    client: Client,
    base_url: String,
    token: String,
}

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    from: Option<User>,
    chat: Chat,
    text: Option<String>,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct User {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(rename = "type")]
    kind: String,
    offset: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    reply_to_message_id: i64,
}

impl Update {
    /// The text message carried by this update, if any.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let text = message.text?;
        let is_command = message
            .entities
            .first()
            .is_some_and(|e| e.kind == BOT_COMMAND && e.offset == 0);

        Some(InboundMessage {
            chat_id: message.chat.id,
            message_id: message.message_id,
            sender: message.from.and_then(|u| u.username),
            text,
            is_command,
        })
    }
}

impl Telegram {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_TELEGRAM_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn read_response<T: for<'de> Deserialize<'de>>(
        method: &str,
        resp: reqwest::Response,
    ) -> Result<T> {
        let status = resp.status();
        let body = resp.text().await?;

        debug!(method, status = %status, body_len = body.len(), "Telegram response");
        trace!(body = %body, "Telegram response body");

        if !status.is_success() {
            return Err(Error::Api(format!("Telegram {} returned {}: {}", method, status, body)));
        }

        let parsed: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Telegram {} JSON: {}", method, e)))?;

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(Error::Api(format!(
                "Telegram {} failed: {}",
                method,
                parsed.description.unwrap_or_default()
            ))),
        }
    }

    /// Fetch updates after `offset`, waiting up to `timeout_secs` for new ones.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let resp = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset.to_string()), ("timeout", timeout_secs.to_string())])
            .send()
            .await?;
        Self::read_response("getUpdates", resp).await
    }

    /// Poll forever, pushing text messages into `queue`. Returns when the queue is closed.
    pub async fn poll(&self, queue: mpsc::Sender<InboundMessage>) -> Result<()> {
        let mut offset = 0;
        info!("polling Telegram for updates");

        loop {
            let updates = match self.get_updates(offset, POLL_TIMEOUT_SECS).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.into_inbound() else {
                    continue;
                };
                debug!(sender = ?message.sender, text = %message.text, "inbound message");
                if queue.send(message).await.is_err() {
                    info!("message queue closed, stopping poller");
                    return Ok(());
                }
            }
        }
    }
}

#[async_trait]
impl ReplySink for Telegram {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let payload = SendMessage {
            chat_id: message.chat_id,
            text: &message.text,
            reply_to_message_id: message.reply_to,
        };
        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;
        let _sent: serde_json::Value = Self::read_response("sendMessage", resp).await?;
        Ok(())
    }
}
