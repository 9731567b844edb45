pub mod console;
pub mod telegram;

use async_trait::async_trait;

use crate::error::Result;

/// A text message received from a chat.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub sender: Option<String>,
    pub text: String,
    pub is_command: bool,
}

/// A reply addressed to a chat and threaded under the message it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub reply_to: i64,
    pub text: String,
}

impl OutboundMessage {
    pub fn reply(to: &InboundMessage, text: String) -> Self {
        Self {
            chat_id: to.chat_id,
            reply_to: to.message_id,
            text,
        }
    }
}

/// Delivers replies back to the chat transport.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<()>;
}
