use async_trait::async_trait;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use super::{InboundMessage, OutboundMessage, ReplySink};
use crate::error::Result;

const CONSOLE_CHAT_ID: i64 = 0;

/// Local transport: stdin lines in, replies on stdout.
#[derive(Debug, Clone, Default)]
pub struct Console;

impl Console {
    /// Read stdin until EOF, one inbound message per line.
    pub async fn poll(&self, queue: mpsc::Sender<InboundMessage>) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut message_id = 0;

        while let Some(line) = lines.next_line().await? {
            message_id += 1;
            let message = InboundMessage {
                chat_id: CONSOLE_CHAT_ID,
                message_id,
                sender: None,
                is_command: line.trim_start().starts_with('/'),
                text: line,
            };
            if queue.send(message).await.is_err() {
                break;
            }
        }

        info!("console input closed");
        Ok(())
    }
}

#[async_trait]
impl ReplySink for Console {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        println!(
            "{} {}",
            format!("#{}", message.reply_to).as_str().dimmed(),
            message.text.as_str().green()
        );
        Ok(())
    }
}
