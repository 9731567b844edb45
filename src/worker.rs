//! Bounded pool of workers draining the shared inbound queue.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

use crate::bot::Bot;
use crate::transport::{InboundMessage, OutboundMessage, ReplySink};

/// Queue capacity per worker before the poller has to wait.
const QUEUE_DEPTH_PER_WORKER: usize = 16;

/// Create the inbound queue sized for `workers`.
pub fn queue(workers: usize) -> (mpsc::Sender<InboundMessage>, mpsc::Receiver<InboundMessage>) {
    mpsc::channel(workers.max(1) * QUEUE_DEPTH_PER_WORKER)
}

/// Run `workers` tasks until the queue is closed and drained.
///
/// Each worker handles one message end-to-end; replies to different messages
/// may go out in any order. A failed reply is logged and the worker moves on.
pub async fn run(
    workers: usize,
    queue: mpsc::Receiver<InboundMessage>,
    bot: Arc<Bot>,
    sink: Arc<dyn ReplySink>,
) {
    let workers = workers.max(1);
    let queue = Arc::new(Mutex::new(queue));
    info!(workers, "starting worker pool");

    let handles = (0..workers).map(|id| {
        let queue = Arc::clone(&queue);
        let bot = Arc::clone(&bot);
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            loop {
                let next = queue.lock().await.recv().await;
                let Some(message) = next else {
                    debug!(worker = id, "queue closed");
                    break;
                };
                handle_one(id, &bot, sink.as_ref(), message).await;
            }
        })
    });

    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            error!(error = %e, "worker task panicked");
        }
    }
}

async fn handle_one(worker: usize, bot: &Bot, sink: &dyn ReplySink, message: InboundMessage) {
    let Some(reply) = bot.handle(&message.text, message.is_command).await else {
        return;
    };
    debug!(worker, chat_id = message.chat_id, "sending reply");
    if let Err(e) = sink.send(OutboundMessage::reply(&message, reply)).await {
        error!(worker, chat_id = message.chat_id, error = %e, "failed to send reply");
    }
}
