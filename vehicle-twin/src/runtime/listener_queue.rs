//! Listener adapter that hands inbound messages to a task-owned queue.

use crate::observability::events;
use crate::transport::{Message, MessageListener};
use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

const COMPONENT: &str = "listener_queue";

/// Forwards every received message into an unbounded queue drained by one receive loop.
///
/// The transport callback never blocks on message handling, and the loop sees messages in
/// delivery order.
pub(crate) struct QueueListener {
    owner: String,
    sender: UnboundedSender<Message>,
}

impl QueueListener {
    pub(crate) fn new(owner: &str) -> (Self, UnboundedReceiver<Message>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                owner: owner.to_string(),
                sender,
            },
            receiver,
        )
    }
}

#[async_trait]
impl MessageListener for QueueListener {
    async fn on_receive(&self, message: Message) {
        trace!(
            component = COMPONENT,
            owner = self.owner.as_str(),
            channel = message.channel.as_str(),
            "queueing inbound message"
        );
        if self.sender.send(message).is_err() {
            debug!(
                event = events::LISTENER_QUEUE_CLOSED,
                component = COMPONENT,
                owner = self.owner.as_str(),
                "receive loop gone; dropping message"
            );
        }
    }
}
