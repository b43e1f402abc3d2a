//! Live forum updates.
//!
//! [`ForumHub`] wraps a `tokio::sync::broadcast` channel. Publishing never blocks
//! and succeeds with no subscribers. A subscriber that falls behind loses the
//! oldest events but stays subscribed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::ForumPost;

const CHANNEL_CAPACITY: usize = 256;

/// Events pushed to connected forum clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForumEvent {
    PostCreated { post: ForumPost },
    PostUpdated { post: ForumPost },
    PostDeleted { id: Uuid, thread_id: Uuid },
}

impl ForumEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            ForumEvent::PostCreated { .. } => "post_created",
            ForumEvent::PostUpdated { .. } => "post_updated",
            ForumEvent::PostDeleted { .. } => "post_deleted",
        }
    }
}

#[derive(Debug)]
pub struct ForumHub {
    sender: broadcast::Sender<ForumEvent>,
}

impl ForumHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: ForumEvent) {
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::debug!(receivers, "Published forum event");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ForumEvent> {
        self.sender.subscribe()
    }
}

impl Default for ForumHub {
    fn default() -> Self {
        Self::new()
    }
}
