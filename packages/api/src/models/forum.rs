//! Community forum posts.
//!
//! A post without a `parent_id` is the root of a thread and carries the
//! thread title. Replies always point at a root, never at another reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: Option<String>,
    pub body: String,
    pub edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ForumPost {
    pub fn is_thread_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The id of the thread this post belongs to.
    pub fn thread_id(&self) -> Uuid {
        self.parent_id.unwrap_or(self.id)
    }
}

#[derive(Debug, Clone)]
pub struct NewForumPost {
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: Option<String>,
    pub body: String,
}

impl NewForumPost {
    pub fn into_post(self, now: DateTime<Utc>) -> ForumPost {
        ForumPost {
            id: Uuid::new_v4(),
            author_id: self.author_id,
            parent_id: self.parent_id,
            title: self.title,
            body: self.body,
            edited: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A thread root with its replies, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub root: ForumPost,
    pub replies: Vec<ForumPost>,
}
