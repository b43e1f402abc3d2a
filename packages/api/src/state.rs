//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::Settings;
use crate::db::Store;
use crate::push::PushSender;
use crate::realtime::ForumHub;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub push: Arc<dyn PushSender>,
    pub forum: Arc<ForumHub>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, push: Arc<dyn PushSender>, settings: Settings) -> Self {
        Self {
            store,
            push,
            forum: Arc::new(ForumHub::new()),
            settings: Arc::new(settings),
        }
    }
}
