//! # Database module: persistence behind the [`Store`] trait
//!
//! Every handler talks to storage through `Arc<dyn Store>`. Two implementations exist:
//!
//! | Type | Backing | Used for |
//! |------|---------|----------|
//! | [`PgStore`] | PostgreSQL through an sqlx pool, schema in `migrations/` | production |
//! | [`MemoryStore`] | `RwLock`-guarded vectors and maps | development without a database, tests |
//!
//! Both keep the same ordering rules: thread listings, resources and assessment
//! results are newest first, replies are oldest first, due reminders are
//! earliest first.
//!
//! ## Re-exports
//!
//! - [`connect`] / [`run_migrations`]: open the PostgreSQL pool and bring the schema up to date.

mod error;
mod memory;
mod pool;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AssessmentResult, ForumPost, NewAssessmentResult, NewForumPost, NewReminder, NewResource,
    NewUser, Reminder, Resource, ResourceFilter, ResourceUpdate, User,
};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use pool::{connect, run_migrations};
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness check used by the readiness probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Create a user. Fails with [`StoreError::Conflict`] when the
    /// `(provider, provider_id)` pair is taken.
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<User>>;
    /// Insert or refresh the profile of an OAuth user.
    async fn upsert_oauth_user(&self, new: NewUser) -> StoreResult<User>;
    /// Add a push token; registering a known token is a no-op.
    async fn add_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<()>;
    async fn remove_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<()>;

    async fn create_resource(&self, new: NewResource) -> StoreResult<Resource>;
    async fn get_resource(&self, id: Uuid) -> StoreResult<Option<Resource>>;
    async fn list_resources(&self, filter: &ResourceFilter) -> StoreResult<Vec<Resource>>;
    async fn update_resource(&self, id: Uuid, update: ResourceUpdate) -> StoreResult<Resource>;
    async fn delete_resource(&self, id: Uuid) -> StoreResult<()>;

    async fn create_post(&self, new: NewForumPost) -> StoreResult<ForumPost>;
    async fn get_post(&self, id: Uuid) -> StoreResult<Option<ForumPost>>;
    async fn list_threads(&self, limit: i64, offset: i64) -> StoreResult<Vec<ForumPost>>;
    async fn list_replies(&self, thread_id: Uuid) -> StoreResult<Vec<ForumPost>>;
    /// Replace the body (and title, for thread roots) and mark the post edited.
    async fn update_post(
        &self,
        id: Uuid,
        title: Option<String>,
        body: String,
    ) -> StoreResult<ForumPost>;
    /// Delete a post. Deleting a thread root also deletes its replies.
    async fn delete_post(&self, id: Uuid) -> StoreResult<()>;

    async fn create_assessment(&self, new: NewAssessmentResult) -> StoreResult<AssessmentResult>;
    async fn get_assessment(&self, id: Uuid) -> StoreResult<Option<AssessmentResult>>;
    async fn list_assessments(&self, user_id: Uuid) -> StoreResult<Vec<AssessmentResult>>;
    async fn delete_assessment(&self, id: Uuid) -> StoreResult<()>;

    async fn create_reminder(&self, new: NewReminder) -> StoreResult<Reminder>;
    async fn get_reminder(&self, id: Uuid) -> StoreResult<Option<Reminder>>;
    async fn list_reminders(&self, user_id: Uuid) -> StoreResult<Vec<Reminder>>;
    /// Scheduled reminders whose time has come and that have attempts left.
    async fn list_due_reminders(
        &self,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> StoreResult<Vec<Reminder>>;
    /// Atomically move a `scheduled` reminder to `sending`. Returns `None` when
    /// the reminder is missing or not `scheduled`, so only one caller wins.
    async fn claim_reminder(&self, id: Uuid) -> StoreResult<Option<Reminder>>;
    /// Mark a delivered reminder `sent`. `attempts` is left unchanged.
    async fn mark_reminder_sent(&self, id: Uuid) -> StoreResult<Reminder>;
    /// Count a failed delivery. The reminder goes back to `scheduled`, or to
    /// `failed` once `max_attempts` is reached.
    async fn record_reminder_failure(
        &self,
        id: Uuid,
        error: &str,
        max_attempts: i32,
    ) -> StoreResult<Reminder>;
    async fn delete_reminder(&self, id: Uuid) -> StoreResult<()>;
}
