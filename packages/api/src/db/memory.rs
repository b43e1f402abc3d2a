use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    AssessmentResult, ForumPost, NewAssessmentResult, NewForumPost, NewReminder, NewResource,
    NewUser, Reminder, ReminderStatus, Resource, ResourceFilter, ResourceUpdate, User,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    // Vectors keep insertion order, which the listing order is derived from.
    resources: Vec<Resource>,
    posts: Vec<ForumPost>,
    assessments: Vec<AssessmentResult>,
    reminders: Vec<Reminder>,
}

/// In-memory Store for tests and database-less development.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn find_mut<'a, T>(
    items: &'a mut [T],
    id: Uuid,
    key: impl Fn(&T) -> Uuid,
    entity: &'static str,
) -> StoreResult<&'a mut T> {
    items
        .iter_mut()
        .find(|item| key(&**item) == id)
        .ok_or_else(|| StoreError::not_found(entity, id))
}

fn remove_by<T>(
    items: &mut Vec<T>,
    id: Uuid,
    key: impl Fn(&T) -> Uuid,
    entity: &'static str,
) -> StoreResult<()> {
    let before = items.len();
    items.retain(|item| key(item) != id);
    if items.len() == before {
        return Err(StoreError::not_found(entity, id));
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tables = self.write();
        let taken = tables
            .users
            .values()
            .any(|u| u.provider == new.provider && u.provider_id == new.provider_id);
        if taken {
            return Err(StoreError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        let user = new.into_user(Utc::now());
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn find_user_by_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.provider == provider && u.provider_id == provider_id)
            .cloned())
    }

    async fn upsert_oauth_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tables = self.write();
        let existing = tables
            .users
            .values_mut()
            .find(|u| u.provider == new.provider && u.provider_id == new.provider_id);
        if let Some(user) = existing {
            user.email = new.email;
            user.name = new.name;
            user.avatar_url = new.avatar_url;
            user.updated_at = Utc::now();
            return Ok(user.clone());
        }
        let user = new.into_user(Utc::now());
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn add_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<()> {
        let mut tables = self.write();
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        if !user.push_tokens.iter().any(|t| t == token) {
            user.push_tokens.push(token.to_string());
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn remove_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<()> {
        let mut tables = self.write();
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        user.push_tokens.retain(|t| t != token);
        Ok(())
    }

    async fn create_resource(&self, new: NewResource) -> StoreResult<Resource> {
        let resource = new.into_resource(Utc::now());
        self.write().resources.push(resource.clone());
        Ok(resource)
    }

    async fn get_resource(&self, id: Uuid) -> StoreResult<Option<Resource>> {
        Ok(self.read().resources.iter().find(|r| r.id == id).cloned())
    }

    async fn list_resources(&self, filter: &ResourceFilter) -> StoreResult<Vec<Resource>> {
        Ok(self
            .read()
            .resources
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn update_resource(&self, id: Uuid, update: ResourceUpdate) -> StoreResult<Resource> {
        let mut tables = self.write();
        let resource = find_mut(&mut tables.resources, id, |r| r.id, "resource")?;
        update.apply(resource, Utc::now());
        Ok(resource.clone())
    }

    async fn delete_resource(&self, id: Uuid) -> StoreResult<()> {
        remove_by(&mut self.write().resources, id, |r| r.id, "resource")
    }

    async fn create_post(&self, new: NewForumPost) -> StoreResult<ForumPost> {
        let mut tables = self.write();
        if let Some(parent_id) = new.parent_id {
            if !tables.posts.iter().any(|p| p.id == parent_id) {
                return Err(StoreError::not_found("forum post", parent_id));
            }
        }
        let post = new.into_post(Utc::now());
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<ForumPost>> {
        Ok(self.read().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_threads(&self, limit: i64, offset: i64) -> StoreResult<Vec<ForumPost>> {
        Ok(self
            .read()
            .posts
            .iter()
            .rev()
            .filter(|p| p.is_thread_root())
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_replies(&self, thread_id: Uuid) -> StoreResult<Vec<ForumPost>> {
        Ok(self
            .read()
            .posts
            .iter()
            .filter(|p| p.parent_id == Some(thread_id))
            .cloned()
            .collect())
    }

    async fn update_post(
        &self,
        id: Uuid,
        title: Option<String>,
        body: String,
    ) -> StoreResult<ForumPost> {
        let mut tables = self.write();
        let post = find_mut(&mut tables.posts, id, |p| p.id, "forum post")?;
        if post.is_thread_root() {
            if let Some(title) = title {
                post.title = Some(title);
            }
        }
        post.body = body;
        post.edited = true;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.write();
        remove_by(&mut tables.posts, id, |p| p.id, "forum post")?;
        tables.posts.retain(|p| p.parent_id != Some(id));
        Ok(())
    }

    async fn create_assessment(&self, new: NewAssessmentResult) -> StoreResult<AssessmentResult> {
        let result = new.into_result(Utc::now());
        self.write().assessments.push(result.clone());
        Ok(result)
    }

    async fn get_assessment(&self, id: Uuid) -> StoreResult<Option<AssessmentResult>> {
        Ok(self.read().assessments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_assessments(&self, user_id: Uuid) -> StoreResult<Vec<AssessmentResult>> {
        Ok(self
            .read()
            .assessments
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_assessment(&self, id: Uuid) -> StoreResult<()> {
        remove_by(&mut self.write().assessments, id, |a| a.id, "assessment")
    }

    async fn create_reminder(&self, new: NewReminder) -> StoreResult<Reminder> {
        let reminder = new.into_reminder(Utc::now());
        self.write().reminders.push(reminder.clone());
        Ok(reminder)
    }

    async fn get_reminder(&self, id: Uuid) -> StoreResult<Option<Reminder>> {
        Ok(self.read().reminders.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reminders(&self, user_id: Uuid) -> StoreResult<Vec<Reminder>> {
        let mut reminders: Vec<Reminder> = self
            .read()
            .reminders
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| r.remind_at);
        Ok(reminders)
    }

    async fn list_due_reminders(
        &self,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> StoreResult<Vec<Reminder>> {
        let mut due: Vec<Reminder> = self
            .read()
            .reminders
            .iter()
            .filter(|r| r.is_due(now, max_attempts))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.remind_at);
        Ok(due)
    }

    async fn claim_reminder(&self, id: Uuid) -> StoreResult<Option<Reminder>> {
        let mut tables = self.write();
        let claimed = tables
            .reminders
            .iter_mut()
            .find(|r| r.id == id && r.status == ReminderStatus::Scheduled)
            .map(|reminder| {
                reminder.status = ReminderStatus::Sending;
                reminder.clone()
            });
        Ok(claimed)
    }

    async fn mark_reminder_sent(&self, id: Uuid) -> StoreResult<Reminder> {
        let mut tables = self.write();
        let reminder = find_mut(&mut tables.reminders, id, |r| r.id, "reminder")?;
        reminder.status = ReminderStatus::Sent;
        reminder.last_error = None;
        Ok(reminder.clone())
    }

    async fn record_reminder_failure(
        &self,
        id: Uuid,
        error: &str,
        max_attempts: i32,
    ) -> StoreResult<Reminder> {
        let mut tables = self.write();
        let reminder = find_mut(&mut tables.reminders, id, |r| r.id, "reminder")?;
        reminder.attempts += 1;
        reminder.last_error = Some(error.to_string());
        reminder.status = if reminder.attempts >= max_attempts {
            ReminderStatus::Failed
        } else {
            ReminderStatus::Scheduled
        };
        Ok(reminder.clone())
    }

    async fn delete_reminder(&self, id: Uuid) -> StoreResult<()> {
        remove_by(&mut self.write().reminders, id, |r| r.id, "reminder")
    }
}
