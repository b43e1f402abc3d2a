//! # PostgreSQL store
//!
//! Rows are read into private `*Row` structs deriving [`sqlx::FromRow`] and then
//! converted into the public models. Enum-like columns (`kind`, `instrument`,
//! `status`) are stored as `TEXT`. A value that no longer parses is reported
//! as [`StoreError::Corrupt`] rather than silently dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    AssessmentResult, ForumPost, NewAssessmentResult, NewForumPost, NewReminder, NewResource,
    NewUser, Reminder, Resource, ResourceFilter, ResourceUpdate, User,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    avatar_url: Option<String>,
    provider: String,
    provider_id: String,
    password_hash: Option<String>,
    push_tokens: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            avatar_url: row.avatar_url,
            provider: row.provider,
            provider_id: row.provider_id,
            password_hash: row.password_hash,
            push_tokens: row.push_tokens,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ResourceRow {
    id: Uuid,
    kind: String,
    title: String,
    summary: String,
    body: String,
    duration_minutes: Option<i32>,
    tags: Vec<String>,
    author_id: Uuid,
    published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ResourceRow> for Resource {
    type Error = StoreError;

    fn try_from(row: ResourceRow) -> Result<Self, Self::Error> {
        Ok(Resource {
            id: row.id,
            kind: row.kind.parse().map_err(StoreError::Corrupt)?,
            title: row.title,
            summary: row.summary,
            body: row.body,
            duration_minutes: row.duration_minutes,
            tags: row.tags,
            author_id: row.author_id,
            published: row.published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ForumPostRow {
    id: Uuid,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    title: Option<String>,
    body: String,
    edited: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ForumPostRow> for ForumPost {
    fn from(row: ForumPostRow) -> Self {
        ForumPost {
            id: row.id,
            author_id: row.author_id,
            parent_id: row.parent_id,
            title: row.title,
            body: row.body,
            edited: row.edited,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AssessmentRow {
    id: Uuid,
    user_id: Uuid,
    instrument: String,
    answers: Vec<i16>,
    score: i32,
    severity: String,
    crisis_flag: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AssessmentRow> for AssessmentResult {
    type Error = StoreError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        let answers = row
            .answers
            .into_iter()
            .map(|a| u8::try_from(a).map_err(|e| StoreError::Corrupt(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AssessmentResult {
            id: row.id,
            user_id: row.user_id,
            instrument: row.instrument.parse().map_err(StoreError::Corrupt)?,
            answers,
            score: row.score,
            severity: row.severity,
            crisis_flag: row.crisis_flag,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ReminderRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    medicine: String,
    remind_at: DateTime<Utc>,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = StoreError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        Ok(Reminder {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            medicine: row.medicine,
            remind_at: row.remind_at,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn map_unique(err: sqlx::Error, message: &str) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        err => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, name, avatar_url, provider, provider_id, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.avatar_url)
        .bind(&new.provider)
        .bind(&new.provider_id)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "An account with this email already exists"))?;
        Ok(row.into())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT * FROM users WHERE provider = $1 AND provider_id = $2")
                .bind(provider)
                .bind(provider_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    async fn upsert_oauth_user(&self, new: NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, name, avatar_url, provider, provider_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (provider, provider_id)
            DO UPDATE SET
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                avatar_url = EXCLUDED.avatar_url,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.avatar_url)
        .bind(&new.provider)
        .bind(&new.provider_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn add_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET push_tokens = CASE
                    WHEN $2 = ANY(push_tokens) THEN push_tokens
                    ELSE array_append(push_tokens, $2)
                END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", user_id));
        }
        Ok(())
    }

    async fn remove_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET push_tokens = array_remove(push_tokens, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", user_id));
        }
        Ok(())
    }

    async fn create_resource(&self, new: NewResource) -> StoreResult<Resource> {
        let row: ResourceRow = sqlx::query_as(
            r#"
            INSERT INTO resources
                (id, kind, title, summary, body, duration_minutes, tags, author_id, published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.kind.as_str())
        .bind(&new.title)
        .bind(&new.summary)
        .bind(&new.body)
        .bind(new.duration_minutes)
        .bind(&new.tags)
        .bind(new.author_id)
        .bind(new.published)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_resource(&self, id: Uuid) -> StoreResult<Option<Resource>> {
        let row: Option<ResourceRow> = sqlx::query_as("SELECT * FROM resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Resource::try_from).transpose()
    }

    async fn list_resources(&self, filter: &ResourceFilter) -> StoreResult<Vec<Resource>> {
        let rows: Vec<ResourceRow> = sqlx::query_as(
            r#"
            SELECT * FROM resources
            WHERE ($1::TEXT IS NULL OR kind = $1)
              AND ($2::TEXT IS NULL OR $2 = ANY(tags))
              AND (NOT $3 OR published)
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(&filter.tag)
        .bind(filter.published_only)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn update_resource(&self, id: Uuid, update: ResourceUpdate) -> StoreResult<Resource> {
        let row: Option<ResourceRow> = sqlx::query_as(
            r#"
            UPDATE resources SET
                kind = COALESCE($2, kind),
                title = COALESCE($3, title),
                summary = COALESCE($4, summary),
                body = COALESCE($5, body),
                duration_minutes = COALESCE($6, duration_minutes),
                tags = COALESCE($7, tags),
                published = COALESCE($8, published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.kind.map(|k| k.as_str()))
        .bind(&update.title)
        .bind(&update.summary)
        .bind(&update.body)
        .bind(update.duration_minutes)
        .bind(&update.tags)
        .bind(update.published)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| StoreError::not_found("resource", id))?
            .try_into()
    }

    async fn delete_resource(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("resource", id));
        }
        Ok(())
    }

    async fn create_post(&self, new: NewForumPost) -> StoreResult<ForumPost> {
        let row: ForumPostRow = sqlx::query_as(
            r#"
            INSERT INTO forum_posts (id, author_id, parent_id, title, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.author_id)
        .bind(new.parent_id)
        .bind(&new.title)
        .bind(&new.body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match (e, new.parent_id) {
            (sqlx::Error::Database(ref db), Some(parent_id)) if db.is_foreign_key_violation() => {
                StoreError::not_found("forum post", parent_id)
            }
            (e, _) => StoreError::Database(e),
        })?;
        Ok(row.into())
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<ForumPost>> {
        let row: Option<ForumPostRow> = sqlx::query_as("SELECT * FROM forum_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ForumPost::from))
    }

    async fn list_threads(&self, limit: i64, offset: i64) -> StoreResult<Vec<ForumPost>> {
        let rows: Vec<ForumPostRow> = sqlx::query_as(
            r#"
            SELECT * FROM forum_posts
            WHERE parent_id IS NULL
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ForumPost::from).collect())
    }

    async fn list_replies(&self, thread_id: Uuid) -> StoreResult<Vec<ForumPost>> {
        let rows: Vec<ForumPostRow> = sqlx::query_as(
            "SELECT * FROM forum_posts WHERE parent_id = $1 ORDER BY created_at ASC, id",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ForumPost::from).collect())
    }

    async fn update_post(
        &self,
        id: Uuid,
        title: Option<String>,
        body: String,
    ) -> StoreResult<ForumPost> {
        // Replies never carry a title, so the COALESCE only applies to thread roots.
        let row: Option<ForumPostRow> = sqlx::query_as(
            r#"
            UPDATE forum_posts SET
                title = CASE WHEN parent_id IS NULL THEN COALESCE($2, title) ELSE title END,
                body = $3,
                edited = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&title)
        .bind(&body)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ForumPost::from)
            .ok_or_else(|| StoreError::not_found("forum post", id))
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<()> {
        // Replies go with their root through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM forum_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("forum post", id));
        }
        Ok(())
    }

    async fn create_assessment(&self, new: NewAssessmentResult) -> StoreResult<AssessmentResult> {
        let answers: Vec<i16> = new.answers.iter().map(|&a| i16::from(a)).collect();
        let row: AssessmentRow = sqlx::query_as(
            r#"
            INSERT INTO assessment_results
                (id, user_id, instrument, answers, score, severity, crisis_flag, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.instrument.as_str())
        .bind(&answers)
        .bind(new.score.total)
        .bind(new.score.severity)
        .bind(new.score.crisis_flag)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_assessment(&self, id: Uuid) -> StoreResult<Option<AssessmentResult>> {
        let row: Option<AssessmentRow> =
            sqlx::query_as("SELECT * FROM assessment_results WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(AssessmentResult::try_from).transpose()
    }

    async fn list_assessments(&self, user_id: Uuid) -> StoreResult<Vec<AssessmentResult>> {
        let rows: Vec<AssessmentRow> = sqlx::query_as(
            "SELECT * FROM assessment_results WHERE user_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn delete_assessment(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM assessment_results WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("assessment", id));
        }
        Ok(())
    }

    async fn create_reminder(&self, new: NewReminder) -> StoreResult<Reminder> {
        let row: ReminderRow = sqlx::query_as(
            r#"
            INSERT INTO reminders (id, user_id, name, medicine, remind_at, status)
            VALUES ($1, $2, $3, $4, $5, 'scheduled')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.name)
        .bind(&new.medicine)
        .bind(new.remind_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_reminder(&self, id: Uuid) -> StoreResult<Option<Reminder>> {
        let row: Option<ReminderRow> = sqlx::query_as("SELECT * FROM reminders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Reminder::try_from).transpose()
    }

    async fn list_reminders(&self, user_id: Uuid) -> StoreResult<Vec<Reminder>> {
        let rows: Vec<ReminderRow> =
            sqlx::query_as("SELECT * FROM reminders WHERE user_id = $1 ORDER BY remind_at, id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        convert_all(rows)
    }

    async fn list_due_reminders(
        &self,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> StoreResult<Vec<Reminder>> {
        let rows: Vec<ReminderRow> = sqlx::query_as(
            r#"
            SELECT * FROM reminders
            WHERE status = 'scheduled' AND remind_at <= $1 AND attempts < $2
            ORDER BY remind_at, id
            "#,
        )
        .bind(now)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn claim_reminder(&self, id: Uuid) -> StoreResult<Option<Reminder>> {
        let row: Option<ReminderRow> = sqlx::query_as(
            r#"
            UPDATE reminders
            SET status = 'sending'
            WHERE id = $1 AND status = 'scheduled'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Reminder::try_from).transpose()
    }

    async fn mark_reminder_sent(&self, id: Uuid) -> StoreResult<Reminder> {
        let row: Option<ReminderRow> = sqlx::query_as(
            r#"
            UPDATE reminders
            SET status = 'sent', last_error = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| StoreError::not_found("reminder", id))?
            .try_into()
    }

    async fn record_reminder_failure(
        &self,
        id: Uuid,
        error: &str,
        max_attempts: i32,
    ) -> StoreResult<Reminder> {
        let row: Option<ReminderRow> = sqlx::query_as(
            r#"
            UPDATE reminders
            SET attempts = attempts + 1,
                last_error = $2,
                status = CASE WHEN attempts + 1 >= $3 THEN 'failed' ELSE 'scheduled' END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| StoreError::not_found("reminder", id))?
            .try_into()
    }

    async fn delete_reminder(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("reminder", id));
        }
        Ok(())
    }
}
