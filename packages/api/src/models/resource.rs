//! Mental-health resources: meditation guides, articles and exercises.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of content a resource holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Meditation,
    Article,
    Exercise,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Meditation => "meditation",
            ResourceKind::Article => "article",
            ResourceKind::Exercise => "exercise",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meditation" => Ok(ResourceKind::Meditation),
            "article" => Ok(ResourceKind::Article),
            "exercise" => Ok(ResourceKind::Exercise),
            other => Err(format!("Unknown resource kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub kind: ResourceKind,
    pub title: String,
    pub summary: String,
    pub body: String,
    /// Suggested session length, meaningful for meditations and exercises.
    pub duration_minutes: Option<i32>,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub kind: ResourceKind,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub duration_minutes: Option<i32>,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub published: bool,
}

impl NewResource {
    pub fn into_resource(self, now: DateTime<Utc>) -> Resource {
        Resource {
            id: Uuid::new_v4(),
            kind: self.kind,
            title: self.title,
            summary: self.summary,
            body: self.body,
            duration_minutes: self.duration_minutes,
            tags: self.tags,
            author_id: self.author_id,
            published: self.published,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceUpdate {
    pub kind: Option<ResourceKind>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub duration_minutes: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

impl ResourceUpdate {
    pub fn apply(self, resource: &mut Resource, now: DateTime<Utc>) {
        if let Some(kind) = self.kind {
            resource.kind = kind;
        }
        if let Some(title) = self.title {
            resource.title = title;
        }
        if let Some(summary) = self.summary {
            resource.summary = summary;
        }
        if let Some(body) = self.body {
            resource.body = body;
        }
        if let Some(duration) = self.duration_minutes {
            resource.duration_minutes = Some(duration);
        }
        if let Some(tags) = self.tags {
            resource.tags = tags;
        }
        if let Some(published) = self.published {
            resource.published = published;
        }
        resource.updated_at = now;
    }
}

/// Listing filter for resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub kind: Option<ResourceKind>,
    pub tag: Option<String>,
    pub published_only: bool,
}

impl ResourceFilter {
    pub fn matches(&self, resource: &Resource) -> bool {
        if self.published_only && !resource.published {
            return false;
        }
        if let Some(kind) = self.kind {
            if resource.kind != kind {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            if !resource.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}
