//! Data models for the application.

mod assessment;
mod forum;
mod reminder;
mod resource;
mod user;

pub use assessment::{AssessmentResult, NewAssessmentResult};
pub use forum::{ForumPost, NewForumPost, Thread};
pub use reminder::{NewReminder, Reminder, ReminderStatus};
pub use resource::{NewResource, Resource, ResourceFilter, ResourceKind, ResourceUpdate};
pub use user::{NewUser, User, UserInfo, LOCAL_PROVIDER};
