pub mod common;

mod assessment_tests;
mod auth_tests;
mod forum_tests;
mod health_tests;
mod reminder_tests;
