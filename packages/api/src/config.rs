//! # Settings
//!
//! Layered configuration built with the `config` crate:
//!
//! 1. defaults set in [`Settings::load`],
//! 2. an optional `config.toml` in the working directory,
//! 3. environment variables prefixed with `MINDWELL`, sections separated by `__`
//!    (`MINDWELL__SERVER__PORT=8080`, `MINDWELL__DATABASE__URL=postgres://...`).
//!
//! A `.env` file is loaded first through `dotenvy` so local development can keep
//! credentials out of the shell. An empty `database.url` runs the service on the
//! in-memory store.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub secure: bool,
    pub inactivity_days: i64,
}

/// OAuth client credentials. A provider is enabled only when both values are set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    /// Public base URL used to build `/auth/{provider}/callback` redirect URIs.
    pub redirect_base: String,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushSettings {
    /// FCM HTTP v1 `messages:send` URL.
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderSettings {
    pub poll_interval_secs: u64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub auth: AuthSettings,
    pub push: PushSettings,
    pub reminders: ReminderSettings,
}

impl Settings {
    /// Load settings from defaults, `config.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::builder()?
            .add_source(
                File::with_name("config.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix("MINDWELL").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Parse settings from a TOML string layered over the defaults.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 5)?
            .set_default("session.secure", false)?
            .set_default("session.inactivity_days", 7)?
            .set_default("auth.redirect_base", "http://localhost:3000")?
            .set_default("reminders.poll_interval_secs", 30)?
            .set_default("reminders.max_attempts", 3)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".into(),
                port: 3000,
            },
            database: DatabaseSettings {
                url: String::new(),
                max_connections: 5,
            },
            session: SessionSettings {
                secure: false,
                inactivity_days: 7,
            },
            auth: AuthSettings {
                redirect_base: "http://localhost:3000".into(),
                ..Default::default()
            },
            push: PushSettings::default(),
            reminders: ReminderSettings {
                poll_interval_secs: 30,
                max_attempts: 3,
            },
        }
    }
}
