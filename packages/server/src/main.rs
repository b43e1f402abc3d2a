use std::sync::Arc;

use anyhow::Context;
use api::db::{MemoryStore, PgStore, Store};
use api::push::{FcmSender, LogSender, PushSender};
use api::reminders::spawn_scheduler;
use api::{AppState, Settings};
use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().context("Failed to load settings")?;
    let push = push_sender(&settings);

    let app = if settings.database.is_configured() {
        let pool = api::db::connect(&settings.database)
            .await
            .context("Failed to connect to database")?;
        api::db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;

        let session_store = PostgresStore::new(pool.clone());
        session_store
            .migrate()
            .await
            .context("Failed to create session table")?;

        tracing::info!("Using PostgreSQL store");
        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
        build_app(store, push, settings, session_store)
    } else {
        tracing::warn!("No database configured, data is kept in memory only");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        build_app(store, push, settings, tower_sessions::MemoryStore::default())
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = spawn_scheduler(app.state.clone(), shutdown_rx);

    let addr = app.state.settings.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app.router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown_tx.send(true).ok();
    scheduler.await.ok();
    tracing::info!("Server stopped");
    Ok(())
}

struct App {
    state: AppState,
    router: Router,
}

fn build_app<S>(
    store: Arc<dyn Store>,
    push: Arc<dyn PushSender>,
    settings: Settings,
    session_store: S,
) -> App
where
    S: SessionStore + Clone,
{
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(settings.session.secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(
            settings.session.inactivity_days,
        )));

    let state = AppState::new(store, push, settings);
    let router = api::router(state.clone())
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    App { state, router }
}

fn push_sender(settings: &Settings) -> Arc<dyn PushSender> {
    match FcmSender::from_settings(&settings.push) {
        Some(sender) => {
            tracing::info!("Push notifications go through FCM");
            Arc::new(sender)
        }
        None => {
            tracing::warn!("Push is not configured, notifications are only logged");
            Arc::new(LogSender)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
