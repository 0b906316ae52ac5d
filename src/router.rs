use crate::{
    api::WeddingBackend,
    config::Config,
    error::AppError,
    routes::{
        pages::{index, not_found, our_story, venue},
        registry::{registry, submit_donation},
        rsvp::{add_member, remove_member, reset, rsvp, submit_code, submit_rsvp},
    },
    util::asset_loader::AssetLoader,
};
use axum::{
    Router,
    response::Html,
    routing::{get, get_service, post},
};
use minijinja::Environment;
use serde::Serialize;
use std::sync::Arc;
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer,
    cookie::{SameSite, time},
};

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn WeddingBackend>,
    pub templates: Arc<Environment<'static>>,
    pub config: Arc<Config>,
    /// The store behind the session layer, read directly when a handler needs
    /// to see writes made by concurrent requests.
    pub sessions: MemoryStore,
}

impl AppState {
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, AppError> {
        let tmpl = self.templates.get_template(name)?;
        Ok(Html(tmpl.render(ctx)?))
    }
}

pub fn create_router(config: Config, backend: Arc<dyn WeddingBackend>) -> Router {
    let templates = setup_templates(&config);
    let sessions = MemoryStore::default();
    let static_dir = config.static_dir.clone();

    let state = AppState {
        backend,
        templates: Arc::new(templates),
        config: Arc::new(config),
        sessions: sessions.clone(),
    };

    let session_layer = SessionManagerLayer::new(sessions)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    Router::new()
        .route("/", get(index))
        .route("/our-story", get(our_story))
        .route("/venue", get(venue))
        .route("/rsvp", get(rsvp).post(submit_rsvp))
        .route("/rsvp/code", post(submit_code))
        .route("/rsvp/members", post(add_member))
        .route("/rsvp/members/{index}/remove", post(remove_member))
        .route("/rsvp/reset", post(reset))
        .route("/registry", get(registry))
        .route("/registry/donations", post(submit_donation))
        .fallback(not_found)
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new(static_dir)))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

fn setup_templates(config: &Config) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(config.template_dir.clone()));
    env.add_global(
        "wedding_date",
        config.wedding_date.format("%B %-d, %Y").to_string(),
    );
    env.add_global(
        "rsvp_deadline",
        config.rsvp_deadline.format("%B %-d, %Y").to_string(),
    );
    AssetLoader::new(&config.static_dir).register(&mut env);
    env
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}
