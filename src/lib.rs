pub mod auth;
pub mod config;
pub mod err;
pub mod method;
pub mod models;
pub mod pages;
pub mod session;
pub mod siswa;
pub mod store;
pub mod validation;
pub mod views;

use std::sync::Arc;

use anyhow::Context;
use axum::body::Body;
use axum::handler::Handler;
use axum::http::Request;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Router};
use tokio::signal;
use tower::make::Shared;
use tower::util::{MapRequest, MapRequestLayer};
use tower::Layer;

pub use crate::config::Config;
pub use crate::err::Error;
use crate::session::SessionStore;
use crate::store::{DynStore, MemoryStore, PgStore};

pub type Page = Result<Response, Error>;

pub fn renders(html: String) -> Page {
    Ok(Html(html).into_response())
}

pub fn redirects(to: &str) -> Page {
    Ok(Redirect::to(to).into_response())
}

pub struct AppState {
    pub store: DynStore,
    pub sessions: SessionStore,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(store: DynStore, session_ttl: chrono::Duration) -> SharedState {
        Arc::new(Self {
            store,
            sessions: SessionStore::new(session_ttl),
        })
    }
}

/// The router wrapped in the method override, ready to be served.
pub type App = MapRequest<Router, fn(Request<Body>) -> Request<Body>>;

pub fn app(state: SharedState) -> App {
    let router = Router::new()
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route(
            "/siswa",
            get(siswa::list_siswa)
                .post(siswa::create_siswa)
                .put(siswa::update_siswa)
                .delete(siswa::delete_siswa),
        )
        .route("/siswa/add", get(siswa::add_form))
        .route("/siswa/edit/:nisn", get(siswa::edit_form))
        .fallback(err::handler404.into_service())
        .layer(Extension(state));

    let override_method: fn(Request<Body>) -> Request<Body> = method::override_method;
    MapRequestLayer::new(override_method).layer(router)
}

async fn open_store(config: &Config) -> anyhow::Result<DynStore> {
    if config.uses_memory_store() {
        log::warn!("Using in-memory store, records will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pg = PgStore::connect(&config.database_url)
        .await
        .context("Could not connect to the database")?;
    pg.prepare().await.context("Could not prepare the database schema")?;
    log::info!("Database connected");
    Ok(Arc::new(pg))
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    auth::bootstrap(store.as_ref(), &config.admin_username, &config.admin_password).await?;

    let state = AppState::new(store, config.session_ttl()?);
    let addr = config.addr();
    log::info!("Starting siswa admin panel on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(Shared::new(app(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                log::error!("Failed to install signal handler: {}", err);
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
}
