mod analysis;
mod auth;
mod config;
mod db;
mod engine;
mod errors;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::broker::AnalysisBroker;
use crate::analysis::history::{HistoryStore, PgHistoryStore, UnconfiguredHistoryStore};
use crate::analysis::upload::TempStore;
use crate::auth::provider::{
    IdentityProvider, SupabaseIdentityProvider, UnconfiguredIdentityProvider,
};
use crate::config::Config;
use crate::db::create_pool;
use crate::engine::HttpAnalysisEngine;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (only a malformed PORT is fatal)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillLens API v{}", env!("CARGO_PKG_VERSION"));
    config.warn_on_degraded_features();

    // Staging directory for uploaded resumes
    let temp_store = TempStore::new(&config.upload_dir);
    temp_store.ensure_dir().await?;
    info!("Staging uploads in {}", temp_store.dir().display());

    // Analysis engine client
    let engine = Arc::new(HttpAnalysisEngine::new(config.analysis_engine_url.clone())?);
    info!("Analysis engine at {}", config.analysis_engine_url);

    // History store (degrades to unavailable without a reachable database)
    let history: Arc<dyn HistoryStore> = match &config.database_url {
        Some(url) => match create_pool(url).await {
            Ok(pool) => Arc::new(PgHistoryStore::new(pool)),
            Err(e) => {
                warn!("Database unavailable, history disabled: {e:#}");
                Arc::new(UnconfiguredHistoryStore)
            }
        },
        None => Arc::new(UnconfiguredHistoryStore),
    };

    // Identity provider
    let identity: Arc<dyn IdentityProvider> = match &config.supabase {
        Some(supabase) => {
            info!("Identity provider at {}", supabase.url);
            Arc::new(SupabaseIdentityProvider::new(supabase)?)
        }
        None => Arc::new(UnconfiguredIdentityProvider),
    };

    // Build app state
    let state = AppState {
        broker: AnalysisBroker::new(engine, history.clone()),
        history,
        identity,
        temp_store,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the deployed frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
