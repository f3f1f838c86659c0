//! Duelhall Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duelhall_domain::ChessRules;
use duelhall_engine::{api, infrastructure::app_settings::EngineSettings, App};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine is usually run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duelhall_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Duelhall Engine");

    let settings = EngineSettings::from_env();
    tracing::info!(
        ping_period_ms = settings.ping_period.as_millis() as u64,
        pong_wait_ms = settings.pong_wait.as_millis() as u64,
        mailbox_capacity = settings.mailbox_capacity,
        "Liveness configured"
    );

    let addr = settings.socket_addr()?;
    let cors = build_cors_layer(&settings);

    let app = Arc::new(App::with_system_ports(settings, Arc::new(ChessRules::new())));

    let mut router = api::router(app).layer(TraceLayer::new_for_http());
    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer(settings: &EngineSettings) -> Option<CorsLayer> {
    let allowed_origins = settings.cors_allowed_origins.as_deref()?;

    // Browsers only preflight the upgrade and the health probe.
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);

    if allowed_origins == "*" {
        return Some(cors.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(value = allowed_origins, "No usable CORS origins, CORS disabled");
        return None;
    }

    Some(cors.allow_origin(origins))
}
