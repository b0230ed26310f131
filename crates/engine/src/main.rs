//! ComfyDeck Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comfydeck_engine::app::{App, WebAssets};
use comfydeck_engine::api;
use comfydeck_engine::infrastructure::{
    comfyui::ComfyUIClient,
    config::AppConfig,
    images::ImagePreviews,
    random::SystemRandom,
    settings::JsonSettingsStore,
    tags::load_tag_index,
    workflows::FsWorkflowStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` files live at the workspace root, not in `crates/engine`.
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comfydeck_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ComfyDeck Engine");

    // Load configuration
    let config = AppConfig::load(&std::env::current_dir()?)?;
    tracing::info!(
        endpoint = %config.comfyui_endpoint,
        workflows = %config.workflow_dir.display(),
        "ComfyUI backend configured"
    );

    // Create infrastructure clients
    let comfy = Arc::new(ComfyUIClient::new(
        &config.comfyui_endpoint,
        config.request_timeout,
    ));
    let workflows = Arc::new(FsWorkflowStore::new(&config.workflow_dir));
    let settings_repo = Arc::new(JsonSettingsStore::new(&config.settings_path));

    let tags = load_tag_index(&config.tags_path()).await;
    tracing::info!(count = tags.len(), "Autocomplete tags loaded");

    // Create application
    let app = Arc::new(App::new(
        comfy,
        workflows,
        settings_repo,
        Arc::new(SystemRandom::new()),
        config.poll_interval,
        WebAssets {
            dist_dir: config.dist_dir.clone(),
            previews: ImagePreviews::new(config.output_folder.clone(), config.temp_folder.clone()),
            tags,
        },
    ));

    // Restore settings and the last workflow before serving
    match app.use_cases.workflow.start.execute().await {
        Some(name) => tracing::info!(workflow = %name, "Session ready"),
        None => tracing::warn!("No workflow templates found"),
    }

    let mut router = api::http::router(app).layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer(config.cors_allowed_origins.as_deref()) {
        router = router.layer(cors);
    }

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

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

fn build_cors_layer(allowed_origins: Option<&str>) -> Option<CorsLayer> {
    let allowed_origins = allowed_origins.map(str::trim).filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
