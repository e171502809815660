//! flashcardd: HTTP daemon wrapping the flashcard pipeline.

use std::sync::Arc;

use flashcard_rag::config::{self, Config};
use flashcard_rag::paths::{self, AppPaths};
use flashcard_rag::pipeline::Pipeline;
use flashcard_rag::server::{self, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,hnsw_rs=warn")
            }),
        )
        .init();

    let app_paths = AppPaths::resolve().unwrap_or_else(|e| {
        tracing::error!("failed to resolve XDG paths: {e}");
        std::process::exit(1);
    });

    let config_file = std::env::var_os("FLASHCARD_CONFIG")
        .map(Into::into)
        .or_else(|| app_paths.existing_config_file());
    let config = Config::load(config_file.as_deref(), &config::collect_env()).unwrap_or_else(|e| {
        tracing::error!("invalid configuration: {e}");
        std::process::exit(1);
    });

    let scratch_dir = config
        .server
        .scratch_dir
        .clone()
        .unwrap_or_else(|| app_paths.uploads_dir());
    if let Err(e) = paths::ensure_dir(&scratch_dir) {
        tracing::error!("failed to create scratch directory: {e}");
        std::process::exit(1);
    }

    let pipeline = Pipeline::from_config(&config).unwrap_or_else(|e| {
        tracing::error!("failed to configure pipeline: {e}");
        std::process::exit(1);
    });
    tracing::info!(?pipeline, scratch = %scratch_dir.display(), "flashcardd initialized");

    let state = Arc::new(AppState::new(pipeline, scratch_dir));
    let app = server::router(state, config.server.max_upload_mb * 1024 * 1024);

    let addr = config.server.addr();
    tracing::info!("flashcardd listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    // Serve with graceful shutdown on SIGTERM/SIGINT.
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let ctrl_c = tokio::signal::ctrl_c();
            #[cfg(unix)]
            {
                let mut sigterm =
                    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                        .expect("failed to register SIGTERM handler");
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            #[cfg(not(unix))]
            {
                ctrl_c.await.ok();
            }
            tracing::info!("flashcardd shutting down");
        })
        .await
        .expect("server error");
}
