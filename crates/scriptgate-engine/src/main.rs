//! scriptgate engine binary.
//!
//! - Config: first CLI argument, else `SCRIPTGATE_CONFIG`, else `scriptgate.yaml`
//! - Logging: `RUST_LOG` via tracing-subscriber `EnvFilter`
//! - Ctrl-C / SIGTERM flips readiness to draining, then shuts down gracefully

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use scriptgate_core::error::{Result, ScriptGateError};
use scriptgate_engine::{app_state::AppState, config, router};

const DEFAULT_CONFIG_PATH: &str = "scriptgate.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SCRIPTGATE_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.server.listen.parse().map_err(|e| {
        ScriptGateError::Config(format!("server.listen must be a valid SocketAddr: {e}"))
    })?;

    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "scriptgate-engine starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ScriptGateError::Io(format!("bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| ScriptGateError::Io(format!("server failed: {e}")))?;

    tracing::info!("scriptgate-engine stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
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
    state.set_draining();
    tracing::info!("signal received, draining");
}
