use guardrail_orchestrator::{app, AppState, OrchestratorConfig};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = OrchestratorConfig::from_env();
    let bind_addr = config.bind_addr();
    let shutdown_grace = config.shutdown_grace;
    let state = AppState::new(config);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%err, %bind_addr, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%bind_addr, "orchestrator listening");

    let router = app(state.clone());
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state, shutdown_grace))
        .await;

    if let Err(err) = result {
        tracing::error!(%err, "server exited with error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(state: AppState, _grace: std::time::Duration) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("draining before shutdown");
    state.start_draining();
}
