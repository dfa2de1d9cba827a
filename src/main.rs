use clap::Parser; // for cli
use flood_alert_relay::{AppState, Args, app};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional, real environment wins
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = &dotenv {
        if !e.not_found() {
            warn!(error = %e, "failed to load .env file");
        }
    }

    // parse and check config, nothing is served if this fails
    let args = Args::parse();
    args.validate()?;

    let state = Arc::new(AppState::from_args(&args)?);

    // spawn the background sweeper
    if state.gates().next().is_some() {
        tokio::spawn(app::sweep_expired(state.clone(), args.sweep_interval()));
    }

    let app = app::router(state);

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "Server running on http://localhost:{}", args.port);
    info!(url = %args.overpass_url, "Forwarding evacuation center queries");
    info!(
        alert_rate_limit = args.alert_rate_limit,
        evac_rate_limit = args.evac_rate_limit,
        "Rate limit: {} requests per {} seconds",
        args.rate_limit,
        args.rate_window
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
