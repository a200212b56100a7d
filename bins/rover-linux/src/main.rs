use rover_server::{FileStorage, RuntimeConfig, SimulatedRover, UdpControl};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,rover_server=debug,rover_core=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Rover starting...");

    let config = RuntimeConfig::from_env()?;
    let storage = FileStorage::open(&config.state_file)?;
    tracing::info!("persisted state in {}", config.state_file.display());

    let SimulatedRover {
        mut controller,
        handle,
        ..
    } = SimulatedRover::new(Box::new(storage), &config);
    controller.boot()?;
    let controller_handle = controller.spawn();

    // UDP control listener
    let udp = UdpControl::bind(config.udp_addr).await?;
    let udp_controller = handle.clone();
    let udp_handle = tokio::spawn(async move {
        if let Err(e) = udp.run(udp_controller).await {
            tracing::error!("UDP listener error: {}", e);
        }
    });

    // HTTP API
    let app = rover_web::create_router(handle).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);
    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tracing::info!("Rover ready");
    tracing::info!("   curl http://{}/config", config.http_addr);
    tracing::info!("   curl http://{}/status?details", config.http_addr);

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = controller_handle => {
            tracing::warn!("Controller stopped");
        }
        _ = udp_handle => {
            tracing::warn!("UDP listener stopped");
        }
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
