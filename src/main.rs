use cx_health::runtime::RuntimeContext;
use cx_health::settings::Settings;
use cx_health::{http, logging};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let settings = Settings::load();
    let bind_addr = settings.bind_addr.clone();

    let context = Arc::new(RuntimeContext::init(settings).await?);
    context.ensure_background_services();

    let router = http::build_router(context);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
