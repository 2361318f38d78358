use anyhow::Context;
use docsum::{
    api, config,
    config::DEFAULT_PORT,
    logging,
    service::DocumentService,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_config().context("Failed to load configuration")?;
    logging::init_tracing();

    let service = DocumentService::from_config(config::get_config())
        .context("Failed to initialize document service")?;
    let app = api::create_router(Arc::new(service));

    let (listener, port) = bind_listener()
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    let port = config::get_config().server_port.unwrap_or(DEFAULT_PORT);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    tracing::debug!(port, "Bound server port");
    Ok((listener, port))
}
