use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;

use config::{BusKind, Config};
use dbus_interface::{FaceAuthInterface, BUS_NAME, OBJECT_PATH};
use faceauth_core::FaceAuthService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    tracing::info!(
        backend = ?config.store_backend,
        path = %config.store_path.display(),
        threshold = config.match_threshold,
        bus = ?config.bus,
        "faceauthd starting"
    );

    let store = faceauth_core::open_store(config.store_backend, &config.store_path);
    let service = FaceAuthService::new(store).with_threshold(config.match_threshold);

    let status = service.enrollment_status();
    tracing::info!(
        enrolled = status.enrolled,
        display_name = status.display_name.as_deref().unwrap_or("-"),
        "identity store loaded"
    );

    let interface = FaceAuthInterface::new(Arc::new(service), tokio::runtime::Handle::current());

    let builder = match config.bus {
        BusKind::Session => zbus::connection::Builder::session()?,
        BusKind::System => zbus::connection::Builder::system()?,
    };
    let _connection = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, interface)?
        .build()
        .await
        .with_context(|| format!("claiming {BUS_NAME} on the {:?} bus", config.bus))?;

    tracing::info!(name = BUS_NAME, path = OBJECT_PATH, "faceauthd ready");

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("faceauthd shutting down");

    Ok(())
}
