//! Gateway entry-point: loads settings, selects the device store and serves
//! the device protocol, health probes and (in debug builds) OpenAPI docs.

mod server;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use server::{Backend, GatewaySettings, ServerConfig, build_backend, create_server};
use tracker_backend::inbound::http::health::HealthState;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = GatewaySettings::load().wrap_err("failed to load gateway settings")?;
    let bind_addr = settings
        .bind_addr()
        .wrap_err("TRACKER_HOST must be an IP address")?;
    let Backend {
        gateway,
        store_health,
    } = build_backend(&settings).await?;

    let config = ServerConfig::new(bind_addr, gateway);
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(Some(server::make_metrics()?));

    let health_state = web::Data::new(HealthState::new().with_store(store_health));
    let server = create_server(health_state.clone(), config)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    server.await.wrap_err("server terminated unexpectedly")?;
    health_state.mark_unhealthy();
    Ok(())
}
