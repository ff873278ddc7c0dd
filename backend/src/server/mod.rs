//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;
mod settings;

pub use config::ServerConfig;
#[cfg(feature = "metrics")]
pub(crate) use metrics::make_metrics;
pub use settings::GatewaySettings;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use color_eyre::eyre::{Context, Result};
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use tracker_backend::Trace;
#[cfg(debug_assertions)]
use tracker_backend::doc::ApiDoc;
use tracker_backend::domain::DeviceGatewayService;
use tracker_backend::domain::ports::{DeviceGateway, StoreHealth};
use tracker_backend::inbound::http::devices;
use tracker_backend::inbound::http::health::{HealthState, live, ready};
use tracker_backend::inbound::http::state::HttpState;
use tracker_backend::outbound::memory::InMemoryDeviceStore;
use tracker_backend::outbound::persistence::{
    DbPool, DieselDeviceStore, PoolConfig, run_pending_migrations,
};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Gateway plus the store handle the readiness probe pings.
pub struct Backend {
    pub gateway: Arc<dyn DeviceGateway>,
    pub store_health: Arc<dyn StoreHealth>,
}

/// Build the gateway over PostgreSQL when a URL is configured, otherwise
/// over the in-memory store.
///
/// # Errors
/// Fails when migrations cannot be applied or the pool cannot be built.
pub async fn build_backend(settings: &GatewaySettings) -> Result<Backend> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let Some(database_url) = settings.database_url.as_deref() else {
        warn!("no database URL configured; device state will not survive a restart");
        let store = Arc::new(InMemoryDeviceStore::default());
        let gateway: Arc<dyn DeviceGateway> =
            Arc::new(DeviceGatewayService::new(store.clone(), store.clone(), clock));
        return Ok(Backend {
            gateway,
            store_health: store,
        });
    };

    if settings.run_migrations {
        run_pending_migrations(database_url)
            .await
            .wrap_err("failed to apply database migrations")?;
    }
    let pool = DbPool::new(
        PoolConfig::new(database_url).with_max_size(settings.db_max_connections()),
    )
    .await
    .wrap_err("failed to build database pool")?;
    info!(
        max_connections = settings.db_max_connections(),
        "using PostgreSQL device store"
    );
    let store = Arc::new(DieselDeviceStore::new(pool));
    let gateway: Arc<dyn DeviceGateway> =
        Arc::new(DeviceGatewayService::new(store.clone(), store.clone(), clock));
    Ok(Backend {
        gateway,
        store_health: store,
    })
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .configure(devices::configure)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and
/// configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        bind_addr,
        gateway,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;
    let http_state = web::Data::new(HttpState::new(gateway));
    #[cfg(feature = "metrics")]
    let prometheus = prometheus.ok_or_else(|| {
        std::io::Error::other("metrics feature enabled without a Prometheus middleware")
    })?;

    let server = HttpServer::new(move || {
        let app = build_app(server_health_state.clone(), http_state.clone());

        #[cfg(feature = "metrics")]
        let app = app.wrap(prometheus.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "device gateway listening");
    health_state.mark_ready();
    Ok(server)
}
