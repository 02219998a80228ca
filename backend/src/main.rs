//! Backend entry-point: loads settings, prepares the database and serves the
//! REST API.

mod server;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use careplan::inbound::http::health::HealthState;
use careplan::inbound::http::session_config::{
    BuildMode, key_fingerprint, session_settings_from_env,
};
use careplan::outbound::persistence::{DbPool, run_migrations};
use server::{AppSettings, ServerConfig, create_server};

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

    let settings = AppSettings::load().wrap_err("failed to load settings")?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .wrap_err("invalid session configuration")?;
    info!(
        fingerprint = %key_fingerprint(&session.key),
        "session signing key loaded"
    );

    let bind_addr = settings.bind_addr()?;
    let pool_config = settings.pool_config()?;
    if settings.run_migrations {
        run_migrations(pool_config.database_url())
            .await
            .wrap_err("failed to apply migrations")?;
    }
    let db_pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to build database pool")?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(session, bind_addr, db_pool),
    )?;
    info!(%bind_addr, "listening");

    // Fail both probes before the listener stops accepting.
    let handle = server.handle();
    actix_web::rt::spawn(async move {
        if actix_web::rt::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested; draining");
            health_state.mark_unhealthy();
            handle.stop(true).await;
        }
    });

    server.await?;
    Ok(())
}
