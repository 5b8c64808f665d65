#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use oathkeeper_login::{
    cache::{build_store, CacheStore},
    configure_o11y, configure_services,
    lifecycle::{Lifecycle, LifecycleState},
    providers::build_http_client,
    settings::LoginServerSettings,
    utils::logging::init_logger,
    LoginOrchestrator, ProviderRegistry, SessionResolver, VERSION,
};
use std::sync::Arc;
use tokio::signal;

/// Seconds in-flight requests get to finish once shutdown starts
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Settings.toml, LOGIN_SERVER_CONFIG_DIR and environment overrides
    let settings = LoginServerSettings::load().context("Failed to load settings")?;
    init_logger(&settings.logging).context("Failed to initialise logger")?;

    let lifecycle = Lifecycle::new();
    let ttl = settings.cache.ttl()?;
    let store = Arc::new(
        build_store(&settings.cache)
            .await
            .context("Failed to initialise session cache")?,
    );
    let client = build_http_client(&settings.upstream).context("Failed to build HTTP client")?;
    let registry = ProviderRegistry::from_settings(&settings, &client);
    if registry.is_empty() {
        log::warn!("No providers configured, every login and session route will answer 404");
    }

    print_startup_info(&settings, &registry, store.backend());

    let cache: Arc<dyn CacheStore> = store.clone();
    let resolver = web::Data::new(SessionResolver::new(cache, ttl));
    let orchestrator = web::Data::new(LoginOrchestrator::new());
    let registry = web::Data::new(registry);
    let store = web::Data::from(store);
    let lifecycle_data = web::Data::new(lifecycle.clone());

    let app_server = HttpServer::new(move || {
        App::new()
            .app_data(registry.clone())
            .app_data(resolver.clone())
            .app_data(orchestrator.clone())
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .disable_signals()
    .shutdown_timeout(SHUTDOWN_TIMEOUT_SECS)
    .bind(settings.get_bind_address())?
    .run();

    let o11y_server = HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(lifecycle_data.clone())
            .configure(configure_o11y)
    })
    .disable_signals()
    .workers(1)
    .bind(settings.get_o11y_bind_address())?
    .run();

    let app_handle = app_server.handle();
    let o11y_handle = o11y_server.handle();
    let mut app_task = actix_web::rt::spawn(app_server);
    let mut o11y_task = actix_web::rt::spawn(o11y_server);

    lifecycle.set(LifecycleState::Ready);

    tokio::select! {
        () = shutdown_signal() => {}
        result = &mut app_task => log::error!("Application server exited unexpectedly: {result:?}"),
        result = &mut o11y_task => log::error!("Observability server exited unexpectedly: {result:?}"),
    }

    lifecycle.set(LifecycleState::Draining);
    app_handle.stop(true).await;
    o11y_handle.stop(true).await;
    lifecycle.set(LifecycleState::Stopped);

    log::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => log::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

fn print_startup_info(settings: &LoginServerSettings, registry: &ProviderRegistry, backend: &str) {
    log::info!(
        "Starting oathkeeper-login {VERSION} on http://{}",
        settings.get_bind_address()
    );
    log::info!("Session cache: {backend}, ttl {}", settings.cache.ttl);
    for name in registry.names() {
        log::info!("  GET /login/{name}    GET /session/{name}");
    }
    log::info!(
        "Observability on http://{} (/health, /metrics)",
        settings.get_o11y_bind_address()
    );
}
