use actix_web::{App, HttpServer};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_lifecycle::api::configure_order_routes;
use order_lifecycle::clients::{HttpUserDirectory, UserDirectoryClient};
use order_lifecycle::config::Settings;
use order_lifecycle::domain::order::OrderLifecycleService;
use order_lifecycle::messaging::{PaymentEventConsumer, PaymentEventHandler};
use order_lifecycle::metrics::{self, Metrics};
use order_lifecycle::store::{ensure_schema, ScyllaItemStore, ScyllaOrderStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, overridable with RUST_LOG
    // Example: RUST_LOG=order_lifecycle=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_lifecycle=debug"))
        )
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(http_addr = %settings.http_addr, "Starting order lifecycle service");

    // === 1. ScyllaDB session and schema ===
    tracing::info!(nodes = ?settings.scylla_nodes, "Connecting to ScyllaDB...");
    let session: Session = SessionBuilder::new()
        .known_nodes(&settings.scylla_nodes)
        .build()
        .await?;
    ensure_schema(&session, &settings.scylla_keyspace).await?;
    let session = Arc::new(session);

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // Metrics HTTP server gets its own runtime thread
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = settings.metrics_port;
    std::thread::spawn(move || {
        let result = tokio::runtime::Runtime::new()
            .map_err(anyhow::Error::from)
            .and_then(|rt| {
                rt.block_on(metrics::start_metrics_server(metrics_registry, metrics_port))
                    .map_err(anyhow::Error::from)
            });
        if let Err(e) = result {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 3. User directory behind its circuit breaker ===
    let directory = HttpUserDirectory::new(&settings.user_service_base_url, settings.user_service_timeout)?;
    let users = UserDirectoryClient::new(
        Arc::new(directory),
        settings.user_circuit_breaker.clone(),
        metrics.clone(),
    );

    // === 4. Lifecycle service ===
    let service = Arc::new(OrderLifecycleService::new(
        Arc::new(ScyllaOrderStore::new(session.clone())),
        Arc::new(ScyllaItemStore::new(session.clone())),
        users,
        metrics.clone(),
    ));

    // === 5. Payment events ===
    let consumer = PaymentEventConsumer::new(
        &settings.kafka_brokers,
        &settings.payment_group_id,
        &settings.payment_topic,
    )?;
    let handler = Arc::new(PaymentEventHandler::new(service.clone(), metrics.clone()));
    tokio::spawn(consumer.run(handler));

    // === 6. HTTP API ===
    tracing::info!(addr = %settings.http_addr, "HTTP API listening");
    HttpServer::new(move || App::new().configure(configure_order_routes(service.clone())))
        .bind(settings.http_addr)?
        .run()
        .await?;

    Ok(())
}
