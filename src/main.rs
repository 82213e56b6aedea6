//! # Order Admission Service
//!
//! Entry point: loads [`AdmissionConfig`] from the environment, starts the
//! [`OrderSystem`] and serves the HTTP API until Ctrl-C.
//!
//! With no `PRODUCT_SERVICE_URL` the in-process catalog is used and seeded with a few
//! demo products so the service can be exercised on its own:
//!
//! ```bash
//! RUST_LOG=info cargo run
//! curl -XPOST localhost:8080/orders -H 'content-type: application/json' \
//!      -d '{"productId": 1, "totalPrice": 1500}'
//! ```

use anyhow::Context;
use order_admission::api;
use order_admission::config::AdmissionConfig;
use order_admission::lifecycle::{setup_tracing, shutdown_signal, OrderSystem};
use order_admission::model::ProductCreate;
use tracing::{info, Instrument};

const DEMO_PRODUCTS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let config = AdmissionConfig::from_env();
    let port = config.port;
    let seed_catalog = config.product_service_url.is_none();

    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    info!(cpus, "Starting order service");
    let system = OrderSystem::start(config).await.context("failed to start order system")?;

    if seed_catalog {
        let span = tracing::info_span!("catalog_seed");
        async {
            for n in 1..=DEMO_PRODUCTS {
                let product = system
                    .products
                    .create_product(ProductCreate {
                        name: format!("Demo product {n}"),
                        price: 1000 * n as i64,
                        qty: 100,
                    })
                    .await
                    .context("failed to seed catalog")?;
                info!(product_id = %product.id, "Seeded product");
            }
            anyhow::Ok(())
        }
        .instrument(span)
        .await?;
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!(port, "Listening");

    axum::serve(listener, api::router(system.admission.clone()))
        .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c()))
        .await
        .context("server error")?;

    system.shutdown().await?;
    info!("Application completed successfully");
    Ok(())
}
