//! Exposes this process's `hds_demux` counters (download attempts, retries,
//! successes, aborts) as a `/metrics` Prometheus text endpoint.
//!
//! Grounded on `scuffle_metrics::prometheus`'s own
//! `PrometheusExporter`/`Registry` wiring (its test module builds the exact
//! exporter → registry → `SdkMeterProvider` pipeline this reproduces for a
//! real HTTP server instead of an in-test buffer).

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus_client::registry::Registry;
use tokio::sync::Mutex;

#[derive(Clone)]
struct AppState {
    registry: std::sync::Arc<Mutex<Registry>>,
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut buffer = String::new();
    let registry = state.registry.lock().await;
    match prometheus_client::encoding::text::encode(&mut buffer, &registry) {
        Ok(()) => ([("content-type", "application/openmetrics-text; version=1.0.0; charset=utf-8")], buffer).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode prometheus metrics");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Initializes the global OpenTelemetry meter provider with a Prometheus
/// exporter and serves it at `http://{addr}/metrics` in the background.
///
/// Returns the spawned server task; dropping it (or aborting it) stops the
/// server, but does not tear down the meter provider.
pub fn init(addr: SocketAddr) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let exporter = scuffle_metrics::prometheus::exporter().build();

    let mut registry = Registry::default();
    registry.register_collector(exporter.collector());

    let provider = SdkMeterProvider::builder()
        .with_reader(exporter)
        .with_resource(Resource::builder().with_attribute(KeyValue::new("service.name", "hds-cli")).build())
        .build();
    opentelemetry::global::set_meter_provider(provider);

    let state = AppState {
        registry: std::sync::Arc::new(Mutex::new(registry)),
    };
    let app = Router::new().route("/metrics", get(metrics_handler)).with_state(state);

    let listener = std::net::TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(listener)?;

    Ok(tokio::spawn(async move {
        tracing::info!(%addr, "serving prometheus metrics");
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "metrics server exited");
        }
    }))
}
