// Scrape endpoint - serves the registry at `GET /metrics` until shutdown.

use super::prometheus_metrics::PrometheusMetrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

async fn scrape(State(metrics): State<Arc<PrometheusMetrics>>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

pub fn metrics_router(metrics: Arc<PrometheusMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .fallback(not_found)
        .with_state(metrics)
}

/// Serve the scrape endpoint on `listener`. Returns once `shutdown` fires.
pub async fn serve_metrics(
    listener: TcpListener,
    metrics: Arc<PrometheusMetrics>,
    shutdown: CancellationToken,
) {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Metrics server listening");
    }

    let server = axum::serve(listener, metrics_router(metrics))
        .with_graceful_shutdown(async move { shutdown.cancelled().await });

    if let Err(e) = server.await {
        tracing::error!(error = %e, "Metrics server failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::ModerationMetrics;
    use std::time::Duration;

    async fn start() -> (String, Arc<PrometheusMetrics>, CancellationToken, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let metrics = Arc::new(PrometheusMetrics::new());
        let token = CancellationToken::new();
        let handle = tokio::spawn(serve_metrics(listener, metrics.clone(), token.clone()));
        (base, metrics, token, handle)
    }

    #[tokio::test]
    async fn test_scrape_exposes_live_values() {
        let (base, metrics, token, _handle) = start().await;
        metrics.set_active_mutes(4);
        metrics.inc_deleted_messages("link_filter");

        let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body = response.text().await.unwrap();
        assert!(body.contains("moderation_active_mutes 4"));
        assert!(body.contains("moderation_deleted_messages_total{reason=\"link_filter\"} 1"));

        // Values written later show up on the next scrape
        metrics.set_active_mutes(1);
        let body = reqwest::get(format!("{}/metrics", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("moderation_active_mutes 1"));

        token.cancel();
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (base, _, token, _handle) = start().await;

        let response = reqwest::get(format!("{}/", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        token.cancel();
    }

    #[tokio::test]
    async fn test_stops_on_cancel() {
        let (_, _, token, handle) = start().await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("server should stop promptly")
            .unwrap();
    }
}
