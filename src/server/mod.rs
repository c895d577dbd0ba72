//! Status API — Axum web server over the persisted wallet state.
//!
//! Read-only: the cycle runner owns all writes; this server only projects
//! the state document. CORS enabled for local dashboards.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/bot/status", get(routes::get_status))
        .route("/api/bot/trades", get(routes::get_trades))
        .route("/api/bot/trades/:index", get(routes::get_trade))
        .route("/api/bot/performance", get(routes::get_performance))
        .route("/api/bot/state", get(routes::get_state))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve the status API. Blocks until the server stops.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    info!(port, "Status API listening on http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind status API port {port}"))?;

    axum::serve(listener, app)
        .await
        .context("Status API server error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StateStore;
    use crate::types::BotState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use routes::ApiState;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state(seed: bool) -> AppState {
        let mut p = std::env::temp_dir();
        p.push(format!("midas_server_test_{}", uuid::Uuid::new_v4()));
        let store = StateStore::new(p);
        if seed {
            let mut bot = BotState::new("w1", dec!(10000));
            store.save(&mut bot).unwrap();
        }
        Arc::new(ApiState {
            store,
            wallet: "w1".to_string(),
        })
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state(false));
        let (status, _) = get(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let app = build_router(test_state(true));
        let (status, body) = get(app, "/api/bot/status").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["wallet_name"], "w1");
        assert!(json["current_capital"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_status_404_when_no_state() {
        let app = build_router(test_state(false));
        let (status, _) = get(app, "/api/bot/status").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_trades_endpoint_with_query() {
        let app = build_router(test_state(true));
        let (status, body) = get(app, "/api/bot/trades?page=1&per_page=10").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total"], 0);
        assert_eq!(json["per_page"], 10);
    }

    #[tokio::test]
    async fn test_trade_by_index_404() {
        let app = build_router(test_state(true));
        let (status, _) = get(app, "/api/bot/trades/0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_performance_endpoint() {
        let app = build_router(test_state(true));
        let (status, body) = get(app, "/api/bot/performance").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["win_rate"], 0.0);
    }

    #[tokio::test]
    async fn test_full_state_endpoint() {
        let app = build_router(test_state(true));
        let (status, body) = get(app, "/api/bot/state").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["trade_history"].is_array());
    }
}
