use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::domain::PositionRecord;
use crate::engine::ledger::PositionLedger;
use crate::engine::report::{render_positions, RISK_WARNING};
use crate::engine::straddle::{StraddleExecutor, StraddleOutcome};

pub struct AppState {
    pub executor: Arc<StraddleExecutor>,
    pub ledger: PositionLedger,
    pub start_time: Instant,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/strategy", get(strategy))
        .route("/api/positions", get(all_positions))
        .route("/api/sessions/{session_id}/straddle", post(execute_straddle))
        .route("/api/sessions/{session_id}/positions", get(session_positions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime_secs: u64,
    open_positions: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Bot is running",
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        open_positions: state.ledger.len().await,
    })
}

#[derive(Serialize)]
struct ExecuteResponse {
    report: String,
    outcome: StraddleOutcome,
}

async fn execute_straddle(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ExecuteResponse>, StatusCode> {
    // Detached so a dropped connection cannot abort a half-placed straddle.
    let executor = state.executor.clone();
    let handle = tokio::spawn(async move { executor.execute(&session_id).await });

    let outcome = handle.await.map_err(|e| {
        error!("Straddle execution task failed: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    info!(executed = outcome.is_executed(), "Straddle trigger handled");

    Ok(Json(ExecuteResponse {
        report: outcome.summary(),
        outcome,
    }))
}

#[derive(Serialize)]
struct PositionEntry {
    key: String,
    #[serde(flatten)]
    record: PositionRecord,
}

#[derive(Serialize)]
struct PositionsResponse {
    report: String,
    positions: Vec<PositionEntry>,
}

fn positions_response(positions: Vec<(String, PositionRecord)>) -> PositionsResponse {
    PositionsResponse {
        report: render_positions(&positions),
        positions: positions
            .into_iter()
            .map(|(key, record)| PositionEntry { key, record })
            .collect(),
    }
}

async fn all_positions(State(state): State<Arc<AppState>>) -> Json<PositionsResponse> {
    Json(positions_response(state.ledger.list_all().await))
}

async fn session_positions(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<PositionsResponse> {
    Json(positions_response(state.ledger.list_for_session(&session_id).await))
}

#[derive(Serialize)]
struct StrategyResponse {
    name: &'static str,
    description: &'static str,
    legs: [&'static str; 2],
    expiry: &'static str,
    stop_loss: &'static str,
    warning: &'static str,
}

async fn strategy() -> Json<StrategyResponse> {
    Json(StrategyResponse {
        name: "short_straddle",
        description: "Sells the at-the-money call and put on the same strike. \
                      Profits if BTC stays near the strike; time decay benefits the seller.",
        legs: ["1 lot ATM call (sell)", "1 lot ATM put (sell)"],
        expiry: "same-day",
        stop_loss: "reduce-only stop buy per leg at a 25% premium increase, triggered on mark price",
        warning: RISK_WARNING,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::delta::DeltaClient;
    use crate::adapters::notifier::LogNotifier;
    use crate::config::{ExchangeConfig, StrategyConfig};
    use crate::domain::{ContractType, Instrument};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::TimeZone;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_state(base_url: &str) -> Arc<AppState> {
        let client = DeltaClient::new(ExchangeConfig::new(base_url, "test-key", "secret")).unwrap();
        let ledger = PositionLedger::new();
        let executor = StraddleExecutor::new(
            Arc::new(client),
            Arc::new(LogNotifier),
            ledger.clone(),
            StrategyConfig::default(),
        );
        Arc::new(AppState {
            executor: Arc::new(executor),
            ledger,
            start_time: Instant::now(),
        })
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn seeded_record(session_id: &str) -> PositionRecord {
        let leg = |kind| Instrument {
            symbol: "C-BTC-67000-181026".into(),
            strike_price: 67000.0,
            contract_type: kind,
            product_id: 1,
            mark_price: 400.0,
        };
        PositionRecord {
            session_id: session_id.into(),
            call: leg(ContractType::Call),
            put: leg(ContractType::Put),
            call_order_id: "1".into(),
            put_order_id: "2".into(),
            call_stop_order_id: Some("3".into()),
            put_stop_order_id: Some("4".into()),
            premium_collected: 800.0,
            expiry_date: "18-10-2026".into(),
            needs_reconciliation: false,
            created_at: Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(app_state("http://127.0.0.1:9"));
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "Bot is running");
        assert_eq!(body["open_positions"], 0);
    }

    #[tokio::test]
    async fn test_positions_empty_and_seeded() {
        let state = app_state("http://127.0.0.1:9");
        let resp = router(state.clone())
            .oneshot(Request::builder().uri("/api/positions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["report"], "📊 No active positions found.");

        state.ledger.record("alice_1".into(), seeded_record("alice")).await;
        state.ledger.record("bob_1".into(), seeded_record("bob")).await;

        let resp = router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/sessions/alice/positions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(resp).await;
        let positions = body["positions"].as_array().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0]["key"], "alice_1");
        assert_eq!(positions[0]["session_id"], "alice");
        assert!(body["report"].as_str().unwrap().contains("🎯 Strike: $67,000"));
    }

    #[tokio::test]
    async fn test_execute_straddle_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/indices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": [{ "symbol": ".DEXBTUSD" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/tickers/.DEXBTUSD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": { "mark_price": "67080.0" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/tickers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": [
                    { "symbol": "C-BTC-67000", "strike_price": "67000", "contract_type": "call_options", "product_id": 101, "mark_price": "120" },
                    { "symbol": "P-BTC-67000", "strike_price": "67000", "contract_type": "put_options", "product_id": 102, "mark_price": "80" },
                    { "symbol": "C-BTC-67200", "strike_price": "67200", "contract_type": "call_options", "product_id": 103, "mark_price": "60" },
                    { "symbol": "P-BTC-67200", "strike_price": "67200", "contract_type": "put_options", "product_id": 104, "mark_price": "140" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": { "id": 555 }
            })))
            .expect(4)
            .mount(&server)
            .await;

        let state = app_state(&server.uri());
        let resp = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sessions/42/straddle")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["outcome"]["status"], "executed");
        let report = body["report"].as_str().unwrap();
        assert!(report.contains("Strike Price: $67,000"));
        assert!(report.contains("Premium Collected: ~$200.00"));
        assert_eq!(state.ledger.list_for_session("42").await.len(), 1);

        let requests = server.received_requests().await.unwrap();
        let stop_bodies: Vec<serde_json::Value> = requests
            .iter()
            .filter(|r| r.url.path() == "/v2/orders")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .filter(|b: &serde_json::Value| b.get("stop_price").is_some())
            .collect();
        assert_eq!(stop_bodies.len(), 2);
        assert_eq!(stop_bodies[0]["stop_price"], "150.0");
        assert_eq!(stop_bodies[1]["stop_price"], "100.0");
    }

    #[tokio::test]
    async fn test_execute_straddle_renders_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/indices"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let resp = router(app_state(&server.uri()))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sessions/42/straddle")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["outcome"]["status"], "failed");
        assert!(body["report"]
            .as_str()
            .unwrap()
            .starts_with("❌ Error executing short straddle: exchange returned HTTP 500"));
    }
}
