//! # REST API
//!
//! Builds the axum router for the order gateway. All endpoints share
//! application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                           | Description                          |
//! |--------|--------------------------------|--------------------------------------|
//! | GET    | `/health`                      | Liveness probe                       |
//! | GET    | `/status`                      | Gateway status summary               |
//! | POST   | `/orders`                      | Create a purchase order              |
//! | GET    | `/orders/:id`                  | Poll order status                    |
//! | POST   | `/orders/:id/fulfill`          | Fulfill a paid order, issue secret   |
//! | POST   | `/callbacks/payment-observed`  | Settlement watcher: payment seen     |
//! | POST   | `/callbacks/payment-confirmed` | Settlement watcher: confirmations in |
//! | POST   | `/resources/:resource/records` | Apply a record change (secret-gated) |
//!
//! ## Error discipline
//!
//! The record endpoint returns one constant 401 body for every
//! authorization failure — unknown resource, wrong secret, malformed
//! secret. Anything more specific turns the endpoint into a probe for
//! which resources exist.

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use umbra_core::external::{RecordBackend, RecordChange};
use umbra_core::order::{Currency, OrderId, Resource};
use umbra_core::{CoreError, OrderLifecycleManager, OwnershipRegistry, StatusSnapshot};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The gateway's reported version string.
    pub version: String,
    /// Order lifecycle manager — the concurrent core of the gateway.
    pub manager: Arc<OrderLifecycleManager>,
    /// Ownership registry consulted for record authorization.
    pub registry: Arc<OwnershipRegistry>,
    /// Record backend invoked after authorization succeeds.
    pub records: Arc<dyn RecordBackend>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// When this gateway process started.
    pub started_at: chrono::DateTime<chrono::Utc>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/orders", post(create_order_handler))
        .route("/orders/:id", get(order_status_handler))
        .route("/orders/:id/fulfill", post(fulfill_handler))
        .route("/callbacks/payment-observed", post(payment_observed_handler))
        .route(
            "/callbacks/payment-confirmed",
            post(payment_confirmed_handler),
        )
        .route("/resources/:resource/records", post(record_change_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request Types
// ---------------------------------------------------------------------------

/// Request body for `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// The resource to purchase, in `name.tld` form.
    pub resource: String,
    /// Settlement currency code (case-insensitive): BTC, XMR, or ETH.
    pub currency: String,
}

/// Request body for `POST /callbacks/payment-observed`.
#[derive(Debug, Deserialize)]
pub struct PaymentObservedRequest {
    /// The order the watcher matched the deposit to.
    pub order_id: OrderId,
    /// Observed amount in atomic units.
    pub amount: u64,
    /// On-chain transaction reference.
    pub tx_ref: String,
}

/// Request body for `POST /callbacks/payment-confirmed`.
#[derive(Debug, Deserialize)]
pub struct PaymentConfirmedRequest {
    /// The order whose payment reached the confirmation threshold.
    pub order_id: OrderId,
}

/// Request body for `POST /resources/:resource/records`.
#[derive(Debug, Deserialize)]
pub struct RecordChangeRequest {
    /// The owner's secret, hex-encoded. Proves ownership; never stored.
    pub secret: String,
    /// Record type, e.g. `A`, `AAAA`, `MX`, `TXT`.
    pub record_type: String,
    /// Record name relative to the zone apex.
    pub name: String,
    /// Record value.
    pub value: String,
    /// TTL in seconds.
    pub ttl: u32,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Gateway software version.
    pub version: String,
    /// Orders currently tracked, live and terminal.
    pub tracked_orders: usize,
    /// Resources with a bound ownership commitment.
    pub bound_resources: usize,
    /// Payments flagged against dead deposit targets.
    pub unmatched_deposits: usize,
    /// Seconds since process start.
    pub uptime_secs: i64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `POST /orders`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderCreatedResponse {
    /// The new order's identifier.
    pub order_id: OrderId,
    /// Canonical resource name.
    pub resource: String,
    /// Settlement currency.
    pub currency: String,
    /// Quoted price in atomic units.
    pub price: u64,
    /// Minimum acceptable payment after the underpayment tolerance.
    pub min_accepted: u64,
    /// The one-time deposit target to pay.
    pub deposit_target: String,
    /// Current order status.
    pub status: String,
}

/// Response payload for `POST /orders/:id/fulfill`.
///
/// The only place the secret ever crosses the wire, and only once: the
/// gateway retains the commitment, not the secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveredResponse {
    /// The delivered order.
    pub order_id: OrderId,
    /// Canonical resource name.
    pub resource: String,
    /// The owner's secret, hex-encoded. Shown once, never retrievable again.
    pub secret: String,
    /// The commitment bound as the ownership record.
    pub commitment: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// The constant body for every authorization failure on the record
/// endpoint. One shape, one message, no detail.
const UNAUTHORIZED_BODY: &str = "unauthorized";

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Maps a [`CoreError`] to an HTTP response.
///
/// Duplicate creates get `429` with a `Retry-After` header so well-behaved
/// clients back off instead of hammering. Credential failures collapse to
/// the opaque 401.
fn error_response(err: CoreError) -> Response {
    if err.is_credential_failure() {
        return unauthorized();
    }

    let status = match &err {
        CoreError::DuplicateOrderAttempt { .. } => StatusCode::TOO_MANY_REQUESTS,
        CoreError::UnknownOrder => StatusCode::NOT_FOUND,
        CoreError::InsufficientPayment { .. } => StatusCode::ACCEPTED,
        CoreError::InvalidResource { .. } | CoreError::UnsupportedCurrency { .. } => {
            StatusCode::BAD_REQUEST
        }
        CoreError::ResourceUnavailable
        | CoreError::InvalidTransition { .. }
        | CoreError::AlreadyBound => StatusCode::CONFLICT,
        CoreError::ProvisioningFailure { .. } => StatusCode::BAD_GATEWAY,
        CoreError::InvalidSecret => StatusCode::UNAUTHORIZED,
    };

    let body = Json(ErrorResponse {
        error: err.to_string(),
    });

    match err.retry_after_secs() {
        Some(secs) => (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response(),
        None => (status, body).into_response(),
    }
}

/// The single opaque authorization failure response.
fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: UNAUTHORIZED_BODY.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the gateway is alive.
///
/// Liveness probe for orchestrators. It intentionally does not check
/// collaborator health — that belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns a gateway status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let resp = StatusResponse {
        version: state.version.clone(),
        tracked_orders: state.manager.order_count(),
        bound_resources: state.registry.len(),
        unmatched_deposits: state.manager.unmatched_deposits().len(),
        uptime_secs: now.signed_duration_since(state.started_at).num_seconds(),
        timestamp: now.to_rfc3339(),
    };
    Json(resp)
}

/// `POST /orders` — creates a purchase order.
///
/// Validates the resource and currency, checks availability, allocates a
/// unique deposit target, and returns everything the buyer needs to pay.
/// Duplicate submissions inside the cooldown window get `429`.
async fn create_order_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Response {
    let resource = match Resource::parse(&req.resource) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };
    let currency = match Currency::parse(&req.currency) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };

    match state.manager.create(resource, currency).await {
        Ok(order) => {
            state.metrics.orders_created_total.inc();
            state
                .metrics
                .tracked_orders
                .set(state.manager.order_count() as i64);

            let resp = OrderCreatedResponse {
                order_id: order.id,
                resource: order.resource.canonical(),
                currency: order.currency.to_string(),
                price: order.price,
                min_accepted: order.min_accepted,
                deposit_target: order.deposit_target.as_str().to_string(),
                status: order.status.to_string(),
            };
            (StatusCode::CREATED, Json(resp)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `GET /orders/:id` — polls an order's status.
///
/// Safe to call arbitrarily often; the `Retry-After` header carries the
/// suggested poll interval. The `secret_issued` field is `true` on exactly
/// one poll — the first after delivery — and never again.
async fn order_status_handler(
    Path(order_id): Path<OrderId>,
    State(state): State<AppState>,
) -> Response {
    match state.manager.get_status(order_id).await {
        Ok(snapshot) => {
            let poll_secs = umbra_core::config::STATUS_POLL_INTERVAL.as_secs().to_string();
            (
                [(header::RETRY_AFTER, poll_secs)],
                Json::<StatusSnapshot>(snapshot),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `POST /orders/:id/fulfill` — fulfills a payment-confirmed order.
///
/// Provisions the resource, binds the ownership commitment, and returns
/// the secret in this response and never again. Concurrent calls for the
/// same order: exactly one wins, the rest get `409`.
async fn fulfill_handler(
    Path(order_id): Path<OrderId>,
    State(state): State<AppState>,
) -> Response {
    let start = std::time::Instant::now();
    match state.manager.fulfill(order_id).await {
        Ok(delivered) => {
            state.metrics.orders_delivered_total.inc();
            state
                .metrics
                .fulfillment_latency_seconds
                .observe(start.elapsed().as_secs_f64());

            let resp = DeliveredResponse {
                order_id: delivered.order_id,
                resource: delivered.resource.canonical(),
                secret: delivered.secret.reveal_hex(),
                commitment: delivered.commitment.to_hex(),
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(e) => {
            if matches!(e, CoreError::ProvisioningFailure { .. }) {
                state.metrics.orders_failed_total.inc();
            }
            error_response(e)
        }
    }
}

/// `POST /callbacks/payment-observed` — settlement watcher callback.
///
/// Underpayments are acknowledged with `202`: the watcher did its job, the
/// shortfall is our bookkeeping problem, not a reason to make it retry.
async fn payment_observed_handler(
    State(state): State<AppState>,
    Json(req): Json<PaymentObservedRequest>,
) -> Response {
    let before_unmatched = state.manager.unmatched_deposits().len();

    match state
        .manager
        .on_payment_observed(req.order_id, req.amount, &req.tx_ref)
        .await
    {
        Ok(()) => {
            if state.manager.unmatched_deposits().len() > before_unmatched {
                state.metrics.unmatched_deposits_total.inc();
            }
            StatusCode::OK.into_response()
        }
        Err(CoreError::InsufficientPayment { expected, received }) => {
            state.metrics.underpayments_total.inc();
            error_response(CoreError::InsufficientPayment { expected, received })
        }
        Err(e) => error_response(e),
    }
}

/// `POST /callbacks/payment-confirmed` — settlement watcher callback.
async fn payment_confirmed_handler(
    State(state): State<AppState>,
    Json(req): Json<PaymentConfirmedRequest>,
) -> Response {
    match state.manager.on_payment_confirmed(req.order_id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /resources/:resource/records` — applies a record change.
///
/// The one secret-gated endpoint. Authorization first; the backend is only
/// reached with a proven owner. Every failure mode — unknown resource,
/// wrong secret, malformed secret — returns the identical 401.
async fn record_change_handler(
    Path(resource): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<RecordChangeRequest>,
) -> Response {
    // A malformed resource cannot be a registered one; same opaque 401,
    // not a 400 that would leak the parse result.
    let resource = match Resource::parse(&resource) {
        Ok(r) => r,
        Err(_) => {
            state.metrics.authorization_denied_total.inc();
            return unauthorized();
        }
    };

    if !state.registry.authorize(&resource, &req.secret) {
        state.metrics.authorization_denied_total.inc();
        tracing::warn!(resource = %resource, "record change denied");
        return unauthorized();
    }

    let change = RecordChange {
        record_type: req.record_type,
        name: req.name,
        value: req.value,
        ttl: req.ttl,
    };

    match state.records.apply(&resource, change).await {
        Ok(()) => {
            tracing::info!(resource = %resource, "record change applied");
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::error!(resource = %resource, error = %e, "record backend failure");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: "record backend unavailable".into(),
                }),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;
    use umbra_core::external::{DevAvailabilityOracle, DevProvisioner, DevRecordBackend};
    use umbra_core::order::ManagerConfig;

    const DEV_PRICE: u64 = 120_000;

    /// Creates a test AppState wired to dev collaborators with a short
    /// create cooldown.
    fn test_app_state() -> AppState {
        let registry = Arc::new(OwnershipRegistry::new());
        let manager = Arc::new(OrderLifecycleManager::with_config(
            Arc::new(DevAvailabilityOracle::new(DEV_PRICE)),
            Arc::new(DevProvisioner::new()),
            Arc::clone(&registry),
            ManagerConfig {
                create_cooldown: Duration::from_millis(100),
                payment_window: Duration::from_secs(1800),
            },
        ));

        AppState {
            version: "0.1.0-test".into(),
            manager,
            registry,
            records: Arc::new(DevRecordBackend::new()),
            metrics: Arc::new(crate::metrics::GatewayMetrics::new()),
            started_at: chrono::Utc::now(),
        }
    }

    /// Sends a GET request and returns (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, headers, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, headers, body)
    }

    /// Drives an order through create + payment to confirmed, via the API.
    async fn create_confirmed_order(router: &Router, resource: &str) -> OrderCreatedResponse {
        let (status, _, body) = post_json(
            router,
            "/orders",
            serde_json::json!({ "resource": resource, "currency": "XMR" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: OrderCreatedResponse = serde_json::from_slice(&body).unwrap();

        let (status, _, _) = post_json(
            router,
            "/callbacks/payment-observed",
            serde_json::json!({
                "order_id": created.order_id,
                "amount": created.price,
                "tx_ref": "tx-api"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = post_json(
            router,
            "/callbacks/payment-confirmed",
            serde_json::json!({ "order_id": created.order_id }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        created
    }

    // -- 1. Health probe -------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    // -- 2. Status summary ------------------------------------------------------

    #[tokio::test]
    async fn status_endpoint_counts_orders() {
        let state = test_app_state();
        let router = create_router(state);

        post_json(
            &router,
            "/orders",
            serde_json::json!({ "resource": "example.com", "currency": "BTC" }),
        )
        .await;

        let (status, body) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.tracked_orders, 1);
        assert_eq!(resp.bound_resources, 0);
        assert_eq!(resp.version, "0.1.0-test");
    }

    // -- 3. Order creation ------------------------------------------------------

    #[tokio::test]
    async fn create_order_returns_deposit_target() {
        let router = create_router(test_app_state());
        let (status, _, body) = post_json(
            &router,
            "/orders",
            serde_json::json!({ "resource": "Example.COM", "currency": "xmr" }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let resp: OrderCreatedResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.resource, "example.com");
        assert_eq!(resp.currency, "XMR");
        assert_eq!(resp.price, DEV_PRICE);
        assert!(resp.min_accepted <= resp.price);
        assert!(resp.deposit_target.starts_with("udep1"));
        assert_eq!(resp.status, "AwaitingPayment");
    }

    #[tokio::test]
    async fn create_order_rejects_bad_input() {
        let router = create_router(test_app_state());

        let (status, _, _) = post_json(
            &router,
            "/orders",
            serde_json::json!({ "resource": "no-dot", "currency": "XMR" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = post_json(
            &router,
            "/orders",
            serde_json::json!({ "resource": "example.com", "currency": "DOGE" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("DOGE"));
    }

    // -- 4. Duplicate create gets 429 + Retry-After ------------------------------

    #[tokio::test]
    async fn duplicate_create_returns_429_with_retry_after() {
        let router = create_router(test_app_state());
        let order = serde_json::json!({ "resource": "example.com", "currency": "XMR" });

        let (status, _, _) = post_json(&router, "/orders", order.clone()).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, headers, _) = post_json(&router, "/orders", order).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(headers.contains_key(header::RETRY_AFTER));
    }

    // -- 5. Status poll ----------------------------------------------------------

    #[tokio::test]
    async fn order_status_poll_and_404() {
        let router = create_router(test_app_state());
        let created = create_confirmed_order(&router, "example.com").await;

        let (status, body) = get(&router, &format!("/orders/{}", created.order_id)).await;
        assert_eq!(status, StatusCode::OK);
        let snap: StatusSnapshot = serde_json::from_slice(&body).unwrap();
        assert_eq!(snap.order_status.to_string(), "PaymentConfirmed");

        let ghost = uuid::Uuid::new_v4();
        let (status, _) = get(&router, &format!("/orders/{}", ghost)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -- 6. Fulfillment issues the secret exactly once ----------------------------

    #[tokio::test]
    async fn fulfill_returns_secret_once_then_conflicts() {
        let state = test_app_state();
        let registry = Arc::clone(&state.registry);
        let router = create_router(state);
        let created = create_confirmed_order(&router, "example.com").await;

        let (status, _, body) = post_json(
            &router,
            &format!("/orders/{}/fulfill", created.order_id),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let delivered: DeliveredResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(delivered.resource, "example.com");
        assert_eq!(delivered.secret.len(), 64);

        // The secret proves ownership.
        let resource = Resource::parse(&delivered.resource).unwrap();
        assert!(registry.authorize(&resource, &delivered.secret));

        // A second fulfill is a conflict, never a second secret.
        let (status, _, _) = post_json(
            &router,
            &format!("/orders/{}/fulfill", created.order_id),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // The first status poll after delivery carries the one-shot notice.
        let (_, body) = get(&router, &format!("/orders/{}", created.order_id)).await;
        let snap: StatusSnapshot = serde_json::from_slice(&body).unwrap();
        assert!(snap.secret_issued);

        let (_, body) = get(&router, &format!("/orders/{}", created.order_id)).await;
        let snap: StatusSnapshot = serde_json::from_slice(&body).unwrap();
        assert!(!snap.secret_issued);
    }

    // -- 7. Underpayment acknowledged with 202 ------------------------------------

    #[tokio::test]
    async fn underpayment_callback_returns_202() {
        let router = create_router(test_app_state());
        let (_, _, body) = post_json(
            &router,
            "/orders",
            serde_json::json!({ "resource": "example.com", "currency": "XMR" }),
        )
        .await;
        let created: OrderCreatedResponse = serde_json::from_slice(&body).unwrap();

        let (status, _, body) = post_json(
            &router,
            "/callbacks/payment-observed",
            serde_json::json!({
                "order_id": created.order_id,
                "amount": created.price / 2,
                "tx_ref": "tx-half"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("insufficient"));

        // Fulfillment is still gated.
        let (status, _, _) = post_json(
            &router,
            &format!("/orders/{}/fulfill", created.order_id),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    // -- 8. Record changes: opaque 401 everywhere ----------------------------------

    #[tokio::test]
    async fn record_change_authorization_is_opaque() {
        let router = create_router(test_app_state());
        let created = create_confirmed_order(&router, "example.com").await;
        let (_, _, body) = post_json(
            &router,
            &format!("/orders/{}/fulfill", created.order_id),
            serde_json::json!({}),
        )
        .await;
        let delivered: DeliveredResponse = serde_json::from_slice(&body).unwrap();

        let change = |secret: &str| {
            serde_json::json!({
                "secret": secret,
                "record_type": "A",
                "name": "@",
                "value": "192.0.2.10",
                "ttl": 3600
            })
        };

        // Owner's secret succeeds.
        let (status, _, _) = post_json(
            &router,
            "/resources/example.com/records",
            change(&delivered.secret),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Wrong secret, unknown resource, malformed secret, malformed
        // resource: byte-identical 401 bodies.
        let cases = [
            ("/resources/example.com/records", change("ab".repeat(32).as_str())),
            ("/resources/never-sold.com/records", change(&delivered.secret)),
            ("/resources/example.com/records", change("not-hex")),
            ("/resources/bad_name/records", change(&delivered.secret)),
        ];

        let mut bodies = Vec::new();
        for (path, body) in cases {
            let (status, _, resp_body) = post_json(&router, path, body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            bodies.push(resp_body);
        }
        assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    }

    // -- 9. Metrics reflect handler activity ---------------------------------------

    #[tokio::test]
    async fn metrics_track_lifecycle_outcomes() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let created = create_confirmed_order(&router, "example.com").await;
        post_json(
            &router,
            &format!("/orders/{}/fulfill", created.order_id),
            serde_json::json!({}),
        )
        .await;

        assert_eq!(metrics.orders_created_total.get(), 1);
        assert_eq!(metrics.orders_delivered_total.get(), 1);
        assert_eq!(metrics.tracked_orders.get(), 1);
    }
}
