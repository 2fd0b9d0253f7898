//! # Prometheus Metrics
//!
//! Operational metrics for the order gateway, scraped at the `/metrics`
//! endpoint on the metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers. Counters
//! track lifecycle outcomes; nothing here carries order identifiers,
//! resources, or anything else that could link a payment to a buyer.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the gateway.
///
/// Clone-friendly (prometheus handles wrap `Arc` internally) so it can be
/// shared across request handlers and the expiry sweeper.
#[derive(Clone)]
pub struct GatewayMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total orders created.
    pub orders_created_total: IntCounter,
    /// Total orders delivered (secret issued).
    pub orders_delivered_total: IntCounter,
    /// Total orders expired unpaid.
    pub orders_expired_total: IntCounter,
    /// Total orders failed during fulfillment.
    pub orders_failed_total: IntCounter,
    /// Total underpayments observed.
    pub underpayments_total: IntCounter,
    /// Total payments flagged against dead deposit targets.
    pub unmatched_deposits_total: IntCounter,
    /// Total record-change requests denied authorization.
    pub authorization_denied_total: IntCounter,
    /// Orders currently tracked by the lifecycle manager.
    pub tracked_orders: IntGauge,
    /// Histogram of fulfillment latency (provision + bind + deliver) in seconds.
    pub fulfillment_latency_seconds: Histogram,
}

impl GatewayMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("umbra".into()), None)
            .expect("failed to create prometheus registry");

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("metric creation");
        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("metric registration");

        let orders_delivered_total = IntCounter::new(
            "orders_delivered_total",
            "Total orders delivered with a secret issued",
        )
        .expect("metric creation");
        registry
            .register(Box::new(orders_delivered_total.clone()))
            .expect("metric registration");

        let orders_expired_total = IntCounter::new(
            "orders_expired_total",
            "Total orders expired without payment",
        )
        .expect("metric creation");
        registry
            .register(Box::new(orders_expired_total.clone()))
            .expect("metric registration");

        let orders_failed_total = IntCounter::new(
            "orders_failed_total",
            "Total orders failed during fulfillment, pending reconciliation",
        )
        .expect("metric creation");
        registry
            .register(Box::new(orders_failed_total.clone()))
            .expect("metric registration");

        let underpayments_total = IntCounter::new(
            "underpayments_total",
            "Total payment observations below the acceptable amount",
        )
        .expect("metric creation");
        registry
            .register(Box::new(underpayments_total.clone()))
            .expect("metric registration");

        let unmatched_deposits_total = IntCounter::new(
            "unmatched_deposits_total",
            "Total payments flagged against dead deposit targets",
        )
        .expect("metric creation");
        registry
            .register(Box::new(unmatched_deposits_total.clone()))
            .expect("metric registration");

        let authorization_denied_total = IntCounter::new(
            "authorization_denied_total",
            "Total record-change requests denied authorization",
        )
        .expect("metric creation");
        registry
            .register(Box::new(authorization_denied_total.clone()))
            .expect("metric registration");

        let tracked_orders = IntGauge::new(
            "tracked_orders",
            "Orders currently tracked by the lifecycle manager",
        )
        .expect("metric creation");
        registry
            .register(Box::new(tracked_orders.clone()))
            .expect("metric registration");

        let fulfillment_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "fulfillment_latency_seconds",
                "End-to-end fulfillment latency in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(fulfillment_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            orders_created_total,
            orders_delivered_total,
            orders_expired_total,
            orders_failed_total,
            underpayments_total,
            unmatched_deposits_total,
            authorization_denied_total,
            tracked_orders,
            fulfillment_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<GatewayMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_and_encode() {
        let metrics = GatewayMetrics::new();
        metrics.orders_created_total.inc();
        metrics.tracked_orders.set(3);
        metrics.fulfillment_latency_seconds.observe(0.02);

        let text = metrics.encode().unwrap();
        assert!(text.contains("umbra_orders_created_total 1"));
        assert!(text.contains("umbra_tracked_orders 3"));
        assert!(text.contains("umbra_fulfillment_latency_seconds"));
    }
}
