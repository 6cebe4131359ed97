//! # Prometheus Metrics
//!
//! Operational metrics for the vault node, scraped from `/metrics` on the
//! metrics port. Everything is registered in a dedicated
//! [`prometheus::Registry`] under the `snp` namespace.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use snp_engine::{Amount, Deployment};

/// Metric handles for the node. Cheap to clone.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Committed operations by vault and operation name.
    pub operations_total: IntCounterVec,
    /// Rejected operations by vault and error kind.
    pub rejections_total: IntCounterVec,
    /// Harvests that failed or timed out, by vault.
    pub harvest_failures_total: IntCounterVec,
    /// `total_assets` per vault, in micro-units.
    pub total_assets: IntGaugeVec,
    /// `total_supply` per vault, in micro-units.
    pub total_supply: IntGaugeVec,
    /// Share price per vault, in micro-units (1_000_000 = 1.0).
    pub share_price: IntGaugeVec,
    /// Current block height of the node's clock.
    pub block_height: IntGauge,
    /// Blocks ticked since start.
    pub blocks_total: IntCounter,
}

impl NodeMetrics {
    /// Creates and registers every metric.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("snp".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("vault_operations_total", "Committed vault operations"),
            &["vault", "operation"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("vault_rejections_total", "Rejected vault operations by error kind"),
            &["vault", "kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let harvest_failures_total = IntCounterVec::new(
            Opts::new(
                "vault_harvest_failures_total",
                "Strategy harvests that failed or timed out",
            ),
            &["vault"],
        )?;
        registry.register(Box::new(harvest_failures_total.clone()))?;

        let total_assets = IntGaugeVec::new(
            Opts::new("vault_total_assets", "Idle plus allocated assets in micro-units"),
            &["vault"],
        )?;
        registry.register(Box::new(total_assets.clone()))?;

        let total_supply = IntGaugeVec::new(
            Opts::new("vault_total_supply", "Outstanding shares in micro-units"),
            &["vault"],
        )?;
        registry.register(Box::new(total_supply.clone()))?;

        let share_price = IntGaugeVec::new(
            Opts::new("vault_share_price", "Share price in micro-units"),
            &["vault"],
        )?;
        registry.register(Box::new(share_price.clone()))?;

        let block_height = IntGauge::new("block_height", "Current block height")?;
        registry.register(Box::new(block_height.clone()))?;

        let blocks_total = IntCounter::new("blocks_total", "Blocks ticked since start")?;
        registry.register(Box::new(blocks_total.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            rejections_total,
            harvest_failures_total,
            total_assets,
            total_supply,
            share_price,
            block_height,
            blocks_total,
        })
    }

    /// Records the outcome of one vault call.
    pub fn record<T>(&self, vault: &str, operation: &str, outcome: &snp_engine::VaultResult<T>) {
        match outcome {
            Ok(_) => self
                .operations_total
                .with_label_values(&[vault, operation])
                .inc(),
            Err(e) => {
                self.rejections_total
                    .with_label_values(&[vault, e.kind()])
                    .inc();
                if matches!(e, snp_engine::VaultError::HarvestFailed { .. }) {
                    self.harvest_failures_total
                        .with_label_values(&[vault])
                        .inc();
                }
            }
        }
    }

    /// Refreshes the per-vault gauges from the deployment.
    pub async fn refresh(&self, deployment: &Deployment) {
        for vault in deployment.vaults() {
            let id = vault.id().as_str();
            self.total_assets
                .with_label_values(&[id])
                .set(gauge_value(vault.get_total_assets().await));
            self.total_supply
                .with_label_values(&[id])
                .set(gauge_value(vault.get_total_supply().await));
            if let Ok(price) = vault.get_share_price().await {
                self.share_price.with_label_values(&[id]).set(gauge_value(price));
            }
        }
    }

    /// Encodes every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Gauges are `i64`; amounts beyond that range pin to the maximum.
fn gauge_value(amount: Amount) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics` in Prometheus text format.
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
