//! # Prometheus Metrics
//!
//! Exposes lending activity for scraping at `/metrics` on the configured
//! metrics port. All metrics are registered in a dedicated
//! [`prometheus::Registry`] under the `nftlend` namespace so they do not
//! collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramTimer, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use nftlend_contracts::{LendingError, LoanLedger};
use nftlend_protocol::config::WAD;
use nftlend_protocol::units::Amount;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct LendingMetrics {
    registry: Registry,
    /// Loans successfully opened.
    pub loans_opened_total: IntCounter,
    /// Loans closed by repayment.
    pub loans_repaid_total: IntCounter,
    /// Loans closed by liquidation.
    pub loans_liquidated_total: IntCounter,
    /// Partial interest payments accepted.
    pub interest_payments_total: IntCounter,
    /// Rejected operations, by operation and error kind.
    pub failed_operations_total: IntCounterVec,
    /// Loans currently open.
    pub open_loans: IntGauge,
    /// Aggregate outstanding principal, in whole value units.
    pub outstanding_principal: Gauge,
    /// Open loans strictly past their due date.
    pub liquidatable_loans: IntGauge,
    /// Engine call latency in seconds, by operation.
    pub operation_latency_seconds: HistogramVec,
}

impl LendingMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("nftlend".into()), None)?;

        let loans_opened_total =
            IntCounter::new("loans_opened_total", "Total number of loans opened")?;
        registry.register(Box::new(loans_opened_total.clone()))?;

        let loans_repaid_total =
            IntCounter::new("loans_repaid_total", "Total number of loans closed by repayment")?;
        registry.register(Box::new(loans_repaid_total.clone()))?;

        let loans_liquidated_total = IntCounter::new(
            "loans_liquidated_total",
            "Total number of loans closed by liquidation",
        )?;
        registry.register(Box::new(loans_liquidated_total.clone()))?;

        let interest_payments_total = IntCounter::new(
            "interest_payments_total",
            "Total number of partial interest payments accepted",
        )?;
        registry.register(Box::new(interest_payments_total.clone()))?;

        let failed_operations_total = IntCounterVec::new(
            Opts::new(
                "failed_operations_total",
                "Rejected lending operations by operation and error kind",
            ),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(failed_operations_total.clone()))?;

        let open_loans = IntGauge::new("open_loans", "Number of loans currently open")?;
        registry.register(Box::new(open_loans.clone()))?;

        let outstanding_principal = Gauge::new(
            "outstanding_principal",
            "Aggregate principal outstanding across open loans, in whole value units",
        )?;
        registry.register(Box::new(outstanding_principal.clone()))?;

        let liquidatable_loans = IntGauge::new(
            "liquidatable_loans",
            "Open loans strictly past their due date",
        )?;
        registry.register(Box::new(liquidatable_loans.clone()))?;

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Lending engine call latency in seconds",
            )
            .buckets(vec![
                0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
            ]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            loans_opened_total,
            loans_repaid_total,
            loans_liquidated_total,
            interest_payments_total,
            failed_operations_total,
            open_loans,
            outstanding_principal,
            liquidatable_loans,
            operation_latency_seconds,
        })
    }

    /// Starts a latency timer for `operation`; observed on drop.
    pub fn start_timer(&self, operation: &str) -> HistogramTimer {
        self.operation_latency_seconds
            .with_label_values(&[operation])
            .start_timer()
    }

    /// Counts a rejected operation.
    pub fn record_failure(&self, operation: &str, err: &LendingError) {
        self.failed_operations_total
            .with_label_values(&[operation, err.kind()])
            .inc();
    }

    /// Refreshes the book gauges from the ledger.
    pub fn observe_book(&self, ledger: &LoanLedger) {
        self.open_loans.set(ledger.open_loan_count() as i64);
        self.liquidatable_loans
            .set(ledger.liquidatable_loans().len() as i64);
        let raw = ledger.total_outstanding_principal().raw();
        self.outstanding_principal.set(raw as f64 / WAD as f64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<LendingMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
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
