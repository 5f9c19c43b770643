//! Prometheus metrics.
//!
//! # Metric Naming Convention
//! - `finance_` prefix for all metrics
//! - `_total` suffix for counters
//!
//! # Labels
//! - `operation`: get_account, get_all_accounts, create_account, ...
//! - `status`: success, error
//! - `source`: cache, primary
//! - `store`: cache, search_index

use finance_engine::{SoftError, Source};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return the handle used to
/// render `/metrics`.
pub fn install() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "finance_operations_total",
        "Account operations by outcome"
    );
    describe_counter!(
        "finance_reads_total",
        "Account reads by the store that served them"
    );
    describe_counter!(
        "finance_soft_errors_total",
        "Tolerated cache and search index failures"
    );

    Ok(handle)
}

/// Record the outcome of an account operation.
pub fn record_operation(operation: &'static str, status: &'static str) {
    counter!(
        "finance_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

/// Record which store served a read.
pub fn record_read(operation: &'static str, source: Source) {
    let source = match source {
        Source::Cache => "cache",
        Source::Primary => "primary",
    };
    counter!(
        "finance_reads_total",
        "operation" => operation,
        "source" => source
    )
    .increment(1);
}

/// Record a tolerated derived-store failure.
pub fn record_soft_error(operation: &'static str, err: &SoftError) {
    counter!(
        "finance_soft_errors_total",
        "operation" => operation,
        "store" => err.store.as_str(),
        "call" => err.operation.as_str()
    )
    .increment(1);
}
