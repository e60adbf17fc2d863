use prometheus_exporter::prometheus::{
    HistogramTimer, HistogramVec, IntGaugeVec, default_registry,
    register_histogram_vec_with_registry, register_int_gauge_vec_with_registry,
};

pub const UNAGGREGATED_POOL: &str = "unaggregated";
pub const AGGREGATED_POOL: &str = "aggregated";
pub const BLOCK_POOL: &str = "block";
pub const FORKCHOICE_POOL: &str = "forkchoice";
pub const SYNC_CONTRIBUTION_POOL: &str = "sync_contribution";

// Provisioning each metrics
lazy_static::lazy_static! {
    pub static ref ATTESTATION_POOL_SIZE: IntGaugeVec = create_int_gauge_vec(
        "attestation_pool_size",
        "Number of attestations stored in each attestation pool",
        &["pool"]
    );

    pub static ref SYNC_CONTRIBUTION_POOL_SIZE: IntGaugeVec = create_int_gauge_vec(
        "sync_contribution_pool_size",
        "Number of sync committee contributions stored",
        &[]
    );

    pub static ref AGGREGATION_TIME: HistogramVec = create_histogram_vec(
        "attestation_aggregation_time",
        "Duration of an aggregation pass over a pool",
        &["pool"]
    );
}

/// Create a new gauge metric
pub fn create_int_gauge_vec(name: &str, help: &str, label_names: &[&str]) -> IntGaugeVec {
    let registry = default_registry();
    register_int_gauge_vec_with_registry!(name, help, label_names, registry)
        .expect("failed to create int gauge vec")
}

/// Set the value of a gauge metric
pub fn set_int_gauge_vec(gauge_vec: &IntGaugeVec, value: i64, label_values: &[&str]) {
    gauge_vec.with_label_values(label_values).set(value);
}

/// Create a new histogram metric
pub fn create_histogram_vec(name: &str, help: &str, label_names: &[&str]) -> HistogramVec {
    let registry = default_registry();
    register_histogram_vec_with_registry!(name, help, label_names, registry)
        .expect("failed to create histogram")
}

/// Start a timer for a histogram metric
pub fn start_timer_vec(histogram_vec: &HistogramVec, label_values: &[&str]) -> HistogramTimer {
    histogram_vec.with_label_values(label_values).start_timer()
}

/// Stop a timer for a histogram metric
pub fn stop_timer(timer: HistogramTimer) {
    timer.observe_duration()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size_gauge_is_labelled_per_pool() {
        set_int_gauge_vec(&ATTESTATION_POOL_SIZE, 3, &[AGGREGATED_POOL]);
        set_int_gauge_vec(&ATTESTATION_POOL_SIZE, 5, &[BLOCK_POOL]);

        assert_eq!(
            ATTESTATION_POOL_SIZE
                .with_label_values(&[AGGREGATED_POOL])
                .get(),
            3
        );
        assert_eq!(
            ATTESTATION_POOL_SIZE.with_label_values(&[BLOCK_POOL]).get(),
            5
        );
    }
}
