use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

/// Register descriptions for every metric the workspace emits.
///
/// These metrics exist for processes that embed the ingestion crates
/// and install their own `metrics` recorder. The `wirelog` binary installs
/// none, so there they are no-ops and the run summary is logged instead.
pub fn describe_metrics() {
    describe_counter!(
        "wirelog_rows_total",
        Unit::Count,
        "Rows scanned during ingestion, labeled by outcome"
    );
    describe_gauge!(
        "wirelog_partitions",
        Unit::Count,
        "Partitions in the most recently built schema store"
    );
    describe_histogram!(
        "wirelog_ingest_seconds",
        Unit::Seconds,
        "Wall time of a full ingestion pass"
    );
    describe_counter!(
        "wirelog_panics_total",
        Unit::Count,
        "Panics captured by the installed hook"
    );
}
