//! Shared test fixtures.

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

/// Install a test-writer `tracing` subscriber once per process.
///
/// Honours `RUST_LOG`; defaults to `warn` so failures injected by
/// [`FaultyMemory`](crate::FaultyMemory) show up next to the failing test.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .compact()
            .try_init()
            .ok();
    });
}

/// Page size of the system backend, for tests that reason about commit
/// granularity.
pub fn system_page_size() -> usize {
    strata_os::system().page_size()
}

/// Whether the system backend can commit sub-ranges. Tests of contiguous
/// mode skip themselves when it cannot.
pub fn system_supports_partial_commit() -> bool {
    strata_os::system().supports_partial_commit()
}
