//! In-memory reference collaborators for exercising the mutation engine.
//!
//! [`MemTable`] implements the storage seam over stored record batches;
//! [`BasicEngine`] implements the expression-engine seam with Arrow
//! compute kernels. Neither is part of the planner's public contract —
//! they exist so integration tests can drive complete plans end to end.
#![forbid(unsafe_code)]

use std::sync::Once;

pub mod engine;
pub mod table;

pub use engine::BasicEngine;
pub use table::MemTable;

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_target(false).init();
    });
}
