//! Process-wide logging setup shared by every tenantdesk binary.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing/logging from the environment.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    crate::tracing::init(LogFormat::from_env());
}
