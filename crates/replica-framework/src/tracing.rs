//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the process-wide subscriber. Call it once from a binary;
//! library code only emits events.
//!
//! ## Configuration
//!
//! Levels come from `RUST_LOG`. The compact format hides module paths (`with_target(false)`)
//! because every event already carries structured fields such as `order_id` or `epoch`.
//!
//! ```bash
//! # State changes, recovered failures
//! RUST_LOG=info cargo run
//!
//! # Full payloads of every request and pushed patch
//! RUST_LOG=debug cargo run
//!
//! # Only the replica plumbing
//! RUST_LOG=replica_framework=debug cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! - **Actor lifecycle**: startup, initialization result, shutdown
//! - **Identity changes**: adopt, clear, epoch advances
//! - **Pushed patches**: one `debug` event per merged patch
//! - **Remote calls**: issued, acknowledged, failed, discarded as stale

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
