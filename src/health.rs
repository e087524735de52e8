//! Health check
//!
//! Lives under a public prefix, so it is never resolved as an alias

/// Liveness probe
///
/// If the process can respond at all, it is alive
pub async fn liveness() -> &'static str {
    "ok"
}
