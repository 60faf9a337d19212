/// Observability and metrics collection
pub mod workers;

use prometheus::{Encoder, TextEncoder};

/// Render the default registry in the Prometheus text format.
pub fn export() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
