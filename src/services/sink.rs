//! Outbound delivery of emitted signals.

use tracing::info;

use crate::error::Result;
use crate::types::Signal;

/// Receives every signal the scanner accepts.
///
/// Delivery failures are reported back to the scanner, which logs them and
/// moves on; they never change what the pipeline emits.
pub trait SignalSink: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, signal: &Signal) -> Result<()>;
}

/// Writes each signal as a JSON document through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl SignalSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, signal: &Signal) -> Result<()> {
        let payload = serde_json::to_string(signal)?;
        info!(
            target: "spectre::signals",
            symbol = %signal.symbol,
            direction = %signal.direction,
            confidence = signal.confidence,
            "{}",
            payload
        );
        Ok(())
    }
}
