//! LogSink - logs frame summaries via tracing

use std::collections::HashMap;

use contracts::{ContractError, DisplaySink, RenderedFrame};
use tracing::{info, instrument};

/// Sink that logs frame summaries for debugging
pub struct LogSink {
    name: String,
    every: u64,
    seen: u64,
}

impl LogSink {
    /// Create a new LogSink that logs every frame it receives
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            every: 1,
            seen: 0,
        }
    }

    /// Create from params map; `every` logs one in N received frames
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> Self {
        let every = params
            .get("every")
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);
        Self {
            every,
            ..Self::new(name)
        }
    }

    fn log_frame_summary(&self, frame: &RenderedFrame) {
        let center = frame.pixel(frame.height as usize / 2, frame.width as usize / 2);

        info!(
            sink = %self.name,
            frame_id = frame.frame_id,
            variant = %frame.variant,
            width = frame.width,
            height = frame.height,
            min = frame.window.min,
            max = frame.window.max,
            center = ?center,
            "Frame received"
        );
    }
}

impl DisplaySink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn write(&mut self, frame: &RenderedFrame) -> Result<(), ContractError> {
        if self.seen % self.every == 0 {
            self.log_frame_summary(frame);
        }
        self.seen += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, frames = self.seen, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::frame;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let result = sink.write(&frame(1)).await;
        assert!(result.is_ok());
        assert_eq!(sink.seen, 1);
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }

    #[test]
    fn test_every_param() {
        let params = HashMap::from([("every".to_string(), "25".to_string())]);
        assert_eq!(LogSink::from_params("a", &params).every, 25);

        let params = HashMap::from([("every".to_string(), "0".to_string())]);
        assert_eq!(LogSink::from_params("a", &params).every, 1);
    }
}
