//! DisplaySink / TelemetrySink / FrameEmitter traits - output interfaces
//!
//! Defines the abstract interface for frame and telemetry consumers.

use crate::{ContractError, RenderedFrame, TemperatureReading};

/// Rendered frame consumer
///
/// All display sink implementations must implement this trait.
#[trait_variant::make(DisplaySink: Send)]
pub trait LocalDisplaySink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one rendered frame
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, frame: &RenderedFrame) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Temperature reading consumer
///
/// Delivery is best-effort; callers log failures and never retry.
#[trait_variant::make(TelemetrySink: Send)]
pub trait LocalTelemetrySink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one reading
    async fn send(&mut self, reading: &TemperatureReading) -> Result<(), ContractError>;
}

/// Synchronous hand-off from the acquisition thread
///
/// Neither method may block: frames overwrite any unconsumed frame and
/// readings are dropped when the telemetry path is busy or rate limited.
pub trait FrameEmitter: Send {
    /// Publish the latest frame
    fn publish(&mut self, frame: RenderedFrame);

    /// Offer a temperature reading
    fn offer_reading(&mut self, reading: TemperatureReading);
}

impl<T: FrameEmitter + ?Sized> FrameEmitter for Box<T> {
    fn publish(&mut self, frame: RenderedFrame) {
        (**self).publish(frame)
    }

    fn offer_reading(&mut self, reading: TemperatureReading) {
        (**self).offer_reading(reading)
    }
}
