//! FramePublisher - bridges the acquisition thread to the async side

use contracts::{FrameEmitter, RenderedFrame, TemperatureReading};

use crate::slot::FrameSlot;
use crate::telemetry::TelemetryOffer;

/// Frame emitter backed by a [`FrameSlot`] and an optional telemetry offer
pub struct FramePublisher {
    slot: FrameSlot,
    telemetry: Option<TelemetryOffer>,
}

impl FramePublisher {
    pub fn new(slot: FrameSlot, telemetry: Option<TelemetryOffer>) -> Self {
        Self { slot, telemetry }
    }
}

impl FrameEmitter for FramePublisher {
    fn publish(&mut self, frame: RenderedFrame) {
        self.slot.publish(frame);
    }

    fn offer_reading(&mut self, reading: TemperatureReading) {
        if let Some(telemetry) = self.telemetry.as_mut() {
            telemetry.offer(reading);
        }
    }
}
