//! RenderedFrame - Frame Engine output
//!
//! Color-mapped frames and sampled temperature readings.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::SensorVariant;

/// Full-scale display value the window maps onto
pub const DISPLAY_MAX: f32 = 255.0;

/// Raw-value window used to scale counts into display values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleWindow {
    /// Lower raw bound
    pub min: u16,
    /// Upper raw bound
    pub max: u16,
    /// `255 / (max - min)`
    pub scale: f32,
}

impl ScaleWindow {
    /// Window for `min..max`; the scale is zero when the window is degenerate
    pub fn new(min: u16, max: u16) -> Self {
        Self {
            min,
            max,
            scale: Self::scale_for(min, max).unwrap_or(0.0),
        }
    }

    /// `255 / (max - min)`, `None` when `max <= min`
    pub fn scale_for(min: u16, max: u16) -> Option<f32> {
        (max > min).then(|| DISPLAY_MAX / f32::from(max - min))
    }
}

impl Default for ScaleWindow {
    fn default() -> Self {
        Self::new(crate::DEFAULT_RANGE_MIN, crate::DEFAULT_RANGE_MAX)
    }
}

/// Rendered RGB frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedFrame {
    /// Frame sequence number (monotonically increasing)
    pub frame_id: u64,

    /// Sensor variant the frame was rendered for
    pub variant: SensorVariant,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Window used for scaling
    pub window: ScaleWindow,

    /// Wall-clock capture time (Unix seconds)
    pub timestamp: f64,

    /// Packed RGB8 pixels, row major
    pub rgb: Bytes,
}

impl RenderedFrame {
    /// RGB triple at `(row, column)`
    pub fn pixel(&self, row: usize, column: usize) -> Option<[u8; 3]> {
        if row >= self.height as usize || column >= self.width as usize {
            return None;
        }
        let offset = (row * self.width as usize + column) * 3;
        let px = self.rgb.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2]])
    }
}

/// Temperature reading forwarded to telemetry
///
/// Field names form the JSON body sent to the telemetry endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Degrees Celsius
    pub temperature: f32,
    /// Unix seconds
    pub timestamp: i64,
    /// Device identifier
    pub device_id: String,
}

/// Radiometric raw value (centi-Kelvin) to degrees Celsius
pub fn raw_to_celsius(raw: u16) -> f32 {
    f32::from(raw) / 100.0 - 273.15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_window() {
        let window = ScaleWindow::new(30000, 30255);
        assert!((window.scale - 1.0).abs() < f32::EPSILON);
        assert_eq!(ScaleWindow::scale_for(100, 100), None);
        assert_eq!(ScaleWindow::scale_for(200, 100), None);
    }

    #[test]
    fn test_raw_to_celsius() {
        assert!((raw_to_celsius(27315) - 0.0).abs() < 0.01);
        assert!((raw_to_celsius(30315) - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_reading_json_shape() {
        let reading = TemperatureReading {
            temperature: 21.5,
            timestamp: 1_700_000_000,
            device_id: "lepton_2.5_001".to_string(),
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["device_id"], "lepton_2.5_001");
        assert_eq!(json["timestamp"], 1_700_000_000i64);
        assert!(json["temperature"].is_number());
    }

    #[test]
    fn test_pixel_bounds() {
        let frame = RenderedFrame {
            frame_id: 1,
            variant: SensorVariant::Lepton2,
            width: 2,
            height: 1,
            window: ScaleWindow::default(),
            timestamp: 0.0,
            rgb: Bytes::from(vec![1, 2, 3, 4, 5, 6]),
        };
        assert_eq!(frame.pixel(0, 1), Some([4, 5, 6]));
        assert_eq!(frame.pixel(1, 0), None);
    }
}
