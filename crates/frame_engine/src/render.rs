//! Colormap rendering onto a persistent RGB canvas.

use bytes::Bytes;
use contracts::{
    warn_due, Packet, PixelCoord, ScaleWindow, SensorVariant, HEADER_WORDS, WORDS_PER_PACKET,
    ZERO_SENTINEL,
};
use tracing::{info, warn};

use crate::colormap;

/// Output coordinate `(row, column)` of word `i` of a segment
///
/// `i` counts every word of the 60-packet segment, header words included.
/// Header positions never reach this function.
#[inline]
pub fn pixel_position(variant: SensorVariant, segment: u8, i: usize) -> (usize, usize) {
    if variant.is_segmented() {
        let half = variant.width() / 2;
        let column = i % WORDS_PER_PACKET - HEADER_WORDS
            + half * ((i % (WORDS_PER_PACKET * 2)) / WORDS_PER_PACKET);
        let row =
            i / WORDS_PER_PACKET / 2 + variant.rows_per_segment() * usize::from(segment - 1);
        (row, column)
    } else {
        (i / WORDS_PER_PACKET, i % WORDS_PER_PACKET - HEADER_WORDS)
    }
}

/// Persistent RGB8 image
///
/// Pixels skipped for the zero sentinel keep whatever the previous frame wrote.
#[derive(Debug, Clone)]
pub struct Canvas {
    variant: SensorVariant,
    rgb: Vec<u8>,
}

impl Canvas {
    /// Black canvas sized for `variant`
    pub fn new(variant: SensorVariant) -> Self {
        Self {
            variant,
            rgb: vec![0; variant.pixel_count() * 3],
        }
    }

    pub fn variant(&self) -> SensorVariant {
        self.variant
    }

    pub fn width(&self) -> usize {
        self.variant.width()
    }

    pub fn height(&self) -> usize {
        self.variant.height()
    }

    /// RGB at `(row, column)`
    pub fn pixel(&self, row: usize, column: usize) -> Option<[u8; 3]> {
        if row >= self.height() || column >= self.width() {
            return None;
        }
        let offset = (row * self.width() + column) * 3;
        Some([self.rgb[offset], self.rgb[offset + 1], self.rgb[offset + 2]])
    }

    #[inline]
    fn set(&mut self, row: usize, column: usize, color: [u8; 3]) {
        let offset = (row * self.width() + column) * 3;
        self.rgb[offset..offset + 3].copy_from_slice(&color);
    }

    /// Immutable copy for publishing
    pub fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(&self.rgb)
    }
}

/// Per-frame render outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Pixels written
    pub written: usize,
    /// Zero-sentinel words skipped
    pub zero_words: u32,
    /// Raw value at the sampled pixel, if it was written this frame
    pub sample_raw: Option<u16>,
}

/// Maps raw words through a colormap onto a canvas
#[derive(Debug)]
pub struct Renderer {
    warn_every: u32,
}

impl Renderer {
    pub fn new(warn_every: u32) -> Self {
        Self {
            warn_every: warn_every.max(1),
        }
    }

    /// Render every stored segment
    ///
    /// `zero_drops` is the persistent zero-value counter; it is warned on every
    /// `warn_every` occurrences and cleared (with a recovery log) at the end of
    /// the frame.
    pub fn render<'a>(
        &self,
        canvas: &mut Canvas,
        table: &[u8],
        window: ScaleWindow,
        segments: impl IntoIterator<Item = (u8, &'a [Packet])>,
        sample: Option<PixelCoord>,
        zero_drops: &mut u32,
    ) -> RenderStats {
        let variant = canvas.variant();
        let last_index = table.len().saturating_sub(1) as f32;
        let mut stats = RenderStats::default();

        for (segment, packets) in segments {
            for (p, packet) in packets.iter().enumerate() {
                for k in HEADER_WORDS..WORDS_PER_PACKET {
                    let value = packet.word(k);
                    if value == ZERO_SENTINEL {
                        stats.zero_words += 1;
                        *zero_drops += 1;
                        if warn_due(*zero_drops, self.warn_every) {
                            warn!(count = *zero_drops, "found zero-value words, skipping pixels");
                        }
                        continue;
                    }

                    let (row, column) = pixel_position(variant, segment, p * WORDS_PER_PACKET + k);
                    let scaled = (f32::from(value) - f32::from(window.min)) * window.scale;
                    let index = scaled.clamp(0.0, last_index) as usize;
                    canvas.set(row, column, colormap::lookup(table, index));
                    stats.written += 1;

                    if sample.is_some_and(|s| s.row == row && s.column == column) {
                        stats.sample_raw = Some(value);
                    }
                }
            }
        }

        if *zero_drops != 0 {
            info!(count = *zero_drops, "zero-value words recovered");
            *zero_drops = 0;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ColormapKind;
    use device::pass_packets;

    #[test]
    fn test_low_res_positions() {
        let v = SensorVariant::Lepton2;
        assert_eq!(pixel_position(v, 1, 2), (0, 0));
        assert_eq!(pixel_position(v, 1, 81), (0, 79));
        assert_eq!(pixel_position(v, 1, 82 * 59 + 81), (59, 79));
    }

    #[test]
    fn test_high_res_positions() {
        let v = SensorVariant::Lepton3;
        // packet 0 -> left half of row 0, packet 1 -> right half
        assert_eq!(pixel_position(v, 1, 2), (0, 0));
        assert_eq!(pixel_position(v, 1, 82 + 2), (0, 80));
        assert_eq!(pixel_position(v, 1, 82 + 81), (0, 159));
        assert_eq!(pixel_position(v, 1, 82 * 2 + 2), (1, 0));
        assert_eq!(pixel_position(v, 3, 2), (60, 0));
        assert_eq!(pixel_position(v, 4, 82 * 59 + 81), (119, 159));
    }

    #[test]
    fn test_manual_window_lookup() {
        let packets = pass_packets(None, |_, _| 31000);
        let mut canvas = Canvas::new(SensorVariant::Lepton2);
        let table = colormap::table(ColormapKind::Grayscale);
        let window = ScaleWindow::new(30000, 32000);
        let mut zero_drops = 0;

        let stats = Renderer::new(12).render(
            &mut canvas,
            table,
            window,
            [(1, packets.as_slice())],
            None,
            &mut zero_drops,
        );

        // (31000 - 30000) * 255 / 2000 = 127.5 -> 127
        assert_eq!(canvas.pixel(10, 10), Some([127, 127, 127]));
        assert_eq!(stats.written, 4800);
    }

    #[test]
    fn test_zero_word_skips_pixel_and_resets_counter() {
        let packets = pass_packets(None, |p, w| if (p, w) == (5, 7) { 0 } else { 30000 });
        let mut canvas = Canvas::new(SensorVariant::Lepton2);
        let table = colormap::table(ColormapKind::Grayscale);
        let window = ScaleWindow::new(29000, 31000);
        let mut zero_drops = 0;

        let stats = Renderer::new(12).render(
            &mut canvas,
            table,
            window,
            [(1, packets.as_slice())],
            None,
            &mut zero_drops,
        );

        assert_eq!(stats.zero_words, 1);
        assert_eq!(stats.written, 4799);
        assert_eq!(zero_drops, 0);
        assert_eq!(canvas.pixel(5, 7), Some([0, 0, 0]));
        assert_eq!(canvas.pixel(5, 8), Some([127, 127, 127]));
    }

    #[test]
    fn test_values_outside_window_clamp() {
        let packets = pass_packets(None, |p, _| if p == 0 { 100 } else { 60000 });
        let mut canvas = Canvas::new(SensorVariant::Lepton2);
        let table = colormap::table(ColormapKind::Grayscale);
        let mut zero_drops = 0;

        Renderer::new(12).render(
            &mut canvas,
            table,
            ScaleWindow::new(30000, 32000),
            [(1, packets.as_slice())],
            None,
            &mut zero_drops,
        );

        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(canvas.pixel(1, 0), Some([255, 255, 255]));
    }

    #[test]
    fn test_sample_pixel_raw_value() {
        let packets = pass_packets(None, |p, w| (p * 100 + w) as u16 + 1);
        let mut canvas = Canvas::new(SensorVariant::Lepton2);
        let mut zero_drops = 0;
        let stats = Renderer::new(12).render(
            &mut canvas,
            colormap::table(ColormapKind::Ironblack),
            ScaleWindow::new(1, 6000),
            [(1, packets.as_slice())],
            Some(PixelCoord { row: 30, column: 40 }),
            &mut zero_drops,
        );
        assert_eq!(stats.sample_raw, Some(3041));
    }
}
