//! Frame engine: assembly, range estimation and rendering for one pass.

use std::time::{SystemTime, UNIX_EPOCH};

use contracts::{Pass, PixelCoord, RenderConfig, RenderedFrame, SensorVariant, SyncState};
use tracing::{debug, info, instrument};

use crate::colormap;
use crate::range::estimate_window;
use crate::render::{Canvas, RenderStats, Renderer};
use crate::segments::SegmentAssembler;

/// Frame engine options
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Repeating zero-value warnings are logged once per this many words
    pub warn_every: u32,
    /// Pixel sampled for telemetry (`None` = frame center)
    pub sample: Option<PixelCoord>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            warn_every: 12,
            sample: None,
        }
    }
}

/// A completed frame
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub frame: RenderedFrame,
    pub stats: RenderStats,
}

/// Turns validated passes into rendered frames
///
/// Owned by the acquisition thread.
#[derive(Debug)]
pub struct FrameEngine {
    assembler: SegmentAssembler,
    canvas: Canvas,
    renderer: Renderer,
    options: EngineOptions,
    frames: u64,
}

impl FrameEngine {
    pub fn new(variant: SensorVariant, options: EngineOptions) -> Self {
        Self {
            assembler: SegmentAssembler::new(variant),
            canvas: Canvas::new(variant),
            renderer: Renderer::new(options.warn_every),
            options,
            frames: 0,
        }
    }

    /// Frames rendered so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Current canvas
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    fn sample_pixel(&self, variant: SensorVariant) -> PixelCoord {
        self.options
            .sample
            .unwrap_or_else(|| PixelCoord::center(variant))
    }

    /// Process one validated pass
    ///
    /// Returns a frame when the pass completes one. The window in `state` is
    /// re-estimated for every completed frame.
    #[instrument(
        level = "trace",
        name = "frame_engine_process",
        skip(self, pass, config, state),
        fields(segment = pass.segment)
    )]
    pub fn process(
        &mut self,
        pass: Pass<'_>,
        config: &RenderConfig,
        state: &mut SyncState,
    ) -> Option<FrameOutput> {
        if config.variant != self.assembler.variant() {
            info!(
                from = %self.assembler.variant(),
                to = %config.variant,
                "sensor variant changed, resetting frame storage"
            );
            self.assembler.reset(config.variant);
            self.canvas = Canvas::new(config.variant);
        }

        if !self.assembler.store(pass) {
            return None;
        }

        let segments = self.assembler.segments().map(|(_, packets)| packets);
        state.window = estimate_window(config, segments, state.window);
        if state.window.max <= state.window.min {
            debug!(
                min = state.window.min,
                max = state.window.max,
                scale = state.window.scale,
                "degenerate range, keeping previous scale"
            );
        }

        let variant = config.variant;
        let sample = self.sample_pixel(variant);
        let stats = self.renderer.render(
            &mut self.canvas,
            colormap::table(config.colormap),
            state.window,
            self.assembler.segments(),
            Some(sample),
            &mut state.zero_drops,
        );

        self.frames += 1;
        let frame = RenderedFrame {
            frame_id: self.frames,
            variant,
            width: variant.width() as u32,
            height: variant.height() as u32,
            window: state.window,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or_default(),
            rgb: self.canvas.snapshot(),
        };

        Some(FrameOutput { frame, stats })
    }
}
