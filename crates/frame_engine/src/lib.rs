//! # Frame Engine
//!
//! Turns validated packet passes into color-mapped frames.
//!
//! Responsibilities:
//! - Store segments and detect frame completion
//! - Estimate the radiometric display window
//! - Render raw words through a colormap onto a persistent canvas
//! - Sample the raw value of one pixel for telemetry
//!
//! ## Example
//!
//! ```ignore
//! use frame_engine::{EngineOptions, FrameEngine};
//!
//! let mut engine = FrameEngine::new(SensorVariant::Lepton3, EngineOptions::default());
//!
//! // Feed passes as the sync controller validates them
//! if let Some(output) = engine.process(pass, &config, &mut state) {
//!     // Publish output.frame
//! }
//! ```

pub mod colormap;
mod engine;
pub mod range;
mod render;
mod segments;

pub use engine::{EngineOptions, FrameEngine, FrameOutput};
pub use range::{estimate_window, scan_extremes, RawExtremes};
pub use render::{pixel_position, Canvas, RenderStats, Renderer};
pub use segments::SegmentAssembler;
