//! Radiometric range estimation.

use contracts::{Packet, RenderConfig, ScaleWindow, ZERO_SENTINEL};

/// Observed nonzero extremes of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawExtremes {
    pub min: u16,
    pub max: u16,
}

/// Scan payload words (header words skipped), ignoring the zero sentinel
pub fn scan_extremes<'a>(segments: impl IntoIterator<Item = &'a [Packet]>) -> Option<RawExtremes> {
    segments
        .into_iter()
        .flatten()
        .flat_map(|packet| packet.payload())
        .filter(|&value| value != ZERO_SENTINEL)
        .fold(None, |acc, value| match acc {
            None => Some(RawExtremes {
                min: value,
                max: value,
            }),
            Some(RawExtremes { min, max }) => Some(RawExtremes {
                min: min.min(value),
                max: max.max(value),
            }),
        })
}

/// Window for the next frame
///
/// Manual bounds are used as configured when both auto flags are off.
/// Otherwise the flagged bounds are replaced by this frame's scanned
/// extremes and the others keep their configured value. A degenerate result
/// (`max <= min`) keeps `prior.scale`; a frame without nonzero words keeps
/// `prior` unchanged.
pub fn estimate_window<'a>(
    config: &RenderConfig,
    segments: impl IntoIterator<Item = &'a [Packet]>,
    prior: ScaleWindow,
) -> ScaleWindow {
    let (min, max) = if config.auto_range() {
        let Some(extremes) = scan_extremes(segments) else {
            return prior;
        };
        (
            if config.auto_range_min {
                extremes.min
            } else {
                config.range_min
            },
            if config.auto_range_max {
                extremes.max
            } else {
                config.range_max
            },
        )
    } else {
        (config.range_min, config.range_max)
    };

    ScaleWindow {
        min,
        max,
        scale: ScaleWindow::scale_for(min, max).unwrap_or(prior.scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::pass_packets;

    fn auto() -> RenderConfig {
        RenderConfig::default()
    }

    #[test]
    fn test_auto_range_skips_zero_and_header() {
        let packets = pass_packets(None, |p, w| match (p, w) {
            (0, 0) => 0,
            (10, 5) => 31000,
            _ => 30000,
        });
        let window = estimate_window(&auto(), [packets.as_slice()], ScaleWindow::default());
        assert_eq!(window.min, 30000);
        assert_eq!(window.max, 31000);
        assert!((window.scale - 0.255).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_frame_takes_bounds_keeps_scale() {
        let packets = pass_packets(None, |_, _| 30000);
        let prior = ScaleWindow::new(29000, 29472);
        let window = estimate_window(&auto(), [packets.as_slice()], prior);
        assert_eq!((window.min, window.max), (30000, 30000));
        assert_eq!(window.scale, prior.scale);
    }

    #[test]
    fn test_all_zero_frame_keeps_prior_window() {
        let packets = pass_packets(None, |_, _| 0);
        let prior = ScaleWindow::new(29000, 29472);
        assert_eq!(scan_extremes([packets.as_slice()]), None);
        assert_eq!(estimate_window(&auto(), [packets.as_slice()], prior), prior);
    }

    #[test]
    fn test_only_flagged_bound_recomputed() {
        let packets = pass_packets(None, |p, _| 29000 + p as u16);
        let mut config = auto();
        config.use_range_max(32000);
        let window = estimate_window(&config, [packets.as_slice()], ScaleWindow::default());
        assert_eq!(window.min, 29000);
        assert_eq!(window.max, 32000);

        let mut config = auto();
        config.use_range_min(28000);
        let window = estimate_window(&config, [packets.as_slice()], ScaleWindow::default());
        assert_eq!(window.min, 28000);
        assert_eq!(window.max, 29059);
    }

    #[test]
    fn test_manual_range_ignores_data() {
        let packets = pass_packets(None, |_, _| 0);
        let mut config = auto();
        config.use_range_min(30000);
        config.use_range_max(32000);
        let window = estimate_window(&config, [packets.as_slice()], ScaleWindow::default());
        assert_eq!((window.min, window.max), (30000, 32000));
        assert!((window.scale - 255.0 / 2000.0).abs() < 1e-6);
    }

    #[test]
    fn test_scan_spans_segments() {
        let a = pass_packets(Some(1), |_, _| 100);
        let b = pass_packets(Some(2), |_, _| 900);
        let extremes = scan_extremes([a.as_slice(), b.as_slice()]).unwrap();
        assert_eq!(extremes, RawExtremes { min: 100, max: 900 });
    }
}
