//! Colormap lookup tables.
//!
//! Each table is a flat `[r, g, b, r, g, b, ...]` byte array of 256 entries.

use std::sync::LazyLock;

use contracts::ColormapKind;

/// Entries per table
pub const COLORMAP_ENTRIES: usize = 256;

type Rgb = (u8, u8, u8);

static RAINBOW: LazyLock<Vec<u8>> = LazyLock::new(|| {
    gradient(
        &[
            (0, 0, 0),
            (0, 0, 255),
            (0, 255, 255),
            (0, 255, 0),
            (255, 255, 0),
            (255, 0, 0),
            (255, 255, 255),
        ],
        COLORMAP_ENTRIES,
    )
});

static GRAYSCALE: LazyLock<Vec<u8>> =
    LazyLock::new(|| (0..COLORMAP_ENTRIES).flat_map(|i| [i as u8; 3]).collect());

static IRONBLACK: LazyLock<Vec<u8>> = LazyLock::new(|| {
    // Descending grey for the cold half, then the iron ramp.
    let half = COLORMAP_ENTRIES / 2;
    let mut table: Vec<u8> = (0..half)
        .flat_map(|i| [(255 - i * 2) as u8; 3])
        .collect();
    table.extend(gradient(
        &[
            (0, 0, 0),
            (40, 0, 100),
            (120, 0, 150),
            (200, 30, 100),
            (240, 90, 20),
            (255, 160, 0),
            (255, 220, 60),
            (255, 255, 255),
        ],
        COLORMAP_ENTRIES - half,
    ));
    table
});

/// Linear interpolation across evenly spaced stops
fn gradient(stops: &[Rgb], entries: usize) -> Vec<u8> {
    let spans = stops.len() - 1;
    let mut table = Vec::with_capacity(entries * 3);
    for i in 0..entries {
        // position along the whole ramp in units of 1/(entries-1)
        let pos = i * spans;
        let denom = entries - 1;
        let stop = (pos / denom).min(spans - 1);
        let frac_num = pos - stop * denom;
        let (a, b) = (stops[stop], stops[stop + 1]);
        let lerp = |x: u8, y: u8| -> u8 {
            let x = x as isize;
            let y = y as isize;
            (x + (y - x) * frac_num as isize / denom as isize) as u8
        };
        table.extend_from_slice(&[lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2)]);
    }
    table
}

/// Flat RGB table for a colormap
pub fn table(kind: ColormapKind) -> &'static [u8] {
    match kind {
        ColormapKind::Rainbow => RAINBOW.as_slice(),
        ColormapKind::Grayscale => GRAYSCALE.as_slice(),
        ColormapKind::Ironblack => IRONBLACK.as_slice(),
    }
}

/// Look up a scaled display value
///
/// Each channel offset `3 * index + k` is clamped to the last byte of the
/// table, so indices past the last entry saturate per channel.
#[inline]
pub fn lookup(table: &[u8], index: usize) -> [u8; 3] {
    let last = table.len() - 1;
    let at = |k: usize| table[(3 * index + k).min(last)];
    [at(0), at(1), at(2)]
}
