//! Pie chart rendering.
//!
//! Slices are rasterized directly into an RGB buffer and encoded with `png`.
//! The title and each slice label are drawn with the embedded bitmap font,
//! labels beside colour swatches in slice order. The same text is also
//! stored in the `Title` and `Legend` text chunks.

use std::f64::consts::TAU;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};

use crate::font::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::report::ChartSlice;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 500;

const CENTER: (f64, f64) = (250.0, 250.0);
const RADIUS: f64 = 220.0;
const OUTLINE_WIDTH: f64 = 1.5;

const LEGEND_X: u32 = 520;
const LEGEND_Y: u32 = 40;
const SWATCH: u32 = 18;
const SWATCH_SPACING: u32 = 28;

/// Glyphs are drawn at twice their bitmap size.
const TEXT_SCALE: u32 = 2;
const TEXT_GAP: u32 = 8;
const TITLE_Y: u32 = 10;

type Rgb = [u8; 3];

const BACKGROUND: Rgb = [255, 255, 255];
const OUTLINE: Rgb = [64, 64, 64];
const TEXT: Rgb = [0, 0, 0];

/// Ten-colour qualitative palette; larger charts cycle through it.
const PALETTE: [Rgb; 10] = [
    [0x1f, 0x77, 0xb4],
    [0xff, 0x7f, 0x0e],
    [0x2c, 0xa0, 0x2c],
    [0xd6, 0x27, 0x28],
    [0x94, 0x67, 0xbd],
    [0x8c, 0x56, 0x4b],
    [0xe3, 0x77, 0xc2],
    [0x7f, 0x7f, 0x7f],
    [0xbc, 0xbd, 0x22],
    [0x17, 0xbe, 0xcf],
];

/// Colour of the slice at `index`.
pub const fn slice_color(index: usize) -> Rgb {
    PALETTE[index % PALETTE.len()]
}

struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32, fill: Rgb) -> Self {
        let len = (width * height) as usize;
        Self {
            width,
            height,
            pixels: fill.repeat(len),
        }
    }

    fn set(&mut self, x: u32, y: u32, color: Rgb) {
        let offset = ((y * self.width + x) * 3) as usize;
        self.pixels[offset..offset + 3].copy_from_slice(&color);
    }

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        for py in y..y + h {
            for px in x..x + w {
                self.set(px, py, color);
            }
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`). Characters that
    /// would cross the right or bottom edge are dropped.
    fn draw_text(&mut self, x: u32, y: u32, text: &str, color: Rgb) {
        let advance = ADVANCE * TEXT_SCALE;
        if y + GLYPH_HEIGHT * TEXT_SCALE > self.height {
            return;
        }

        let mut left = x;
        for c in text.chars() {
            if left + GLYPH_WIDTH * TEXT_SCALE > self.width {
                tracing::debug!(text, "chart text clipped");
                break;
            }
            for gy in 0..GLYPH_HEIGHT {
                for gx in 0..GLYPH_WIDTH {
                    if font::is_set(c, gx, gy) {
                        self.fill_rect(
                            left + gx * TEXT_SCALE,
                            y + gy * TEXT_SCALE,
                            TEXT_SCALE,
                            TEXT_SCALE,
                            color,
                        );
                    }
                }
            }
            left += advance;
        }
    }
}

/// Cumulative fraction at which each drawn slice ends, with its palette index.
#[expect(clippy::cast_precision_loss, reason = "second totals stay far below 2^52")]
fn slice_bounds(slices: &[ChartSlice]) -> Vec<(f64, usize)> {
    let total: i64 = slices.iter().map(|s| s.seconds.max(0)).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut cumulative = 0;
    slices
        .iter()
        .enumerate()
        .filter(|(_, s)| s.seconds > 0)
        .map(|(idx, s)| {
            cumulative += s.seconds;
            (cumulative as f64 / total as f64, idx)
        })
        .collect()
}

fn rasterize(title: &str, slices: &[ChartSlice]) -> Canvas {
    let mut canvas = Canvas::new(WIDTH, HEIGHT, BACKGROUND);
    let bounds = slice_bounds(slices);

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let dx = f64::from(x) + 0.5 - CENTER.0;
            let dy = CENTER.1 - (f64::from(y) + 0.5);
            let dist = dx.hypot(dy);
            if dist > RADIUS {
                continue;
            }
            if dist > RADIUS - OUTLINE_WIDTH {
                canvas.set(x, y, OUTLINE);
                continue;
            }

            // Counter-clockwise from 3 o'clock.
            let angle = dy.atan2(dx).rem_euclid(TAU);
            let fraction = angle / TAU;
            if let Some(&(_, idx)) = bounds
                .iter()
                .find(|(end, _)| fraction < *end)
                .or_else(|| bounds.last())
            {
                canvas.set(x, y, slice_color(idx));
            }
        }
    }

    canvas.draw_text(LEGEND_X, TITLE_Y, title, TEXT);

    let label_x = LEGEND_X + SWATCH + TEXT_GAP;
    let label_offset = (SWATCH - GLYPH_HEIGHT * TEXT_SCALE) / 2;
    let mut y = LEGEND_Y;
    for (idx, slice) in slices.iter().enumerate() {
        if slice.seconds <= 0 {
            continue;
        }
        if y + SWATCH > HEIGHT {
            tracing::debug!(remaining = slices.len() - idx, "legend truncated");
            break;
        }
        canvas.fill_rect(LEGEND_X, y, SWATCH, SWATCH, slice_color(idx));
        canvas.draw_text(label_x, y + label_offset, &slice.label, TEXT);
        y += SWATCH_SPACING;
    }

    canvas
}

/// Render `slices` as a pie chart PNG at `path`, creating parent directories.
pub fn render_pie(title: &str, slices: &[ChartSlice], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create chart directory {}", parent.display()))?;
    }

    let canvas = rasterize(title, slices);
    let legend = slices
        .iter()
        .filter(|s| s.seconds > 0)
        .map(|s| s.label.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let file = File::create(path)
        .with_context(|| format!("failed to create chart {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), WIDTH, HEIGHT);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder
        .add_itxt_chunk("Title".to_string(), title.to_string())
        .context("failed to add chart title")?;
    encoder
        .add_itxt_chunk("Legend".to_string(), legend)
        .context("failed to add chart legend")?;

    let mut writer = encoder
        .write_header()
        .with_context(|| format!("failed to write chart {}", path.display()))?;
    writer
        .write_image_data(&canvas.pixels)
        .with_context(|| format!("failed to write chart {}", path.display()))?;
    writer
        .finish()
        .with_context(|| format!("failed to write chart {}", path.display()))?;

    tracing::debug!(path = ?path, slices = slices.len(), "wrote chart");
    Ok(())
}
