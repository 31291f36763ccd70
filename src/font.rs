//! Bitmap text built on the Spleen 12x24 font.
//!
//! Glyphs are scaled with nearest-neighbour sampling so that one em equals
//! the requested font size. A 24 px Spleen cell spans 1.2 em.

use spleen_font::{PSF2Font, FONT_12X24};
use std::collections::HashMap;

pub const CELL_WIDTH: usize = 12;
pub const CELL_HEIGHT: usize = 24;

const CELL_EM: f64 = 1.2;
const FALLBACK: char = '?';

/// Pixel rectangle `[x0, x1) x [y0, y1)` that drawing is limited to.
pub type PixelClip = (i64, i64, i64, i64);

/// No clipping at all.
pub const UNCLIPPED: PixelClip = (i64::MIN, i64::MIN, i64::MAX, i64::MAX);

#[derive(Debug, Clone, PartialEq)]
struct Glyph {
    bits: Vec<bool>,
}

impl Glyph {
    fn on(&self, col: usize, row: usize) -> bool {
        col < CELL_WIDTH && row < CELL_HEIGHT && self.bits[row * CELL_WIDTH + col]
    }
}

/// Horizontal advance of one character cell at `font_size` px.
pub fn advance(font_size: f64) -> f64 {
    cell_height(font_size) * CELL_WIDTH as f64 / CELL_HEIGHT as f64
}

/// Height of one character cell at `font_size` px.
pub fn cell_height(font_size: f64) -> f64 {
    font_size * CELL_EM
}

/// Width of `text` set at `font_size` with `spacing` px between characters.
pub fn measure(text: &str, font_size: f64, spacing: f64) -> f64 {
    let n = text.chars().count();
    if n == 0 {
        return 0.0;
    }
    n as f64 * advance(font_size) + (n - 1) as f64 * spacing
}

#[derive(Debug, Default)]
pub struct BitmapFont {
    cache: HashMap<char, Option<Glyph>>,
}

impl BitmapFont {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(ch: char) -> Option<Glyph> {
        let mut font = PSF2Font::new(FONT_12X24).ok()?;
        let utf8 = ch.to_string();
        let rows = font.glyph_for_utf8(utf8.as_bytes())?;

        let mut bits = vec![false; CELL_WIDTH * CELL_HEIGHT];
        for (row_y, row) in rows.enumerate() {
            for (col_x, on) in row.enumerate() {
                if row_y < CELL_HEIGHT && col_x < CELL_WIDTH {
                    bits[row_y * CELL_WIDTH + col_x] = on;
                }
            }
        }
        Some(Glyph { bits })
    }

    fn glyph(&mut self, ch: char) -> Option<&Glyph> {
        let ch = if self.cache.entry(ch).or_insert_with(|| Self::load(ch)).is_some() {
            ch
        } else {
            tracing::trace!(?ch, "no glyph; using fallback");
            self.cache.entry(FALLBACK).or_insert_with(|| Self::load(FALLBACK));
            FALLBACK
        };
        self.cache.get(&ch).and_then(Option::as_ref)
    }

    /// Call `plot(x, y)` for every lit pixel of `text` laid out from the
    /// top-left corner `(x, y)` that falls inside `clip`. Only the part of
    /// each cell overlapping `clip` is visited. Bold thickens each stroke by
    /// one source column.
    #[allow(clippy::too_many_arguments)]
    pub fn draw<F>(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        font_size: f64,
        spacing: f64,
        bold: bool,
        clip: PixelClip,
        mut plot: F,
    ) where
        F: FnMut(i64, i64),
    {
        let step = advance(font_size);
        let height = cell_height(font_size);
        let scale = height / CELL_HEIGHT as f64;
        let w_px = step.ceil() as i64;
        let h_px = height.ceil() as i64;
        if w_px <= 0 || h_px <= 0 {
            return;
        }

        let (cx0, cy0, cx1, cy1) = clip;
        let top = y.round() as i64;
        let rows = cy0.saturating_sub(top).clamp(0, h_px)..cy1.saturating_sub(top).clamp(0, h_px);
        if rows.is_empty() {
            return;
        }

        let mut pen_x = x;
        for ch in text.chars() {
            let left = pen_x.round() as i64;
            if left >= cx1 && step + spacing >= 0.0 {
                break;
            }
            let cols = cx0.saturating_sub(left).clamp(0, w_px)..cx1.saturating_sub(left).clamp(0, w_px);
            if !cols.is_empty() {
                if let Some(glyph) = self.glyph(ch) {
                    for py in rows.clone() {
                        let row = ((py as f64 + 0.5) / scale) as usize;
                        for px in cols.clone() {
                            let col = ((px as f64 + 0.5) / scale) as usize;
                            let lit = glyph.on(col, row) || (bold && col > 0 && glyph.on(col - 1, row));
                            if lit {
                                plot(left + px, top + py);
                            }
                        }
                    }
                }
            }
            pen_x += step + spacing;
        }
    }
}
