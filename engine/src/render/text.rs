//! Glyph rasterising for overlay text.

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};

use crate::error::Result;

static DEJAVU_SANS_MONO: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

/// A font face at one pixel size.
#[derive(Clone)]
pub struct TextFont {
    font: FontArc,
    scale: PxScale,
}

impl TextFont {
    /// The bundled DejaVu Sans Mono face.
    pub fn builtin(size: f32) -> Result<Self> {
        Self::from_bytes(DEJAVU_SANS_MONO, size)
    }

    pub fn from_bytes(data: &'static [u8], size: f32) -> Result<Self> {
        Ok(Self {
            font: FontArc::try_from_slice(data)?,
            scale: PxScale::from(size),
        })
    }

    pub fn line_height(&self) -> f32 {
        self.font.as_scaled(self.scale).height()
    }

    /// Lays `text` out on a single line whose top is at `y` and calls
    /// `plot(x, y, coverage)` for every pixel a glyph touches.
    pub(crate) fn rasterize(&self, text: &str, x: i32, y: i32, mut plot: impl FnMut(i32, i32, f32)) {
        let scaled = self.font.as_scaled(self.scale);
        let mut caret = point(x as f32, y as f32 + scaled.ascent());
        for c in text.chars() {
            let mut glyph = scaled.scaled_glyph(c);
            glyph.position = caret;
            caret.x += scaled.h_advance(glyph.id);
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                plot(
                    bounds.min.x as i32 + gx as i32,
                    bounds.min.y as i32 + gy as i32,
                    coverage,
                );
            });
        }
    }
}
