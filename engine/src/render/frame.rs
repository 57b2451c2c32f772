//! CPU-side frame buffer that the scene draws into every frame.

use image::{imageops, Pixel, Rgba, RgbaImage};

use super::text::TextFont;

pub type Color = Rgba<u8>;

pub const DEBUG_RED: Color = Rgba([255, 0, 0, 255]);
pub const DEBUG_TEXT: Color = Rgba([255, 255, 255, 255]);

/// Integer screen rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn set_top_left(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.w)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add_unsigned(self.h)
    }

    /// True when the two rectangles share at least one pixel.
    pub fn overlaps(&self, other: &ScreenRect) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn bounds(&self) -> ScreenRect {
        let (w, h) = self.size();
        ScreenRect::new(0, 0, w, h)
    }

    /// Reallocates only when the size actually changes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.size() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    pub fn fill(&mut self, color: Color) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Alpha-blends `src` with its top-left at (x, y); off-screen parts are clipped.
    pub fn blit(&mut self, src: &RgbaImage, x: i32, y: i32) {
        imageops::overlay(&mut self.image, src, i64::from(x), i64::from(y));
    }

    /// One pixel wide rectangle outline.
    pub fn outline(&mut self, rect: ScreenRect, color: Color) {
        if rect.w == 0 || rect.h == 0 {
            return;
        }
        let (right, bottom) = (rect.right() - 1, rect.bottom() - 1);
        for x in rect.x..=right {
            self.put(x, rect.y, color);
            self.put(x, bottom, color);
        }
        for y in rect.y..=bottom {
            self.put(rect.x, y, color);
            self.put(right, y, color);
        }
    }

    /// Writes one line of `text` with its top-left at (x, y), blending glyph
    /// coverage over what is already there.
    pub fn text(&mut self, font: &TextFont, text: &str, x: i32, y: i32, color: Color) {
        let (w, h) = self.size();
        let image = &mut self.image;
        font.rasterize(text, x, y, |px, py, coverage| {
            if px < 0 || py < 0 || px as u32 >= w || py as u32 >= h {
                return;
            }
            let alpha = (coverage.clamp(0.0, 1.0) * f32::from(color[3])).round() as u8;
            let [r, g, b, _] = color.0;
            image
                .get_pixel_mut(px as u32, py as u32)
                .blend(&Rgba([r, g, b, alpha]));
        });
    }

    fn put(&mut self, x: i32, y: i32, color: Color) {
        let (w, h) = self.size();
        if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        *self.image.get_pixel(x, y)
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: Color = Rgba([0, 0, 255, 255]);
    const GREEN: Color = Rgba([0, 255, 0, 255]);

    #[test]
    fn blit_clips_at_the_edges() {
        let mut frame = Frame::new(8, 8);
        frame.fill(BLUE);
        let tile = RgbaImage::from_pixel(4, 4, GREEN);

        frame.blit(&tile, -2, 6);

        assert_eq!(frame.pixel(0, 6), GREEN);
        assert_eq!(frame.pixel(1, 7), GREEN);
        assert_eq!(frame.pixel(2, 6), BLUE);
        assert_eq!(frame.pixel(0, 5), BLUE);
    }

    #[test]
    fn transparent_pixels_keep_the_background() {
        let mut frame = Frame::new(2, 1);
        frame.fill(BLUE);
        let mut src = RgbaImage::from_pixel(2, 1, GREEN);
        src.put_pixel(1, 0, Rgba([255, 255, 255, 0]));

        frame.blit(&src, 0, 0);

        assert_eq!(frame.pixel(0, 0), GREEN);
        assert_eq!(frame.pixel(1, 0), BLUE);
    }

    #[test]
    fn outline_leaves_the_interior() {
        let mut frame = Frame::new(6, 6);
        frame.outline(ScreenRect::new(1, 1, 4, 4), DEBUG_RED);

        assert_eq!(frame.pixel(1, 1), DEBUG_RED);
        assert_eq!(frame.pixel(4, 4), DEBUG_RED);
        assert_eq!(frame.pixel(4, 2), DEBUG_RED);
        assert_eq!(frame.pixel(2, 2), Rgba([0, 0, 0, 0]));
        assert_eq!(frame.pixel(5, 5), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn outline_partially_off_screen() {
        let mut frame = Frame::new(4, 4);
        frame.outline(ScreenRect::new(-2, -2, 4, 4), DEBUG_RED);
        assert_eq!(frame.pixel(1, 0), DEBUG_RED);
        assert_eq!(frame.pixel(0, 1), DEBUG_RED);
        assert_eq!(frame.pixel(1, 1), DEBUG_RED);
        assert_eq!(frame.pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(frame.pixel(2, 2), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn text_is_drawn_below_its_anchor() {
        let font = TextFont::builtin(16.0).unwrap();
        let mut frame = Frame::new(64, 32);
        frame.fill(BLUE);

        frame.text(&font, "FPS: 60", 2, 4, DEBUG_TEXT);

        let lit: Vec<(u32, u32)> = (0..32)
            .flat_map(|y| (0..64).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.pixel(x, y) != BLUE)
            .collect();
        assert!(lit.iter().any(|&(x, y)| frame.pixel(x, y)[0] > 200));
        assert!(lit.iter().all(|&(x, y)| x >= 2 && y >= 4), "ink above or left of the anchor");
    }

    #[test]
    fn off_screen_text_is_clipped() {
        let font = TextFont::builtin(16.0).unwrap();
        let mut frame = Frame::new(8, 8);
        frame.fill(BLUE);
        frame.text(&font, "hidden", -500, -500, DEBUG_TEXT);
        frame.text(&font, "", 0, 0, DEBUG_TEXT);
        assert!(frame.as_image().pixels().all(|p| *p == BLUE));
    }

    #[test]
    fn huge_rects_saturate_instead_of_overflowing() {
        let rect = ScreenRect::new(i32::MAX - 1, 0, u32::MAX, 4);
        assert_eq!(rect.right(), i32::MAX);
        assert!(!rect.overlaps(&ScreenRect::new(0, 0, 8, 8)));
    }

    #[test]
    fn rect_overlap() {
        let a = ScreenRect::new(0, 0, 10, 10);
        assert!(a.overlaps(&ScreenRect::new(9, 9, 5, 5)));
        assert!(!a.overlaps(&ScreenRect::new(10, 0, 5, 5)));
        assert!(!a.overlaps(&ScreenRect::new(-5, 0, 5, 5)));
    }
}
