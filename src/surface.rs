//! Drawing surfaces the compositor and magnifiers paint into.
//!
//! [`Surface`] is the small subset of a 2D canvas the comparator needs.
//! [`RasterSurface`] implements it on the CPU over an `RgbaImage`. Its
//! pixels are uploaded as a texture by the viewer. Text is not rasterized
//! here: labels are recorded and the presenter overlays them with its own
//! font.

use crate::geometry::{Point, Rect};
use crate::media::Media;
use image::{Rgba, RgbaImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const SEPARATOR: Color = Color([0xFF, 0x00, 0x00, 0xFF]);
    pub const MAGNIFIER_BACKGROUND: Color = Color([0x49, 0x49, 0x49, 0xFF]);
    pub const LABEL_STROKE: Color = Color([0x00, 0x00, 0x00, 0xFF]);
    pub const LABEL_FILL: Color = Color([0xFF, 0xFF, 0xFF, 0xFF]);

    pub fn to_f32(self) -> [f32; 4] {
        self.0.map(|c| c as f32 / 255.0)
    }
}

pub trait Surface: Send {
    fn create(width: u32, height: u32) -> Self
    where
        Self: Sized;

    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Resizes and clears the surface, resetting smoothing to enabled.
    fn resize(&mut self, width: u32, height: u32);

    fn set_smoothing(&mut self, enabled: bool);
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draws the `src` crop of the media's current frame scaled into `dst`.
    fn draw_media(&mut self, media: &dyn Media, src: Rect, dst: Rect);

    fn stroke_line(&mut self, from: Point, to: Point, color: Color);

    /// Outlined text whose baseline starts at `at`.
    fn draw_label(&mut self, text: &str, at: Point);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: Point,
}

pub struct RasterSurface {
    pixels: RgbaImage,
    smoothing: bool,
    labels: Vec<Label>,
    revision: u64,
}

impl RasterSurface {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Bumped on every mutation, so presenters can skip unchanged uploads.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        let alpha = color[3] as u32;
        if alpha == 0 {
            return;
        }
        let dst = self.pixels.get_pixel_mut(x, y);
        if alpha == 255 {
            *dst = color;
            return;
        }
        let inv = 255 - alpha;
        for c in 0..3 {
            dst[c] = ((color[c] as u32 * alpha + dst[c] as u32 * inv) / 255) as u8;
        }
        dst[3] = (alpha + dst[3] as u32 * inv / 255).min(255) as u8;
    }
}

fn sample_nearest(frame: &RgbaImage, u: f32, v: f32) -> Rgba<u8> {
    let x = (u.floor() as u32).min(frame.width() - 1);
    let y = (v.floor() as u32).min(frame.height() - 1);
    *frame.get_pixel(x, y)
}

fn sample_bilinear(frame: &RgbaImage, u: f32, v: f32) -> Rgba<u8> {
    let max_x = (frame.width() - 1) as f32;
    let max_y = (frame.height() - 1) as f32;
    let fx = (u - 0.5).clamp(0.0, max_x);
    let fy = (v - 0.5).clamp(0.0, max_y);
    let (x0, y0) = (fx.floor(), fy.floor());
    let (x1, y1) = ((x0 + 1.0).min(max_x), (y0 + 1.0).min(max_y));
    let (tx, ty) = (fx - x0, fy - y0);

    let p00 = frame.get_pixel(x0 as u32, y0 as u32);
    let p10 = frame.get_pixel(x1 as u32, y0 as u32);
    let p01 = frame.get_pixel(x0 as u32, y1 as u32);
    let p11 = frame.get_pixel(x1 as u32, y1 as u32);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
        let bottom = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round() as u8;
    }
    Rgba(out)
}

/// Half-open pixel span whose centres fall inside `[start, end)`.
fn pixel_span(start: f32, end: f32, limit: u32) -> std::ops::Range<u32> {
    let first = (start - 0.5).ceil().max(0.0);
    let last = (end - 0.5).ceil().clamp(0.0, limit as f32);
    first as u32..(last as u32).max(first as u32)
}

impl Surface for RasterSurface {
    fn create(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            smoothing: true,
            labels: Vec::new(),
            revision: 0,
        }
    }

    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width, height);
        self.smoothing = true;
        self.labels.clear();
        self.touch();
    }

    fn set_smoothing(&mut self, enabled: bool) {
        self.smoothing = enabled;
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let xs = pixel_span(rect.x, rect.right(), self.width());
        let ys = pixel_span(rect.y, rect.bottom(), self.height());
        for y in ys {
            for x in xs.clone() {
                self.blend(x, y, Rgba(color.0));
            }
        }
        self.touch();
    }

    fn draw_media(&mut self, media: &dyn Media, src: Rect, dst: Rect) {
        if src.is_empty() || dst.is_empty() {
            return;
        }
        let Some(frame) = media.current_frame() else {
            return;
        };
        if frame.width() == 0 || frame.height() == 0 {
            return;
        }
        let scale_x = src.width / dst.width;
        let scale_y = src.height / dst.height;
        let (frame_w, frame_h) = (frame.width() as f32, frame.height() as f32);

        for y in pixel_span(dst.y, dst.bottom(), self.height()) {
            let v = src.y + (y as f32 + 0.5 - dst.y) * scale_y;
            if v < 0.0 || v >= frame_h {
                continue;
            }
            for x in pixel_span(dst.x, dst.right(), self.width()) {
                let u = src.x + (x as f32 + 0.5 - dst.x) * scale_x;
                if u < 0.0 || u >= frame_w {
                    continue;
                }
                let color = if self.smoothing {
                    sample_bilinear(&frame, u, v)
                } else {
                    sample_nearest(&frame, u, v)
                };
                self.blend(x, y, color);
            }
        }
        self.touch();
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: Color) {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
        let (w, h) = (self.width() as f32, self.height() as f32);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = (from.x + dx * t).floor();
            let y = (from.y + dy * t).floor();
            if x >= 0.0 && y >= 0.0 && x < w && y < h {
                self.blend(x as u32, y as u32, Rgba(color.0));
            }
        }
        self.touch();
    }

    fn draw_label(&mut self, text: &str, at: Point) {
        self.labels.push(Label {
            text: text.to_string(),
            position: at,
        });
        self.touch();
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Identity of a media object, for asserting which source was drawn.
    pub fn media_id(media: &dyn Media) -> usize {
        media as *const dyn Media as *const () as usize
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum DrawOp {
        Resize(u32, u32),
        Smoothing(bool),
        Fill(Rect, Color),
        Media { media: usize, src: Rect, dst: Rect },
        Line(Point, Point, Color),
        Label(String, Point),
    }

    pub struct RecordingSurface {
        width: u32,
        height: u32,
        pub ops: Vec<DrawOp>,
    }

    impl RecordingSurface {
        pub fn media_draws(&self) -> Vec<(usize, Rect, Rect)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    DrawOp::Media { media, src, dst } => Some((*media, *src, *dst)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Surface for RecordingSurface {
        fn create(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ops: Vec::new(),
            }
        }

        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
            self.ops.clear();
            self.ops.push(DrawOp::Resize(width, height));
        }

        fn set_smoothing(&mut self, enabled: bool) {
            self.ops.push(DrawOp::Smoothing(enabled));
        }

        fn fill_rect(&mut self, rect: Rect, color: Color) {
            self.ops.push(DrawOp::Fill(rect, color));
        }

        fn draw_media(&mut self, media: &dyn Media, src: Rect, dst: Rect) {
            self.ops.push(DrawOp::Media {
                media: media_id(media),
                src,
                dst,
            });
        }

        fn stroke_line(&mut self, from: Point, to: Point, color: Color) {
            self.ops.push(DrawOp::Line(from, to, color));
        }

        fn draw_label(&mut self, text: &str, at: Point) {
            self.ops.push(DrawOp::Label(text.to_string(), at));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::StillImage;

    fn checker() -> StillImage {
        let mut frame = RgbaImage::new(2, 2);
        frame.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        frame.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        frame.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        frame.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        StillImage::new(frame)
    }

    #[test]
    fn nearest_neighbour_keeps_pixels_sharp() {
        let mut surface = RasterSurface::create(8, 8);
        surface.set_smoothing(false);
        surface.draw_media(
            &checker(),
            Rect::new(0.0, 0.0, 2.0, 2.0),
            Rect::new(0.0, 0.0, 8.0, 8.0),
        );
        assert_eq!(*surface.pixels().get_pixel(3, 3), Rgba([255, 0, 0, 255]));
        assert_eq!(*surface.pixels().get_pixel(4, 3), Rgba([0, 255, 0, 255]));
        assert_eq!(*surface.pixels().get_pixel(3, 4), Rgba([0, 0, 255, 255]));
        assert_eq!(*surface.pixels().get_pixel(7, 7), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn crops_are_drawn_at_their_destination_only() {
        let mut surface = RasterSurface::create(4, 4);
        surface.set_smoothing(false);
        surface.draw_media(
            &checker(),
            Rect::new(1.0, 0.0, 1.0, 1.0),
            Rect::new(2.0, 2.0, 2.0, 2.0),
        );
        assert_eq!(*surface.pixels().get_pixel(1, 1), Rgba([0, 0, 0, 0]));
        assert_eq!(*surface.pixels().get_pixel(2, 2), Rgba([0, 255, 0, 255]));
        assert_eq!(*surface.pixels().get_pixel(3, 3), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn resize_clears_pixels_and_labels() {
        let mut surface = RasterSurface::create(4, 4);
        surface.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::MAGNIFIER_BACKGROUND);
        surface.draw_label("A", Point::new(1.0, 2.0));
        let before = surface.revision();

        surface.resize(6, 3);
        assert!(surface.revision() > before);
        assert_eq!((surface.width(), surface.height()), (6, 3));
        assert!(surface.labels().is_empty());
        assert_eq!(*surface.pixels().get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn vertical_line_covers_the_column() {
        let mut surface = RasterSurface::create(5, 4);
        surface.stroke_line(Point::new(2.0, 0.0), Point::new(2.0, 4.0), Color::SEPARATOR);
        for y in 0..4 {
            assert_eq!(surface.pixels().get_pixel(2, y).0, Color::SEPARATOR.0);
            assert_eq!(surface.pixels().get_pixel(1, y).0, [0, 0, 0, 0]);
        }
    }

    #[test]
    fn out_of_bounds_drawing_is_clipped() {
        let mut surface = RasterSurface::create(4, 4);
        surface.fill_rect(Rect::new(-10.0, -10.0, 100.0, 100.0), Color::SEPARATOR);
        surface.draw_media(
            &checker(),
            Rect::new(-4.0, -4.0, 8.0, 8.0),
            Rect::new(-2.0, -2.0, 16.0, 16.0),
        );
        assert_eq!(surface.pixels().get_pixel(3, 3).0, [255, 0, 0, 255]);
    }
}
