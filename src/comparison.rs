use crate::geometry::{Point, Rect, Size, Source};
use crate::state::{InteractiveState, Orientation};
use crate::surface::{Color, Surface};
use log::debug;

/// Position of the split line along its axis.
///
/// Clamped to `[1, size - 1]` so both sides always keep a nonzero extent.
pub fn split_coordinate(state: &InteractiveState, canvas: Size) -> f32 {
    if state.orientation.is_vertical() {
        state.cursor.x.max(1.0).min(canvas.width - 1.0)
    } else {
        state.cursor.y.max(1.0).min(canvas.height - 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitGeometry {
    pub base_src: Rect,
    pub base_dst: Rect,
    pub overlay_src: Rect,
    pub overlay_dst: Rect,
    pub separator: (Point, Point),
}

impl SplitGeometry {
    pub fn compute(state: &InteractiveState, sources: &[Source; 2], canvas: Size) -> Self {
        let (w, h) = (canvas.width, canvas.height);
        let s0 = sources[0].origin;
        let s1 = sources[1].origin;
        let at = split_coordinate(state, canvas);

        let (overlay_src, overlay_dst, separator) = match state.orientation {
            Orientation::RIGHT => (
                Rect::new(s1.x + at, s1.y, w - at, h),
                Rect::new(at, 0.0, w - at, h),
                (Point::new(at, 0.0), Point::new(at, h)),
            ),
            Orientation::LEFT => (
                Rect::new(s1.x, s1.y, at, h),
                Rect::new(0.0, 0.0, at, h),
                (Point::new(at, 0.0), Point::new(at, h)),
            ),
            Orientation::TOP => (
                Rect::new(s1.x, s1.y, w, at),
                Rect::new(0.0, 0.0, w, at),
                (Point::new(0.0, at), Point::new(w, at)),
            ),
            _ => (
                Rect::new(s1.x, s1.y + at, w, h - at),
                Rect::new(0.0, at, w, h - at),
                (Point::new(0.0, at), Point::new(w, at)),
            ),
        };

        Self {
            base_src: Rect::new(s0.x, s0.y, w, h),
            base_dst: Rect::new(0.0, 0.0, w, h),
            overlay_src,
            overlay_dst,
            separator,
        }
    }
}

/// Repaints the canvas: source 0 everywhere, source 1 on its side of the split.
pub fn render_comparison<S: Surface + ?Sized>(
    surface: &mut S,
    sources: &[Source; 2],
    state: &InteractiveState,
) {
    let canvas = Size::new(surface.width() as f32, surface.height() as f32);
    let geometry = SplitGeometry::compute(state, sources, canvas);

    surface.draw_media(sources[0].media.as_ref(), geometry.base_src, geometry.base_dst);
    surface.draw_media(
        sources[1].media.as_ref(),
        geometry.overlay_src,
        geometry.overlay_dst,
    );
    let (from, to) = geometry.separator;
    surface.stroke_line(from, to, Color::SEPARATOR);

    debug!(
        "Composited orientation {} split at {:?}",
        state.orientation.value(),
        from
    );
}
