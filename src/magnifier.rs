use crate::geometry::{Point, Rect, Size, Source};
use crate::state::{InteractiveState, Orientation};
use crate::surface::{Color, Surface};

/// Where the label baseline starts inside a panel.
pub const LABEL_POSITION: Point = Point::new(10.0, 20.0);

/// Source window (canvas coordinates) and where it lands in the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnifierCrop {
    pub src: Rect,
    pub dst: Rect,
}

/// Crop of the canvas a panel of size `panel` shows at `zoom`, centred on `cursor`.
///
/// The window is clamped to the canvas. Cutting it on the left or top
/// shifts the destination by the zoomed overflow. The destination extent
/// always stays `zoom` times the source extent, so nothing gets stretched.
/// Returns `None` when nothing of the canvas is left to show.
pub fn magnifier_crop(cursor: Point, zoom: f32, panel: Size, canvas: Size) -> Option<MagnifierCrop> {
    let mut src = Rect::new(
        cursor.x - panel.width / (2.0 * zoom),
        cursor.y - panel.height / (2.0 * zoom),
        panel.width / zoom,
        panel.height / zoom,
    );
    let mut dst_origin = Point::default();

    if src.x < 0.0 {
        dst_origin.x = -zoom * src.x;
        src.width += src.x;
        src.x = 0.0;
    }
    if src.right() > canvas.width {
        src.width = canvas.width - src.x;
    }
    if src.y < 0.0 {
        dst_origin.y = -zoom * src.y;
        src.height += src.y;
        src.y = 0.0;
    }
    if src.bottom() > canvas.height {
        src.height = canvas.height - src.y;
    }

    if src.is_empty() {
        return None;
    }
    Some(MagnifierCrop {
        src,
        dst: Rect::new(
            dst_origin.x,
            dst_origin.y,
            zoom * src.width,
            zoom * src.height,
        ),
    })
}

/// Panel box for the preferred size inside a viewport of `available`:
/// at most half of it on each axis, and at least one pixel.
pub fn fit_panel(preferred: Size, available: Size) -> Size {
    let fit = |want: f32, room: f32| want.min((room / 2.0).floor()).max(1.0);
    Size::new(
        fit(preferred.width, available.width),
        fit(preferred.height, available.height),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub left: f32,
    pub top: f32,
}

/// Places both panels next to `cursor`, each on the side its source is drawn.
pub fn place_pair(orientation: Orientation, cursor: Point, panels: [Size; 2]) -> [Placement; 2] {
    let [p0, p1] = panels;
    if orientation.is_vertical() {
        let (left0, left1) = if orientation == Orientation::RIGHT {
            (cursor.x - p0.width, cursor.x)
        } else {
            (cursor.x, cursor.x - p1.width)
        };
        [
            Placement {
                left: left0,
                top: cursor.y - p0.height / 2.0,
            },
            Placement {
                left: left1,
                top: cursor.y - p1.height / 2.0,
            },
        ]
    } else {
        let (top0, top1) = if orientation == Orientation::TOP {
            (cursor.y, cursor.y - p1.height)
        } else {
            (cursor.y - p0.height, cursor.y)
        };
        [
            Placement {
                left: cursor.x - p0.width / 2.0,
                top: top0,
            },
            Placement {
                left: cursor.x - p1.width / 2.0,
                top: top1,
            },
        ]
    }
}

pub struct Magnifier<S> {
    surface: S,
    panel: Size,
    placement: Placement,
}

impl<S: Surface> Magnifier<S> {
    pub fn new(panel: Size) -> Self {
        Self {
            surface: S::create(panel.width as u32, panel.height as u32),
            panel,
            placement: Placement::default(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn panel_size(&self) -> Size {
        self.panel
    }

    pub fn set_panel_size(&mut self, panel: Size) {
        self.panel = panel;
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn paint(&mut self, source: &Source, state: &InteractiveState, canvas: Size) {
        let (w, h) = (self.panel.width, self.panel.height);
        self.surface.resize(w as u32, h as u32);
        self.surface
            .fill_rect(Rect::new(0.0, 0.0, w, h), Color::MAGNIFIER_BACKGROUND);
        self.surface.set_smoothing(false);

        if let Some(crop) = magnifier_crop(state.cursor, state.zoom, self.panel, canvas) {
            let src = Rect::new(
                source.origin.x + crop.src.x,
                source.origin.y + crop.src.y,
                crop.src.width,
                crop.src.height,
            );
            self.surface.draw_media(source.media.as_ref(), src, crop.dst);
        }

        if let Some(label) = &source.label {
            self.surface.draw_label(label, LABEL_POSITION);
        }
    }
}

pub struct MagnifierPair<S> {
    panels: [Magnifier<S>; 2],
    visible: bool,
}

impl<S: Surface> MagnifierPair<S> {
    pub fn new(panel: Size) -> Self {
        Self {
            panels: [Magnifier::new(panel), Magnifier::new(panel)],
            visible: false,
        }
    }

    pub fn panels(&self) -> &[Magnifier<S>; 2] {
        &self.panels
    }

    pub fn set_panel_size(&mut self, panel: Size) {
        for magnifier in &mut self.panels {
            magnifier.set_panel_size(panel);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Shows the panels around `cursor`, given in the comparator frame.
    pub fn move_to(&mut self, orientation: Orientation, cursor: Point) {
        let sizes = [self.panels[0].panel, self.panels[1].panel];
        let placements = place_pair(orientation, cursor, sizes);
        for (magnifier, placement) in self.panels.iter_mut().zip(placements) {
            magnifier.placement = placement;
        }
        self.visible = true;
    }

    pub fn paint(&mut self, sources: &[Source; 2], state: &InteractiveState, canvas: Size) {
        if !self.visible {
            return;
        }
        for (magnifier, source) in self.panels.iter_mut().zip(sources) {
            magnifier.paint(source, state, canvas);
        }
    }
}
