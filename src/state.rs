use crate::geometry::{Point, Size};

/// Which axis the split line runs along and which side source 1 takes.
///
/// Even values split vertically, odd values horizontally. Within an axis
/// the two values put source 1 on opposite sides:
/// 0 right, 1 top, 2 left, 3 bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation(u8);

impl Orientation {
    pub const RIGHT: Orientation = Orientation(0);
    pub const TOP: Orientation = Orientation(1);
    pub const LEFT: Orientation = Orientation(2);
    pub const BOTTOM: Orientation = Orientation(3);

    pub fn new(value: u8) -> Self {
        Orientation(value % 4)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Self {
        Orientation((self.0 + 1) % 4)
    }

    pub fn is_vertical(self) -> bool {
        self.0 % 2 == 0
    }
}

/// Everything pointer events and settings mutate, and every redraw reads.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveState {
    pub cursor: Point,
    pub zoom: f32,
    pub speed: f32,
    pub orientation: Orientation,
}

impl InteractiveState {
    pub const DEFAULT_ZOOM: f32 = 4.0;
    pub const DEFAULT_SPEED: f32 = 1.0;

    pub fn centered(canvas: Size, zoom: f32) -> Self {
        Self {
            cursor: Point::new(canvas.width / 2.0, canvas.height / 2.0),
            zoom,
            speed: Self::DEFAULT_SPEED,
            orientation: Orientation::default(),
        }
    }

    pub fn rotate(&mut self) {
        self.orientation = self.orientation.next();
    }
}
