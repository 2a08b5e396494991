use crate::error::SetupError;
use crate::media::Media;
use log::debug;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Inclusive containment, matching how the canvas edges count as inside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// How a compared element takes part in the comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Role {
    /// One element holding both sources stacked: top is source 0.
    VerticalSplit {
        top: Option<String>,
        bottom: Option<String>,
    },
    /// One element holding both sources side by side: left is source 0.
    HorizontalSplit {
        left: Option<String>,
        right: Option<String>,
    },
    Left {
        label: Option<String>,
    },
    Right {
        label: Option<String>,
    },
    #[default]
    Unmarked,
}

#[derive(Clone)]
pub struct ComparedElement {
    pub media: Arc<dyn Media>,
    pub role: Role,
}

impl ComparedElement {
    pub fn new(media: Arc<dyn Media>, role: Role) -> Self {
        Self { media, role }
    }
}

impl fmt::Debug for ComparedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparedElement")
            .field("kind", &self.media.kind())
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Clone)]
pub struct Source {
    pub media: Arc<dyn Media>,
    pub origin: Point,
    pub label: Option<String>,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("kind", &self.media.kind())
            .field("origin", &self.origin)
            .field("label", &self.label)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub size: Size,
    pub sources: [Source; 2],
}

impl Resolution {
    /// Floor of the resolved size, never below one pixel on either axis.
    pub fn canvas_pixels(&self) -> (u32, u32) {
        (
            (self.size.width as u32).max(1),
            (self.size.height as u32).max(1),
        )
    }
}

fn natural_size(element: &ComparedElement) -> Result<Size, SetupError> {
    element.media.natural_size().ok_or(SetupError::MediaNotReady)
}

fn source(element: &ComparedElement, origin: Point, label: &Option<String>) -> Source {
    Source {
        media: element.media.clone(),
        origin,
        label: label.clone(),
    }
}

pub fn resolve(elements: &[ComparedElement]) -> Result<Resolution, SetupError> {
    let resolution = match elements {
        [] => return Err(SetupError::NoComparedElement),
        [single] => {
            let size = natural_size(single)?;
            match &single.role {
                Role::VerticalSplit { top, bottom } => {
                    let height = size.height / 2.0;
                    Resolution {
                        size: Size::new(size.width, height),
                        sources: [
                            source(single, Point::new(0.0, 0.0), top),
                            source(single, Point::new(0.0, height), bottom),
                        ],
                    }
                }
                Role::HorizontalSplit { left, right } => {
                    let width = size.width / 2.0;
                    Resolution {
                        size: Size::new(width, size.height),
                        sources: [
                            source(single, Point::new(0.0, 0.0), left),
                            source(single, Point::new(width, 0.0), right),
                        ],
                    }
                }
                _ => return Err(SetupError::UnresolvableSingle),
            }
        }
        [a, b] => {
            let left = [a, b]
                .into_iter()
                .find_map(|e| match &e.role {
                    Role::Left { label } => Some((e, label)),
                    _ => None,
                });
            let right = [a, b]
                .into_iter()
                .find_map(|e| match &e.role {
                    Role::Right { label } => Some((e, label)),
                    _ => None,
                });
            let ((left, left_label), (right, right_label)) = match (left, right) {
                (Some(left), Some(right)) => (left, right),
                _ => return Err(SetupError::MissingPair),
            };
            let size = natural_size(left)?;
            natural_size(right)?;
            Resolution {
                size,
                sources: [
                    source(left, Point::default(), left_label),
                    source(right, Point::default(), right_label),
                ],
            }
        }
        more => return Err(SetupError::TooManyElements(more.len())),
    };

    debug!(
        "Resolved comparison: {}x{} canvas, sources at {:?} and {:?}",
        resolution.size.width,
        resolution.size.height,
        resolution.sources[0].origin,
        resolution.sources[1].origin
    );
    Ok(resolution)
}
