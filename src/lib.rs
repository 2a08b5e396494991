//! Interactive split-line comparison of two images or image sequences.
//!
//! A [`Comparator`] paints source 0 over its canvas and source 1 on one side
//! of a split line that follows the cursor. Two magnifier panels show zoomed
//! crops of each source around the cursor. A [`RedrawDriver`] feeds it
//! pointer and settings commands and keeps video content repainting.

pub mod comparator;
pub mod comparison;
pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod image_loader;
pub mod magnifier;
pub mod media;
pub mod player;
pub mod settings;
pub mod state;
pub mod surface;

pub use comparator::{setup_each, Comparator, ComparatorConfig, PointerEvent};
pub use config::{AppConfig, ComparatorOptions};
pub use driver::{Command, RedrawDriver, SharedComparator};
pub use error::SetupError;
pub use geometry::{ComparedElement, Role};
pub use media::{Media, MediaKind, Playback};
pub use surface::{RasterSurface, Surface};
