use thiserror::Error;

/// Reasons a comparator gives up during setup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SetupError {
    #[error("comparator contains no compared element")]
    NoComparedElement,

    #[error("unable to compare a single element without a vertical or horizontal split")]
    UnresolvableSingle,

    #[error("comparator must contain a left and a right compared element")]
    MissingPair,

    #[error("comparison not handled for more than two elements (got {0})")]
    TooManyElements(usize),

    #[error("compared element has no natural size yet")]
    MediaNotReady,

    #[error("media failed to load: {0}")]
    MediaFailed(String),
}
