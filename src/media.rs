//! Media sources a comparator can draw from.
//!
//! A [`Media`] is anything that eventually knows its natural pixel size and
//! can hand out the frame to draw right now. Still images are ready as soon as
//! they exist. Frame sequences (see [`crate::player`]) become ready once their
//! background load finishes, which is announced through a [`ReadySignal`].

use crate::geometry::Size;
use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt};
use image::RgbaImage;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Outcome delivered to everyone waiting on a [`ReadySignal`].
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Ready,
    Failed(String),
}

pub trait Media: Send + Sync {
    /// Natural pixel size, `None` until the media is ready.
    fn natural_size(&self) -> Option<Size>;

    /// Resolves once the natural size is known (or loading failed).
    fn ready(&self) -> BoxFuture<'static, Readiness>;

    fn current_frame(&self) -> Option<Arc<RgbaImage>>;

    fn playback(&self) -> Option<&dyn Playback> {
        None
    }

    fn kind(&self) -> MediaKind {
        if self.playback().is_some() {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    fn is_ready(&self) -> bool {
        self.natural_size().is_some()
    }
}

pub trait Playback: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn is_playing(&self) -> bool;
    fn set_playback_rate(&self, rate: f32);
    fn playback_rate(&self) -> f32;
}

enum SignalState {
    Pending(Vec<oneshot::Sender<Readiness>>),
    Done(Readiness),
}

/// One-shot readiness notification with any number of subscribers.
///
/// Subscribing after the signal fired yields the stored outcome immediately.
/// Only the first call to [`ReadySignal::resolve`] counts.
pub struct ReadySignal {
    state: Mutex<SignalState>,
}

impl ReadySignal {
    pub fn pending() -> Self {
        Self {
            state: Mutex::new(SignalState::Pending(Vec::new())),
        }
    }

    pub fn ready() -> Self {
        Self {
            state: Mutex::new(SignalState::Done(Readiness::Ready)),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.lock(), SignalState::Done(_))
    }

    pub fn subscribe(&self) -> BoxFuture<'static, Readiness> {
        let mut state = self.state.lock();
        match &mut *state {
            SignalState::Done(outcome) => future::ready(outcome.clone()).boxed(),
            SignalState::Pending(waiters) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                rx.map(|outcome| {
                    outcome.unwrap_or_else(|_| {
                        Readiness::Failed("media dropped before becoming ready".to_string())
                    })
                })
                .boxed()
            }
        }
    }

    pub fn resolve(&self, outcome: Readiness) {
        let mut state = self.state.lock();
        if let SignalState::Pending(waiters) = &mut *state {
            let waiters = std::mem::take(waiters);
            debug!("Readiness resolved as {:?} for {} waiter(s)", outcome, waiters.len());
            *state = SignalState::Done(outcome.clone());
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }
}

pub struct StillImage {
    frame: Arc<RgbaImage>,
    signal: ReadySignal,
}

impl StillImage {
    pub fn new(frame: RgbaImage) -> Self {
        Self {
            frame: Arc::new(frame),
            signal: ReadySignal::ready(),
        }
    }
}

impl Media for StillImage {
    fn natural_size(&self) -> Option<Size> {
        Some(Size::new(self.frame.width() as f32, self.frame.height() as f32))
    }

    fn ready(&self) -> BoxFuture<'static, Readiness> {
        self.signal.subscribe()
    }

    fn current_frame(&self) -> Option<Arc<RgbaImage>> {
        Some(self.frame.clone())
    }
}
