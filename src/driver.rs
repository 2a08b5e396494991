//! Event and redraw scheduling for a comparator.
//!
//! Host input goes through a channel to a command task. Handlers therefore
//! never paint inline; the repaint happens on the next turn of the runtime.
//! Video content also gets two 25 Hz timers, one for the canvas and one for
//! the magnifiers, because playing frames change without any pointer motion.
//! Still content is painted once up front and afterwards only on input.

use crate::comparator::{Comparator, PointerEvent};
use crate::geometry::Size;
use crate::settings::PlaybackAction;
use crate::surface::Surface;
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub type SharedComparator<S> = Arc<Mutex<Comparator<S>>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Pointer(PointerEvent),
    Zoom(f32),
    Speed(f32),
    Playback(PlaybackAction),
    MagnifierSize(Size),
}

fn apply<S: Surface>(comparator: &mut Comparator<S>, command: Command) {
    match command {
        Command::Pointer(event) => comparator.handle_pointer(event),
        Command::Zoom(value) => comparator.set_zoom(value),
        Command::Speed(value) => comparator.set_speed(value),
        Command::Playback(action) => comparator.playback(action),
        Command::MagnifierSize(panel) => comparator.set_magnifier_size(panel),
    }
}

fn spawn_timer<S, F>(comparator: SharedComparator<S>, period: Duration, paint: F) -> JoinHandle<()>
where
    S: Surface + 'static,
    F: Fn(&mut Comparator<S>) + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            paint(&mut comparator.lock());
        }
    })
}

/// Owns the tasks driving one comparator. Dropping it stops them all.
pub struct RedrawDriver {
    commands: mpsc::UnboundedSender<Command>,
    tasks: Vec<JoinHandle<()>>,
}

impl RedrawDriver {
    /// Starts the command task and the repaint schedule.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S: Surface + 'static>(comparator: SharedComparator<S>, period: Duration) -> Self {
        let (commands, mut receiver) = mpsc::unbounded_channel::<Command>();
        let mut tasks = Vec::with_capacity(3);

        let target = comparator.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                debug!("Applying {:?}", command);
                apply(&mut target.lock(), command);
            }
        }));

        let has_video = comparator.lock().has_video();
        if has_video {
            info!("Starting {:?} redraw timers for video content", period);
            tasks.push(spawn_timer(comparator.clone(), period, |c| c.paint_canvas()));
            tasks.push(spawn_timer(comparator, period, |c| c.paint_magnifiers()));
        } else {
            tasks.push(tokio::spawn(async move {
                comparator.lock().repaint();
            }));
        }

        Self { commands, tasks }
    }

    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn pointer(&self, event: PointerEvent) -> bool {
        self.send(Command::Pointer(event))
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    pub fn shutdown(self) {
        info!("Stopping comparator driver");
        drop(self);
    }
}

impl Drop for RedrawDriver {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ComparatorConfig;
    use crate::config::ComparatorOptions;
    use crate::geometry::{ComparedElement, Point, Role};
    use crate::media::{Media, Playback, StillImage};
    use crate::player::FrameSequence;
    use crate::surface::recording::RecordingSurface;
    use image::RgbaImage;

    fn comparator(right: Arc<dyn Media>) -> SharedComparator<RecordingSurface> {
        let left: Arc<dyn Media> = Arc::new(StillImage::new(RgbaImage::new(40, 30)));
        let config = ComparatorConfig::new(vec![
            ComparedElement::new(left, Role::Left { label: None }),
            ComparedElement::new(right, Role::Right { label: None }),
        ]);
        let options = ComparatorOptions {
            magnifier_size: Size::new(20.0, 20.0),
            ..ComparatorOptions::default()
        };
        let comparator = pollster::block_on(Comparator::setup(config, &options)).unwrap();
        Arc::new(Mutex::new(comparator))
    }

    fn canvas_draws(comparator: &SharedComparator<RecordingSurface>) -> usize {
        comparator.lock().canvas().media_draws().len()
    }

    #[tokio::test(start_paused = true)]
    async fn stills_are_painted_once_then_only_on_input() {
        let shared = comparator(Arc::new(StillImage::new(RgbaImage::new(40, 30))));
        let driver = RedrawDriver::start(shared.clone(), Duration::from_millis(40));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(canvas_draws(&shared), 2);

        assert!(driver.pointer(PointerEvent::Moved(Point::new(10.0, 10.0))));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(canvas_draws(&shared), 4);
        assert!(shared.lock().magnifiers().is_visible());
        assert_eq!(shared.lock().state().cursor, Point::new(10.0, 10.0));
    }

    #[tokio::test(start_paused = true)]
    async fn video_repaints_on_a_timer_until_shutdown() {
        let video = Arc::new(FrameSequence::from_frames(
            "clip",
            vec![(RgbaImage::new(40, 30), 40_000)],
        ));
        let shared = comparator(video);
        let driver = RedrawDriver::start(shared.clone(), Duration::from_millis(40));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let painted = canvas_draws(&shared);
        assert!(painted >= 8, "only {painted} draws");
        assert!(driver.is_running());

        driver.shutdown();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let stopped_at = canvas_draws(&shared);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(canvas_draws(&shared), stopped_at);
    }

    #[tokio::test(start_paused = true)]
    async fn settings_commands_reach_the_comparator() {
        let video = Arc::new(FrameSequence::from_frames(
            "clip",
            vec![(RgbaImage::new(40, 30), 40_000)],
        ));
        let shared = comparator(video.clone());
        let driver = RedrawDriver::start(shared.clone(), Duration::from_millis(40));

        driver.send(Command::Zoom(2.0));
        driver.send(Command::Speed(0.5));
        driver.send(Command::Playback(PlaybackAction::Play));
        driver.send(Command::Pointer(PointerEvent::Clicked(Point::new(5.0, 5.0))));
        driver.send(Command::MagnifierSize(Size::new(12.0, 8.0)));
        tokio::time::sleep(Duration::from_millis(1)).await;

        let comparator = shared.lock();
        assert_eq!(comparator.state().zoom, 2.0);
        assert_eq!(comparator.state().orientation.value(), 1);
        assert!((video.playback_rate() - 0.5).abs() < 1e-6);
        assert!(video.is_playing());
        assert_eq!(
            comparator.magnifiers().panels()[1].panel_size(),
            Size::new(12.0, 8.0)
        );
    }
}
