use crate::geometry::Size;
use crate::media::{Media, Playback, ReadySignal, Readiness};
use futures::future::BoxFuture;
use image::RgbaImage;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Frames with their start and end times in microseconds.
type Timed = Vec<(Arc<RgbaImage>, u64, u64)>;

struct Timeline {
    frames: Timed,
    current_time: u64,
    is_playing: bool,
    rate: f32,
    last_tick: Option<Instant>,
}

impl Timeline {
    fn total_duration(&self) -> u64 {
        self.frames.last().map(|(_, _, end)| *end).unwrap_or(0)
    }

    fn advance(&mut self, delta_time: u64) {
        let total_duration = self.total_duration();
        if total_duration == 0 {
            return;
        }
        let old_time = self.current_time;
        self.current_time = (self.current_time + delta_time) % total_duration;
        debug!(
            "Advanced sequence: old_time = {}, delta_time = {}, new_time = {}, total_duration = {}",
            old_time, delta_time, self.current_time, total_duration
        );
    }

    /// Moves the clock forward by the wall time since the last sync, scaled by rate.
    fn sync(&mut self, now: Instant) {
        if !self.is_playing {
            return;
        }
        if let Some(last) = self.last_tick {
            let elapsed = now.saturating_duration_since(last).as_micros() as f64;
            self.advance((elapsed * self.rate as f64) as u64);
        }
        self.last_tick = Some(now);
    }

    fn current(&self) -> Option<&Arc<RgbaImage>> {
        self.frames
            .iter()
            .find(|(_, start, end)| *start <= self.current_time && self.current_time < *end)
            .or_else(|| self.frames.first())
            .map(|(image, _, _)| image)
    }
}

/// An image sequence played back like a video.
///
/// Created empty while its frames load in the background; becomes ready
/// once [`FrameSequence::finish_loading`] hands it the decoded frames.
pub struct FrameSequence {
    name: String,
    timeline: Mutex<Timeline>,
    signal: ReadySignal,
}

impl FrameSequence {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeline: Mutex::new(Timeline {
                frames: Vec::new(),
                current_time: 0,
                is_playing: false,
                rate: 1.0,
                last_tick: None,
            }),
            signal: ReadySignal::pending(),
        }
    }

    /// A sequence that is ready right away, frames given with durations in microseconds.
    pub fn from_frames(name: impl Into<String>, frames: Vec<(RgbaImage, u64)>) -> Self {
        let sequence = Self::pending(name);
        sequence.finish_loading(frames);
        sequence
    }

    fn accumulate_durations(frames: Vec<(RgbaImage, u64)>) -> Timed {
        let mut accumulated = 0;
        frames
            .into_iter()
            .map(|(image, duration)| {
                let start = accumulated;
                accumulated += duration;
                (Arc::new(image), start, accumulated)
            })
            .collect()
    }

    pub fn finish_loading(&self, frames: Vec<(RgbaImage, u64)>) {
        if frames.is_empty() {
            self.fail(format!("sequence '{}' has no frames", self.name));
            return;
        }
        let frames = Self::accumulate_durations(frames);
        {
            let mut timeline = self.timeline.lock();
            timeline.frames = frames;
            info!(
                "Sequence '{}' ready: {} frames, {} us",
                self.name,
                timeline.frames.len(),
                timeline.total_duration()
            );
        }
        self.signal.resolve(Readiness::Ready);
    }

    pub fn fail(&self, reason: String) {
        warn!("Sequence '{}' failed to load: {}", self.name, reason);
        self.signal.resolve(Readiness::Failed(reason));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_count(&self) -> usize {
        self.timeline.lock().frames.len()
    }

    pub fn position(&self) -> u64 {
        self.timeline.lock().current_time
    }

    /// Advances the clock by `delta_time` microseconds of media time.
    pub fn advance(&self, delta_time: u64) {
        self.timeline.lock().advance(delta_time);
    }

    pub fn sync(&self, now: Instant) {
        self.timeline.lock().sync(now);
    }
}

impl Media for FrameSequence {
    fn natural_size(&self) -> Option<Size> {
        let timeline = self.timeline.lock();
        timeline
            .frames
            .first()
            .map(|(image, _, _)| Size::new(image.width() as f32, image.height() as f32))
    }

    fn ready(&self) -> BoxFuture<'static, Readiness> {
        self.signal.subscribe()
    }

    fn current_frame(&self) -> Option<Arc<RgbaImage>> {
        let mut timeline = self.timeline.lock();
        timeline.sync(Instant::now());
        timeline.current().cloned()
    }

    fn playback(&self) -> Option<&dyn Playback> {
        Some(self)
    }
}

impl Playback for FrameSequence {
    fn play(&self) {
        let mut timeline = self.timeline.lock();
        if !timeline.is_playing {
            timeline.is_playing = true;
            timeline.last_tick = Some(Instant::now());
            debug!("Sequence '{}' is now playing", self.name);
        }
    }

    fn pause(&self) {
        let mut timeline = self.timeline.lock();
        timeline.sync(Instant::now());
        timeline.is_playing = false;
        timeline.last_tick = None;
        debug!("Sequence '{}' is now paused", self.name);
    }

    fn is_playing(&self) -> bool {
        self.timeline.lock().is_playing
    }

    fn set_playback_rate(&self, rate: f32) {
        let mut timeline = self.timeline.lock();
        timeline.sync(Instant::now());
        timeline.rate = rate.max(0.0);
        debug!("Sequence '{}' playback rate set to {}", self.name, timeline.rate);
    }

    fn playback_rate(&self) -> f32 {
        self.timeline.lock().rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use image::Rgba;
    use std::time::Duration;

    fn frame(shade: u8) -> RgbaImage {
        RgbaImage::from_pixel(4, 2, Rgba([shade, shade, shade, 255]))
    }

    fn three_frames() -> FrameSequence {
        FrameSequence::from_frames(
            "test",
            vec![(frame(10), 40_000), (frame(20), 40_000), (frame(30), 20_000)],
        )
    }

    fn shade(sequence: &FrameSequence) -> u8 {
        sequence.current_frame().unwrap().get_pixel(0, 0)[0]
    }

    #[test]
    fn pending_sequence_has_no_size_until_loaded() {
        let sequence = FrameSequence::pending("later");
        assert!(!sequence.is_ready());
        let ready = sequence.ready();
        sequence.finish_loading(vec![(frame(1), 1000)]);
        assert_eq!(pollster::block_on(ready), Readiness::Ready);
        assert_eq!(sequence.natural_size(), Some(Size::new(4.0, 2.0)));
        assert_eq!(sequence.kind(), MediaKind::Video);
    }

    #[test]
    fn empty_sequence_fails_readiness() {
        let sequence = FrameSequence::pending("empty");
        sequence.finish_loading(Vec::new());
        assert!(matches!(
            pollster::block_on(sequence.ready()),
            Readiness::Failed(_)
        ));
    }

    #[test]
    fn advancing_selects_frames_and_loops() {
        let sequence = three_frames();
        assert_eq!(shade(&sequence), 10);
        sequence.advance(45_000);
        assert_eq!(shade(&sequence), 20);
        sequence.advance(40_000);
        assert_eq!(shade(&sequence), 30);
        sequence.advance(20_000);
        assert_eq!(sequence.position(), 5_000);
        assert_eq!(shade(&sequence), 10);
    }

    #[test]
    fn paused_sequence_does_not_move() {
        let sequence = three_frames();
        let start = Instant::now();
        sequence.sync(start + Duration::from_millis(50));
        assert_eq!(sequence.position(), 0);
    }

    #[test]
    fn rate_scales_wall_time() {
        let sequence = three_frames();
        sequence.set_playback_rate(0.5);
        sequence.play();
        assert!(sequence.is_playing());
        let start = sequence.timeline.lock().last_tick.unwrap();
        sequence.sync(start + Duration::from_millis(60));
        assert_eq!(sequence.position(), 30_000);
        sequence.pause();
        assert!(!sequence.is_playing());
        assert_eq!(sequence.playback_rate(), 0.5);
    }

    #[test]
    fn negative_rate_is_clamped() {
        let sequence = three_frames();
        sequence.set_playback_rate(-2.0);
        assert_eq!(sequence.playback_rate(), 0.0);
    }
}
