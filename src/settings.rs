use crate::geometry::Source;
use crate::state::InteractiveState;
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    name: &'static str,
    min: f32,
    max: f32,
    step: f32,
    value: f32,
    display: String,
}

fn format_value(value: f32, step: f32) -> String {
    let decimals = (-step.log10()).round().max(0.0) as usize;
    format!("{:.*}", decimals, value)
}

impl Slider {
    pub fn new(name: &'static str, min: f32, max: f32, step: f32, value: f32) -> Self {
        let mut slider = Self {
            name,
            min,
            max,
            step,
            value: min,
            display: String::new(),
        };
        slider.set(value);
        slider
    }

    /// Commits a new value: clamped, snapped to the step, label refreshed.
    pub fn set(&mut self, value: f32) -> f32 {
        if value.is_nan() {
            return self.value;
        }
        let snapped = self.min + ((value - self.min) / self.step).round() * self.step;
        self.value = snapped.clamp(self.min, self.max);
        self.display = format_value(self.value, self.step);
        self.value
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    pub fn step(&self) -> f32 {
        self.step
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Play,
    Pause,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsPanel {
    zoom: Slider,
    speed: Option<Slider>,
}

impl SettingsPanel {
    pub const ZOOM_RANGE: (f32, f32) = (1.0, 10.0);
    pub const SPEED_RANGE: (f32, f32) = (0.0, 1.0);
    pub const SPEED_STEP: f32 = 0.1;

    /// Speed and playback controls only exist when a source is a video.
    pub fn new(state: &InteractiveState, has_video: bool) -> Self {
        let (zoom_min, zoom_max) = Self::ZOOM_RANGE;
        let (speed_min, speed_max) = Self::SPEED_RANGE;
        Self {
            zoom: Slider::new("Zoom", zoom_min, zoom_max, 1.0, state.zoom),
            speed: has_video.then(|| {
                Slider::new("Speed", speed_min, speed_max, Self::SPEED_STEP, state.speed)
            }),
        }
    }

    pub fn zoom(&self) -> &Slider {
        &self.zoom
    }

    pub fn speed(&self) -> Option<&Slider> {
        self.speed.as_ref()
    }

    pub fn has_playback_controls(&self) -> bool {
        self.speed.is_some()
    }

    pub fn change_zoom(&mut self, value: f32) -> f32 {
        self.zoom.set(value)
    }

    pub fn change_speed(&mut self, value: f32) -> Option<f32> {
        self.speed.as_mut().map(|slider| slider.set(value))
    }
}

/// Sets the playback rate on every video source; still images are skipped.
pub fn apply_speed(sources: &[Source; 2], rate: f32) {
    for (index, source) in sources.iter().enumerate() {
        if let Some(playback) = source.media.playback() {
            debug!("Source {} playback rate -> {}", index, rate);
            playback.set_playback_rate(rate);
        }
    }
}

pub fn apply_playback(sources: &[Source; 2], action: PlaybackAction) {
    for source in sources {
        if let Some(playback) = source.media.playback() {
            match action {
                PlaybackAction::Play => playback.play(),
                PlaybackAction::Pause => playback.pause(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Size};
    use crate::media::{Media, Playback, StillImage};
    use crate::player::FrameSequence;
    use image::RgbaImage;
    use std::sync::Arc;

    fn state() -> InteractiveState {
        InteractiveState::centered(Size::new(400.0, 300.0), 4.0)
    }

    #[test]
    fn zoom_is_an_integer_in_range() {
        let mut panel = SettingsPanel::new(&state(), false);
        assert_eq!(panel.zoom().value(), 4.0);
        assert_eq!(panel.zoom().display(), "4");
        assert_eq!(panel.change_zoom(7.4), 7.0);
        assert_eq!(panel.zoom().display(), "7");
        assert_eq!(panel.change_zoom(25.0), 10.0);
        assert_eq!(panel.change_zoom(0.0), 1.0);
        assert_eq!(panel.zoom().display(), "1");
        assert_eq!(panel.change_zoom(f32::NAN), 1.0);
    }

    #[test]
    fn speed_only_exists_for_video() {
        let mut panel = SettingsPanel::new(&state(), false);
        assert!(panel.speed().is_none());
        assert!(!panel.has_playback_controls());
        assert_eq!(panel.change_speed(0.5), None);

        let mut panel = SettingsPanel::new(&state(), true);
        assert_eq!(panel.speed().unwrap().display(), "1.0");
        let speed = panel.change_speed(0.46).unwrap();
        assert!((speed - 0.5).abs() < 1e-6);
        assert_eq!(panel.speed().unwrap().display(), "0.5");
    }

    #[test]
    fn speed_reaches_every_video_and_skips_stills() {
        let video = Arc::new(FrameSequence::from_frames(
            "clip",
            vec![(RgbaImage::new(4, 4), 40_000)],
        ));
        let still: Arc<dyn Media> = Arc::new(StillImage::new(RgbaImage::new(4, 4)));
        let sources = [
            Source {
                media: still,
                origin: Point::default(),
                label: None,
            },
            Source {
                media: video.clone(),
                origin: Point::default(),
                label: None,
            },
        ];

        apply_speed(&sources, 0.5);
        assert_eq!(video.playback_rate(), 0.5);
        assert!(sources[0].media.playback().is_none());

        apply_playback(&sources, PlaybackAction::Play);
        assert!(video.is_playing());
        apply_playback(&sources, PlaybackAction::Pause);
        assert!(!video.is_playing());
    }
}
