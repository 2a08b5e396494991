use crate::comparison::render_comparison;
use crate::config::ComparatorOptions;
use crate::error::SetupError;
use crate::geometry::{self, ComparedElement, Point, Rect, Resolution, Size, Source};
use crate::magnifier::MagnifierPair;
use crate::media::{MediaKind, Readiness};
use crate::settings::{self, PlaybackAction, SettingsPanel};
use crate::state::InteractiveState;
use crate::surface::Surface;
use futures::future::join_all;
use log::{debug, error, info};

#[derive(Debug, Clone, Default)]
pub struct ComparatorConfig {
    pub elements: Vec<ComparedElement>,
}

impl ComparatorConfig {
    pub fn new(elements: Vec<ComparedElement>) -> Self {
        Self { elements }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Moved(Point),
    Clicked(Point),
    Left,
}

/// Waits until every compared element knows its natural size.
pub async fn wait_until_ready(elements: &[ComparedElement]) -> Result<(), SetupError> {
    let pending: Vec<_> = elements
        .iter()
        .filter(|element| !element.media.is_ready())
        .map(|element| element.media.ready())
        .collect();
    if !pending.is_empty() {
        debug!("Waiting for {} compared element(s) to load", pending.len());
    }
    for outcome in join_all(pending).await {
        if let Readiness::Failed(reason) = outcome {
            return Err(SetupError::MediaFailed(reason));
        }
    }
    Ok(())
}

pub struct Comparator<S> {
    canvas: S,
    size: Size,
    sources: [Source; 2],
    state: InteractiveState,
    magnifiers: MagnifierPair<S>,
    settings: SettingsPanel,
}

impl<S: Surface> Comparator<S> {
    pub async fn setup(
        config: ComparatorConfig,
        options: &ComparatorOptions,
    ) -> Result<Self, SetupError> {
        if config.elements.is_empty() {
            return Err(SetupError::NoComparedElement);
        }
        wait_until_ready(&config.elements).await?;
        let resolution = geometry::resolve(&config.elements)?;
        Ok(Self::from_resolution(resolution, options))
    }

    pub fn from_resolution(resolution: Resolution, options: &ComparatorOptions) -> Self {
        let (width, height) = resolution.canvas_pixels();
        let has_video = resolution
            .sources
            .iter()
            .any(|source| source.media.kind() == MediaKind::Video);
        let mut state = InteractiveState::centered(resolution.size, options.zoom);
        let settings = SettingsPanel::new(&state, has_video);
        state.zoom = settings.zoom().value();
        info!(
            "Comparator ready: {}x{} canvas, {}",
            width,
            height,
            if has_video { "video" } else { "still images" }
        );
        Self {
            canvas: S::create(width, height),
            size: resolution.size,
            sources: resolution.sources,
            settings,
            state,
            magnifiers: MagnifierPair::new(options.magnifier_size),
        }
    }

    pub fn canvas(&self) -> &S {
        &self.canvas
    }

    /// Width the comparator container is pinned to; the viewer sizes its content by it.
    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn sources(&self) -> &[Source; 2] {
        &self.sources
    }

    pub fn state(&self) -> &InteractiveState {
        &self.state
    }

    pub fn magnifiers(&self) -> &MagnifierPair<S> {
        &self.magnifiers
    }

    pub fn settings(&self) -> &SettingsPanel {
        &self.settings
    }

    pub fn has_video(&self) -> bool {
        self.settings.has_playback_controls()
    }

    /// Takes the panel box the host laid out; visible panels are re-placed and repainted.
    pub fn set_magnifier_size(&mut self, panel: Size) {
        if self.magnifiers.panels()[0].panel_size() == panel {
            return;
        }
        debug!("Magnifier panels -> {}x{}", panel.width, panel.height);
        self.magnifiers.set_panel_size(panel);
        if self.magnifiers.is_visible() {
            self.move_split(self.state.cursor);
        }
    }

    fn canvas_rect(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.canvas.width() as f32,
            self.canvas.height() as f32,
        )
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Moved(at) => {
                if self.canvas_rect().contains(at) {
                    self.move_split(at);
                } else {
                    self.magnifiers.hide();
                }
            }
            PointerEvent::Clicked(at) => {
                if self.canvas_rect().contains(at) {
                    self.state.rotate();
                    debug!("Orientation -> {}", self.state.orientation.value());
                    self.move_split(at);
                }
            }
            PointerEvent::Left => self.magnifiers.hide(),
        }
    }

    /// Moves the split to `at`, shows the magnifiers there and repaints.
    pub fn move_split(&mut self, at: Point) {
        self.state.cursor = at;
        self.magnifiers.move_to(self.state.orientation, at);
        self.repaint();
    }

    pub fn paint_canvas(&mut self) {
        render_comparison(&mut self.canvas, &self.sources, &self.state);
    }

    pub fn paint_magnifiers(&mut self) {
        let canvas = Size::new(self.canvas.width() as f32, self.canvas.height() as f32);
        self.magnifiers.paint(&self.sources, &self.state, canvas);
    }

    pub fn repaint(&mut self) {
        self.paint_canvas();
        self.paint_magnifiers();
    }

    pub fn set_zoom(&mut self, value: f32) {
        self.state.zoom = self.settings.change_zoom(value);
        debug!("Zoom -> {}", self.state.zoom);
        self.paint_magnifiers();
    }

    pub fn set_speed(&mut self, value: f32) {
        if let Some(speed) = self.settings.change_speed(value) {
            self.state.speed = speed;
            settings::apply_speed(&self.sources, speed);
        }
    }

    pub fn playback(&mut self, action: PlaybackAction) {
        if self.has_video() {
            settings::apply_playback(&self.sources, action);
        }
    }
}

/// Sets up several comparators; a failing one is logged and left out.
pub async fn setup_each<S: Surface>(
    configs: Vec<ComparatorConfig>,
    options: &ComparatorOptions,
) -> Vec<Comparator<S>> {
    let mut comparators = Vec::with_capacity(configs.len());
    for (index, config) in configs.into_iter().enumerate() {
        match Comparator::setup(config, options).await {
            Ok(comparator) => comparators.push(comparator),
            Err(e) => error!("Comparator {} abandoned: {}", index, e),
        }
    }
    comparators
}
