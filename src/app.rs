use anyhow::{anyhow, Context as _, Result};
use futures::channel::oneshot;
use imgui::{Condition, TextureId};
use imgui_wgpu::{Renderer, RendererConfig, Texture, TextureConfig};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use log::{debug, error, info};
use parking_lot::Mutex;
use split_comparator::comparator::{Comparator, PointerEvent};
use split_comparator::driver::{Command, RedrawDriver, SharedComparator};
use split_comparator::geometry::{Point, Size};
use split_comparator::image_loader::MediaLoader;
use split_comparator::magnifier::{fit_panel, Placement};
use split_comparator::settings::PlaybackAction;
use split_comparator::surface::{Color, Label, RasterSurface, Surface};
use split_comparator::{AppConfig, SetupError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::event::{Event, WindowEvent};
use winit::window::Window;

type SetupResult = Result<Comparator<RasterSurface>, SetupError>;

struct UploadedSurface {
    texture: TextureId,
    size: (u32, u32),
    revision: Option<u64>,
}

struct PanelView {
    placement: Placement,
    size: Size,
    labels: Vec<Label>,
}

/// What the UI needs from the comparator for one frame, captured under the lock.
struct ViewSnapshot {
    container_width: f32,
    canvas_size: [f32; 2],
    magnifiers_visible: bool,
    panels: [PanelView; 2],
    zoom_label: String,
    speed_label: Option<String>,
}

impl ViewSnapshot {
    fn capture(comparator: &Comparator<RasterSurface>) -> Self {
        let panel = |index: usize| {
            let magnifier = &comparator.magnifiers().panels()[index];
            PanelView {
                placement: magnifier.placement(),
                size: magnifier.panel_size(),
                labels: magnifier.surface().labels().to_vec(),
            }
        };
        let settings = comparator.settings();
        Self {
            container_width: comparator.width(),
            canvas_size: [
                comparator.canvas().width() as f32,
                comparator.canvas().height() as f32,
            ],
            magnifiers_visible: comparator.magnifiers().is_visible(),
            panels: [panel(0), panel(1)],
            zoom_label: settings.zoom().display().to_string(),
            speed_label: settings.speed().map(|s| s.display().to_string()),
        }
    }
}

struct Session {
    comparator: SharedComparator<RasterSurface>,
    driver: RedrawDriver,
    canvas: UploadedSurface,
    magnifiers: [UploadedSurface; 2],
    snapshot: ViewSnapshot,
    preferred_panel: Size,
    reported_panel: Size,
    zoom_edit: i32,
    speed_edit: f32,
    hovered: bool,
    last_pointer: Option<Point>,
}

pub struct AppState {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    imgui: imgui::Context,
    platform: WinitPlatform,
    renderer: Renderer,
    runtime: tokio::runtime::Runtime,
    _loader: MediaLoader,
    pending: Option<oneshot::Receiver<SetupResult>>,
    session: Option<Session>,
    failure: Option<String>,
    redraw_period: Duration,
    magnifier_size: Size,
    last_frame: Instant,
}

fn create_texture(device: &wgpu::Device, renderer: &Renderer, (width, height): (u32, u32)) -> Texture {
    let config = TextureConfig {
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        label: Some("comparator surface"),
        format: Some(wgpu::TextureFormat::Rgba8Unorm),
        sampler_desc: wgpu::SamplerDescriptor {
            label: Some("comparator sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        },
        ..Default::default()
    };
    Texture::new(device, renderer, config)
}

fn upload_surface(
    device: &wgpu::Device,
    renderer: &mut Renderer,
    size: (u32, u32),
) -> UploadedSurface {
    let size = (size.0.max(1), size.1.max(1));
    let texture = create_texture(device, renderer, size);
    UploadedSurface {
        texture: renderer.textures.insert(texture),
        size,
        revision: None,
    }
}

/// Copies the surface pixels to its texture when they changed since the last upload.
fn sync_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    renderer: &mut Renderer,
    uploaded: &mut UploadedSurface,
    surface: &RasterSurface,
) {
    if uploaded.revision == Some(surface.revision()) {
        return;
    }
    let size = (surface.width(), surface.height());
    if size.0 == 0 || size.1 == 0 {
        return;
    }
    if size != uploaded.size {
        debug!("Recreating texture {:?} at {}x{}", uploaded.texture, size.0, size.1);
        let texture = create_texture(device, renderer, size);
        renderer.textures.replace(uploaded.texture, texture);
        uploaded.size = size;
    }
    if let Some(texture) = renderer.textures.get(uploaded.texture) {
        texture.write(queue, surface.pixels().as_raw(), size.0, size.1);
    }
    uploaded.revision = Some(surface.revision());
}

fn draw_outlined_text(draw_list: &imgui::DrawListMut, pos: [f32; 2], text: &str) {
    let stroke = Color::LABEL_STROKE.to_f32();
    for (dx, dy) in [(-1.0, 0.0), (1.0, 0.0), (0.0, -1.0), (0.0, 1.0)] {
        draw_list.add_text([pos[0] + dx, pos[1] + dy], stroke, text);
    }
    draw_list.add_text(pos, Color::LABEL_FILL.to_f32(), text);
}

impl AppState {
    pub async fn new(window: &Window, config: AppConfig) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        // SAFETY: the window outlives the surface; both live until the event loop exits.
        let surface = unsafe { instance.create_surface(window) }.context("Failed to create surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("No suitable GPU adapter found"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("comparator device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("Failed to create device")?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;
        let alpha_mode = capabilities
            .alpha_modes
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Surface reports no alpha modes"))?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);

        let mut imgui = imgui::Context::create();
        imgui.set_ini_filename(None);
        let mut platform = WinitPlatform::init(&mut imgui);
        platform.attach_window(imgui.io_mut(), window, HiDpiMode::Default);
        let renderer = Renderer::new(
            &mut imgui,
            &device,
            &queue,
            RendererConfig {
                texture_format: surface_config.format,
                ..Default::default()
            },
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to start runtime")?;

        let loader = MediaLoader::new(config.num_load_threads, config.fps);
        let comparator_config = config.comparator_config(&loader)?;
        let options = config.options.clone();
        let redraw_period = options.redraw_period;
        let magnifier_size = options.magnifier_size;
        let (sender, receiver) = oneshot::channel();
        runtime.spawn(async move {
            let result = Comparator::<RasterSurface>::setup(comparator_config, &options).await;
            let _ = sender.send(result);
        });
        info!("Comparator setup scheduled");

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            imgui,
            platform,
            renderer,
            runtime,
            _loader: loader,
            pending: Some(receiver),
            session: None,
            failure: None,
            redraw_period,
            magnifier_size,
            last_frame: Instant::now(),
        })
    }

    pub fn handle_event(&mut self, window: &Window, event: &Event<()>) {
        self.platform
            .handle_event(self.imgui.io_mut(), window, event);

        if let Event::WindowEvent {
            event: WindowEvent::Resized(size),
            ..
        } = event
        {
            if size.width > 0 && size.height > 0 {
                self.surface_config.width = size.width;
                self.surface_config.height = size.height;
                self.surface.configure(&self.device, &self.surface_config);
            }
        }
    }

    fn start_session(&mut self, comparator: Comparator<RasterSurface>) {
        let zoom_edit = comparator.settings().zoom().value() as i32;
        let speed_edit = comparator
            .settings()
            .speed()
            .map(|s| s.value())
            .unwrap_or(1.0);
        let canvas_size = (comparator.canvas().width(), comparator.canvas().height());
        let panel = comparator.magnifiers().panels()[0].panel_size();
        let panel_size = (panel.width as u32, panel.height as u32);
        let snapshot = ViewSnapshot::capture(&comparator);

        let shared: SharedComparator<RasterSurface> = Arc::new(Mutex::new(comparator));
        let driver = {
            let _guard = self.runtime.enter();
            RedrawDriver::start(shared.clone(), self.redraw_period)
        };

        let canvas = upload_surface(&self.device, &mut self.renderer, canvas_size);
        let magnifiers = [
            upload_surface(&self.device, &mut self.renderer, panel_size),
            upload_surface(&self.device, &mut self.renderer, panel_size),
        ];
        self.session = Some(Session {
            comparator: shared,
            driver,
            canvas,
            magnifiers,
            snapshot,
            preferred_panel: self.magnifier_size,
            reported_panel: panel,
            zoom_edit,
            speed_edit,
            hovered: false,
            last_pointer: None,
        });
    }

    pub fn update(&mut self) {
        if let Some(mut receiver) = self.pending.take() {
            match receiver.try_recv() {
                Ok(Some(Ok(comparator))) => self.start_session(comparator),
                Ok(Some(Err(e))) => {
                    error!("Comparator setup abandoned: {}", e);
                    self.failure = Some(e.to_string());
                }
                Ok(None) => self.pending = Some(receiver),
                Err(_) => self.failure = Some("Comparator setup stopped unexpectedly".to_string()),
            }
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let comparator = session.comparator.lock();
        sync_texture(
            &self.device,
            &self.queue,
            &mut self.renderer,
            &mut session.canvas,
            comparator.canvas(),
        );
        for (uploaded, magnifier) in session
            .magnifiers
            .iter_mut()
            .zip(comparator.magnifiers().panels())
        {
            sync_texture(
                &self.device,
                &self.queue,
                &mut self.renderer,
                uploaded,
                magnifier.surface(),
            );
        }
        session.snapshot = ViewSnapshot::capture(&comparator);
    }

    pub fn render(&mut self, window: &Window) -> Result<()> {
        let now = Instant::now();
        self.imgui.io_mut().update_delta_time(now - self.last_frame);
        self.last_frame = now;

        self.platform
            .prepare_frame(self.imgui.io_mut(), window)
            .map_err(|e| anyhow!("Failed to prepare frame: {}", e))?;
        let ui = self.imgui.new_frame();

        let session = &mut self.session;
        let failure = &self.failure;
        let content_width = session
            .as_ref()
            .map_or(0.0, |session| session.snapshot.container_width);
        ui.window("Comparator")
            .position([10.0, 10.0], Condition::FirstUseEver)
            .content_size([content_width, 0.0])
            .always_auto_resize(true)
            .build(|| match session {
                None => match failure {
                    Some(reason) => ui.text(format!("Setup failed: {}", reason)),
                    None => ui.text("Loading media..."),
                },
                Some(session) => build_comparator_ui(ui, session),
            });

        self.platform.prepare_render(ui, window);
        let draw_data = self.imgui.render();

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Dropped frame: {}", e);
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("comparator encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("comparator pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.08,
                            g: 0.08,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.renderer
                .render(draw_data, &self.queue, &self.device, &mut rpass)
                .map_err(|e| anyhow!("imgui render failed: {:?}", e))?;
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn build_comparator_ui(ui: &imgui::Ui, session: &mut Session) {
    let origin = ui.cursor_screen_pos();
    imgui::Image::new(session.canvas.texture, session.snapshot.canvas_size).build(ui);

    let hovered = ui.is_item_hovered();
    let mouse = ui.io().mouse_pos;
    let local = Point::new(mouse[0] - origin[0], mouse[1] - origin[1]);
    if hovered {
        if session.last_pointer != Some(local) {
            session.driver.pointer(PointerEvent::Moved(local));
            session.last_pointer = Some(local);
        }
        if ui.is_item_clicked() {
            session.driver.pointer(PointerEvent::Clicked(local));
        }
    } else if session.hovered {
        session.driver.pointer(PointerEvent::Left);
        session.last_pointer = None;
    }
    session.hovered = hovered;

    let display = ui.io().display_size;
    let panel = fit_panel(session.preferred_panel, Size::new(display[0], display[1]));
    if panel != session.reported_panel {
        session.driver.send(Command::MagnifierSize(panel));
        session.reported_panel = panel;
    }

    if session.snapshot.magnifiers_visible {
        let draw_list = ui.get_foreground_draw_list();
        let font_size = ui.current_font_size();
        for (panel, uploaded) in session.snapshot.panels.iter().zip(&session.magnifiers) {
            let min = [
                origin[0] + panel.placement.left,
                origin[1] + panel.placement.top,
            ];
            let max = [min[0] + panel.size.width, min[1] + panel.size.height];
            draw_list.add_image(uploaded.texture, min, max).build();
            draw_list.add_rect(min, max, [1.0, 1.0, 1.0, 0.6]).build();
            for label in &panel.labels {
                let pos = [
                    min[0] + label.position.x,
                    min[1] + label.position.y - font_size,
                ];
                draw_outlined_text(&draw_list, pos, &label.text);
            }
        }
    }

    ui.separator();
    ui.set_next_item_width(160.0);
    ui.slider("Zoom", 1, 10, &mut session.zoom_edit);
    if ui.is_item_deactivated_after_edit() {
        session.driver.send(Command::Zoom(session.zoom_edit as f32));
    }
    ui.same_line();
    ui.text(&session.snapshot.zoom_label);

    if let Some(speed_label) = &session.snapshot.speed_label {
        ui.set_next_item_width(160.0);
        ui.slider_config("Speed", 0.0f32, 1.0f32)
            .display_format("%.1f")
            .build(&mut session.speed_edit);
        if ui.is_item_deactivated_after_edit() {
            session.driver.send(Command::Speed(session.speed_edit));
        }
        ui.same_line();
        ui.text(speed_label);

        if ui.button("play") {
            session.driver.send(Command::Playback(PlaybackAction::Play));
        }
        ui.same_line();
        if ui.button("pause") {
            session.driver.send(Command::Playback(PlaybackAction::Pause));
        }
    }
}
