use log::{error, info};
use split_comparator::config::{build_cli, AppConfig, SourceSpec};
use winit::{
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};
mod app;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = build_cli().get_matches();
    let app_config = AppConfig::from_matches(&matches)?;
    let (width, height) = app_config.window_size;

    match &app_config.sources {
        SourceSpec::Pair { left, right } => info!(
            "Starting split comparator with left: {}, right: {}, window size: {}x{}",
            left.display(),
            right.display(),
            width,
            height
        ),
        SourceSpec::Single { path, split } => info!(
            "Starting split comparator with {} split {:?}, window size: {}x{}",
            path.display(),
            split,
            width,
            height
        ),
    }

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Split Comparator")
        .with_inner_size(winit::dpi::LogicalSize::new(width, height))
        .build(&event_loop)?;

    let mut app_state = pollster::block_on(app::AppState::new(&window, app_config))?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        app_state.handle_event(&window, &event);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => *control_flow = ControlFlow::Exit,
                _ => {}
            },
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            Event::RedrawRequested(_) => {
                app_state.update();
                if let Err(e) = app_state.render(&window) {
                    error!("Render error: {}", e);
                }
            }
            _ => {}
        }
    });
}
