//! `modelview3d`: flies a camera around one model.
//!
//! Usage: `modelview3d [config.json]`. Without an argument the config is read from
//! `<config dir>/modelview3d/viewer.json` when it exists, otherwise defaults are used.
//!
//! Controls: WASD to move, mouse to look, scroll to zoom, Escape to quit.

use std::path::PathBuf;
use std::time::Instant;

use glam::Mat4;
use glow::HasContext;
use log::LevelFilter;
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::{Keycode, Scancode};

use modelview3d::abs::App;
use modelview3d::{Camera, CameraMovement, Model, ShaderProgram, ViewerConfig};

const MOVEMENT_KEYS: [(Scancode, CameraMovement); 4] = [
    (Scancode::W, CameraMovement::Forward),
    (Scancode::S, CameraMovement::Backward),
    (Scancode::A, CameraMovement::Left),
    (Scancode::D, CameraMovement::Right),
];

fn setup_logger(level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

/// The config path given on the command line, or the per-user one if it exists.
fn config_path() -> Option<PathBuf> {
    if let Some(arg) = std::env::args_os().nth(1) {
        return Some(PathBuf::from(arg));
    }
    dirs::config_dir()
        .map(|dir| dir.join("modelview3d").join("viewer.json"))
        .filter(|path| path.is_file())
}

fn main() {
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("modelview3d: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path();
    let config = match &path {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    setup_logger(config.log_level())?;
    match &path {
        Some(path) => log::info!("using config {}", path.display()),
        None => log::info!("no config file found, using defaults"),
    }

    let window = &config.window;
    let mut app = App::new(&window.title, window.width, window.height, window.fullscreen)?;

    unsafe {
        app.gl.enable(glow::DEPTH_TEST);
        if config.import.gamma {
            app.gl.enable(glow::FRAMEBUFFER_SRGB);
        }
        let (w, h) = app.drawable_size();
        app.gl.viewport(0, 0, w as i32, h as i32);
    }

    let shader = ShaderProgram::from_files(
        &app.gl,
        &config.shaders.vertex,
        &config.shaders.fragment,
        config.shaders.geometry.as_deref(),
    )?
    .strict()?;

    let model = Model::load_or_empty(&app.gl, &config.model, &config.import);
    for issue in model.issues() {
        log::warn!("{issue}");
    }

    let mut camera = Camera::from_settings(&config.camera);
    let mut last_frame = Instant::now();

    'running: loop {
        let now = Instant::now();
        let delta_time = (now - last_frame).as_secs_f32();
        last_frame = now;

        for event in app.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                Event::MouseMotion { xrel, yrel, .. } => {
                    // window y grows downwards
                    camera.process_look(xrel as f32, -yrel as f32, true);
                }
                Event::MouseWheel { precise_y, .. } => camera.process_zoom(precise_y),
                Event::Window {
                    win_event: WindowEvent::SizeChanged(w, h),
                    ..
                } => unsafe {
                    app.gl.viewport(0, 0, w, h);
                },
                _ => {}
            }
        }

        let keyboard = app.event_pump.keyboard_state();
        for (scancode, movement) in MOVEMENT_KEYS {
            if keyboard.is_scancode_pressed(scancode) {
                camera.process_movement(movement, delta_time);
            }
        }

        let (w, h) = app.drawable_size();
        let aspect_ratio = w as f32 / h.max(1) as f32;

        unsafe {
            app.gl.clear_color(0.1, 0.1, 0.1, 1.0);
            app.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        shader.use_program();
        shader.set_uniform("projection", camera.projection_matrix(aspect_ratio));
        shader.set_uniform("view", camera.view_matrix());
        shader.set_uniform("model", Mat4::IDENTITY);
        shader.set_uniform("view_pos", camera.position());
        model.draw(&shader);

        app.window.gl_swap_window();
    }

    Ok(())
}
