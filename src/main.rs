//! Interactive viewer. Move the mouse (or drag a finger) to stir the fluid,
//! `T` toggles light/dark mode, `Esc` quits.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cursor_fluid::{DisplayMode, FluidError, Frame, FrameLoop, SimConfig, Surface, Viewport};
use log::{error, warn};
use macroquad::prelude::*;

#[derive(Debug, Parser)]
#[command(about = "Cursor-reactive fluid background")]
struct Opt {
    /// RON config file. Falls back to defaults if missing or invalid.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// light or dark
    #[arg(short, long)]
    mode: Option<DisplayMode>,

    /// Inject random splats while the pointer is idle.
    #[arg(long)]
    ambient: bool,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "cursor-fluid".to_owned(),
        window_width: 1280,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        error!("{e:#}");
    }
}

async fn run() -> Result<()> {
    let args = Opt::parse();

    let mut config = match &args.config {
        Some(path) => {
            let (config, err) = SimConfig::load_or_default(path);
            if let Some(e) = err {
                warn!("{e}; using defaults");
            }
            config
        }
        None => SimConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.display_mode = mode;
    }
    config.ambient.enabled |= args.ambient;

    let mut frame_loop = FrameLoop::start(|| Ok(WindowSurface::new(window_size())), config)?;
    let mut touching = false;

    while frame_loop.is_running() {
        if is_key_pressed(KeyCode::Escape) {
            frame_loop.stop();
            break;
        }
        if is_key_pressed(KeyCode::T) {
            frame_loop.toggle_display_mode();
        }

        frame_loop.resize(window_size());

        let touches = touches();
        if touches.is_empty() {
            if touching {
                frame_loop.pointer_leave();
                touching = false;
            }
            let (x, y) = mouse_position();
            frame_loop.pointer_move(x, y);
        } else {
            touching = true;
            let points: Vec<(f32, f32)> = touches
                .iter()
                .filter(|t| !matches!(t.phase, TouchPhase::Ended | TouchPhase::Cancelled))
                .map(|t| (t.position.x, t.position.y))
                .collect();
            frame_loop.touch_move(&points);
        }

        frame_loop.tick(get_time());

        clear_background(BLACK);
        draw_texture_ex(
            &frame_loop.surface().texture,
            0.,
            0.,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        next_frame().await;
    }

    Ok(())
}

fn window_size() -> Viewport {
    Viewport::new(screen_width() as u32, screen_height() as u32).at_least_one()
}

/// Streams frames into a texture stretched over the window.
struct WindowSurface {
    texture: Texture2D,
    size: Viewport,
}

impl WindowSurface {
    fn new(size: Viewport) -> Self {
        let blank = vec![0; size.width as usize * size.height as usize * 4];
        let texture = Texture2D::from_rgba8(size.width as u16, size.height as u16, &blank);
        texture.set_filter(FilterMode::Linear);
        Self { texture, size }
    }
}

impl Surface for WindowSurface {
    fn size(&self) -> Viewport {
        self.size
    }

    fn resize(&mut self, viewport: Viewport) -> Result<(), FluidError> {
        *self = Self::new(viewport);
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<(), FluidError> {
        if (frame.width(), frame.height()) != (self.size.width as usize, self.size.height as usize) {
            return Err(FluidError::ContextLost);
        }
        self.texture
            .update_from_bytes(self.size.width, self.size.height, frame.as_bytes());
        Ok(())
    }
}
