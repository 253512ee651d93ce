//! Headless renderer: drives the solver along a scripted pointer path and
//! writes every frame as a PNG.

use std::{
    f32::consts::TAU,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use cursor_fluid::{DisplayMode, FluidError, Frame, FrameLoop, SimConfig, Surface, Viewport};
use log::info;

#[derive(Debug, Parser)]
#[command(about = "Render a scripted cursor path through the fluid to a PNG sequence")]
struct Opt {
    /// RON config file; defaults are used for anything it leaves out.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for numbered frames.
    #[arg(short, long, default_value = "frames")]
    out: PathBuf,

    #[arg(short, long, default_value_t = 180)]
    frames: usize,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 360)]
    height: u32,

    /// light or dark; overrides the config file.
    #[arg(short, long)]
    mode: Option<DisplayMode>,

    /// Also inject random ambient splats.
    #[arg(long)]
    ambient: bool,

    /// Print the effective config as RON and exit.
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Opt::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::load_from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.display_mode = mode;
    }
    config.ambient.enabled |= args.ambient;

    if args.dump_config {
        println!("{}", config.to_ron()?);
        return Ok(());
    }

    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    let viewport = Viewport::new(args.width, args.height);
    let surface = PngSequence {
        dir: args.out.clone(),
        size: viewport,
        written: 0,
    };
    let mut frame_loop = FrameLoop::start(|| Ok(surface), config)?;

    for i in 0..args.frames {
        let t = i as f32 / 60.;
        let (x, y) = cursor_path(t, viewport);
        frame_loop.pointer_move(x, y);

        if !frame_loop.tick(t as f64) {
            break;
        }
        if (i + 1) % 30 == 0 {
            info!("{}/{}", i + 1, args.frames);
        }
    }

    let written = frame_loop.into_surface().written;
    println!("wrote {written} frames to {}", args.out.display());
    Ok(())
}

/// Lissajous figure across the middle of the viewport, in pixels.
fn cursor_path(t: f32, viewport: Viewport) -> (f32, f32) {
    let (w, h) = (viewport.width as f32, viewport.height as f32);
    let x = 0.5 + 0.35 * (TAU * 0.23 * t).sin();
    let y = 0.5 + 0.3 * (TAU * 0.37 * t).sin();
    (x * w, y * h)
}

struct PngSequence {
    dir: PathBuf,
    size: Viewport,
    written: usize,
}

impl Surface for PngSequence {
    fn size(&self) -> Viewport {
        self.size
    }

    fn present(&mut self, frame: &Frame) -> Result<(), FluidError> {
        let path = self.dir.join(format!("{:04}.png", self.written));
        write_png(&path, frame)
            .map_err(|e| FluidError::Present(format!("{}: {e:#}", path.display())))?;
        self.written += 1;
        Ok(())
    }
}

fn write_png(path: impl AsRef<Path>, frame: &Frame) -> Result<()> {
    let file = File::create(path)?;
    let w = &mut BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, frame.width() as _, frame.height() as _);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(frame.as_bytes())?;

    Ok(())
}
