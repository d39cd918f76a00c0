use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anim_render::{Animation, Composition, RenderFuture, Surface, shutdown_scheduler};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "anim-render", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print composition metadata as JSON.
    Info(InfoArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render a frame range as numbered PNGs on the render pool.
    Frames(FramesArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input composition JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct SizeArgs {
    /// Output width (defaults to the composition width).
    #[arg(long)]
    width: Option<usize>,

    /// Output height (defaults to the composition height).
    #[arg(long)]
    height: Option<usize>,

    /// Stretch to the output size instead of letterboxing.
    #[arg(long)]
    stretch: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input composition JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index relative to the first frame. Out-of-range values are clamped.
    #[arg(long, allow_negative_numbers = true)]
    frame: i64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Only paint this region, as `x,y,width,height`.
    #[arg(long, value_parser = parse_region)]
    region: Option<[usize; 4]>,

    #[command(flatten)]
    size: SizeArgs,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Input composition JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory; the sequence is written as `frame_00000.png`, `frame_00001.png`, ...
    #[arg(long)]
    out_dir: PathBuf,

    /// First frame, relative to the composition start.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    from: i64,

    /// Last frame (inclusive). Defaults to the final frame.
    #[arg(long, allow_negative_numbers = true)]
    to: Option<i64>,

    /// Independent instances rendering in parallel.
    #[arg(long, default_value_t = 4)]
    instances: usize,

    #[command(flatten)]
    size: SizeArgs,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let res = match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Frames(args) => cmd_frames(args),
    };
    shutdown_scheduler();
    res
}

fn parse_region(s: &str) -> Result<[usize; 4], String> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse::<usize>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<_, _>>()?;
    <[usize; 4]>::try_from(parts).map_err(|_| "expected x,y,width,height".to_string())
}

fn load(path: &Path) -> anyhow::Result<Arc<Composition>> {
    Composition::from_path(path).with_context(|| format!("load composition '{}'", path.display()))
}

fn output_size(comp: &Composition, size: &SizeArgs) -> (usize, usize) {
    let natural = comp.size();
    (
        size.width.unwrap_or(natural.width as usize),
        size.height.unwrap_or(natural.height as usize),
    )
}

fn write_png(path: &Path, surface: &Surface) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let width = u32::try_from(surface.width()).context("surface width")?;
    let height = u32::try_from(surface.height()).context("surface height")?;
    image::save_buffer_with_format(
        path,
        &surface.to_rgba8(),
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let comp = load(&args.in_path)?;
    let info = serde_json::json!({
        "name": comp.name,
        "start_frame": comp.start_frame(),
        "end_frame": comp.end_frame(),
        "total_frame": comp.total_frame(),
        "frame_rate": comp.frame_rate(),
        "duration": comp.duration(),
        "size": comp.size(),
        "layers": comp.layer_info_list(),
        "markers": comp.markers(),
    });
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let comp = load(&args.in_path)?;
    let (width, height) = output_size(&comp, &args.size);
    let anim = Animation::new(comp);

    let mut surface = Surface::try_new(width, height)?;
    let surface = match args.region {
        Some([x, y, w, h]) => {
            if !surface.set_draw_region(x, y, w, h) {
                anyhow::bail!("region {x},{y},{w},{h} does not fit a {width}x{height} surface");
            }
            anim.render_partial_sync(args.frame, surface)
        }
        None => anim.render_sync(args.frame, surface, !args.size.stretch),
    };

    write_png(&args.out, &surface)?;
    tracing::info!(
        frame = anim.map_frame(args.frame),
        out = %args.out.display(),
        "wrote frame"
    );
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let comp = load(&args.in_path)?;
    let (width, height) = output_size(&comp, &args.size);
    let keep_aspect_ratio = !args.size.stretch;
    let last = args
        .to
        .unwrap_or_else(|| i64::try_from(comp.total_frame()).unwrap_or(i64::MAX) - 1);
    if last < args.from {
        anyhow::bail!("empty frame range {}..={last}", args.from);
    }

    let instances: Vec<Arc<Animation>> = (0..args.instances.max(1))
        .map(|_| Arc::new(Animation::new(Arc::clone(&comp))))
        .collect();

    let started = Instant::now();
    // Files are numbered by position in the sequence, so negative or offset ranges still sort.
    let frames: Vec<(usize, i64)> = (args.from..=last).enumerate().collect();
    let mut written = 0usize;
    for batch in frames.chunks(instances.len()) {
        let pending = batch
            .iter()
            .zip(&instances)
            .map(|(&(index, frame), anim)| {
                let surface = Surface::try_new(width, height)?;
                let fut = anim.render_async(frame, surface, keep_aspect_ratio)?;
                Ok((index, anim.map_frame(frame), fut))
            })
            .collect::<anyhow::Result<Vec<(usize, u64, RenderFuture)>>>()?;

        for (index, frame, fut) in pending {
            let surface = fut
                .wait()
                .with_context(|| format!("render frame {frame}"))?;
            let path = args.out_dir.join(format!("frame_{index:05}.png"));
            write_png(&path, &surface)?;
            tracing::debug!(index, frame, path = %path.display(), "wrote frame");
            written += 1;
        }
    }

    tracing::info!(
        frames = written,
        instances = instances.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        out_dir = %args.out_dir.display(),
        "wrote frames"
    );
    Ok(())
}
