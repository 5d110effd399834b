use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Convert a vector animation into a looping animated GIF.
#[derive(Parser, Debug)]
#[command(name = "lottie2gif", version)]
struct Cli {
    /// Input animation JSON (`.tgs` files are gunzipped first).
    input: PathBuf,

    /// Output size as WIDTHxHEIGHT; defaults to the animation's own size.
    resolution: Option<lottie2gif::Canvas>,

    /// Background color as hex RGB (e.g. `ff00ff`); defaults to white.
    background: Option<String>,

    /// Output path; defaults to the input path with `.gif` appended.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write this single frame as a PNG instead of the GIF.
    #[arg(long, value_name = "FRAME")]
    png: Option<u64>,

    /// Render frames in parallel.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,

    /// Render every Nth frame.
    #[arg(long, default_value_t = 1)]
    frame_step: u32,

    /// Fail instead of approximating when a frame has more than 256 colors.
    #[arg(long)]
    exact_palette: bool,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let anim = lottie2gif::Animation::from_path(&cli.input)
        .with_context(|| format!("load animation '{}'", cli.input.display()))?;
    let background = resolve_background(cli.background.as_deref());
    if cli.png.is_none() {
        // Reject sizes GIF cannot store before the session allocates frames.
        lottie2gif::check_gif_canvas(cli.resolution.unwrap_or_else(|| anim.size()))?;
    }

    let opts = lottie2gif::RenderSessionOpts {
        raster: lottie2gif::RasterOpts {
            background: Some(background),
            ..lottie2gif::RasterOpts::default()
        },
        quantize: lottie2gif::QuantizeOpts {
            mode: if cli.exact_palette {
                lottie2gif::PaletteMode::Exact
            } else {
                lottie2gif::PaletteMode::Approximate
            },
        },
        parallel: cli.parallel,
        threads: cli.threads,
        frame_step: cli.frame_step,
        ..lottie2gif::RenderSessionOpts::default()
    };
    let mut session = lottie2gif::RenderSession::new(&anim, cli.resolution, opts)?;

    if let Some(frame) = cli.png {
        let out = cli
            .out
            .unwrap_or_else(|| append_extension(&cli.input, &format!("{frame}.png")));
        return write_png(&mut session, lottie2gif::FrameIndex(frame), &out);
    }

    let out = cli.out.unwrap_or_else(|| append_extension(&cli.input, "gif"));
    ensure_parent_dir(&out)?;
    let file = File::create(&out).with_context(|| format!("create '{}'", out.display()))?;
    let canvas = session.canvas();
    let mut encoder = lottie2gif::GifEncoder::open(BufWriter::new(file), canvas.width, canvas.height)?;
    let stats = session
        .render_to_sink(&mut encoder)
        .with_context(|| format!("render '{}'", cli.input.display()))?;

    tracing::info!(
        frames = stats.frames_rendered,
        size = %canvas,
        "wrote {}",
        out.display()
    );
    Ok(())
}

// An unusable background is not fatal: fall back to white.
fn resolve_background(arg: Option<&str>) -> lottie2gif::Rgb8 {
    match arg.map(lottie2gif::Rgb8::from_hex) {
        None => lottie2gif::Rgb8::WHITE,
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            tracing::warn!("ignoring background color: {e}; using white");
            lottie2gif::Rgb8::WHITE
        }
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn write_png(
    session: &mut lottie2gif::RenderSession<'_>,
    frame: lottie2gif::FrameIndex,
    out: &Path,
) -> anyhow::Result<()> {
    let buffer = session.render_frame(frame)?;
    ensure_parent_dir(out)?;
    image::save_buffer_with_format(
        out,
        &buffer.to_straight_rgba8(),
        buffer.width(),
        buffer.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))?;

    tracing::info!("wrote {}", out.display());
    Ok(())
}
