//! Voronoi diagram CLI
//!
//! Computes clipped Voronoi diagrams from random or listed sites and writes
//! them as polygon lists, rendered images, or animations of moving sites.
//!
//! ## YAML scene file
//!
//! ```yaml
//! width: 800
//! height: 600
//! seed: 3
//! sites: 200          # random sites, or list them:
//! points:
//!   - [120.5, 40]
//!   - [300, 410.25]
//! speed: 40           # animation only
//! fps: 30
//! frames: 150
//! ```
//!
//! Run with: `voronoi --input scene.yaml -o cells.yaml`
//!
//! Flags given on the command line override scene values:
//!
//!   voronoi --sites 500 --seed 7 -o cells.png --show-sites
//!   voronoi --input scene.yaml -o anim.gif --frames 300
//!
//! ## Graceful interruption
//!
//! Animation frames are streamed to disk as they render. Press Ctrl+C to
//! stop early and keep the frames rendered so far.

mod render;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use fortune_core::{
    dedup_sites, filter_similar_points, quantize_sites, BBox, Diagram, Site, SiteCollection,
    Voronoi,
};

use crate::render::{draw_sites, palette, render_diagram};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Png,
    Gif,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

/// YAML scene file format
#[derive(Debug, Default, Deserialize)]
struct Scene {
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    seed: Option<u64>,
    /// Number of random sites
    #[serde(default)]
    sites: Option<usize>,
    /// Explicit site positions, used instead of random sites
    #[serde(default)]
    points: Vec<[f64; 2]>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    fps: Option<u32>,
    #[serde(default)]
    frames: Option<usize>,
}

fn load_scene(path: &PathBuf) -> anyhow::Result<Scene> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene file: {:?}", path))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse scene file: {:?}", path))
}

/// Polygon file written for `-o *.yaml`
#[derive(Debug, Serialize)]
struct PolygonFile {
    width: f64,
    height: f64,
    cells: Vec<CellRecord>,
}

/// One entry per input site, in input order
#[derive(Debug, Serialize)]
struct CellRecord {
    site: [f64; 2],
    /// Empty for a site dropped as a duplicate
    polygon: Vec<[f64; 2]>,
    /// Input indices of the sites owning adjacent cells
    neighbors: Vec<usize>,
}

impl PolygonFile {
    fn new(diagram: &Diagram, sites: &[Site], bbox: &BBox, filter: Option<f64>) -> Self {
        let cells = diagram
            .polygons(Some(sites))
            .into_iter()
            .zip(sites)
            .map(|(polygon, site)| {
                let polygon = match filter {
                    Some(threshold) => filter_similar_points(&polygon, threshold),
                    None => polygon,
                };
                let neighbors = site
                    .voronoi_id
                    .map(|id| {
                        diagram
                            .neighbor_ids(id)
                            .into_iter()
                            .map(|n| diagram.cells[n].site_index)
                            .collect()
                    })
                    .unwrap_or_default();
                CellRecord {
                    site: [site.x, site.y],
                    polygon: polygon.iter().map(|p| [p.x, p.y]).collect(),
                    neighbors,
                }
            })
            .collect();
        Self {
            width: bbox.width(),
            height: bbox.height(),
            cells,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "voronoi")]
#[command(about = "Compute and render clipped Voronoi diagrams", long_about = None)]
struct Args {
    /// YAML scene file (bounding box size, sites, animation settings)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file path (.yaml, .png or .gif)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (inferred from the output extension by default)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Number of random sites
    #[arg(long)]
    sites: Option<usize>,

    /// Random seed for site placement, motion and colors
    #[arg(long)]
    seed: Option<u64>,

    /// Bounding box width (pixels for image output)
    #[arg(long)]
    width: Option<f64>,

    /// Bounding box height (pixels for image output)
    #[arg(long)]
    height: Option<f64>,

    /// Snap sites onto the 1e-9 grid before computing
    #[arg(long)]
    quantize: bool,

    /// Drop sites sharing an integer-floored position with an earlier site
    #[arg(long)]
    dedup: bool,

    /// Simplify output polygons, merging points closer than this on both axes
    #[arg(long)]
    filter: Option<f64>,

    /// Draw site positions as dots on rendered frames
    #[arg(long)]
    show_sites: bool,

    /// Number of animation frames
    #[arg(long)]
    frames: Option<usize>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Site speed (units per second)
    #[arg(long)]
    speed: Option<f64>,

    /// Time repeated computations over growing site counts
    #[arg(long)]
    benchmark: bool,

    /// Computations per site count in benchmark mode
    #[arg(long, default_value = "20")]
    bench_frames: usize,

    /// Largest site count in benchmark mode
    #[arg(long, default_value = "20000")]
    bench_sites: usize,
}

/// Scene values with CLI overrides applied
#[derive(Debug)]
struct Settings {
    bbox: BBox,
    seed: u64,
    sites: Vec<Site>,
    speed: f64,
    fps: u32,
    frames: usize,
}

impl Settings {
    fn resolve(args: &Args, scene: Scene) -> anyhow::Result<Self> {
        let width = args.width.or(scene.width).unwrap_or(800.0);
        let height = args.height.or(scene.height).unwrap_or(600.0);
        let bbox = BBox::from_size(width, height);
        bbox.validate()?;
        let seed = args.seed.or(scene.seed).unwrap_or(0);

        let sites = match args.sites {
            Some(count) => SiteCollection::random(count, &bbox, seed).sites,
            None if !scene.points.is_empty() => {
                scene.points.iter().map(|&[x, y]| Site::new(x, y)).collect()
            }
            None => SiteCollection::random(scene.sites.unwrap_or(100), &bbox, seed).sites,
        };

        Ok(Self {
            bbox,
            seed,
            sites,
            speed: args.speed.or(scene.speed).unwrap_or(40.0),
            fps: args.fps.or(scene.fps).unwrap_or(30).max(1),
            frames: args.frames.or(scene.frames).unwrap_or(150),
        })
    }

    /// Image dimensions for rendered output
    fn image_size(&self) -> (u32, u32) {
        (
            self.bbox.width().round().max(1.0) as u32,
            self.bbox.height().round().max(1.0) as u32,
        )
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Set up SIGINT handler
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
        })
        .context("failed to set Ctrl-C handler")?;
    }

    let scene = args.input.as_ref().map(load_scene).transpose()?.unwrap_or_default();
    let mut settings = Settings::resolve(&args, scene)?;

    if args.quantize {
        quantize_sites(&mut settings.sites);
    }
    if args.dedup {
        let before = settings.sites.len();
        settings.sites = dedup_sites(&settings.sites);
        info!("dedup: {} -> {} sites", before, settings.sites.len());
    }
    println!(
        "Bounding box: {}x{}, {} sites (seed: {})",
        settings.bbox.width(),
        settings.bbox.height(),
        settings.sites.len(),
        settings.seed
    );

    if args.benchmark {
        return run_benchmark(&settings, &args);
    }

    let output = args
        .output
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Output path required (use -o/--output)"))?;
    let format = args
        .format
        .or_else(|| OutputFormat::from_path(output))
        .ok_or_else(|| anyhow::anyhow!("cannot infer output format from {:?}; use --format", output))?;

    match format {
        OutputFormat::Yaml => write_polygons(&mut settings, &args, output),
        OutputFormat::Png => write_image(&mut settings, &args, output),
        OutputFormat::Gif => write_animation(settings, &args, output, &interrupted),
    }
}

fn write_polygons(settings: &mut Settings, args: &Args, output: &Path) -> anyhow::Result<()> {
    let start = Instant::now();
    let diagram = Voronoi::new().compute(&mut settings.sites, &settings.bbox)?;
    debug!("computed {} cells in {:?}", diagram.cells.len(), start.elapsed());

    let file = PolygonFile::new(&diagram, &settings.sites, &settings.bbox, args.filter);
    let yaml = serde_yaml::to_string(&file).context("failed to serialize polygons")?;
    std::fs::write(output, yaml).with_context(|| format!("failed to write {:?}", output))?;
    println!("Wrote {} cells to: {:?}", diagram.cells.len(), output);
    Ok(())
}

fn write_image(settings: &mut Settings, args: &Args, output: &Path) -> anyhow::Result<()> {
    let (width, height) = settings.image_size();
    let diagram = Voronoi::new().compute(&mut settings.sites, &settings.bbox)?;
    let colors = palette(settings.sites.len(), settings.seed);
    let mut image = render_diagram(&diagram, width, height, &colors);
    if args.show_sites {
        let positions: Vec<_> = settings.sites.iter().map(Site::pos).collect();
        draw_sites(&mut image, &positions);
    }
    image
        .save(output)
        .with_context(|| format!("failed to save {:?}", output))?;
    println!("Output saved to: {:?}", output);
    Ok(())
}

fn write_animation(
    settings: Settings,
    args: &Args,
    output: &Path,
    interrupted: &AtomicBool,
) -> anyhow::Result<()> {
    let (width, height) = settings.image_size();
    let colors = palette(settings.sites.len(), settings.seed);
    let mut sites = SiteCollection::new(settings.sites, settings.seed);
    let dt = 1.0 / settings.fps as f64;
    let total_frames = settings.frames;

    println!(
        "Rendering {} frames at {} fps ({:.1}s duration)",
        total_frames,
        settings.fps,
        total_frames as f64 * dt
    );

    let progress = ProgressBar::new(total_frames as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut encoder = GifEncoder::create(output, width, height, settings.fps)?;
    let mut voronoi = Voronoi::new();
    let mut frames_rendered = 0;
    let mut frame_ms = Vec::with_capacity(total_frames);
    let render_start = Instant::now();

    for _ in 0..total_frames {
        if interrupted.load(Ordering::Relaxed) {
            progress.abandon_with_message("Interrupted");
            eprintln!(
                "Interrupted after {} of {} frames, finalizing partial output...",
                frames_rendered, total_frames
            );
            break;
        }

        let frame_start = Instant::now();
        let diagram = voronoi.compute(&mut sites.sites, &settings.bbox)?;
        let mut frame = render_diagram(&diagram, width, height, &colors);
        if args.show_sites {
            draw_sites(&mut frame, &sites.positions());
        }
        voronoi.recycle(diagram);
        encoder.write_frame(frame.as_raw())?;
        sites.step(settings.speed, dt, &settings.bbox);

        frame_ms.push(frame_start.elapsed().as_secs_f64() * 1000.0);
        frames_rendered += 1;
        progress.inc(1);
    }

    if frames_rendered == 0 {
        eprintln!("No frames rendered.");
        return Ok(());
    }
    if !interrupted.load(Ordering::Relaxed) {
        progress.finish_with_message("Rendering complete");
    }

    let total_wall = render_start.elapsed();
    let partial = if interrupted.load(Ordering::Relaxed) { "partial" } else { "complete" };
    println!(
        "Output saved to: {:?} ({} frames, {})",
        output, frames_rendered, partial
    );
    let avg = frame_ms.iter().sum::<f64>() / frame_ms.len() as f64;
    let max = frame_ms.iter().cloned().fold(0.0f64, f64::max);
    println!(
        "Render time: {:.1}s wall, {:.1} ms/frame avg, {:.1} ms max",
        total_wall.as_secs_f64(),
        avg,
        max
    );
    Ok(())
}

/// Time `bench_frames` computations for doubling site counts up to
/// `bench_sites`, reusing one engine and recycling its diagrams.
fn run_benchmark(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    println!("\n=== Voronoi Benchmark ===");
    println!("Bounding box: {}x{}", settings.bbox.width(), settings.bbox.height());
    println!("Frames per size: {}", args.bench_frames);
    println!();

    let mut counts = Vec::new();
    let mut count = 100usize.min(args.bench_sites.max(1));
    while count < args.bench_sites {
        counts.push(count);
        count *= 2;
    }
    counts.push(args.bench_sites.max(1));

    let mut rows: BTreeMap<usize, (Duration, Duration)> = BTreeMap::new();
    let mut voronoi = Voronoi::new();
    for &n in &counts {
        let sites = SiteCollection::random(n, &settings.bbox, settings.seed).sites;
        // Warmup, also sizes the recycled arenas.
        let mut warm = sites.clone();
        let diagram = voronoi.compute(&mut warm, &settings.bbox)?;
        voronoi.recycle(diagram);

        let mut total = Duration::ZERO;
        let mut max = Duration::ZERO;
        for _ in 0..args.bench_frames {
            let mut frame_sites = sites.clone();
            let start = Instant::now();
            let diagram = voronoi.compute(&mut frame_sites, &settings.bbox)?;
            let elapsed = start.elapsed();
            voronoi.recycle(diagram);
            total += elapsed;
            max = max.max(elapsed);
        }
        rows.insert(n, (total, max));
    }

    println!("{:>8} {:>8} {:>8} {:>8} {:>8}", "sites", "frames", "avg_ms", "max_ms", "fps");
    for (n, (total, max)) in &rows {
        let frames = args.bench_frames.max(1) as f64;
        let avg = total.as_secs_f64() * 1000.0 / frames;
        let fps = if avg > 0.0 { 1000.0 / avg } else { f64::INFINITY };
        println!(
            "{:>8} {:>8} {:>8.2} {:>8.2} {:>8.1}",
            n,
            args.bench_frames,
            avg,
            max.as_secs_f64() * 1000.0,
            fps
        );
    }
    Ok(())
}

/// Streaming GIF encoder: frames are quantized and written as they arrive.
struct GifEncoder {
    encoder: gif::Encoder<std::fs::File>,
    width: u16,
    height: u16,
    frame_delay: u16,
}

impl GifEncoder {
    fn create(output: &Path, width: u32, height: u32, fps: u32) -> anyhow::Result<Self> {
        use gif::{Encoder, Repeat};
        let width = u16::try_from(width).context("GIF width exceeds 65535")?;
        let height = u16::try_from(height).context("GIF height exceeds 65535")?;
        let file = std::fs::File::create(output)
            .with_context(|| format!("failed to create {:?}", output))?;
        let mut encoder = Encoder::new(file, width, height, &[])?;
        encoder.set_repeat(Repeat::Infinite)?;
        let frame_delay = (100 / fps).max(1) as u16;
        Ok(Self {
            encoder,
            width,
            height,
            frame_delay,
        })
    }

    /// Write one frame's raw RGB pixel data
    fn write_frame(&mut self, rgb_data: &[u8]) -> anyhow::Result<()> {
        let (pixels, palette) = quantize_rgb(rgb_data);
        let mut frame =
            gif::Frame::from_palette_pixels(self.width, self.height, pixels, palette, None);
        frame.delay = self.frame_delay;
        self.encoder.write_frame(&frame)?;
        Ok(())
    }
}

/// Map RGB pixels onto a 256-entry palette: exact colors first, then the
/// nearest existing entry once the palette is full.
fn quantize_rgb(rgb_data: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut pixels: Vec<u8> = Vec::with_capacity(rgb_data.len() / 3);
    let mut palette: Vec<[u8; 3]> = Vec::new();

    for chunk in rgb_data.chunks_exact(3) {
        let rgb = [chunk[0], chunk[1], chunk[2]];
        let idx = palette.iter().position(|&c| c == rgb).unwrap_or_else(|| {
            if palette.len() < 256 {
                palette.push(rgb);
                palette.len() - 1
            } else {
                palette
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, c)| {
                        let dr = c[0] as i32 - rgb[0] as i32;
                        let dg = c[1] as i32 - rgb[1] as i32;
                        let db = c[2] as i32 - rgb[2] as i32;
                        dr * dr + dg * dg + db * db
                    })
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            }
        });
        pixels.push(idx as u8);
    }

    while palette.len() < 256 {
        palette.push([0, 0, 0]);
    }
    let flat_palette = palette.iter().flat_map(|c| c.iter().copied()).collect();
    (pixels, flat_palette)
}
