//! gingham CLI: find chessboard corners (or dot centres with `--blobs`) in
//! images.
//!
//! Output is one line per grid point, `filename x y level`, where `level` is
//! the pyramid level the point was last measured at. Images without a board
//! produce `filename - - -`.

use clap::Parser;
use gingham::chessboard::{ChessboardDetector, GridSize, Pattern};
use gingham::detect::{check_image_size, load_gray};
use gingham::{preprocess, ChessboardDetection, Config};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "gingham")]
#[command(about = "Detect chessboard and circle calibration grids in images")]
#[command(version)]
struct Cli {
    /// Images to process.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Box blur radius applied after contrast enhancement (0 disables).
    #[arg(long)]
    blur: Option<u32>,

    /// Skip histogram equalization and CLAHE.
    #[arg(long)]
    noclahe: bool,

    /// Detect at this pyramid level only (0..=10). By default levels are
    /// searched coarse to fine.
    #[arg(long)]
    level: Option<u32>,

    /// Look for a grid of dark circles on a light background instead of a
    /// chessboard. Circles are found at full resolution only.
    #[arg(long, conflicts_with = "level")]
    blobs: bool,

    /// Report corners as found, without coarse-to-fine refinement.
    #[arg(long)]
    no_refine: bool,

    /// Number of worker threads.
    #[arg(long, short = 'j', default_value_t = 4)]
    jobs: usize,

    /// Grid points per side of a square board.
    #[arg(long, conflicts_with_all = ["rows", "cols"])]
    gridn: Option<u32>,

    /// Grid point rows (with --cols).
    #[arg(long, requires = "cols")]
    rows: Option<u32>,

    /// Grid point columns (with --rows).
    #[arg(long, requires = "rows")]
    cols: Option<u32>,

    /// JSON configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write preprocessed images and ChESS responses here.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn build_config(&self) -> CliResult<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(r) = self.blur {
            cfg.preprocess.blur_radius = r;
        }
        if self.noclahe {
            cfg.preprocess.contrast_enhancement = false;
        }
        if self.level.is_some() {
            cfg.detector.pyramid_level = self.level;
        }
        if self.blobs {
            cfg.detector.pattern = Pattern::CircleGrid;
        }
        if self.no_refine {
            cfg.detector.refine.enabled = false;
        }
        if let Some(n) = self.gridn {
            cfg.detector.grid = GridSize::new(n, n)?;
        }
        if let (Some(rows), Some(cols)) = (self.rows, self.cols) {
            cfg.detector.grid = GridSize::new(rows, cols)?;
        }
        Ok(cfg)
    }
}

fn init_logging(level: &str) -> CliResult<()> {
    let filter =
        gingham::core::parse_level(level).ok_or_else(|| format!("unknown log level '{level}'"))?;
    #[cfg(feature = "tracing")]
    gingham::init_tracing(false, filter);
    #[cfg(not(feature = "tracing"))]
    gingham::core::init_with_level(filter)?;
    Ok(())
}

fn dash_line(name: &str) -> String {
    format!("{name} - - -\n")
}

fn format_detection(name: &str, detection: &ChessboardDetection) -> String {
    let mut out = String::new();
    for c in &detection.corners {
        out.push_str(&format!(
            "{name} {:.6} {:.6} {}\n",
            c.position.x, c.position.y, c.level
        ));
    }
    out
}

/// Run one image end to end and return its output block.
fn process_image(
    path: &Path,
    cfg: &Config,
    detector: &ChessboardDetector,
    debug_dir: Option<&Path>,
) -> String {
    let name = path.display().to_string();

    let image = match load_gray(path) {
        Ok(img) => img,
        Err(err) => {
            log::error!("Couldn't open image '{name}': {err}");
            return format!("## Couldn't open image '{name}'\n{}", dash_line(&name));
        }
    };
    if let Err(err) = check_image_size(&image, &cfg.detector) {
        log::error!("{name}: {err}");
        return dash_line(&name);
    }

    let started = Instant::now();
    let prepared = preprocess(&image, &cfg.preprocess);
    if let Some(dir) = debug_dir {
        if let Err(err) = gingham::debug::write_debug_images(dir, path, &prepared) {
            log::warn!("{name}: debug dump failed: {err}");
        }
    }

    let result = detector.detect(&prepared);
    log::debug!(
        "{name}: {:.1} ms",
        started.elapsed().as_secs_f64() * 1000.0
    );

    match result {
        Ok(Some(detection)) => format_detection(&name, &detection),
        Ok(None) => dash_line(&name),
        Err(err) => {
            log::error!("{name}: {err}");
            dash_line(&name)
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let cfg = cli.build_config()?;
    let detector = ChessboardDetector::new(cfg.detector.clone())?;
    let jobs = cli.jobs.clamp(1, cli.images.len().max(1));

    {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "# filename x y level")?;
        stdout.flush()?;
    }

    std::thread::scope(|scope| {
        for worker in 0..jobs {
            let (cli, cfg, detector) = (&cli, &cfg, &detector);
            scope.spawn(move || {
                for path in cli.images.iter().skip(worker).step_by(jobs) {
                    let block = process_image(path, cfg, detector, cli.debug_dir.as_deref());
                    let mut stdout = std::io::stdout().lock();
                    if stdout.write_all(block.as_bytes()).and_then(|_| stdout.flush()).is_err() {
                        return;
                    }
                }
            });
        }
    });

    Ok(())
}
