//! tileprint CLI
//!
//! Renders the pages of a JSON job file to image files.
//!
//! Usage: tileprint job.json --out pages/ --dpi 300

mod job;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use tileprint_common::net::{DEFAULT_TIMEOUT, HttpFetcher, TileFetcher, USER_AGENT};
use tileprint_render::output::DEFAULT_JPEG_QUALITY;
use tileprint_render::window::DEFAULT_MAX_IN_FLIGHT;
use tileprint_render::{
    PageFormat, PageImage, PipelineConfig, PrintLayer, RenderPipeline, RenderRequest,
};

use job::Job;

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Jpeg,
    Png,
}

/// tileprint - rasterize stacked map tile layers into printable pages
#[derive(Parser, Debug)]
#[command(name = "tileprint")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Render every page of a job as JPEG into the current directory
    tileprint job.json

    # 150 dpi PNG pages into ./out
    tileprint job.json --out out --dpi 150 --format png

    # Show per-page and per-layer progress
    tileprint -vv job.json
"#)]
struct Cli {
    /// Job file describing layers and pages
    #[arg(value_name = "JOB")]
    job: PathBuf,

    /// Directory the pages are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Override the job's output resolution
    #[arg(long)]
    dpi: Option<f64>,

    /// Maximum concurrent tile fetches
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    max_in_flight: usize,

    /// Page image format
    #[arg(long, value_enum, default_value_t = Format::Jpeg)]
    format: Format,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    const fn page_format(&self) -> PageFormat {
        match self.format {
            Format::Jpeg => PageFormat::Jpeg {
                quality: self.quality,
            },
            Format::Png => PageFormat::Png,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let job = Job::load(&cli.job)?;
    let base_dir = cli
        .job
        .parent()
        .map(|dir| dir.to_string_lossy().into_owned());
    let fetcher: Arc<dyn TileFetcher> = Arc::new(
        HttpFetcher::with_options(Duration::from_secs(cli.timeout), USER_AGENT)
            .context("failed to set up tile fetcher")?,
    );
    let layers = job.build_layers(&fetcher, base_dir.as_deref());
    let printable: Vec<&dyn PrintLayer> = layers.iter().map(|l| l as &dyn PrintLayer).collect();
    let dpi = cli.dpi.unwrap_or(job.resolution_dpi);

    let pipeline = RenderPipeline::new(PipelineConfig {
        max_in_flight: cli.max_in_flight,
        output: cli.page_format(),
    });

    let mut done = 0.0;
    let mut shown = 0;
    let request = RenderRequest::new(printable, job.pages(), job.zooms(), dpi)
        .with_scale(job.scale)
        .on_progress(|inc, total| {
            done += inc;
            let percent = progress_percent(done, total);
            if percent != shown {
                shown = percent;
                log::info!("{percent}%");
            }
        });

    let started = Instant::now();
    let pages = pipeline
        .render(request)
        .with_context(|| format!("failed to render '{}'", cli.job.display()))?;

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("failed to create '{}'", cli.out.display()))?;
    for (index, page) in pages.iter().enumerate() {
        let path = write_page(&cli.out, index, page)?;
        println!(
            "  {} {} ({}x{})",
            "wrote".green(),
            path.display(),
            page.width,
            page.height
        );
    }
    println!(
        "{} {} pages in {:.1}s",
        "Done:".bold(),
        pages.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn progress_percent(done: f64, total: f64) -> u32 {
    if total <= 0.0 {
        return 100;
    }
    (done / total * 100.0).floor().clamp(0.0, 100.0) as u32
}

fn write_page(dir: &Path, index: usize, page: &PageImage) -> Result<PathBuf> {
    let path = dir.join(format!("page-{:03}.{}", index + 1, page.format.extension()));
    fs::write(&path, &page.bytes).with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0.0, 4.0), 0);
        assert_eq!(progress_percent(1.0, 4.0), 25);
        assert_eq!(progress_percent(4.000_000_1, 4.0), 100);
        assert_eq!(progress_percent(0.0, 0.0), 100);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["tileprint", "job.json"]);
        assert_eq!(cli.out, PathBuf::from("."));
        assert_eq!(cli.max_in_flight, 20);
        assert_eq!(cli.page_format(), PageFormat::default());

        let cli = Cli::parse_from(["tileprint", "job.json", "--format", "png", "-vv"]);
        assert_eq!(cli.page_format(), PageFormat::Png);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_page_file_names() {
        let page = PageImage {
            bytes: vec![1, 2, 3],
            width: 1,
            height: 1,
            format: PageFormat::Png,
        };
        let dir = std::env::temp_dir().join(format!("tileprint-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = write_page(&dir, 0, &page).unwrap();
        assert!(path.ends_with("page-001.png"));
        assert_eq!(fs::read(&path).unwrap(), [1, 2, 3]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
