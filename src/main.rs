use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use webcrop::config::{self, AppConfig};
use webcrop::imaging::{EncodeParams, ImageBackend, OutputFormat, RustBackend};
use webcrop::overlay::Compositor;
use webcrop::overlay::font::FontCache;
use webcrop::process::{BatchRequest, BatchRunner, CropPolicy};
use webcrop::session::Session;
use webcrop::types::NormalizedPoint;
use webcrop::{output, scan};

#[derive(Parser)]
#[command(name = "webcrop")]
#[command(about = "Batch-generate cropped, watermarked web variants of images")]
#[command(long_about = "\
Batch-generate cropped, watermarked web variants of images

Every image in the source folder is scaled to cover each selected size and
cropped to exactly that size, then decorated with the configured overlays
(shapes, a graphic watermark, text) and written to:

  <output>/<width>x<height>/<name>.<ext>

Crops are centered unless a focus point [x, y] is given, as fractions of the
image width and height (0,0 = top left).

Run 'webcrop gen-config' to generate a documented webcrop.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./webcrop.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate every selected size for every image in a folder
    Run {
        /// Folder containing .jpg/.jpeg/.png sources
        source: PathBuf,
        /// Destination root
        output: PathBuf,
        /// Size labels to generate, overriding `selected_sizes`
        #[arg(long = "size")]
        sizes: Vec<String>,
        /// Crop focus for every file, as `x,y`
        #[arg(long, value_parser = parse_point)]
        focus: Option<NormalizedPoint>,
        /// Write a JSON report of the run to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Render one image at one size and report its estimated output size
    Preview {
        /// Source image
        file: PathBuf,
        /// Size label (default: first selected size)
        #[arg(long)]
        size: Option<String>,
        /// Where to write the rendered preview
        #[arg(long, default_value = "preview.png")]
        output: PathBuf,
        /// Crop focus, as `x,y`
        #[arg(long, value_parser = parse_point)]
        focus: Option<NormalizedPoint>,
    },
    /// List the size catalog and the current selection
    Sizes,
    /// Print a stock webcrop.toml with all options documented
    GenConfig,
}

fn parse_point(s: &str) -> Result<NormalizedPoint, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{s}'"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok(NormalizedPoint::new(x, y))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            source,
            output: destination,
            sizes,
            focus,
            report,
        } => {
            let mut cfg = load(cli.config.as_deref())?;
            if !sizes.is_empty() {
                cfg.selected_sizes = sizes;
                cfg.validate()?;
            }

            let sources = scan::list_source_images(&source)?;
            let crop = match focus {
                Some(p) => CropPolicy::AllFiles(p),
                None => cfg.crop_policy(&source),
            };
            let request = BatchRequest::new(sources, cfg.selected_targets(), destination)
                .with_overlay(&cfg.overlay)
                .with_crop(crop)
                .with_encode(cfg.encode_options());

            let runner = BatchRunner::new(Arc::new(RustBackend::new()));
            let handle = runner.start(request, compositor(&cfg))?;
            for event in handle.events().iter() {
                for line in output::format_process_event(&event) {
                    println!("{}", line);
                }
            }
            let summary = handle.wait()?;

            if let Some(report) = report {
                let json = serde_json::to_string_pretty(&summary)?;
                std::fs::write(&report, json)?;
            }
            if summary.failed > 0 {
                return Err(format!("{} of {} variants failed", summary.failed, summary.total).into());
            }
        }
        Command::Preview {
            file,
            size,
            output: preview_path,
            focus,
        } => {
            let cfg = load(cli.config.as_deref())?;
            let backend = RustBackend::new();

            let mut session = Session::new(cfg.sizes.clone(), compositor(&cfg));
            session.select_labels(&cfg.selected_sizes);
            session.overlay = cfg.overlay.clone();
            session.encode = cfg.encode_options();
            if let Some(p) = focus.or_else(|| cfg.crop_policy(parent_dir(&file)).resolve(&file)) {
                session.crop.set_active(true);
                session.crop.set_focus(p);
            }

            let label = match size {
                Some(label) => label,
                None => cfg
                    .selected_targets()
                    .first()
                    .map(|s| s.label.clone())
                    .ok_or("no size selected; pass --size")?,
            };
            let index = session
                .catalog()
                .iter()
                .position(|s| s.label == label)
                .ok_or_else(|| format!("unknown size '{label}'"))?;

            let preview = session.preview(&backend, &file, index)?;
            let encoding = OutputFormat::SameAsInput
                .encoding_for(&preview_path)
                .ok_or_else(|| format!("unsupported preview format: {}", preview_path.display()))?;
            backend.encode(
                &preview.rendered,
                &preview_path,
                &EncodeParams {
                    encoding,
                    quality: session.encode.quality,
                },
            )?;
            output::print_preview(&preview, &preview_path);
        }
        Command::Sizes => {
            let cfg = load(cli.config.as_deref())?;
            output::print_sizes(&cfg.sizes, &cfg.selected_sizes);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config and decode the graphic overlay, resolving its path against
/// the config file's folder.
fn load(path: Option<&Path>) -> Result<AppConfig, config::ConfigError> {
    let mut cfg = config::load_config(path)?;
    let base = path.map(parent_dir).unwrap_or_else(|| Path::new("."));
    cfg.overlay.load_assets(base);
    Ok(cfg)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn compositor(cfg: &AppConfig) -> Compositor {
    Compositor::new(FontCache::new(Box::new(cfg.font_source())))
}
