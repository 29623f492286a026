use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watermark_inpaint::{
    default_output_path, parse_boxes, FastMarchInpainter, ProcessResult, RepairConfig,
    RepairEngine,
};

#[derive(Parser)]
#[command(
    name = "watermark-inpaint",
    about = "Remove boxed watermarks, logos and captions from images by inpainting",
    version,
    after_help = "Simple usage: watermark-inpaint <image> --boxes '[[x1,y1,x2,y2]]'\n\n\
                  Boxes are in source pixel coordinates. Entries that are not exactly\n\
                  four numbers are ignored. The same boxes apply to every image when\n\
                  the input is a directory."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_cleaned.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Boxes to repair as JSON, e.g. '[[10,20,110,60]]'
    #[arg(short, long, conflicts_with = "boxes_file")]
    boxes: Option<String>,

    /// Read the JSON box list from a file
    #[arg(long, value_name = "PATH")]
    boxes_file: Option<PathBuf>,

    /// JSON configuration file; flags below override its values
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pixels added around every box before masking
    #[arg(long)]
    margin: Option<u32>,

    /// Context window grows to at least this multiple of the mask size
    #[arg(long)]
    context_multiplier: Option<f32>,

    /// Context window grows by at least this many pixels per axis
    #[arg(long)]
    min_context: Option<u32>,

    /// Model input alignment modulus
    #[arg(long)]
    modulus: Option<u32>,

    /// Gaussian sigma used to feather the repaired region
    #[arg(long)]
    feather_radius: Option<f32>,

    /// Neighbourhood radius of the built-in fast-marching inpainter
    #[arg(long, default_value_t = watermark_inpaint::fast_march::DEFAULT_RADIUS)]
    fill_radius: usize,

    /// Run a single inference pass instead of averaging with a mirrored pass
    #[arg(long)]
    no_mirror: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("watermark_inpaint={default_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let boxes = match load_boxes(&cli) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let engine = match RepairEngine::new(FastMarchInpainter::new(cli.fill_radius), config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Fatal: Failed to initialize engine: {e}");
            process::exit(1);
        }
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !cli.quiet {
        eprintln!(
            "Repairing {} box(es), margin {}px, {} pass(es)",
            boxes.len(),
            engine.config().mask_margin,
            if engine.config().mirror_fusion { 2 } else { 1 }
        );
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: watermark-inpaint <input_dir> -o <output_dir> --boxes <json>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &boxes)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &boxes)]
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &cli);
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if skip_count > 0 {
            eprint!(", Skipped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn build_config(cli: &Cli) -> watermark_inpaint::Result<RepairConfig> {
    let mut config = match &cli.config {
        Some(path) => RepairConfig::from_json_file(path)?,
        None => RepairConfig::default(),
    };

    if let Some(margin) = cli.margin {
        config.mask_margin = margin;
    }
    if let Some(multiplier) = cli.context_multiplier {
        config.context_multiplier = multiplier;
    }
    if let Some(min_context) = cli.min_context {
        config.min_context_margin = min_context;
    }
    if let Some(modulus) = cli.modulus {
        config.pad_modulus = modulus;
    }
    if let Some(radius) = cli.feather_radius {
        config.feather_radius = radius;
    }
    if cli.no_mirror {
        config.mirror_fusion = false;
    }

    config.validate()?;
    Ok(config)
}

fn load_boxes(cli: &Cli) -> watermark_inpaint::Result<Vec<Vec<f64>>> {
    match (&cli.boxes, &cli.boxes_file) {
        (Some(json), _) => parse_boxes(json),
        (None, Some(path)) => parse_boxes(&std::fs::read_to_string(path)?),
        (None, None) => Ok(Vec::new()),
    }
}

fn print_result(result: &ProcessResult, cli: &Cli) {
    if cli.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !cli.quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !cli.quiet {
            eprintln!("[OK] {filename}");
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if !cli.quiet && result.dropped_boxes > 0 {
        eprintln!("  -> ignored {} malformed box(es)", result.dropped_boxes);
    }
    if cli.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fill_radius_defaults_to_backend_radius() {
        let cli = Cli::parse_from(["watermark-inpaint", "photo.jpg"]);
        assert_eq!(cli.fill_radius, watermark_inpaint::fast_march::DEFAULT_RADIUS);
        assert_eq!(
            FastMarchInpainter::new(cli.fill_radius).radius(),
            FastMarchInpainter::default().radius()
        );
    }

    #[test]
    fn flags_override_config_defaults() {
        let cli = Cli::parse_from([
            "watermark-inpaint",
            "photo.jpg",
            "--boxes",
            "[[1,2,3,4]]",
            "--margin",
            "2",
            "--no-mirror",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.mask_margin, 2);
        assert!(!config.mirror_fusion);
        assert_eq!(load_boxes(&cli).unwrap(), vec![vec![1.0, 2.0, 3.0, 4.0]]);
    }
}
