use clap::{Parser, Subcommand};
use imgderiv::config;
use imgderiv::derive::Deriver;
use imgderiv::imaging::{CropAnchor, OperationParams, Rgb};
use imgderiv::output::{self, Report};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Source references shared by every derivative command.
#[derive(clap::Args, Clone)]
struct Sources {
    /// Paths, site-relative URLs (/uploads/a.jpg), or absolute URLs
    #[arg(required = true)]
    sources: Vec<String>,
}

#[derive(Parser)]
#[command(name = "imgderiv")]
#[command(about = "Generate deterministic image derivatives")]
#[command(long_about = "\
Generate deterministic image derivatives

Each derivative is written next to its source with a name that encodes the
operation and its parameters. If that file already exists it is reused:

  photo.jpg  resize 100x50 --crop center   → photo-100x50-c-center.jpg
  photo.jpg  letterbox 300x200 --color f00 → photo-lbox-300x200-ff0000.jpg
  photo.jpg  letterbox 300x200             → photo-lbox-300x200-trans.jpg
  photo.jpg  retina --factor 2             → photo@2x.jpg

Remote sources are downloaded once into the sideload directory. When a
derivative cannot be produced, the original reference is printed instead.

Run 'imgderiv gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Regenerate derivatives even if they already exist
    #[arg(long, global = true)]
    force: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scale and crop to exactly WIDTHxHEIGHT
    Resize {
        #[command(flatten)]
        sources: Sources,
        /// Target width (0 = infer from aspect ratio)
        #[arg(long, default_value_t = 0)]
        width: u32,
        /// Target height (0 = infer from aspect ratio)
        #[arg(long, default_value_t = 0)]
        height: u32,
        /// Crop anchor: default, center, top, bottom, left, right, top-center, bottom-center
        #[arg(long, default_value = "default")]
        crop: CropAnchor,
    },
    /// Fit inside WIDTHxHEIGHT and pad the rest
    Letterbox {
        #[command(flatten)]
        sources: Sources,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Padding color (#rrggbb or #rgb); transparent when omitted
        #[arg(long)]
        color: Option<Rgb>,
    },
    /// Upscale uniformly by a factor
    Retina {
        #[command(flatten)]
        sources: Sources,
        /// Multiplier (defaults to retina.factor from the config)
        #[arg(long)]
        factor: Option<f64>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        other => other,
    };

    let config = config::load_config(cli.config.as_deref())?;
    let (sources, params) = match command {
        Command::Resize {
            sources,
            width,
            height,
            crop,
        } => (
            sources.sources,
            OperationParams::Resize {
                width,
                height,
                anchor: crop,
            },
        ),
        Command::Letterbox {
            sources,
            width,
            height,
            color,
        } => (
            sources.sources,
            OperationParams::Letterbox {
                width,
                height,
                color,
            },
        ),
        Command::Retina { sources, factor } => (
            sources.sources,
            OperationParams::Retina {
                factor: factor.unwrap_or(config.retina.factor),
            },
        ),
        Command::GenConfig => return Ok(()),
    };
    params.validate()?;
    init_thread_pool(&config.processing);

    let deriver = Deriver::with_defaults(config);
    let reports: Vec<Report> = sources
        .par_iter()
        .map(|source| Report::new(source, deriver.try_derive(source, &params, cli.force)))
        .collect();

    if cli.json {
        println!("{}", output::reports_json(&reports)?);
    } else {
        output::print_reports(&reports);
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Never more threads than cores; the config can only lower the count.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
