use clap::Parser;
use raw_thumbs::engine::PreviewEngine;
use raw_thumbs::pipeline::{Pipeline, PipelineOptions};
use raw_thumbs::{config, output};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "raw-thumbs")]
#[command(about = "Extract thumbnail, gallery and full JPEGs from a folder of RAW photos")]
#[command(long_about = "\
Extract thumbnail, gallery and full JPEGs from a folder of RAW photos

Every RAW file carries JPEG previews written by the camera. raw-thumbs copies
the three smallest of them into tier folders and writes a manifest.json that
lists them in shooting order.

Input files must be named PREFIX_DIGITS.EXT (IMG_0001.CR2); anything else is
skipped. Output layout:

  OUTPUT/
  └── shoot-2024/                  # Named after the source folder
      ├── manifest.json            # {\"full\": [...], \"gallery\": [...], \"thumbnail\": [...]}
      ├── full/IMG_0001-full.jpeg
      ├── gallery/IMG_0001-gallery.jpeg
      └── thumbnail/IMG_0001-thumbnail.jpeg

Files that fail are retried once after all others have been tried.

Run 'raw-thumbs --gen-config' to generate a documented config file.
Set RUST_LOG=debug for diagnostic logging.")]
#[command(version)]
struct Cli {
    /// Folder of RAW files
    #[arg(required_unless_present = "gen_config")]
    source: Option<PathBuf>,

    /// Output root; a sub-folder named after SOURCE is created inside it
    #[arg(required_unless_present = "gen_config")]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Retry passes for failed files (overrides the config file)
    #[arg(long)]
    retries: Option<u32>,

    /// Write an indented manifest
    #[arg(long)]
    pretty: bool,

    /// Print a stock config file with all options documented
    #[arg(long, exclusive = true)]
    gen_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }
    let (Some(source), Some(output_root)) = (cli.source, cli.output) else {
        return Err("SOURCE and OUTPUT are required".into());
    };

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(retries) = cli.retries {
        config.pipeline.retries = retries;
    }
    if cli.pretty {
        config.manifest.pretty = true;
    }
    tracing::debug!(?config, "resolved config");

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_run_event(&event);
        }
    });

    // The pipeline owns the sender; dropping it lets the printer finish.
    let result = {
        let mut pipeline =
            Pipeline::new(PreviewEngine::new(), PipelineOptions::from_config(&config))
                .with_events(tx);
        pipeline.run(&source, &output_root)
    };
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;

    let summary = result?;
    output::print_summary(&summary);
    Ok(())
}
