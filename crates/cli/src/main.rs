//! imagebake - drive Packer-compatible builds from the command line.
//!
//! A thin front end over imagebake-lib, mainly for developing and debugging
//! build jobs outside the declarative engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use imagebake_lib::packer::version::detect_version;
use imagebake_lib::provider::files::{FilesQuery, files_hash};
use imagebake_lib::provider::image::{ImageConfig, ImageState, apply};
use imagebake_lib::provider::{Provider, ProviderSettings};

#[derive(Parser)]
#[command(name = "imagebake")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Tool binary to invoke (default: packer from PATH)
  #[arg(long, global = true)]
  tool: Option<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a build job described by a JSON file
  Build {
    /// Path to the job file (an image configuration in JSON)
    job: PathBuf,

    /// Prior state from a previous run, for a stable resource id
    #[arg(long)]
    prior: Option<PathBuf>,
  },

  /// Print the detected tool version
  Version,

  /// Print the combined digest of template files
  Hash {
    /// Explicit template file
    #[arg(long)]
    file: Option<String>,

    /// Directory to scan for *.pkr.hcl / *.pkr.json templates
    #[arg(long)]
    directory: Option<String>,

    /// Additional files folded into the digest
    dependencies: Vec<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();
  let settings = ProviderSettings {
    tool_binary: cli.tool.unwrap_or_else(|| "packer".to_string()),
  };

  match cli.command {
    Commands::Build { job, prior } => cmd_build(settings, &job, prior.as_deref()).await,
    Commands::Version => cmd_version(settings).await,
    Commands::Hash {
      file,
      directory,
      dependencies,
    } => cmd_hash(file, directory, dependencies),
  }
}

async fn cmd_build(
  settings: ProviderSettings,
  job: &std::path::Path,
  prior: Option<&std::path::Path>,
) -> Result<()> {
  let raw = std::fs::read_to_string(job)
    .with_context(|| format!("failed to read job file {}", job.display()))?;
  let config: ImageConfig =
    serde_json::from_str(&raw).with_context(|| format!("invalid job file {}", job.display()))?;

  let prior_state: Option<ImageState> = match prior {
    Some(path) => {
      let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read prior state {}", path.display()))?;
      Some(serde_json::from_str(&raw).with_context(|| "invalid prior state")?)
    }
    None => None,
  };

  let provider = Provider::configure(settings).await?;

  eprintln!(
    "{} building {}",
    "::".cyan().bold(),
    config.name.as_deref().unwrap_or("<unnamed>")
  );

  match apply(&provider, &config, prior_state.as_ref()).await {
    Ok(state) => {
      eprintln!("{} build finished", "::".green().bold());
      println!("{}", serde_json::to_string_pretty(&state)?);
      Ok(())
    }
    Err(err) => {
      eprintln!("{} build failed: {}", "error:".red().bold(), err);
      std::process::exit(1);
    }
  }
}

async fn cmd_version(settings: ProviderSettings) -> Result<()> {
  let version = detect_version(&settings.tool_binary, None, &Default::default(), true)
    .await
    .with_context(|| format!("could not run {}", settings.tool_binary))?;
  println!("{version}");
  Ok(())
}

fn cmd_hash(
  file: Option<String>,
  directory: Option<String>,
  dependencies: Vec<String>,
) -> Result<()> {
  let query = FilesQuery {
    file,
    directory,
    file_dependencies: dependencies,
  };
  let digest = files_hash(&query)?;
  println!("{digest}");
  Ok(())
}
