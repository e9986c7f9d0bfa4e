use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceid::recognize::{self, Response};
use faceid::storage::{FileStore, GalleryStore};
use faceid::{config, Encoding};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "faceid")]
#[command(
    version,
    about = "Face recognition against a gallery of enrolled encodings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a face encoding (JSON array of numbers)
    Enroll {
        /// Identity to enroll the face under
        #[arg(short, long)]
        id: String,
        /// File holding the encoding (defaults to stdin)
        #[arg(short = 'f', long)]
        input: Option<PathBuf>,
    },
    /// Recognize a face from embedding model output (JSON array of encodings)
    Recognize {
        /// File holding the encodings (defaults to stdin)
        #[arg(short = 'f', long)]
        input: Option<PathBuf>,
        /// Override the configured tolerance
        #[arg(short, long)]
        tolerance: Option<f64>,
    },
    /// List enrolled identities
    List,
    /// Remove the enrolled face for an identity
    Remove {
        #[arg(short, long)]
        id: String,
    },
    /// Remove all enrolled faces
    Purge,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;
    let store = FileStore::new(cfg.store_dir());

    match cli.command {
        Commands::Enroll { id, input } => enroll(&cfg, &store, &id, input.as_deref()),
        Commands::Recognize { input, tolerance } => {
            recognize_face(&cfg, &store, input.as_deref(), tolerance)
        }
        Commands::List => list(&store),
        Commands::Remove { id } => remove(&store, &id),
        Commands::Purge => purge(&store),
        Commands::Config => open_config(),
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("reading stdin")?;
            Ok(raw)
        }
    }
}

fn enroll(cfg: &config::Config, store: &FileStore, id: &str, input: Option<&Path>) -> Result<()> {
    info!("Enrolling identity: {}", id);

    let raw = read_input(input)?;
    let encoding = Encoding::from_json(&raw).context("Failed to parse face encoding")?;

    if encoding.dimension() != cfg.dimension {
        anyhow::bail!(
            "Encoding has dimension {}, expected {}",
            encoding.dimension(),
            cfg.dimension
        );
    }

    store
        .enroll(id, &encoding)
        .context("Failed to save face record")?;

    info!("✓ Face enrolled successfully for: {}", id);
    Ok(())
}

fn recognize_face(
    cfg: &config::Config,
    store: &FileStore,
    input: Option<&Path>,
    tolerance: Option<f64>,
) -> Result<()> {
    let raw = read_input(input)?;
    let encodings = recognize::parse_oracle_output(&raw)?;

    let mut matcher = cfg.matcher();
    if let Some(tolerance) = tolerance {
        matcher = matcher.with_tolerance(tolerance);
    }

    let response = Response::from(recognize::recognize(store, &matcher, &encodings));
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.is_error() {
        anyhow::bail!("{}", response.message);
    }
    Ok(())
}

fn list(store: &FileStore) -> Result<()> {
    let faces = store.load().context("Failed to load face records")?;

    if faces.is_empty() {
        info!("No enrolled faces in {}", store.root().display());
        return Ok(());
    }

    for face in faces {
        match Encoding::from_json(&face.encoding) {
            Ok(encoding) => println!("{}\t{}", face.identity, encoding.dimension()),
            Err(e) => println!("{}\tinvalid ({})", face.identity, e),
        }
    }
    Ok(())
}

fn remove(store: &FileStore, id: &str) -> Result<()> {
    if store.remove(id).context("Failed to remove face record")? {
        info!("✓ Removed enrolled face for: {}", id);
    } else {
        warn!("No enrolled face for: {}", id);
    }
    Ok(())
}

fn purge(store: &FileStore) -> Result<()> {
    info!("Purging enrolled faces in {}", store.root().display());

    store.purge().context("Failed to purge face records")?;

    info!("✓ All faces purged");
    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
