//! Command-line front end for the editor core.
//!
//! # Responsibility
//! - Run the conversion passes over files or stdin for scripting and checks.
//! - Move markup in and out of the SQLite store.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ssml_core::store::{MarkupSink, MarkupSource, SqliteMarkupStore};
use ssml_core::{deserialize, export_ssml, serialize, EditorConfig};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ssml", version, about = "Speech markup editor tools")]
struct Args {
    /// JSON editor config; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when omitted.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the speech markup for editor markup.
    Export {
        /// Markup file; reads stdin when omitted.
        input: Option<PathBuf>,
    },
    /// Re-serialize editor markup into its canonical form.
    Normalize { input: Option<PathBuf> },
    /// Print the parsed document tree as JSON.
    Inspect { input: Option<PathBuf> },
    /// Store editor markup under the configured key.
    Save {
        #[arg(long)]
        db: PathBuf,
        input: Option<PathBuf>,
    },
    /// Print the markup stored under the configured key.
    Load {
        #[arg(long)]
        db: PathBuf,
        /// Print speech markup instead of editor markup.
        #[arg(long)]
        ssml: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(log_dir) = &args.log_dir {
        let log_dir = log_dir.to_str().context("log dir is not valid UTF-8")?;
        ssml_core::init_logging(&args.log_level, log_dir).map_err(anyhow::Error::msg)?;
    }

    let config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match args.command {
        Command::Export { input } => {
            let document = deserialize(&read_input(input.as_deref())?)?;
            println!("{}", export_ssml(&document));
        }
        Command::Normalize { input } => {
            let document = deserialize(&read_input(input.as_deref())?)?;
            println!("{}", serialize(&document)?);
        }
        Command::Inspect { input } => {
            let document = deserialize(&read_input(input.as_deref())?)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Command::Save { db, input } => {
            let document = deserialize(&read_input(input.as_deref())?)?;
            let store = SqliteMarkupStore::open(&db)?;
            store.write_markup(&config.storage_key, &serialize(&document)?)?;
            println!("saved key={} db={}", config.storage_key, db.display());
        }
        Command::Load { db, ssml } => {
            let store = SqliteMarkupStore::open(&db)?;
            let Some(markup) = store.read_markup(&config.storage_key)? else {
                bail!("nothing stored under key `{}`", config.storage_key);
            };
            if ssml {
                println!("{}", export_ssml(&deserialize(&markup)?));
            } else {
                println!("{markup}");
            }
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}
