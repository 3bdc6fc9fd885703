//! pvault CLI
//!
//! Command-line interface for pvault - a local catalog of AI-generation prompts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pvault_core::{
    CatalogError, Category, Config, RecordStore, SqliteStore, StorageError, UnavailableStore,
    Vault, VaultError,
};

mod commands;
mod editor;
mod logging;
mod output;

use commands::record::{ClearFields, RecordFields};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pvault")]
#[command(about = "pvault - Local catalog for AI-generation prompts")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a new prompt
    #[command(alias = "create")]
    Add {
        #[command(flatten)]
        fields: RecordFields,
    },
    /// List prompts, newest first
    #[command(alias = "ls")]
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<Category>,
        /// Case-insensitive match on title, prompt and tags
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show prompt details
    Show {
        /// Prompt ID (full or prefix)
        id: String,
    },
    /// Edit a prompt
    Edit {
        /// Prompt ID (full or prefix)
        id: String,
        #[command(flatten)]
        fields: RecordFields,
        #[command(flatten)]
        clear: ClearFields,
    },
    /// Open a prompt's media in the default viewer
    Open {
        /// Prompt ID (full or prefix)
        id: String,
        /// Open the input image instead of the output
        #[arg(long)]
        input: bool,
    },
    /// Delete a prompt
    #[command(alias = "rm")]
    Delete {
        /// Prompt ID (full or prefix)
        id: String,
    },
    /// Export all prompts to a JSON backup
    Export {
        /// Destination file, or '-' for stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import prompts from a JSON backup
    Import {
        /// Backup file
        path: PathBuf,
    },
    /// Delete all prompts
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show storage usage and prompt counts
    Status,
    /// Ask the refinement service to elaborate a prompt
    Refine {
        /// Prompt ID (full or prefix)
        #[arg(required_unless_present = "text", conflicts_with = "text")]
        id: Option<String>,
        /// Refine this text instead of a stored prompt
        #[arg(long)]
        text: Option<String>,
        /// Save the refined text back to the prompt
        #[arg(long, requires = "id", conflicts_with = "text")]
        apply: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, storage_quota_bytes, log_file, refine.*)
        key: String,
        /// Configuration value ('none' clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let result = run(cli).await;

    if let Err(ref e) = result {
        if let Some(hint) = recovery_hint(e) {
            eprintln!("Hint: {}", hint);
        }
    }

    result
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config =
        Config::load_with_cli_override(cli.config.as_ref()).context("Failed to load configuration")?;
    logging::init(&config, cli.verbose);

    // Refining free text needs no storage
    if let Commands::Refine {
        id: None,
        text: Some(text),
        ..
    } = &cli.command
    {
        return commands::refine::text(&config.refine, text.clone(), &output).await;
    }

    let store = open_store(&config, &output).await;
    let mut vault = Vault::load(store).await.context("Failed to load prompts")?;

    match cli.command {
        Commands::Add { fields } => commands::record::add(&mut vault, fields, &output).await,
        Commands::List { category, search } => {
            commands::record::list(&vault, category, search, &output)
        }
        Commands::Show { id } => commands::record::show(&vault, id, &output),
        Commands::Edit { id, fields, clear } => {
            commands::record::edit(&mut vault, id, fields, clear, &output).await
        }
        Commands::Open { id, input } => commands::record::open_media(&vault, id, input, &output),
        Commands::Delete { id } => commands::record::delete(&mut vault, id, &output).await,
        Commands::Export { output: path } => commands::backup::export(&vault, path, &output).await,
        Commands::Import { path } => commands::backup::import(&mut vault, path, &output).await,
        Commands::Reset { yes } => commands::backup::reset(&mut vault, yes, &output).await,
        Commands::Status => commands::status::show(&vault, &config, &output).await,
        Commands::Refine { id, text, apply } => match id {
            Some(id) => {
                commands::refine::record(&mut vault, &config.refine, id, apply, &output).await
            }
            None => {
                commands::refine::text(&config.refine, text.unwrap_or_default(), &output).await
            }
        },
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Open the on-disk store, falling back to an unavailable stand-in
///
/// Reads then see an empty collection and writes fail with a clear error.
async fn open_store(config: &Config, output: &Output) -> Arc<dyn RecordStore> {
    match SqliteStore::open(config).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            output.warning(&format!("{}", e));
            if let Some(hint) = e.recovery_suggestion() {
                output.warning(hint);
            }
            output.warning("Continuing without storage; changes cannot be saved.");
            Arc::new(UnavailableStore::from_error(config.sqlite_path(), &e))
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Recovery suggestion for the first storage error in the chain
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<StorageError>() {
            return e.recovery_suggestion();
        }
        match cause.downcast_ref::<VaultError>() {
            Some(VaultError::Storage(e))
            | Some(VaultError::Catalog(CatalogError::Storage(e))) => e.recovery_suggestion(),
            _ => None,
        }
    })
}
