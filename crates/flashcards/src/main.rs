//! `flashcardd` - server and CLI for flashcards
//!
//! This binary runs the flashcard HTTP API and offers a few commands for
//! inspecting the database and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use flashcards::cli::{Cli, Command, ConfigCommand, ServeCommand};
use flashcards::{init_logging, Config, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    if let Command::Config(config_cmd) = &cli.command {
        if !config_cmd.uses_loaded_config() {
            return handle_config_file(config_cmd, cli.config);
        }
    }

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, &serve_cmd).await,
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(ConfigCommand::Show { json }) => handle_config_show(&config, json),
        Command::Config(config_cmd) => handle_config_file(&config_cmd, cli.config),
    }
}

async fn handle_serve(mut config: Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    cmd.apply_to(&mut config);
    config
        .validate()
        .context("invalid server options")?;
    flashcards::api::serve(&config)
        .await
        .context("running HTTP server")?;
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let path = config.database_path();
    let stats = if path.exists() {
        let storage = Storage::open(&path)
            .with_context(|| format!("opening database at {}", path.display()))?;
        Some(storage.stats()?)
    } else {
        None
    };

    if json {
        let status = serde_json::json!({
            "database_path": path,
            "database_exists": stats.is_some(),
            "total_flashcards": stats.as_ref().map_or(0, |s| s.total_flashcards),
            "categories": stats.as_ref().map(|s| s.categories.clone()).unwrap_or_default(),
            "db_size_bytes": stats.as_ref().map_or(0, |s| s.db_size_bytes),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("flashcardd status");
        println!("-----------------");
        println!("Database:      {}", path.display());
        match stats {
            Some(stats) => {
                println!("Flashcards:    {}", stats.total_flashcards);
                println!("Categories:    {}", stats.categories.len());
                println!("Size (bytes):  {}", stats.db_size_bytes);
            }
            None => println!("               (not created yet)"),
        }
    }
    Ok(())
}

fn handle_config_show(config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Storage]");
    println!("  Database path:      {}", config.database_path().display());
    println!();
    println!("[Server]");
    println!("  Bind address:       {}", config.bind_address());
    println!("  CORS enabled:       {}", config.server.cors_enabled);
    println!();
    println!("[Pagination]");
    println!(
        "  Default per page:   {}",
        config.pagination.default_per_page
    );
    println!("  Max per page:       {}", config.pagination.max_per_page);
    Ok(())
}

/// `config path` and `config validate`, which must not depend on the default
/// file loading cleanly.
fn handle_config_file(cmd: &ConfigCommand, global: Option<PathBuf>) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = ConfigCommand::validate_target(file.clone(), global);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            println!("Configuration is valid.");
        }
        ConfigCommand::Show { .. } => {
            anyhow::bail!("`config show` needs the loaded configuration");
        }
    }
    Ok(())
}
