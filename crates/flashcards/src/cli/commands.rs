//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

impl ConfigCommand {
    /// Whether the command reads the already-loaded configuration.
    ///
    /// `path` and `validate` must work even when the default file is broken.
    #[must_use]
    pub fn uses_loaded_config(&self) -> bool {
        matches!(self, Self::Show { .. })
    }

    /// The file `validate` should check: `--file`, then the global
    /// `--config`, then the default location.
    #[must_use]
    pub fn validate_target(file: Option<PathBuf>, global: Option<PathBuf>) -> PathBuf {
        file.or(global)
            .unwrap_or_else(crate::Config::default_config_path)
    }
}

impl ServeCommand {
    /// Apply command-line overrides to a loaded configuration.
    pub fn apply_to(&self, config: &mut crate::Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
