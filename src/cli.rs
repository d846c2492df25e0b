//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for persona-sync.

use clap::{Parser, Subcommand};

/// persona-sync - Persona role bundles for user accounts
///
/// Reads a persona catalog and a user store, computes each user's roles
/// from the personas they hold, and re-saves every holder of a persona in
/// chunks after its role set changes.
#[derive(Parser, Debug)]
#[command(name = "persona-sync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PERSONA_SYNC_CONFIG")]
    pub config: Option<String>,

    /// User store file (overrides storage.users_file)
    #[arg(long, global = true)]
    pub users_file: Option<String>,

    /// Persona catalog file (overrides storage.personas_file)
    #[arg(long, global = true)]
    pub personas_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Re-save every user holding a persona so their roles are recomputed
    Resync {
        /// Persona id
        persona: String,

        /// Users saved per chunk operation
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Stop after the first failed chunk
        #[arg(long)]
        halt_on_failure: bool,

        /// Print the chunk plan without saving anything
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the ids of users holding a persona
    Members {
        /// Persona id
        persona: String,
    },

    /// Show the roles a user receives from their personas
    Roles {
        /// User id
        uid: u64,
    },

    /// Read the persona catalog
    Persona {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PersonaSubcommand {
    /// List personas, ordered by label
    List,

    /// Show one persona and its roles
    Show {
        /// Persona id
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}
