pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::app_config::DEFAULT_MANIFEST;

/// Keep users' authorized_keys files in line with a declared set of keys.
#[derive(Parser, Debug)]
#[command(name = "authkeys", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the manifest of key declarations
    #[arg(long, global = true, env = "AUTHKEYS_MANIFEST", default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile every declaration in the manifest
    Apply {
        /// Report what would change without touching any file
        #[arg(long)]
        dry_run: bool,
    },

    /// Report declarations that are out of sync; fails if any are
    Check,

    /// Show the keys currently in a user's authorized_keys file
    List {
        /// Account whose key file to read
        user: String,
    },

    /// Show the history of key file changes
    Log {
        /// Filter by account
        #[arg(long)]
        user: Option<String>,
        /// Show last N entries
        #[arg(long)]
        last: Option<usize>,
    },
}
