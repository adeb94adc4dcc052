//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wdm_config::ColorChoice;

/// wdm - NVIDIA web driver manager for macOS
#[derive(Parser)]
#[command(name = "wdm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Repackage NVIDIA web driver installers and watch for driver updates")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Write debug logs to the wdm logs directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Repackage a driver installer without its OS version check and open it
    #[command(alias = "i")]
    Install {
        /// Path to the vendor installer package
        package: PathBuf,
    },

    /// Download the driver for this OS build and install it
    InstallUpdate,

    /// Check for a driver update now
    Check,

    /// Keep checking for updates while automatic checks are enabled
    Watch,

    /// List driver releases from the update feed
    Updates {
        /// Show releases for every OS build, not just this one
        #[arg(long)]
        all: bool,
    },

    /// Show the running OS, installed driver and preferences
    Status,

    /// Stop notifying about a driver version ("Don't Show Again")
    Suppress {
        /// Version to silence (default: the latest release for this OS build)
        version: Option<String>,
    },

    /// Notify about every driver version again
    Unsuppress,

    /// Show or change preferences
    Prefs {
        /// Enable or disable automatic update checks
        #[arg(long, value_name = "on|off", value_parser = clap::builder::BoolishValueParser::new())]
        automatic_checks: Option<bool>,
    },
}
