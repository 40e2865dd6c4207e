//! tvone CLI - command-line control of TV One video processors.
//!
//! ## Features
//!
//! - Write and read unit parameters with echo verification
//! - Install the custom multi-head resolution tables
//! - Toggle content protection (HDCP)
//! - Upload EDID data and stored images
//! - Interactive serial port selection
//! - Shell completion generation

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use env_logger::Env;
use std::path::PathBuf;

mod commands;
mod config;
mod serial;

use commands::ConnectOptions;
use config::Config;

/// tvone - RS232 control for TV One video processors.
///
/// Environment variables:
///   TVONE_PORT             - Default serial port
///   TVONE_BAUD             - Default baud rate (default: 57600)
///   TVONE_NON_INTERACTIVE  - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "tvone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Serial port to use (interactive selection if not specified).
    #[arg(short, long, global = true, env = "TVONE_PORT")]
    port: Option<String>,

    /// Baud rate (default: 57600, or the configured value).
    #[arg(short, long, global = true, env = "TVONE_BAUD")]
    baud: Option<u32>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, global = true, env = "TVONE_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports.
    Ports,

    /// Write a parameter and verify the unit's echo.
    Set {
        /// Channel to address.
        #[arg(value_parser = parse_u8_auto)]
        channel: u8,
        /// Window to address (e.g. 0, 0x41 for window A).
        #[arg(value_parser = parse_u8_auto)]
        window: u8,
        /// Function code (decimal or 0x-prefixed hex).
        #[arg(value_parser = parse_u16_auto)]
        function: u16,
        /// Value to set.
        value: i32,
    },

    /// Read a parameter.
    Get {
        /// Channel to address.
        #[arg(value_parser = parse_u8_auto)]
        channel: u8,
        /// Window to address.
        #[arg(value_parser = parse_u8_auto)]
        window: u8,
        /// Function code (decimal or 0x-prefixed hex).
        #[arg(value_parser = parse_u16_auto)]
        function: u16,
    },

    /// Query the unit's identity (version, product type, board type).
    Identity,

    /// Toggle content protection on the output and both sources.
    Hdcp {
        /// Desired state.
        state: Toggle,
    },

    /// Install the custom multi-head resolution tables.
    InstallResolutions,

    /// Upload display-identification data into a slot.
    UploadEdid {
        /// EDID binary to upload (at most 256 bytes).
        file: PathBuf,
        /// Target slot.
        #[arg(short, long)]
        slot: u8,
    },

    /// Upload a stored image into a slot.
    UploadImage {
        /// Image binary to upload.
        file: PathBuf,
        /// Target slot.
        #[arg(short, long)]
        slot: u8,
    },

    /// Generate shell completions to stdout.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// On/off argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Toggle {
    /// Enable.
    On,
    /// Disable.
    Off,
}

fn parse_u8_auto(text: &str) -> Result<u8, String> {
    parse_auto(text, |t| u8::from_str_radix(t, 16), str::parse)
}

fn parse_u16_auto(text: &str) -> Result<u16, String> {
    parse_auto(text, |t| u16::from_str_radix(t, 16), str::parse)
}

fn parse_auto<T>(
    text: &str,
    from_hex: impl Fn(&str) -> Result<T, std::num::ParseIntError>,
    from_dec: impl Fn(&str) -> Result<T, std::num::ParseIntError>,
) -> Result<T, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => from_hex(hex),
        None => from_dec(text),
    };
    parsed.map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    if let Err(err) = run(cli) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    let options = ConnectOptions {
        port: cli.port.clone(),
        baud: cli.baud,
        non_interactive: cli.non_interactive,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Ports => commands::ports(),
        Commands::Set {
            channel,
            window,
            function,
            value,
        } => commands::set(&options, &config, channel, window, function, value),
        Commands::Get {
            channel,
            window,
            function,
        } => commands::get(&options, &config, channel, window, function),
        Commands::Identity => commands::identity(&options, &config),
        Commands::Hdcp { state } => {
            commands::hdcp(&options, &config, matches!(state, Toggle::On))
        },
        Commands::InstallResolutions => commands::install_resolutions(&options, &config),
        Commands::UploadEdid { file, slot } => {
            commands::upload_edid(&options, &config, &file, slot)
        },
        Commands::UploadImage { file, slot } => {
            commands::upload_image(&options, &config, &file, slot)
        },
        Commands::Completions { shell } => {
            commands::completions(shell);
            Ok(())
        },
    }
}
