//! Interactive serial port selection.
//!
//! Resolution order: explicit `--port`/`TVONE_PORT`, then the config file,
//! then auto-selection (a single available port), then an interactive
//! picker. Non-interactive mode never prompts.

use crate::config::Config;
use anyhow::{Result, bail};
use dialoguer::{Select, theme::ColorfulTheme};
use log::debug;
use std::io::IsTerminal;
use tvone::NativeLink;

/// Options for serial port selection.
pub(crate) struct SerialOptions {
    /// Explicit port specified via CLI.
    pub port: Option<String>,
    /// Non-interactive mode (fail if multiple ports).
    pub non_interactive: bool,
}

/// Select a serial port interactively or automatically.
pub(crate) fn select_serial_port(options: &SerialOptions, config: &Config) -> Result<String> {
    if let Some(port_name) = &options.port {
        return Ok(port_name.clone());
    }

    if let Some(port_name) = &config.connection.serial {
        debug!("Using port from config: {port_name}");
        return Ok(port_name.clone());
    }

    let ports = NativeLink::list_ports()?;
    if ports.is_empty() {
        bail!("no serial ports found; specify one with --port");
    }
    if ports.len() == 1 {
        debug!("Auto-selected only port: {}", ports[0].port_name);
        return Ok(ports[0].port_name.clone());
    }

    if options.non_interactive || !std::io::stderr().is_terminal() {
        bail!("multiple serial ports found; specify one with --port");
    }

    let names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();
    let picked = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select serial port")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(names[picked].clone())
}
