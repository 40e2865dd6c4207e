//! Command implementations.

use crate::Cli;
use crate::config::Config;
use crate::serial::{SerialOptions, select_serial_port};
use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tvone::{LogDiagnostics, NativeLink, Processor};

/// Connection-related options shared by every unit-facing command.
pub(crate) struct ConnectOptions {
    /// Explicit port from CLI/env, if any.
    pub port: Option<String>,
    /// Explicit baud rate from CLI/env, if any.
    pub baud: Option<u32>,
    /// Never prompt; fail instead.
    pub non_interactive: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
}

/// Open the unit: resolve the port, wire Ctrl-C to the cancellation token,
/// and route diagnostics through the logger.
fn connect(options: &ConnectOptions, config: &Config) -> Result<Processor<NativeLink>> {
    let port_name = select_serial_port(
        &SerialOptions {
            port: options.port.clone(),
            non_interactive: options.non_interactive,
        },
        config,
    )?;
    let baud = options
        .baud
        .or(config.connection.baud)
        .unwrap_or(tvone::link::DEFAULT_BAUD);
    debug!("connecting to {port_name} at {baud} baud");

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_token = Arc::clone(&cancel);
    if let Err(err) = ctrlc::set_handler(move || handler_token.store(true, Ordering::SeqCst)) {
        warn!("could not install Ctrl-C handler: {err}");
    }

    let processor = Processor::open(&port_name, baud)
        .with_context(|| format!("opening {port_name}"))?
        .with_diagnostics(Box::new(LogDiagnostics))
        .with_cancel_token(cancel);
    Ok(processor)
}

/// List available serial ports.
pub(crate) fn ports() -> Result<()> {
    let ports = NativeLink::list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }
    for info in ports {
        match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                println!(
                    "{}  USB {:04x}:{:04x} {}",
                    info.port_name,
                    usb.vid,
                    usb.pid,
                    usb.product.as_deref().unwrap_or("")
                );
            },
            _ => println!("{}", info.port_name),
        }
    }
    Ok(())
}

/// Write one parameter and report the verified result.
pub(crate) fn set(
    options: &ConnectOptions,
    config: &Config,
    channel: u8,
    window: u8,
    function: u16,
    value: i32,
) -> Result<()> {
    let mut unit = connect(options, config)?;
    unit.set(channel, window, function, value)?;
    println!(
        "{} ch {channel} win {window:#04x} func {function:#06x} = {value}",
        style("set").green()
    );
    Ok(())
}

/// Read one parameter.
pub(crate) fn get(
    options: &ConnectOptions,
    config: &Config,
    channel: u8,
    window: u8,
    function: u16,
) -> Result<()> {
    let mut unit = connect(options, config)?;
    let value = unit.get(channel, window, function)?;
    println!("{value}");
    Ok(())
}

/// Query and print the unit's identity.
pub(crate) fn identity(options: &ConnectOptions, config: &Config) -> Result<()> {
    let mut unit = connect(options, config)?;
    let identity = unit.identity()?;
    println!("version:      {}", identity.version);
    println!("product type: {}", identity.product_type);
    println!("board type:   {}", identity.board_type);
    Ok(())
}

/// Toggle content protection.
pub(crate) fn hdcp(options: &ConnectOptions, config: &Config, enabled: bool) -> Result<()> {
    let mut unit = connect(options, config)?;
    unit.set_hdcp_enabled(enabled)?;
    println!(
        "{} HDCP {}",
        style("ok").green(),
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Install the custom resolution tables.
pub(crate) fn install_resolutions(options: &ConnectOptions, config: &Config) -> Result<()> {
    let mut unit = connect(options, config)?;
    unit.install_custom_resolutions()?;
    println!("{} custom resolution tables installed", style("ok").green());
    Ok(())
}

/// Upload an EDID binary into a slot.
pub(crate) fn upload_edid(
    options: &ConnectOptions,
    config: &Config,
    file: &Path,
    slot: u8,
) -> Result<()> {
    let data =
        std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let mut unit = connect(options, config)?;
    let bar = progress_bar(options.quiet);
    unit.upload_edid(&data, slot, |sent, total| {
        bar.set_length(total as u64);
        bar.set_position(sent as u64);
    })?;
    bar.finish_and_clear();
    println!(
        "{} EDID ({} bytes) uploaded to slot {slot}",
        style("ok").green(),
        data.len()
    );
    Ok(())
}

/// Upload an image binary into a slot.
pub(crate) fn upload_image(
    options: &ConnectOptions,
    config: &Config,
    file: &Path,
    slot: u8,
) -> Result<()> {
    let data =
        std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let mut unit = connect(options, config)?;
    let bar = progress_bar(options.quiet);
    unit.upload_image(&data, slot, |sent, total| {
        bar.set_length(total as u64);
        bar.set_position(sent as u64);
    })?;
    bar.finish_and_clear();
    println!(
        "{} image ({} bytes) uploaded to slot {slot}",
        style("ok").green(),
        data.len()
    );
    Ok(())
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::no_length();
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} chunks")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Generate shell completions to stdout.
pub(crate) fn completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
