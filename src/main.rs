//! peripherald - detachable keyboard control daemon for tablets
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Read loop (main thread)                     │
//! │    control channel → dispatch → coordinator  │
//! ├──────────────────────────────────────────────┤
//! │  kbd-signal      termination signals         │
//! │  kbd-monitor     presence debounce           │
//! │  kbd-watchdog    monitor liveness            │
//! │  kbd-preference  angle-detection toggle      │
//! │  kbd-sensor      body accelerometer          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every state change funnels through the keyboard state coordinator,
//! which owns the outbound half of the control channel.

mod config;
mod constants;
mod device;
mod dispatch;
mod error;
mod event_loop;
mod protocol;
mod sensor;
mod signal;
mod state;
mod tasks;
#[cfg(test)]
mod testing;

use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use device::{ChannelOpener, DeviceOpener, NodePresence, PresenceCheck, ReconnectSupervisor};
use error::DaemonError;
use event_loop::LoopExit;
use sensor::Accelerometer;
use signal::SignalWatch;
use state::Daemon;

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    help: bool,
    version: bool,
    check: bool,
    config: Option<PathBuf>,
    /// Some(None) = write to the default location
    init_config: Option<Option<PathBuf>>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, DaemonError> {
    let mut parsed = Args::default();
    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "-V" | "--version" => parsed.version = true,
            "--check" => parsed.check = true,
            "--init-config" => parsed.init_config = Some(None),
            _ => {
                if let Some(path) = arg.strip_prefix("--config=") {
                    if path.is_empty() {
                        return Err(DaemonError::Usage("--config requires a path".into()));
                    }
                    parsed.config = Some(PathBuf::from(path));
                } else if let Some(path) = arg.strip_prefix("--init-config=") {
                    parsed.init_config = Some(Some(PathBuf::from(path)));
                } else {
                    return Err(DaemonError::Usage(format!("Unknown argument: {}", arg)));
                }
            }
        }
    }
    Ok(parsed)
}

fn print_help() {
    println!(
        r#"peripherald {} - detachable keyboard control daemon

USAGE:
    peripherald [OPTIONS]

OPTIONS:
    -h, --help                Print this help message
    -V, --version             Print version information
    --config=PATH             Load configuration from PATH
    --init-config[=PATH]      Write a commented default config
                              (default: /etc/peripherald/config.toml)
    --check                   Load config, resolve devices, print a report

CONFIG FILE (first found):
    $PERIPHERALD_CONFIG
    ~/.config/peripherald/config.toml
    /etc/peripherald/config.toml

ENVIRONMENT:
    RUST_LOG                  Log filter (default: info)
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Print the resolved configuration and devices
fn print_check(cfg: &config::Config, explicit: Option<&std::path::Path>) {
    let source = explicit
        .map(|p| p.display().to_string())
        .or_else(|| config::Config::config_path().map(|p| p.display().to_string()))
        .unwrap_or_else(|| "(built-in defaults)".to_string());
    let node = device::find_keyboard_input_path(&cfg.device);
    let opener = DeviceOpener::new(&cfg.device.control_path);
    let accel = Accelerometer::locate(&cfg.angle);

    println!("Config:          {}", source);
    println!(
        "Control device:  {} ({})",
        cfg.device.control_path,
        if opener.writable() { "writable" } else { "not writable" }
    );
    println!(
        "Keyboard node:   {} [{}]{}",
        node.path.display(),
        node.name.as_deref().unwrap_or("fallback"),
        if NodePresence::new(&node.path).is_present() { "" } else { " (absent)" }
    );
    println!(
        "Accelerometer:   {}",
        accel
            .map(|a| a.dir().display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("Preference file: {}", cfg.angle.preference_path);
}

fn run(args: Args) -> Result<(), DaemonError> {
    let cfg = config::Config::load(args.config.as_deref());

    if args.check {
        print_check(&cfg, args.config.as_deref());
        return Ok(());
    }

    let start = Instant::now();
    info!(
        "peripherald {} (frame schema v{}) starting at {}",
        env!("CARGO_PKG_VERSION"),
        protocol::SCHEMA_VERSION,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let node = device::find_keyboard_input_path(&cfg.device);
    // Before any thread exists so the mask is inherited everywhere
    signal::block_termination_signals()?;
    let signals = SignalWatch::new()?;

    let opener = Arc::new(DeviceOpener::new(&cfg.device.control_path));
    let channel = opener.open().map_err(|source| DaemonError::ChannelOpen {
        path: cfg.device.control_path.clone(),
        source,
    })?;
    info!("Opened control device {}", opener.describe());

    let reconnect_cfg = cfg.reconnect.clone();
    let accel = Accelerometer::locate(&cfg.angle);
    let daemon = Daemon::new(
        cfg,
        Box::new(NodePresence::new(&node.path)),
        opener.clone(),
    );
    let mut reader = channel.reader;

    tasks::preference::reload(&daemon);
    {
        let present = daemon.keyboard_present();
        info!(
            "Keyboard {} at startup",
            if present { "connected" } else { "not connected" }
        );
        let mut kb = daemon.keyboard();
        kb.install_writer(channel.writer);
        if present {
            kb.set_enabled(true, true);
        }
    }

    let mut supervisor = ReconnectSupervisor::new(opener, reconnect_cfg);
    let exit = std::thread::scope(|scope| -> Result<LoopExit, DaemonError> {
        if let Err(e) = tasks::spawn_all(scope, &daemon, signals, accel) {
            daemon.request_shutdown();
            return Err(e);
        }

        let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);
        info!("Listening for keyboard controller events");

        let exit = event_loop::run(&daemon, &mut reader, &mut supervisor);
        daemon.request_shutdown();
        Ok(exit)
    });

    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
    drop(reader);
    let elapsed = start.elapsed().as_secs();
    info!(
        "peripherald stopped after {}h {:02}m {:02}s",
        elapsed / 3600,
        (elapsed / 60) % 60,
        elapsed % 60
    );

    match exit? {
        LoopExit::Shutdown => Ok(()),
        LoopExit::ChannelLost => Err(DaemonError::ChannelLost(supervisor.failures())),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("peripherald: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if args.help {
        print_help();
        return;
    }
    if args.version {
        println!("peripherald {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Some(path) = args.init_config.as_ref() {
        match config::Config::write_default_config(path.as_deref()) {
            Ok(path) => println!("Config file generated: {}", path.display()),
            Err(e) => {
                eprintln!("Failed to generate config: {:#}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = run(args) {
        match &e {
            DaemonError::Other(inner) => error!("{:#}", inner),
            DaemonError::ChannelLost(_) => warn!("{}", e),
            _ => error!("{}", e),
        }
        std::process::exit(e.exit_code());
    }
}
