//! # geolive
//!
//! Terminal front end for the live-search dispatchers. Stdin lines stand in
//! for keystrokes in an input control; sink updates go to stdout.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use geolive_core::{DeliveryOrder, DispatchEvent, logging};
use geolive_dispatch::{Dispatcher, InputControl, WriterSink};
use geolive_settings::GeoliveSettings;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Debounced live-search over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "geolive", version, about = "Debounced live-search over WebSocket")]
struct Cli {
    /// Settings file (default `~/.geolive/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Server host.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Quiet window in milliseconds, for every channel.
    #[arg(long, global = true)]
    quiet_window_ms: Option<u64>,

    /// Delivery order of overlapping sessions: `latest-wins` or `receipt-order`.
    #[arg(long, global = true)]
    delivery: Option<DeliveryOrder>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured channels.
    Channels,
    /// Dispatch each stdin line as a new value of the channel's input.
    Watch {
        /// Channel name, e.g. `countries`.
        channel: String,
    },
    /// Dispatch one value immediately and print the replies.
    Send {
        /// Channel name.
        channel: String,
        /// Value to send.
        value: String,
    },
}

impl Cli {
    /// Load settings, then apply command-line overrides on top.
    fn settings(&self) -> Result<GeoliveSettings> {
        self.settings_with(|name| std::env::var(name).ok())
    }

    fn settings_with<F>(&self, lookup: F) -> Result<GeoliveSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(geolive_settings::settings_path);
        let mut settings = geolive_settings::load_settings_with(&path, lookup)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply_overrides(&mut settings);
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }

    fn apply_overrides(&self, settings: &mut GeoliveSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ms) = self.quiet_window_ms {
            settings.dispatch.quiet_window_ms = ms;
            for channel in settings.channels.values_mut() {
                channel.quiet_window_ms = None;
            }
        }
        if let Some(delivery) = self.delivery {
            settings.dispatch.delivery = delivery;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = logging::with_startup_logging(|| cli.settings())?;
    logging::init_subscriber(&settings.logging.level);

    match &cli.command {
        Command::Channels => {
            print!("{}", channel_table(&settings)?);
            Ok(())
        }
        Command::Watch { channel } => watch(&settings, channel).await,
        Command::Send { channel, value } => send(&settings, channel, value).await,
    }
}

fn channel_table(settings: &GeoliveSettings) -> Result<String> {
    let mut out = String::new();
    for name in settings.channels.keys() {
        let channel = settings.channel(name)?;
        let endpoint = settings.endpoint_for(name)?;
        let window = settings.quiet_window_for(name)?;
        out.push_str(&format!(
            "{name:<12} {endpoint:<36} #{sink:<20} {window}ms\n",
            endpoint = endpoint.to_string(),
            sink = channel.sink,
            window = window.as_millis(),
        ));
    }
    Ok(out)
}

fn stdout_dispatcher(
    settings: &GeoliveSettings,
    channel: &str,
    control: InputControl,
) -> Result<Dispatcher> {
    let selector = settings.channel(channel)?.sink.clone();
    Dispatcher::from_settings(
        settings,
        channel,
        Arc::new(control),
        Arc::new(WriterSink::stdout(selector)),
    )
    .with_context(|| format!("Failed to set up channel '{channel}'"))
}

async fn watch(settings: &GeoliveSettings, channel: &str) -> Result<()> {
    let control = InputControl::new();
    let dispatcher = stdout_dispatcher(settings, channel, control.clone())?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        control.set(line.trim_end());
                        let _ = dispatcher.notify_input_changed();
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, dropping pending input");
                let _ = dispatcher.cancel_pending();
                break;
            }
        }
    }

    dispatcher.wait_idle().await;
    let stats = serde_json::to_string(&dispatcher.stats()).context("Failed to encode stats")?;
    eprintln!("{stats}");
    Ok(())
}

async fn send(settings: &GeoliveSettings, channel: &str, value: &str) -> Result<()> {
    let mut settings = settings.clone();
    settings.dispatch.quiet_window_ms = 0;
    if let Some(config) = settings.channels.get_mut(channel) {
        config.quiet_window_ms = Some(0);
    }
    let dispatcher = stdout_dispatcher(&settings, channel, InputControl::new())?;
    let mut events = dispatcher.subscribe();

    let _ = dispatcher.notify_value(value);
    tokio::time::timeout(reply_budget(&settings), dispatcher.wait_idle())
        .await
        .context("Timed out waiting for the session to finish")?;

    while let Ok(event) = events.try_recv() {
        if let DispatchEvent::Failed { error, .. } = event {
            bail!("dispatch to '{channel}' failed: {error}");
        }
    }
    Ok(())
}

/// Upper bound for a single `send`: handshake plus the reply window, with slack.
fn reply_budget(settings: &GeoliveSettings) -> Duration {
    Duration::from_millis(
        settings
            .server
            .connect_timeout_ms
            .saturating_add(settings.dispatch.reply_timeout_ms)
            .saturating_add(1_000),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("geolive").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_watch_with_global_flags() {
        let cli = parse(&["watch", "countries", "--port", "9000", "--delivery", "receipt-order"]);
        assert!(matches!(&cli.command, Command::Watch { channel } if channel == "countries"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.delivery, Some(DeliveryOrder::ReceiptOrder));
    }

    #[test]
    fn rejects_unknown_delivery() {
        let result = Cli::try_parse_from(["geolive", "--delivery", "random", "channels"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_settings() {
        let cli = parse(&[
            "--host",
            "geo.local",
            "--quiet-window-ms",
            "250",
            "--log-level",
            "debug",
            "channels",
        ]);
        let mut settings = GeoliveSettings::default();
        cli.apply_overrides(&mut settings);

        assert_eq!(settings.server.host, "geo.local");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(
            settings.quiet_window_for("units").unwrap(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn settings_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"port": 8100}}}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let cli = parse(&["--settings", path, "--host", "10.0.0.2", "channels"]);
        let settings = cli.settings().unwrap();
        assert_eq!(settings.server.port, 8100);
        assert_eq!(settings.server.host, "10.0.0.2");
    }

    #[test]
    fn reply_budget_saturates_on_huge_timeouts() {
        let mut settings = GeoliveSettings::default();
        assert_eq!(reply_budget(&settings), Duration::from_millis(16_000));

        settings.server.connect_timeout_ms = u64::MAX;
        assert!(settings.validate().is_ok());
        assert_eq!(reply_budget(&settings), Duration::from_millis(u64::MAX));
    }

    #[derive(Clone, Default)]
    struct Buffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn ignored_env_override_is_reported_during_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let cli = parse(&["--settings", path.to_str().unwrap(), "channels"]);
        let lookup = |name: &str| (name == "GEOLIVE_PORT").then(|| "not-a-port".to_string());

        let buffer = Buffer::default();
        let sink = buffer.clone();
        let settings =
            logging::with_startup_logging_to(move || sink.clone(), || cli.settings_with(lookup))
                .unwrap();

        assert_eq!(settings.server.port, 8000);
        let out = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("invalid env var, ignoring"), "{out}");
        assert!(out.contains("GEOLIVE_PORT"), "{out}");
    }

    #[test]
    fn channel_table_lists_default_channels() {
        let table = channel_table(&GeoliveSettings::default()).unwrap();
        assert!(table.contains("ws://127.0.0.1:8000/countries"));
        assert!(table.contains("#currencies_stream"));
        assert!(table.contains("#dest_units_list"));
        assert_eq!(table.lines().count(), 3);
    }
}
