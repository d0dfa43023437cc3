use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use clap::Parser;
use log::{info, warn};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::core::alerts::channels::notification::DesktopNotifier;
use crate::core::alerts::channels::ChannelError;
use crate::core::alerts::engine::AlertEngine;
use crate::core::alerts::model::AlertChannelKind;
use crate::core::config::{ConfigManager, Settings};
use crate::core::coordinator::{Coordinator, CoordinatorHandle, LoopCommand};
use crate::core::feed::{FeedError, HttpFeedClient};
use crate::core::host::TerminalHost;
use crate::core::model::Feed;
use crate::core::preference::{FileKeyValueStore, SoundPreference};
use crate::core::toast::{ToastKind, ToastMessage};
use crate::core::watcher::{FeedWatcher, TickMode, TickOutcome};

const APP_NAME: &str = "admin-notifier";
const WINDOW_TITLE: &str = "Admin Panel";

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about = "Alerts the operator about new orders and reservations")]
struct Cli {
    /// Directory holding settings.json and preferences.json
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Back-office API base URL, e.g. http://localhost:8000/api/v1
    #[arg(long)]
    api_url: Option<String>,

    /// Poll both feeds once and exit
    #[arg(long)]
    once: bool,

    /// Play the test alarm and exit
    #[arg(long, conflicts_with = "once")]
    test_alarm: bool,

    /// The terminal stays in view; skip system notifications
    #[arg(long)]
    foreground: bool,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("no config directory found, pass --config-dir")]
    NoConfigDir,

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("polling the back office failed")]
    PollFailed,

    #[error("test alarm failed: {0}")]
    Alarm(#[from] ChannelError),
}

pub fn run() {
    init_logging();
    if let Err(e) = try_run(Cli::parse()) {
        eprintln!("{}: {}", APP_NAME, e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Also installs the log -> tracing bridge for the library's log records
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn try_run(cli: Cli) -> Result<(), AppError> {
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(AppError::NoConfigDir)?,
    };

    let manager = ConfigManager::new(config_dir.clone());
    let mut settings = manager.load();
    if !manager.path().exists() {
        // First run: leave an editable settings.json behind
        match manager.save(&settings) {
            Ok(()) => info!("Wrote default settings to {:?}", manager.path()),
            Err(e) => warn!("Could not write {:?}: {}", manager.path(), e),
        }
    }
    settings.apply_env();
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    info!("Using API at {}", settings.api_base_url);
    for kind in AlertChannelKind::all() {
        let state = if settings.alert_settings.is_enabled(*kind) { "on" } else { "off" };
        info!("{} [{}]: {}", kind.display_name(), state, kind.description());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;

    runtime.block_on(async move {
        let engine = build_engine(&settings, &config_dir, cli.foreground);
        if cli.test_alarm {
            play_test_alarm(&settings, engine).await
        } else if cli.once {
            poll_once(&settings, engine).await
        } else {
            watch(&settings, engine).await
        }
    })
}

fn build_engine(settings: &Settings, config_dir: &std::path::Path, foreground: bool) -> AlertEngine {
    let host = Arc::new(TerminalHost::new(WINDOW_TITLE));
    host.set_visible(foreground);
    let store = Arc::new(FileKeyValueStore::new(config_dir.join("preferences.json")));
    let engine = AlertEngine::new(
        settings.alert_settings.clone(),
        host,
        SoundPreference::new(store),
    )
    .with_notifier(Box::new(DesktopNotifier::new(APP_NAME)));

    #[cfg(feature = "audio")]
    let engine = engine.with_audio(Box::new(crate::core::alerts::channels::tone::RodioDevice::new()));
    #[cfg(not(feature = "audio"))]
    info!("Built without the audio feature, alarm tones are disabled");

    engine
}

async fn play_test_alarm(settings: &Settings, mut engine: AlertEngine) -> Result<(), AppError> {
    let result = engine.test_alarm();
    if result.is_ok() {
        // Let the audio thread finish the sequence before the process exits
        let tone = &settings.alert_settings.tone;
        let length = u64::from(tone.beeps) * (tone.beep_ms + tone.gap_ms);
        tokio::time::sleep(Duration::from_millis(length + 200)).await;
    }
    engine.teardown();
    result.map_err(AppError::from)
}

async fn poll_once(settings: &Settings, mut engine: AlertEngine) -> Result<(), AppError> {
    let client = HttpFeedClient::new(settings)?;
    let mut watcher = FeedWatcher::new(Arc::new(client));
    let outcome = watcher.tick(TickMode::Explicit, &mut engine).await;
    engine.teardown();

    match outcome {
        TickOutcome::Baseline {
            orders_mark,
            reservations_mark,
        } => {
            println!(
                "Latest order #{}, latest reservation #{}",
                orders_mark, reservations_mark
            );
            Ok(())
        }
        TickOutcome::Failed => Err(AppError::PollFailed),
        // A single poll is always the baseline
        TickOutcome::Alerted(_) | TickOutcome::Unchanged => Ok(()),
    }
}

async fn watch(settings: &Settings, engine: AlertEngine) -> Result<(), AppError> {
    let client = HttpFeedClient::new(settings)?;
    for feed in Feed::all() {
        info!("Polling {}", client.url_for(*feed));
    }
    let period = Duration::from_secs(settings.poll_interval_seconds);
    let handle = Coordinator::new(Arc::new(client), engine, period).spawn();

    println!("Commands: r = refresh, t = test alarm, m = sound on/off, q = quit");

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("No ctrl-c handler, stop with q: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let stdin = BufReader::new(tokio::io::stdin());
    operate(&handle, stdin, ctrl_c, |line| println!("{}", line)).await;

    handle.shutdown().await;
    Ok(())
}

/// Relay operator input to the loop and toasts back to the operator until
/// `stop` resolves or a quit command comes in. Toasts keep flowing after the
/// input ends, e.g. when running as a service with stdin closed.
async fn operate<R, S>(
    handle: &CoordinatorHandle,
    input: R,
    stop: S,
    mut emit: impl FnMut(String),
) where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut toasts = handle.toasts();
    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            changed = toasts.changed() => {
                if changed.is_err() {
                    break;
                }
                let toast = toasts.borrow_and_update().clone();
                if let Some(toast) = toast {
                    emit(format_toast(&toast, Local::now()));
                }
            }
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(Input::Command(command)) => handle.send(command).await,
                    Some(Input::Quit) => break,
                    None => emit(format!("Unknown command {:?}", line.trim())),
                },
                Ok(None) => {
                    info!("Input closed, commands disabled until restart");
                    input_open = false;
                }
                Err(e) => {
                    warn!("Reading input failed, commands disabled: {}", e);
                    input_open = false;
                }
            },
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(LoopCommand),
    Quit,
}

fn parse_command(line: &str) -> Option<Input> {
    match line.trim().to_lowercase().as_str() {
        "r" | "refresh" => Some(Input::Command(LoopCommand::Refresh)),
        "t" | "test" => Some(Input::Command(LoopCommand::TestAlarm)),
        "m" | "mute" => Some(Input::Command(LoopCommand::ToggleSound)),
        "q" | "quit" => Some(Input::Quit),
        _ => None,
    }
}

fn format_toast(toast: &ToastMessage, at: DateTime<Local>) -> String {
    let mark = match toast.kind {
        ToastKind::Success => '✔',
        ToastKind::Error => '✖',
    };
    format!("{} {} {}", at.format("%H:%M:%S"), mark, toast.text)
}
