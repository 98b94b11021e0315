use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use focustrack_core::auth::{Anonymous, AuthProvider, LocalAccounts};
use focustrack_core::notify::{Alert, ChannelNotifier, DisabledNotifier, Notifier};
use focustrack_core::storage::{Config, Database, HttpMirror, SessionSinks};
use focustrack_core::{
    Category, Command, Event, Finalizer, FocusMachine, Input, ResumeChoice, SessionDriver,
    TimerConfig, Visibility,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const HELP: &str = "commands: start [minutes] [category], pause, resume, stop, reset, \
                    bg, fg, yes, no, status, quit";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run an interactive session, reading commands from stdin
    Run {
        /// Session length in minutes (defaults to config)
        #[arg(long)]
        minutes: Option<u32>,
        /// study, coding, project or reading (defaults to config)
        #[arg(long)]
        category: Option<Category>,
    },
}

/// One line of stdout.
#[derive(Serialize)]
#[serde(untagged)]
enum Output<'a> {
    Event(&'a Event),
    Notification { r#type: &'static str, alert: &'a Alert },
}

enum Line {
    Input(Input),
    Quit,
    Help,
    Unknown(String),
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run { minutes, category } => session(minutes, category).await,
    }
}

async fn session(
    minutes: Option<u32>,
    category: Option<Category>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut defaults = config.timer_config();
    if let Some(minutes) = minutes {
        defaults.duration_min = minutes;
    }
    if category.is_some() {
        defaults.category = category;
    }

    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();
    let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
        Arc::new(ChannelNotifier::new(alert_tx))
    } else {
        // The printer stops once both senders are gone.
        drop(alert_tx);
        Arc::new(DisabledNotifier)
    };

    let auth: Arc<dyn AuthProvider> = match LocalAccounts::open_default() {
        Ok(accounts) => Arc::new(accounts),
        Err(e) => {
            warn!(error = %e, "account book unavailable; sessions stay local");
            Arc::new(Anonymous)
        }
    };
    let mut sinks = SessionSinks::new(Box::new(Database::open()?), auth);
    match HttpMirror::from_config(&config.remote) {
        Ok(Some(mirror)) => sinks = sinks.with_remote(Arc::new(mirror)),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "remote mirror disabled"),
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let driver = SessionDriver::new(
        FocusMachine::new(defaults),
        Finalizer::new(sinks, Arc::clone(&notifier)),
        Arc::clone(&notifier),
        event_tx,
    )
    .with_reminders(config.notifications.halfway_reminder)
    .with_mirror_timeout(Duration::from_secs(config.remote.timeout_secs));

    let (input_tx, input_rx) = mpsc::channel(16);
    let driver_task = tokio::spawn(driver.run(input_rx));

    let printer = tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                Some(event) = event_rx.recv() => serde_json::to_string(&Output::Event(&event)),
                Some(alert) = alert_rx.recv() => serde_json::to_string(&Output::Notification {
                    r#type: "Notification",
                    alert: &alert,
                }),
                else => break,
            };
            match line {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to encode output"),
            }
        }
    });

    eprintln!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line, defaults) {
            Line::Input(input) => {
                if input_tx.send(input).await.is_err() {
                    break;
                }
            }
            Line::Quit => break,
            Line::Help => eprintln!("{HELP}"),
            Line::Unknown(word) if word.is_empty() => {}
            Line::Unknown(word) => eprintln!("unknown command: {word} ({HELP})"),
        }
    }

    // Leaving mid-run keeps what was focused so far.
    let _ = input_tx.send(Command::Stop.into()).await;
    drop(input_tx);
    let driver = driver_task.await?;
    debug!(phase = ?driver.machine().phase(), "session loop finished");
    drop(driver);

    notifier.cancel_all_pending();
    drop(notifier);
    printer.await?;
    Ok(())
}

fn parse_line(line: &str, defaults: TimerConfig) -> Line {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Line::Unknown(String::new());
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "start" => {
            let mut config = defaults;
            for arg in words {
                if let Ok(minutes) = arg.parse::<u32>() {
                    config.duration_min = minutes;
                } else if let Ok(category) = arg.parse::<Category>() {
                    config.category = Some(category);
                } else {
                    return Line::Unknown(line.trim().to_string());
                }
            }
            Command::Start(config).into()
        }
        "pause" => Command::Pause.into(),
        "resume" => Command::Resume.into(),
        "stop" => Command::Stop.into(),
        "reset" => Command::Reset.into(),
        "status" => Command::Snapshot.into(),
        "bg" | "background" => Input::Visibility(Visibility::Background),
        "inactive" => Input::Visibility(Visibility::Inactive),
        "fg" | "active" => Input::Visibility(Visibility::Active),
        "yes" | "y" => Input::Choice(ResumeChoice::Resume),
        "no" | "n" => Input::Choice(ResumeChoice::StayPaused),
        "quit" | "exit" | "q" => return Line::Quit,
        "help" | "?" => return Line::Help,
        _ => return Line::Unknown(word.to_string()),
    };
    Line::Input(input)
}
