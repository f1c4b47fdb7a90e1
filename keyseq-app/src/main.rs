//! keyseq - Key sequence watcher
//!
//! Loads named key sequences and reports progress as they are typed in the terminal.

use std::fs::{self, File};
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use crossterm::{
    event::{Event, KeyCode, KeyEvent, KeyModifiers},
    queue,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use keyseq_input::{key_name, Config, CrosstermSource, KeyDispatcher, KeyPress};

/// How long to wait for a terminal event before draining notices
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sent from matcher callbacks to the UI loop
#[derive(Debug, Clone, PartialEq, Eq)]
enum Notice {
    Step { name: String, code: u32 },
    Complete { name: String },
}

impl Notice {
    fn describe(&self) -> String {
        match self {
            Notice::Step { name, code } => {
                let key = key_name(*code).unwrap_or_else(|| code.to_string());
                format!("  {} <- {}", name, key)
            }
            Notice::Complete { name } => format!("* {} complete!", name),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let log_path = init_logging()?;

    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load(),
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut dispatcher = KeyDispatcher::new();
    let names = register_sequences(&config, &mut dispatcher, &tx);
    if names.is_empty() {
        anyhow::bail!("no usable sequences (see {})", log_path.display());
    }
    info!("watching {} sequence(s): {}", names.len(), names.join(", "));

    enable_raw_mode()?;
    let result = run_app(&mut stdout(), &mut dispatcher, &rx, &names);
    disable_raw_mode()?;

    result
}

/// Log to a file; the terminal is in raw mode while we run
fn init_logging() -> anyhow::Result<PathBuf> {
    let log_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyseq");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("keyseq.log");
    let file = File::create(&log_path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "keyseq=info,keyseq_input=info,warn".into()
        }))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();

    Ok(log_path)
}

/// Start a matcher per valid sequence, returning the names that were started.
///
/// Invalid entries are reported by `keyseq_input` and never registered.
fn register_sequences(
    config: &Config,
    dispatcher: &mut KeyDispatcher,
    tx: &Sender<Notice>,
) -> Vec<String> {
    let mut names = Vec::new();

    for seq in &config.sequences {
        let step_tx = tx.clone();
        let step_name = seq.name.clone();
        let complete_tx = tx.clone();
        let complete_name = seq.name.clone();

        let matcher = seq.builder().and_then(|builder| {
            builder
                .on_step(move |press: &KeyPress| {
                    let _ = step_tx.send(Notice::Step {
                        name: step_name.clone(),
                        code: press.code,
                    });
                })
                .on_complete(move |_| {
                    let _ = complete_tx.send(Notice::Complete {
                        name: complete_name.clone(),
                    });
                })
                .build()
        });

        if let Ok(matcher) = matcher {
            matcher.start(dispatcher);
            names.push(seq.name.clone());
        }
    }

    names
}

fn is_quit(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
}

fn run_app<W: Write>(
    out: &mut W,
    dispatcher: &mut KeyDispatcher,
    rx: &Receiver<Notice>,
    names: &[String],
) -> anyhow::Result<()> {
    let mut source = CrosstermSource::new();

    queue!(
        out,
        Print(format!("keyseq: watching {}\r\n", names.join(", "))),
        Print("Ctrl+C or Ctrl+Q to quit\r\n")
    )?;
    out.flush()?;

    loop {
        if let Some(Event::Key(key)) = source.pump(dispatcher, POLL_INTERVAL)? {
            if is_quit(&key) {
                break;
            }
        }
        print_notices(out, rx)?;
    }

    Ok(())
}

fn print_notices<W: Write>(out: &mut W, rx: &Receiver<Notice>) -> io::Result<()> {
    let mut printed = false;
    for notice in rx.try_iter() {
        if let Notice::Complete { ref name } = notice {
            info!("sequence '{}' entered", name);
        }
        queue!(out, Print(notice.describe()), Print("\r\n"))?;
        printed = true;
    }
    if printed {
        out.flush()?;
    }
    Ok(())
}
