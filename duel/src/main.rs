//! chessduel: play against a UCI engine, or watch two engine instances play
//! each other, from a line-oriented console.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use duel::config;
use duel::console::{describe, describe_event, parse_command, Command, Console, HELP};
use duel::{spawn_session, Mode, SearchSettings, SessionConfig, TranscriptStore};
use engine::{EngineSettings, UciLauncher, WorkerLauncher};

#[derive(Parser)]
#[command(name = "chessduel", about = "Human vs engine and engine vs engine chess")]
struct Cli {
    /// Starting mode: hvh, hvw, hvw-black or wvw.
    #[arg(long, default_value = "hvw", value_parser = parse_mode)]
    mode: Mode,

    /// UCI engine binary. Searched for in the usual places when omitted.
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Extra argument passed to the engine; repeatable.
    #[arg(long = "engine-arg")]
    engine_args: Vec<String>,

    /// Seconds per worker move (0.1-60).
    #[arg(long)]
    time: Option<f64>,

    /// Worker skill level (0-20).
    #[arg(long)]
    level: Option<u8>,

    /// Run without any engine; every side is played by hand.
    #[arg(long)]
    no_engine: bool,

    /// Directory saved games are read from and written to.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::parse(s).ok_or_else(|| format!("unknown mode {:?}", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_dir = config::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chessduel");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("chessduel starting up");

    let settings = SearchSettings {
        time_budget: SearchSettings::time_budget(
            cli.time.unwrap_or_else(config::get_time_budget_secs),
        )?,
        skill_level: SearchSettings::skill_level(cli.level.unwrap_or_else(config::get_skill_level))?,
    };

    let launcher: Option<Arc<dyn WorkerLauncher>> = if cli.no_engine {
        None
    } else {
        Some(Arc::new(UciLauncher::new(EngineSettings {
            path: cli.engine.or_else(config::get_engine_path),
            args: cli.engine_args,
            handshake_timeout: Duration::from_secs(config::get_handshake_timeout_secs()),
            ..EngineSettings::default()
        })))
    };

    let store = TranscriptStore::new(cli.data_dir.unwrap_or_else(config::get_data_dir));
    tracing::info!("Using data directory: {}", store.dir().display());

    let handle = spawn_session(
        SessionConfig {
            mode: cli.mode,
            settings,
        },
        launcher,
    );

    let (snapshot, mut events) = handle.subscribe().await?;
    let printer = tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = describe_event(&event) {
                        println!("* {}", line);
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Event printer lagged by {} events", n);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("chessduel, type 'help' for commands");
    println!("Debug logs: {}/chessduel.YYYY-MM-DD", log_dir.display());
    println!("{}", describe(&snapshot));

    let mut console = Console::new(handle.clone(), store);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if command == Command::Help {
            println!("{}", HELP);
            continue;
        }
        match console.execute(command).await {
            Ok(text) if text.is_empty() => {}
            Ok(text) => println!("{}", text),
            Err(e) => println!("error: {}", e),
        }
    }

    handle.shutdown().await;
    printer.abort();

    tracing::info!("chessduel shutting down");
    Ok(())
}
