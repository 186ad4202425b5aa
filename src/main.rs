use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ludwig::{App, CrosstermTerminal, EditorConfig, LineTerminal, RunMode};

/// Variable holding the log filter, in `tracing_subscriber` syntax.
const LOG_FILTER_VAR: &str = "LUDWIG_LOG";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to edit
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Create the file if it does not exist
    #[arg(short = 'c', long)]
    create: bool,

    /// Open the file for reading only
    #[arg(short = 'r', long)]
    read_only: bool,

    /// Initialisation file
    #[arg(short = 'i', long, value_name = "FILE")]
    init: Option<PathBuf>,

    /// No initialisation file
    #[arg(short = 'I', long)]
    no_init: bool,

    /// Command file run after the initialisation file
    #[arg(short = 'x', long, value_name = "FILE")]
    execute: Option<PathBuf>,

    /// Batch mode: run standard input as one command span
    #[arg(short = 'M', long, conflicts_with = "hardcopy")]
    batch: bool,

    /// Hardcopy mode: read one command line at a time
    #[arg(short = 'H', long)]
    hardcopy: bool,

    /// Characters of text each frame may hold
    #[arg(long, value_name = "CHARS")]
    space: Option<usize>,

    /// Write a log to this file
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

impl Args {
    fn run_mode(&self) -> RunMode {
        if self.batch {
            RunMode::Batch
        } else if self.hardcopy {
            RunMode::Hardcopy
        } else {
            RunMode::Screen
        }
    }

    fn config(&self) -> EditorConfig {
        let mut config = EditorConfig::new(self.run_mode());
        config.file = self.file.clone();
        config.create = self.create;
        config.read_only = self.read_only;
        config.init_file = self.init.clone();
        config.command_file = self.execute.clone();
        if let Some(space) = self.space {
            config.space_limit = space;
        }
        config.with_env(|var| std::env::var(var).ok(), self.no_init)
    }
}

fn init_logging(path: Option<&PathBuf>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log {}", path.display()))?;
    let filter = EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<bool> {
    let config = args.config();
    let run_mode = config.run_mode;
    let refresh_delay = config.refresh_delay;
    let interrupt = Arc::new(AtomicBool::new(false));
    let mut app = App::new(config, interrupt.clone());
    info!(?run_mode, file = ?args.file, "starting");

    match run_mode {
        RunMode::Screen => {
            let mut term = CrosstermTerminal::new(interrupt).with_refresh_delay(refresh_delay);
            app.startup(&mut term)?;
            app.run_screen(&mut term)?;
            let mut report = LineTerminal::new(io::empty(), io::stdout(), "ludwig");
            Ok(app.windup(&mut report))
        }
        RunMode::Hardcopy => {
            let handler_flag = interrupt.clone();
            ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
                .context("installing interrupt handler")?;
            let mut term = LineTerminal::new(io::stdin().lock(), io::stdout(), "hardcopy");
            app.startup(&mut term)?;
            app.run_hardcopy(&mut term)?;
            Ok(app.windup(&mut term))
        }
        RunMode::Batch => {
            let handler_flag = interrupt.clone();
            ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
                .context("installing interrupt handler")?;
            let mut script = String::new();
            io::stdin()
                .read_to_string(&mut script)
                .context("reading commands from standard input")?;
            let mut term = LineTerminal::new(io::empty(), io::stdout(), "batch");
            app.startup(&mut term)?;
            app.run_batch(&mut term, &script);
            Ok(app.windup(&mut term))
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_logging(args.log.as_ref()) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = %err, "editor failed");
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
