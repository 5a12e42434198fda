use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use powerball_scan::config::{EngineKind, ScannerConfig};
use powerball_scan::{commands, log, paths, set_verbose};

#[derive(Parser)]
#[command(name = "powerball-scan", version, about = "Scan Powerball tickets and check them against the latest draw")]
struct Cli {
    /// Configuration file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log extraction details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one ticket photo and print the numbers found
    Scan {
        image: PathBuf,
        /// Recognition engine (overrides the config)
        #[arg(long, value_enum)]
        engine: Option<EngineKind>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scan frames as they appear in a directory until enough numbers are found
    Watch {
        dir: PathBuf,
        #[arg(long)]
        interval_ms: Option<u64>,
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Number of unique sets to collect before stopping
        #[arg(long)]
        target: Option<usize>,
        #[arg(long, value_enum)]
        engine: Option<EngineKind>,
    },
    /// Check confirmed number sets from a JSON file against the latest draw
    Check {
        tickets: PathBuf,
        /// Draw date to record on the tickets (defaults to the draw's date)
        #[arg(long)]
        draw_date: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the latest draw and where it came from
    Draw {
        #[arg(long)]
        json: bool,
    },
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        log(&format!("[PANIC]{} {}", location, msg));
    }));
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    set_verbose(cli.verbose);

    install_panic_hook();
    paths::ensure_directories()?;

    let config_path = cli.config.unwrap_or_else(paths::get_default_config_path);
    let mut config = ScannerConfig::load(&config_path);

    match cli.command {
        Command::Scan {
            image,
            engine,
            json,
        } => {
            if let Some(engine) = engine {
                config.engine = engine;
            }
            commands::scan(&config, &image, json)
        }
        Command::Watch {
            dir,
            interval_ms,
            max_attempts,
            target,
            engine,
        } => {
            if let Some(engine) = engine {
                config.engine = engine;
            }
            if let Some(interval_ms) = interval_ms {
                config.scanner.interval_ms = interval_ms;
            }
            if let Some(max_attempts) = max_attempts {
                config.scanner.max_attempts = max_attempts;
            }
            if let Some(target) = target {
                config.scanner.target_sets = target;
            }
            commands::watch(&config, &dir)
        }
        Command::Check {
            tickets,
            draw_date,
            json,
        } => commands::check(&config, &tickets, draw_date.as_deref(), json),
        Command::Draw { json } => commands::draw(&config, json),
    }
}
