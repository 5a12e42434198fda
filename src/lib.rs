//! Powerball ticket scanner.
//!
//! Reads ticket numbers from photos with Tesseract OCR, checks them against
//! the latest official draw, and reports any prize won.

pub mod commands;
pub mod config;
pub mod extract;
pub mod lottery;
pub mod ocr;
pub mod paths;
pub mod scanner;

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

const LOG_FILE_NAME: &str = "powerball_scan.log";

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Logs a timestamped message to stderr and the log file.
///
/// Stdout is reserved for command output so `--json` stays machine-readable.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    eprint!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Like `log`, but only when verbose mode is on.
pub fn log_debug(msg: &str) {
    if VERBOSE.load(Ordering::Relaxed) {
        log(msg);
    }
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}
