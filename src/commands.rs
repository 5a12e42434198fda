//! Subcommand implementations.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::ScannerConfig;
use crate::extract::NumberSetExtractor;
use crate::lottery::numbers::is_valid_multiplier;
use crate::lottery::{Draw, DrawGateway, NumberSet, Ticket};
use crate::log;
use crate::ocr::{scan_image, OcrEngine, TextRecognizer};
use crate::scanner::{spawn_scanner, DirectoryFrames, ScanEvent, ScanSession};

const MANUAL_ENTRY_HINT: &str =
    "No numbers could be read. Enter them manually in a tickets JSON file and run `check`.";

/// One-shot scan of a single image.
pub fn scan(config: &ScannerConfig, image: &Path, json: bool) -> Result<()> {
    let bytes = fs::read(image).with_context(|| format!("Failed to read {}", image.display()))?;
    let extractor = NumberSetExtractor::from_config(&config.extraction)?;
    crate::log_debug(&format!("Extraction strategies: {:?}", extractor.strategy_names()));
    let mut engine = OcrEngine::from_config(config);

    let outcome = scan_image(&bytes, &mut engine, &extractor, &config.preprocess);
    engine.shutdown();
    let outcome = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.numbers.is_empty() {
        println!("{}", MANUAL_ENTRY_HINT);
        return Ok(());
    }

    for (i, numbers) in outcome.numbers.iter().enumerate() {
        println!("{}. {}", i + 1, numbers);
    }
    println!(
        "Confidence: {:.0}% (strategy: {})",
        outcome.confidence * 100.0,
        outcome.strategy.unwrap_or("none")
    );
    Ok(())
}

/// Continuous scan of frames appearing in `dir`.
pub fn watch(config: &ScannerConfig, dir: &Path) -> Result<()> {
    let session = ScanSession::new(
        OcrEngine::from_config(config),
        DirectoryFrames::new(dir, Duration::from_millis(config.scanner.frame_settle_ms))?,
        NumberSetExtractor::from_config(&config.extraction)?,
        config.preprocess.clone(),
        config.scanner.clone(),
    );
    println!("Watching {} for ticket frames...", dir.display());

    let handle = spawn_scanner(session)?;
    for event in handle.events.iter() {
        match event {
            ScanEvent::Started { engine } => log(&format!("Scanning with {}", engine)),
            ScanEvent::FrameProcessed {
                attempt,
                new_sets,
                progress,
                ..
            } => {
                for numbers in &new_sets {
                    println!("[frame {}] {}", attempt, numbers);
                }
                log(&format!("Progress: {}%", progress));
            }
            ScanEvent::FrameFailed { attempt, error } => {
                log(&format!("Frame {} skipped: {}", attempt, error));
            }
            ScanEvent::Finished(_) => break,
        }
    }

    let summary = handle.join()?;
    println!(
        "Stopped ({:?}) after {} frame(s), {} unique set(s):",
        summary.stop_reason,
        summary.attempts,
        summary.numbers.len()
    );
    if summary.numbers.is_empty() {
        println!("{}", MANUAL_ENTRY_HINT);
    }
    for (i, numbers) in summary.numbers.iter().enumerate() {
        println!("{}. {}", i + 1, numbers);
    }
    Ok(())
}

/// Evaluates confirmed tickets against the latest draw.
pub fn check(
    config: &ScannerConfig,
    tickets_path: &Path,
    draw_date: Option<&str>,
    json: bool,
) -> Result<()> {
    let sets = load_number_sets(tickets_path)?;
    let draw = latest_draw(config)?;
    let draw_date = draw_date.unwrap_or(&draw.draw_date);

    let mut tickets = sets
        .into_iter()
        .enumerate()
        .map(|(i, numbers)| Ticket::confirm(numbers, draw_date, i))
        .collect::<Result<Vec<_>>>()?;
    for ticket in &mut tickets {
        ticket.evaluate(&draw);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tickets)?);
        return Ok(());
    }

    print_draw(&draw);
    for ticket in &tickets {
        match (&ticket.prize_tier, ticket.prize_amount) {
            (Some(tier), Some(amount)) => println!(
                "{}  WINNER: {} - ${}",
                ticket.numbers,
                tier,
                format_dollars(amount)
            ),
            _ => println!("{}  no prize", ticket.numbers),
        }
    }

    let total: u64 = tickets.iter().filter_map(|t| t.prize_amount).sum();
    println!("Total winnings: ${}", format_dollars(total));
    Ok(())
}

/// Prints the latest draw.
pub fn draw(config: &ScannerConfig, json: bool) -> Result<()> {
    let draw = latest_draw(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&draw)?);
    } else {
        print_draw(&draw);
    }
    Ok(())
}

fn latest_draw(config: &ScannerConfig) -> Result<Draw> {
    let gateway = DrawGateway::from_config(&config.gateway)?;
    Ok(gateway.latest_draw())
}

fn print_draw(draw: &Draw) {
    println!("Draw {}: {}", draw.draw_date, draw.winning_numbers);
    if let Some(multiplier) = draw.multiplier {
        println!("Power Play: {}x", multiplier);
    }
    if draw.jackpot_amount > 0 {
        println!("Jackpot: ${}", format_dollars(draw.jackpot_amount));
    }
    if draw.is_mock() {
        println!("Warning: no draw source answered, these are sample numbers");
    }
}

/// Either a plain list of sets or the JSON printed by `scan --json`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TicketFile {
    Sets(Vec<NumberSet>),
    ScanOutput { numbers: Vec<NumberSet> },
}

/// Reads and validates the number sets in a tickets file.
pub fn load_number_sets(path: &Path) -> Result<Vec<NumberSet>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file: TicketFile = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a list of number sets", path.display()))?;
    let sets = match file {
        TicketFile::Sets(sets) | TicketFile::ScanOutput { numbers: sets } => sets,
    };

    if sets.is_empty() {
        return Err(anyhow!("{} holds no number sets", path.display()));
    }

    sets.into_iter()
        .enumerate()
        .map(|(i, set)| {
            let validated = NumberSet::new(set.white_balls, set.powerball)
                .with_context(|| format!("Ticket line {} is invalid", i + 1))?;
            match set.power_play {
                Some(m) if !is_valid_multiplier(m) => Err(anyhow!(
                    "Ticket line {}: {}x is not a Power Play multiplier",
                    i + 1,
                    m
                )),
                Some(m) => Ok(validated.with_power_play(m)),
                None => Ok(validated),
            }
        })
        .collect()
}

/// 1234567 -> "1,234,567"
fn format_dollars(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tickets.json");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_plain_list() {
        let (_dir, path) = write(
            r#"[
                {"white_balls": [5, 19, 36, 49, 64], "powerball": 20, "power_play": 2},
                {"white_balls": [20, 30, 37, 55, 61], "powerball": 21}
            ]"#,
        );
        let sets = load_number_sets(&path).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].power_play, Some(2));
        assert_eq!(sets[1].power_play, None);
    }

    #[test]
    fn test_load_scan_output() {
        let (_dir, path) = write(
            r#"{"numbers": [{"white_balls": [5, 19, 36, 49, 64], "powerball": 20}],
                "confidence": 0.8, "raw_text": "B 0519364964 20", "strategy": "direct_pattern"}"#,
        );
        let sets = load_number_sets(&path).unwrap();
        assert_eq!(sets[0].white_balls, [5, 19, 36, 49, 64]);
    }

    #[test]
    fn test_load_rejects_invalid_entries() {
        let (_dir, path) = write(r#"[{"white_balls": [5, 5, 36, 49, 64], "powerball": 20}]"#);
        assert!(load_number_sets(&path).is_err());

        let (_dir, path) =
            write(r#"[{"white_balls": [5, 19, 36, 49, 64], "powerball": 20, "power_play": 7}]"#);
        assert!(load_number_sets(&path).is_err());

        let (_dir, path) = write("[]");
        assert!(load_number_sets(&path).is_err());
    }

    #[test]
    fn test_format_dollars() {
        assert_eq!(format_dollars(0), "0");
        assert_eq!(format_dollars(100), "100");
        assert_eq!(format_dollars(1_000), "1,000");
        assert_eq!(format_dollars(50_000_000), "50,000,000");
    }
}
