//! Direct per-marker pattern matching.
//!
//! Each ticket line marker (A-E) has a family of patterns: the clean marker
//! and the glyphs OCR commonly reads in its place, followed either by six
//! space-separated numbers or by five merged two-digit groups plus the
//! powerball. Results land in a slot per marker so they stay addressable by
//! their source line.

use anyhow::Result;
use regex::{Captures, Regex};

use super::repair::accept_candidate;
use super::{ExtractionInput, ExtractionStrategy};
use crate::lottery::numbers::{NumberSet, WHITE_BALL_COUNT};

/// Marker letters in slot order.
pub const MARKERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// Clean marker plus known misreads, as regex alternatives.
const MARKER_PREFIXES: [&str; 5] = [
    r"A|4",
    r"B|8|13|R",
    r"C|G|\(",
    r"D|0|O|P",
    r"E|F|£",
];

const SPACED_BODY: &str =
    r"(\d{1,2})\s+(\d{1,2})\s+(\d{1,2})\s+(\d{1,2})\s+(\d{1,2})\s+(\d{1,2})(?:\D|$)";
const MERGED_BODY: &str = r"(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})\s*(\d{1,2})(?:\D|$)";

/// One named pattern for one marker.
struct LinePattern {
    name: &'static str,
    regex: Regex,
}

impl LinePattern {
    fn try_match(&self, line: &str) -> Option<NumberSet> {
        let caps = self.regex.captures(line)?;
        let values = capture_values(&caps)?;
        accept_candidate(&values[..WHITE_BALL_COUNT], values[WHITE_BALL_COUNT])
    }
}

/// All patterns for one marker.
struct MarkerFamily {
    marker: char,
    patterns: Vec<LinePattern>,
}

impl MarkerFamily {
    fn new(marker: char, prefixes: &str) -> Result<Self> {
        let head = format!(r"^[^A-Za-z0-9\s]{{0,2}}\s*(?:{})(?:[.,:]\s*|\s+)", prefixes);
        Ok(Self {
            marker,
            patterns: vec![
                LinePattern {
                    name: "spaced",
                    regex: Regex::new(&format!("{}{}", head, SPACED_BODY))?,
                },
                LinePattern {
                    name: "merged",
                    regex: Regex::new(&format!("{}{}", head, MERGED_BODY))?,
                },
            ],
        })
    }

    fn try_match(&self, line: &str) -> Option<NumberSet> {
        self.patterns.iter().find_map(|pattern| {
            let set = pattern.try_match(line)?;
            crate::log_debug(&format!(
                "Direct pattern {}/{} matched '{}'",
                self.marker, pattern.name, line
            ));
            Some(set)
        })
    }
}

/// Runs the per-marker pattern families against every raw-text line.
pub struct DirectPatternStrategy {
    families: Vec<MarkerFamily>,
}

impl DirectPatternStrategy {
    pub fn new() -> Result<Self> {
        let families = MARKERS
            .iter()
            .zip(MARKER_PREFIXES.iter())
            .map(|(&marker, prefixes)| MarkerFamily::new(marker, prefixes))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { families })
    }

    /// Fills one slot per marker, keeping the first valid match for each.
    pub fn extract_slots(&self, raw_text: &str) -> [Option<NumberSet>; 5] {
        let mut slots: [Option<NumberSet>; 5] = Default::default();

        for line in raw_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            for (slot, family) in self.families.iter().enumerate() {
                if slots[slot].is_some() {
                    continue;
                }
                if let Some(set) = family.try_match(line) {
                    slots[slot] = Some(set);
                    break;
                }
            }
        }

        slots
    }
}

impl ExtractionStrategy for DirectPatternStrategy {
    fn name(&self) -> &'static str {
        "direct_pattern"
    }

    fn try_extract(&self, input: &ExtractionInput) -> Result<Vec<NumberSet>> {
        Ok(self
            .extract_slots(input.raw_text)
            .into_iter()
            .flatten()
            .collect())
    }
}

fn capture_values(caps: &Captures) -> Option<Vec<u8>> {
    (1..=WHITE_BALL_COUNT + 1)
        .map(|i| caps.get(i).and_then(|m| m.as_str().parse::<u8>().ok()))
        .collect()
}
