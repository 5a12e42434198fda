//! Last-resort extraction for text with no recognizable ticket lines.
//!
//! Slides a six-number window over every 1-2 digit token in the text and
//! keeps windows that are valid and look like drawn numbers rather than
//! incidental small numbers (odds, dates, disclaimers).

use anyhow::Result;
use regex::Regex;

use super::marker::MarkerLineMatcher;
use super::{ExtractionInput, ExtractionStrategy};
use crate::config::ExtractionConfig;
use crate::lottery::numbers::{dedup_number_sets, is_valid, NumberSet, WHITE_BALL_COUNT};

pub struct FallbackStrategy {
    token: Regex,
    markers: MarkerLineMatcher,
    min_average: f32,
    min_spread: u8,
    max_results: usize,
}

impl FallbackStrategy {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            token: Regex::new(r"\d{1,2}")?,
            markers: MarkerLineMatcher::new()?,
            min_average: config.fallback_min_average,
            min_spread: config.fallback_min_spread,
            max_results: config.fallback_max_results,
        })
    }

    /// Rejects windows made of small or tightly clustered numbers.
    fn is_plausible(&self, white_balls: &[u8]) -> bool {
        let sum: u32 = white_balls.iter().map(|&b| b as u32).sum();
        let average = sum as f32 / white_balls.len() as f32;
        if average < self.min_average {
            return false;
        }

        let min = white_balls.iter().min().copied().unwrap_or(0);
        let max = white_balls.iter().max().copied().unwrap_or(0);
        max - min > self.min_spread
    }
}

impl ExtractionStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn try_extract(&self, input: &ExtractionInput) -> Result<Vec<NumberSet>> {
        // Text with marker lines is structured; guessing windows there only adds noise
        if !self.markers.marker_lines(input.raw_text).is_empty() {
            return Ok(Vec::new());
        }

        let tokens: Vec<u8> = self
            .token
            .find_iter(input.raw_text)
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        crate::log_debug(&format!("Fallback tokens: {:?}", tokens));

        let mut found = Vec::new();
        for window in tokens.windows(WHITE_BALL_COUNT + 1) {
            let (white_balls, powerball) = (&window[..WHITE_BALL_COUNT], window[WHITE_BALL_COUNT]);
            if is_valid(white_balls, powerball) && self.is_plausible(white_balls) {
                if let Some(set) = NumberSet::from_parts(white_balls, powerball) {
                    found.push(set);
                }
            }
        }

        let mut unique = dedup_number_sets(found);
        unique.truncate(self.max_results);
        Ok(unique)
    }
}
