//! Single-line parser shared by the line-oriented strategies.
//!
//! A line is reduced to its digits region, merged digit runs are split into
//! two-digit groups, and the first six 1-2 digit tokens become the number
//! set. Lines with too few tokens fall back to digits-only segmentation.

use anyhow::Result;
use regex::Regex;

use super::repair::accept_candidate;
use crate::lottery::numbers::{NumberSet, WHITE_BALL_COUNT};

/// Leading line marker (A-E) with up to two noise characters before it.
pub const MARKER_PREFIX_PATTERN: &str = r"^[^A-Za-z0-9\s]{0,2}\s*([A-E])(?:[.,:]\s*|\s+)";

/// Parses one line of ticket text into a number set.
pub struct LineParser {
    marker_prefix: Regex,
    digit_run: Regex,
    token: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            marker_prefix: Regex::new(MARKER_PREFIX_PATTERN)?,
            digit_run: Regex::new(r"\d{3,}")?,
            token: Regex::new(r"\d{1,2}")?,
        })
    }

    /// Parses a line candidate. Returns None unless a valid set is recovered.
    pub fn parse(&self, line: &str) -> Option<NumberSet> {
        let without_marker = self.marker_prefix.replace(line.trim(), "");
        let normalized = normalize_glyphs(&without_marker);
        let start = normalized.find(|c: char| c.is_ascii_digit())?;
        let numeric = &normalized[start..];

        let repaired = self.repair_merged_digits(numeric);
        let tokens = self.number_tokens(&repaired);

        if tokens.len() > WHITE_BALL_COUNT {
            if let Some(set) = accept_candidate(&tokens[..WHITE_BALL_COUNT], tokens[WHITE_BALL_COUNT]) {
                return Some(set);
            }
        }

        crate::log_debug(&format!(
            "Line '{}' gave {} tokens, trying digits-only segmentation",
            line.trim(),
            tokens.len()
        ));
        segment_digits_only(numeric)
    }

    /// Splits digit runs of three or more into two-digit groups, leaving a
    /// one- or two-digit remainder at the end ("203037556121" -> "20 30 37 55 61 21").
    pub fn repair_merged_digits(&self, text: &str) -> String {
        self.digit_run
            .replace_all(text, |caps: &regex::Captures| split_digit_run(&caps[0]))
            .into_owned()
    }

    /// All 1-2 digit numbers in the text, in order.
    pub fn number_tokens(&self, text: &str) -> Vec<u8> {
        self.token
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<u8>().ok())
            .collect()
    }

    /// Marker letter at the start of the line, if any.
    pub fn leading_marker(&self, line: &str) -> Option<char> {
        self.marker_prefix
            .captures(line.trim())
            .and_then(|caps| caps[1].chars().next())
    }
}

fn split_digit_run(run: &str) -> String {
    let digits = run.as_bytes();
    let mut groups: Vec<&str> = Vec::with_capacity(digits.len() / 2 + 1);
    let mut pos = 0;
    while pos < digits.len() {
        let end = (pos + 2).min(digits.len());
        groups.push(&run[pos..end]);
        pos = end;
    }
    groups.join(" ")
}

/// Replaces letters commonly confused with digits, when they touch a digit.
pub fn normalize_glyphs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let replacement = match c {
            'O' | 'o' | 'Q' => Some('0'),
            'I' | 'l' | '|' => Some('1'),
            'S' | 's' => Some('5'),
            'Z' | 'z' => Some('2'),
            _ => None,
        };
        let touches_digit = out.chars().last().is_some_and(|p| p.is_ascii_digit())
            || chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());

        match replacement {
            Some(digit) if touches_digit => out.push(digit),
            _ => out.push(c),
        }
    }

    out
}

/// Reads a line as bare digits: exactly five two-digit white balls followed
/// by a one- or two-digit powerball. Groups of "00" are rejected.
pub fn segment_digits_only(text: &str) -> Option<NumberSet> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    let white_len = WHITE_BALL_COUNT * 2;
    if !(white_len + 1..=white_len + 2).contains(&digits.len()) {
        return None;
    }

    let mut groups: Vec<&str> = (0..WHITE_BALL_COUNT)
        .map(|i| &digits[i * 2..i * 2 + 2])
        .collect();
    groups.push(&digits[white_len..]);

    if groups.iter().any(|g| g.chars().all(|c| c == '0')) {
        return None;
    }

    let values: Vec<u8> = groups.iter().filter_map(|g| g.parse().ok()).collect();
    if values.len() != WHITE_BALL_COUNT + 1 {
        return None;
    }
    accept_candidate(&values[..WHITE_BALL_COUNT], values[WHITE_BALL_COUNT])
}
