//! Rebuilds ticket rows from word bounding boxes.
//!
//! Words are bucketed by the vertical midpoint of their box, each bucket is
//! read left to right, and the resulting rows go through the line parser.

use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;

use super::line::LineParser;
use super::{ExtractionInput, ExtractionStrategy};
use crate::lottery::numbers::{dedup_number_sets, NumberSet};
use crate::ocr::WordBox;

/// Header and footer text that never holds ticket numbers.
const NON_DATA_PATTERN: &str =
    r"(?i)power\s*play|powerball|education|thanks|draw|odds|cash\s*value|\bmon\s|printed";

/// A marker near the start of a row.
const MARKER_HINT_PATTERN: &str = r"(^|\s)[A-E](\.|\s)";

pub struct WordBoxStrategy {
    row_bucket_px: u32,
    non_data: Regex,
    marker_hint: Regex,
    parser: LineParser,
}

impl WordBoxStrategy {
    pub fn new(row_bucket_px: u32) -> Result<Self> {
        Ok(Self {
            row_bucket_px: row_bucket_px.max(1),
            non_data: Regex::new(NON_DATA_PATTERN)?,
            marker_hint: Regex::new(MARKER_HINT_PATTERN)?,
            parser: LineParser::new()?,
        })
    }

    /// Groups words into rows, top to bottom, and joins each row's text.
    pub fn reconstruct_rows(&self, words: &[WordBox]) -> Vec<String> {
        let mut rows: BTreeMap<i64, Vec<&WordBox>> = BTreeMap::new();
        for word in words {
            let mid_y = (word.top as f64 + word.bottom as f64) / 2.0;
            let key = (mid_y / self.row_bucket_px as f64).round() as i64;
            rows.entry(key).or_default().push(word);
        }

        rows.into_values()
            .filter_map(|mut row| {
                row.sort_by_key(|w| w.left);
                let text = row
                    .iter()
                    .map(|w| w.text.trim())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                (!text.is_empty()).then_some(text)
            })
            .collect()
    }

    /// Rows worth parsing: non-data rows dropped, marker rows preferred when present.
    pub fn candidate_rows(&self, words: &[WordBox]) -> Vec<String> {
        let rows: Vec<String> = self
            .reconstruct_rows(words)
            .into_iter()
            .filter(|row| {
                let keep = !self.non_data.is_match(row);
                if !keep {
                    crate::log_debug(&format!("Skipping non-data row: '{}'", row));
                }
                keep
            })
            .collect();

        let marked: Vec<String> = rows
            .iter()
            .filter(|row| self.marker_hint.is_match(row))
            .cloned()
            .collect();

        if marked.is_empty() { rows } else { marked }
    }
}

impl ExtractionStrategy for WordBoxStrategy {
    fn name(&self) -> &'static str {
        "word_boxes"
    }

    fn try_extract(&self, input: &ExtractionInput) -> Result<Vec<NumberSet>> {
        if input.words.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.candidate_rows(input.words);
        crate::log_debug(&format!("Word-box rows: {:?}", rows));

        let parsed = rows
            .iter()
            .filter_map(|row| self.parser.parse(row))
            .collect();
        Ok(dedup_number_sets(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, left: u32, top: u32) -> WordBox {
        WordBox {
            text: text.to_string(),
            left,
            top,
            right: left + 30,
            bottom: top + 20,
        }
    }

    fn strategy() -> WordBoxStrategy {
        WordBoxStrategy::new(20).unwrap()
    }

    #[test]
    fn test_rows_sorted_left_to_right() {
        // Words arrive out of order; small vertical jitter stays in one row
        let words = vec![
            word("30", 80, 108),
            word("A.", 0, 101),
            word("20", 40, 104),
            word("05", 40, 160),
            word("B.", 0, 161),
        ];
        let rows = strategy().reconstruct_rows(&words);
        assert_eq!(rows, vec!["A. 20 30", "B. 05"]);
    }

    #[test]
    fn test_header_rows_dropped() {
        let words = vec![
            word("POWER", 0, 0),
            word("PLAY", 60, 0),
            word("20", 0, 100),
            word("30", 40, 100),
        ];
        assert_eq!(strategy().candidate_rows(&words), vec!["20 30"]);
    }

    #[test]
    fn test_extracts_from_word_boxes() {
        let mut words = Vec::new();
        for (i, token) in ["A.", "20", "30", "37", "55", "61", "21"].iter().enumerate() {
            words.push(word(token, i as u32 * 40, 100));
        }
        for (i, token) in ["B.", "0519364964", "20"].iter().enumerate() {
            words.push(word(token, i as u32 * 120, 150));
        }
        words.push(word("ODDS", 0, 220));

        let input = ExtractionInput {
            raw_text: "",
            words: &words,
        };
        let sets = strategy().try_extract(&input).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].white_balls, [20, 30, 37, 55, 61]);
        assert_eq!(sets[1].white_balls, [5, 19, 36, 49, 64]);
    }

    #[test]
    fn test_marker_rows_preferred() {
        let mut words = Vec::new();
        for (i, token) in ["10", "22", "33", "44", "55", "12"].iter().enumerate() {
            words.push(word(token, i as u32 * 40, 40));
        }
        for (i, token) in ["C", "22", "41", "45", "49", "60", "11"].iter().enumerate() {
            words.push(word(token, i as u32 * 40, 100));
        }
        let input = ExtractionInput {
            raw_text: "",
            words: &words,
        };
        let sets = strategy().try_extract(&input).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].powerball, 11);
    }

    #[test]
    fn test_no_words_no_results() {
        let sets = strategy()
            .try_extract(&ExtractionInput::text_only("A. 20 30 37 55 61 21"))
            .unwrap();
        assert!(sets.is_empty());
    }
}
