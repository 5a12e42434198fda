//! Marker-line extraction: raw-text lines that start with a line marker (A-E).

use anyhow::Result;
use regex::Regex;

use super::line::{LineParser, MARKER_PREFIX_PATTERN};
use super::{ExtractionInput, ExtractionStrategy};
use crate::lottery::numbers::{dedup_number_sets, NumberSet};

/// Finds raw-text lines that begin with a line marker (A-E).
pub struct MarkerLineMatcher {
    pattern: Regex,
}

impl MarkerLineMatcher {
    pub fn new() -> Result<Self> {
        // The marker must be followed by something, not end the line.
        Ok(Self {
            pattern: Regex::new(&format!(r"{}\S", MARKER_PREFIX_PATTERN))?,
        })
    }

    pub fn marker_lines<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && self.pattern.is_match(line))
            .collect()
    }
}

/// Parses every marker line of the raw text.
pub struct MarkerLineStrategy {
    matcher: MarkerLineMatcher,
    parser: LineParser,
}

impl MarkerLineStrategy {
    pub fn new() -> Result<Self> {
        Ok(Self {
            matcher: MarkerLineMatcher::new()?,
            parser: LineParser::new()?,
        })
    }
}

impl ExtractionStrategy for MarkerLineStrategy {
    fn name(&self) -> &'static str {
        "marker_lines"
    }

    fn try_extract(&self, input: &ExtractionInput) -> Result<Vec<NumberSet>> {
        let lines = self.matcher.marker_lines(input.raw_text);
        crate::log_debug(&format!("Marker lines found: {:?}", lines));

        let parsed = lines
            .iter()
            .filter_map(|line| {
                let set = self.parser.parse(line)?;
                if let Some(marker) = self.parser.leading_marker(line) {
                    crate::log_debug(&format!("Line {}: {}", marker, set));
                }
                Some(set)
            })
            .collect();
        Ok(dedup_number_sets(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<NumberSet> {
        MarkerLineStrategy::new()
            .unwrap()
            .try_extract(&ExtractionInput::text_only(text))
            .unwrap()
    }

    #[test]
    fn test_marker_lines_detection() {
        let matcher = MarkerLineMatcher::new().unwrap();
        let text = "POWERBALL\nA. 20 30 37 55 61 21\n  - B 05 19 36 49 64 20\nCASH VALUE\nE.\nD.17 19";
        assert_eq!(
            matcher.marker_lines(text),
            vec!["A. 20 30 37 55 61 21", "- B 05 19 36 49 64 20", "D.17 19"]
        );
    }

    #[test]
    fn test_extracts_each_marker_line() {
        let text = "A. 20 30 37 55 61 21\nB. 0519364964 20\nC. 22 41 45 49 60 11\nODDS 1 IN 292";
        let sets = extract(text);
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[1].white_balls, [5, 19, 36, 49, 64]);
        assert_eq!(sets[2].powerball, 11);
    }

    #[test]
    fn test_skips_unparseable_marker_lines() {
        let sets = extract("A. 20 30\nB. 05 19 36 49 64 20");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].powerball, 20);
    }

    #[test]
    fn test_duplicate_lines_collapse() {
        let sets = extract("A. 20 30 37 55 61 21\nA 61 55 37 30 20 21");
        assert_eq!(sets.len(), 1);
    }
}
