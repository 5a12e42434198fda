//! Number set extraction from OCR output.
//!
//! Runs a fixed-priority cascade of independent strategies and returns the
//! validated, de-duplicated result of the first strategy that finds anything.
//! Earlier strategies are strict and tuned for well-structured tickets; later
//! ones are more permissive and only run when nothing else worked.

pub mod direct;
pub mod fallback;
pub mod line;
pub mod marker;
pub mod repair;
pub mod spatial;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::config::ExtractionConfig;
use crate::lottery::numbers::{dedup_number_sets, NumberSet};
use crate::ocr::WordBox;
use crate::{log, log_debug};

use direct::DirectPatternStrategy;
use fallback::FallbackStrategy;
use marker::MarkerLineStrategy;
use spatial::WordBoxStrategy;

/// OCR output handed to each strategy.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    pub raw_text: &'a str,
    pub words: &'a [WordBox],
}

impl<'a> ExtractionInput<'a> {
    pub fn text_only(raw_text: &'a str) -> Self {
        Self {
            raw_text,
            words: &[],
        }
    }
}

/// One step of the cascade.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Candidate sets found in the input. Errors mean "no result from this strategy".
    fn try_extract(&self, input: &ExtractionInput) -> Result<Vec<NumberSet>>;
}

/// Strategies selectable from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectPattern,
    WordBoxes,
    MarkerLines,
    Fallback,
}

impl StrategyKind {
    /// Default cascade, highest priority first.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::DirectPattern,
        StrategyKind::WordBoxes,
        StrategyKind::MarkerLines,
        StrategyKind::Fallback,
    ];

    fn build(self, config: &ExtractionConfig) -> Result<Box<dyn ExtractionStrategy>> {
        Ok(match self {
            StrategyKind::DirectPattern => Box::new(DirectPatternStrategy::new()?),
            StrategyKind::WordBoxes => Box::new(WordBoxStrategy::new(config.row_bucket_px)?),
            StrategyKind::MarkerLines => Box::new(MarkerLineStrategy::new()?),
            StrategyKind::Fallback => Box::new(FallbackStrategy::new(config)?),
        })
    }
}

/// Extraction result plus the strategy that produced it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub numbers: Vec<NumberSet>,
    /// Name of the winning strategy; None when nothing was found
    pub strategy: Option<&'static str>,
}

/// Ordered strategy cascade. Stateless across calls.
pub struct NumberSetExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl NumberSetExtractor {
    /// Builds the cascade listed in the configuration.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        let strategies = config
            .strategies
            .iter()
            .map(|kind| kind.build(config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { strategies })
    }

    /// Builds a cascade from explicit strategies, in priority order.
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Valid number sets found in the OCR output. Empty when nothing was found.
    pub fn extract(&self, raw_text: &str, words: &[WordBox]) -> Vec<NumberSet> {
        self.extract_report(raw_text, words).numbers
    }

    /// Like `extract`, also reporting which strategy succeeded.
    pub fn extract_report(&self, raw_text: &str, words: &[WordBox]) -> ExtractionReport {
        let input = ExtractionInput { raw_text, words };

        for strategy in &self.strategies {
            let name = strategy.name();
            let outcome = catch_unwind(AssertUnwindSafe(|| strategy.try_extract(&input)));

            let candidates = match outcome {
                Ok(Ok(candidates)) => candidates,
                Ok(Err(e)) => {
                    log(&format!("Strategy {} failed: {:#}", name, e));
                    continue;
                }
                Err(_) => {
                    log(&format!("Strategy {} panicked, skipping", name));
                    continue;
                }
            };

            let valid: Vec<NumberSet> = candidates.into_iter().filter(|s| s.is_valid()).collect();
            let numbers = dedup_number_sets(valid);

            if numbers.is_empty() {
                log_debug(&format!("Strategy {} found nothing", name));
                continue;
            }

            log(&format!(
                "Strategy {} found {} number set(s)",
                name,
                numbers.len()
            ));
            return ExtractionReport {
                numbers,
                strategy: Some(name),
            };
        }

        log("No strategy found a valid number set");
        ExtractionReport::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn extractor() -> NumberSetExtractor {
        NumberSetExtractor::from_config(&ExtractionConfig::default()).unwrap()
    }

    fn word(text: &str, left: u32, top: u32) -> WordBox {
        WordBox {
            text: text.to_string(),
            left,
            top,
            right: left + 30,
            bottom: top + 20,
        }
    }

    struct Failing;
    impl ExtractionStrategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn try_extract(&self, _input: &ExtractionInput) -> Result<Vec<NumberSet>> {
            Err(anyhow!("unexpected shape"))
        }
    }

    struct Panicking;
    impl ExtractionStrategy for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn try_extract(&self, _input: &ExtractionInput) -> Result<Vec<NumberSet>> {
            panic!("index out of bounds")
        }
    }

    /// Emits a fixed list, including invalid and duplicate entries.
    struct Fixed(Vec<NumberSet>);
    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn try_extract(&self, _input: &ExtractionInput) -> Result<Vec<NumberSet>> {
            Ok(self.0.clone())
        }
    }

    fn raw(whites: [u8; 5], pb: u8) -> NumberSet {
        NumberSet::from_parts(&whites, pb).unwrap()
    }

    #[test]
    fn test_default_cascade_order() {
        assert_eq!(
            extractor().strategy_names(),
            vec!["direct_pattern", "word_boxes", "marker_lines", "fallback"]
        );
    }

    #[test]
    fn test_full_ticket() {
        let text = "POWERBALL\nMON JUN 03 24\nA. 20 30 37 55 61 21\nB. 0519364964 20\n\
                    C. 22 41 45 49 60 11\nD. 17 19 28 46 53 15\nE. 08 20 23 61 64 07\n\
                    POWER PLAY NO\nODDS 1 IN 292,201,338";
        let report = extractor().extract_report(text, &[]);
        assert_eq!(report.strategy, Some("direct_pattern"));
        assert_eq!(report.numbers.len(), 5);
        assert_eq!(report.numbers[1].white_balls, [5, 19, 36, 49, 64]);
    }

    #[test]
    fn test_direct_pattern_short_circuits() {
        // The word boxes describe a different line; they must not leak into the result
        let words: Vec<WordBox> = ["C", "22", "41", "45", "49", "60", "11"]
            .iter()
            .enumerate()
            .map(|(i, t)| word(t, i as u32 * 40, 100))
            .collect();
        let text = "A. 20 30 37 55 61 21\n10 22 33 44 55 12";

        let report = extractor().extract_report(text, &words);
        assert_eq!(report.strategy, Some("direct_pattern"));
        assert_eq!(report.numbers, vec![raw([20, 30, 37, 55, 61], 21)]);
    }

    #[test]
    fn test_word_boxes_used_when_direct_patterns_fail() {
        let words: Vec<WordBox> = ["C", "22", "41", "45", "49", "60", "11"]
            .iter()
            .enumerate()
            .map(|(i, t)| word(t, i as u32 * 40, 100))
            .collect();
        // Raw text lost the line structure entirely
        let report = extractor().extract_report("C 22 41\n45 49 60 11", &words);
        assert_eq!(report.strategy, Some("word_boxes"));
        assert_eq!(report.numbers[0].powerball, 11);
    }

    #[test]
    fn test_marker_lines_used_for_noisy_lines() {
        // A trailing extra number still fits the direct patterns
        let report = extractor().extract_report("A. 20 30 37 55 61 21 3", &[]);
        assert_eq!(report.strategy, Some("direct_pattern"));

        // A merged pair mid-line does not
        let report = extractor().extract_report("A. 20 30 3755 61 21", &[]);
        assert_eq!(report.strategy, Some("marker_lines"));
        assert_eq!(report.numbers[0].white_balls, [20, 30, 37, 55, 61]);
    }

    #[test]
    fn test_fallback_for_unstructured_text() {
        let report = extractor().extract_report("QP 20 30 37 55 61 21", &[]);
        assert_eq!(report.strategy, Some("fallback"));
    }

    #[test]
    fn test_nothing_found() {
        let report = extractor().extract_report("1 in 292 million odds", &[]);
        assert!(report.numbers.is_empty());
        assert!(report.strategy.is_none());
        assert!(extractor().extract("", &[]).is_empty());
    }

    #[test]
    fn test_failing_strategies_are_contained() {
        let extractor = NumberSetExtractor::with_strategies(vec![
            Box::new(Failing),
            Box::new(Panicking),
            Box::new(Fixed(vec![raw([20, 30, 37, 55, 61], 21)])),
        ]);
        let report = extractor.extract_report("anything", &[]);
        assert_eq!(report.strategy, Some("fixed"));
        assert_eq!(report.numbers.len(), 1);
    }

    #[test]
    fn test_invalid_and_duplicate_candidates_filtered() {
        let extractor = NumberSetExtractor::with_strategies(vec![
            Box::new(Fixed(vec![raw([1, 1, 2, 3, 4], 5), raw([1, 2, 3, 4, 70], 5)])),
            Box::new(Fixed(vec![
                raw([20, 30, 37, 55, 61], 21),
                raw([61, 55, 37, 30, 20], 21),
                raw([20, 30, 37, 55, 61], 30),
            ])),
        ]);
        // The first strategy only yields invalid sets, so the cascade moves on
        let report = extractor.extract_report("", &[]);
        assert_eq!(report.strategy, Some("fixed"));
        assert_eq!(report.numbers, vec![raw([20, 30, 37, 55, 61], 21)]);
    }

    #[test]
    fn test_emitted_sets_are_always_valid() {
        let inputs = [
            "A. 20 30 37 55 61 21\nB. 99 98 97 96 95 94",
            "Z 00 00 00 00 00 00\nE. 70 71 72 73 74 75",
            "1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20",
            "B 0519364964 20\nC 0000000000 00",
            "12 34 56 78 90 12 34 56 78 90 11 22 33 44 55 66",
        ];
        for text in inputs {
            for set in extractor().extract(text, &[]) {
                assert!(set.is_valid(), "{} from {:?}", set, text);
            }
        }
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "B 0519364964 20\nD. 17 19 28 46 53 15";
        assert_eq!(extractor().extract(text, &[]), extractor().extract(text, &[]));
    }
}
