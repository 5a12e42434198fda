pub mod engine;
pub mod preprocess;
pub mod setup;

pub use engine::{OcrEngine, RecognitionFailure, RecognitionResult, TextRecognizer, WordBox};
pub use preprocess::{enhance, load_image};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::PreprocessConfig;
use crate::extract::NumberSetExtractor;
use crate::lottery::NumberSet;

/// Everything one scan of one image produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub numbers: Vec<NumberSet>,
    pub confidence: f32,
    pub raw_text: String,
    /// Extraction strategy that found the numbers
    pub strategy: Option<&'static str>,
}

/// High-level function: encoded image → number sets.
///
/// Decodes and preprocesses the image, runs recognition, then the extractor
/// cascade. Decode and recognition failures are returned as errors; an
/// image without readable numbers is a successful scan with no sets.
pub fn scan_image<R: TextRecognizer + ?Sized>(
    bytes: &[u8],
    recognizer: &mut R,
    extractor: &NumberSetExtractor,
    preprocess: &PreprocessConfig,
) -> Result<ScanOutcome> {
    let img = load_image(bytes)?;
    let enhanced = enhance(&img, preprocess);
    crate::log_debug(&format!(
        "Preprocessed {}x{} -> {}x{}",
        img.width(),
        img.height(),
        enhanced.width(),
        enhanced.height()
    ));

    let recognition = recognizer
        .recognize(&enhanced)
        .with_context(|| format!("Recognition with {} failed", recognizer.name()))?;
    crate::log(&format!(
        "{}: {} line(s), {} word(s), confidence {:.2}",
        recognizer.name(),
        recognition.raw_text.lines().count(),
        recognition.words.len(),
        recognition.confidence
    ));
    crate::log_debug(&format!("Raw text:\n{}", recognition.raw_text));

    let report = extractor.extract_report(&recognition.raw_text, &recognition.words);

    Ok(ScanOutcome {
        numbers: report.numbers,
        confidence: recognition.confidence,
        raw_text: recognition.raw_text,
        strategy: report.strategy,
    })
}
