use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::setup::{locate_tesseract, TesseractPaths, LANGUAGE};
use crate::config::{EngineKind, ScannerConfig};

/// Characters the engines are allowed to emit.
pub const CHAR_WHITELIST: &str = "0123456789ABCDE.,+- ";

/// Confidence reported by engines whose output carries no per-word scores.
pub const NOMINAL_CONFIDENCE: f32 = 0.5;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A recognized word and its bounding box in preprocessed-image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Output of one recognition run.
#[derive(Debug, Clone, Default)]
pub struct RecognitionResult {
    /// Recognized text, one line per detected text line
    pub raw_text: String,
    /// Overall confidence in [0, 1]
    pub confidence: f32,
    /// Word boxes; empty when the engine does not report them
    pub words: Vec<WordBox>,
}

#[derive(Debug, Error)]
pub enum RecognitionFailure {
    #[error("Tesseract not found. Please install Tesseract-OCR.")]
    NotAvailable,
    #[error("Tesseract failed: {0}")]
    Process(String),
    #[error("Tesseract timed out after {0:?}")]
    Timeout(Duration),
    #[error("Failed to read Tesseract output: {0}")]
    UnreadableOutput(String),
    #[error("Image I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write image for recognition: {0}")]
    Image(#[from] image::ImageError),
}

/// A text recognition engine.
pub trait TextRecognizer {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Prepares the engine. Calling it again on a ready engine is a no-op.
    fn initialize(&mut self) -> Result<(), RecognitionFailure>;

    /// Recognizes text in a preprocessed image, initializing first if needed.
    fn recognize(&mut self, img: &GrayImage) -> Result<RecognitionResult, RecognitionFailure>;

    fn shutdown(&mut self);

    fn is_ready(&self) -> bool;
}

/// Located executable plus per-run limits, shared by both engine variants.
struct TesseractRuntime {
    paths: Option<TesseractPaths>,
    timeout: Duration,
}

impl TesseractRuntime {
    fn new(timeout: Duration) -> Self {
        Self {
            paths: None,
            timeout,
        }
    }

    fn initialize(&mut self) -> Result<(), RecognitionFailure> {
        if self.paths.is_none() {
            self.paths = Some(locate_tesseract().ok_or(RecognitionFailure::NotAvailable)?);
        }
        Ok(())
    }

    /// Runs Tesseract on `img` and returns the contents of the output file.
    ///
    /// `extension` is the file Tesseract writes next to the output base:
    /// "tsv" when the `tsv` config is requested, "txt" otherwise.
    fn run(
        &mut self,
        img: &GrayImage,
        mode_args: &[&str],
        config_file: Option<&str>,
        extension: &str,
    ) -> Result<String, RecognitionFailure> {
        self.initialize()?;
        let paths = self.paths.as_ref().ok_or(RecognitionFailure::NotAvailable)?;

        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        // Tesseract appends the extension to this base path
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut command = Command::new(&paths.executable);
        command.arg(temp_input.path()).arg(&output_base);
        if let Some(tessdata) = &paths.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        command
            .arg("-l")
            .arg(LANGUAGE)
            .args(mode_args)
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", CHAR_WHITELIST))
            .arg("-c")
            .arg("preserve_interword_spaces=1");
        if let Some(config_file) = config_file {
            command.arg(config_file);
        }

        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RecognitionFailure::NotAvailable,
                _ => RecognitionFailure::Io(e),
            })?;

        let output = wait_with_timeout(child, self.timeout)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionFailure::Process(stderr.trim().to_string()));
        }

        let result_path = format!("{}.{}", output_base, extension);
        let content = read_output(Path::new(&result_path));
        let _ = std::fs::remove_file(&result_path);
        content
    }
}

fn read_output(path: &Path) -> Result<String, RecognitionFailure> {
    std::fs::read_to_string(path).map_err(|e| RecognitionFailure::UnreadableOutput(e.to_string()))
}

/// Waits for the child to exit, killing it once `timeout` has passed.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Output, RecognitionFailure> {
    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            return Ok(child.wait_with_output()?);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RecognitionFailure::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Block-mode Tesseract with TSV output: word boxes and per-word confidence.
pub struct BlockEngine {
    runtime: TesseractRuntime,
}

impl BlockEngine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            runtime: TesseractRuntime::new(timeout),
        }
    }
}

impl TextRecognizer for BlockEngine {
    fn name(&self) -> &'static str {
        "tesseract-block"
    }

    fn initialize(&mut self) -> Result<(), RecognitionFailure> {
        self.runtime.initialize()
    }

    fn recognize(&mut self, img: &GrayImage) -> Result<RecognitionResult, RecognitionFailure> {
        // Assume a single uniform block of text
        let tsv = self.runtime.run(img, &["--psm", "6"], Some("tsv"), "tsv")?;
        parse_tsv_output(&tsv)
    }

    fn shutdown(&mut self) {
        self.runtime.paths = None;
    }

    fn is_ready(&self) -> bool {
        self.runtime.paths.is_some()
    }
}

/// Sparse-text Tesseract on the LSTM engine, plain text only.
///
/// Finds as much text as possible in no particular order, which copes
/// better with crumpled or skewed tickets than block mode but is slower.
pub struct SparseEngine {
    runtime: TesseractRuntime,
}

impl SparseEngine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            runtime: TesseractRuntime::new(timeout),
        }
    }
}

impl TextRecognizer for SparseEngine {
    fn name(&self) -> &'static str {
        "tesseract-sparse"
    }

    fn initialize(&mut self) -> Result<(), RecognitionFailure> {
        self.runtime.initialize()
    }

    fn recognize(&mut self, img: &GrayImage) -> Result<RecognitionResult, RecognitionFailure> {
        let text = self
            .runtime
            .run(img, &["--psm", "11", "--oem", "1"], None, "txt")?;
        Ok(RecognitionResult {
            raw_text: normalize_plain_text(&text),
            confidence: NOMINAL_CONFIDENCE,
            words: Vec::new(),
        })
    }

    fn shutdown(&mut self) {
        self.runtime.paths = None;
    }

    fn is_ready(&self) -> bool {
        self.runtime.paths.is_some()
    }
}

/// Either engine variant, selected by configuration.
pub enum OcrEngine {
    Block(BlockEngine),
    Sparse(SparseEngine),
}

impl OcrEngine {
    pub fn new(kind: EngineKind, timeout: Duration) -> Self {
        match kind {
            EngineKind::Primary => OcrEngine::Block(BlockEngine::new(timeout)),
            EngineKind::Alternate => OcrEngine::Sparse(SparseEngine::new(timeout)),
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(
            config.engine,
            Duration::from_secs(config.tesseract_timeout_secs),
        )
    }
}

impl TextRecognizer for OcrEngine {
    fn name(&self) -> &'static str {
        match self {
            OcrEngine::Block(e) => e.name(),
            OcrEngine::Sparse(e) => e.name(),
        }
    }

    fn initialize(&mut self) -> Result<(), RecognitionFailure> {
        match self {
            OcrEngine::Block(e) => e.initialize(),
            OcrEngine::Sparse(e) => e.initialize(),
        }
    }

    fn recognize(&mut self, img: &GrayImage) -> Result<RecognitionResult, RecognitionFailure> {
        match self {
            OcrEngine::Block(e) => e.recognize(img),
            OcrEngine::Sparse(e) => e.recognize(img),
        }
    }

    fn shutdown(&mut self) {
        match self {
            OcrEngine::Block(e) => e.shutdown(),
            OcrEngine::Sparse(e) => e.shutdown(),
        }
    }

    fn is_ready(&self) -> bool {
        match self {
            OcrEngine::Block(e) => e.is_ready(),
            OcrEngine::Sparse(e) => e.is_ready(),
        }
    }
}

/// Drops blank lines and trailing whitespace from plain-text output.
fn normalize_plain_text(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses Tesseract TSV output into raw text, word boxes and mean confidence.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Only level 5 rows are words.
pub fn parse_tsv_output(tsv: &str) -> Result<RecognitionResult, RecognitionFailure> {
    let mut rows = tsv.lines();
    match rows.next() {
        Some(header) if header.starts_with("level") => {}
        _ => {
            return Err(RecognitionFailure::UnreadableOutput(
                "missing TSV header".to_string(),
            ))
        }
    }

    let mut lines: Vec<String> = Vec::new();
    let mut words: Vec<WordBox> = Vec::new();
    let mut current_key: Option<(u32, u32, u32)> = None;
    let mut current_line: Vec<&str> = Vec::new();
    let mut conf_sum: f32 = 0.0;
    let mut conf_count: usize = 0;

    for row in rows {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let number = |i: usize| fields[i].trim().parse::<u32>().unwrap_or(0);
        let key = (number(2), number(3), number(4));
        if current_key != Some(key) {
            if !current_line.is_empty() {
                lines.push(current_line.join(" "));
            }
            current_line = Vec::new();
            current_key = Some(key);
        }
        current_line.push(text);

        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        if conf >= 0.0 {
            conf_sum += conf;
            conf_count += 1;
        }

        let (left, top) = (number(6), number(7));
        words.push(WordBox {
            text: text.to_string(),
            left,
            top,
            right: left.saturating_add(number(8)),
            bottom: top.saturating_add(number(9)),
        });
    }

    if !current_line.is_empty() {
        lines.push(current_line.join(" "));
    }

    let confidence = if conf_count > 0 {
        (conf_sum / conf_count as f32 / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(RecognitionResult {
        raw_text: lines.join("\n"),
        confidence,
        words,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn test_parse_tsv_lines_and_boxes() {
        let content = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t600\t400\t-1\t",
            "4\t1\t1\t1\t1\t0\t10\t20\t300\t30\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t20\t20\t30\t90.5\tA.",
            "5\t1\t1\t1\t1\t2\t40\t20\t30\t30\t80\t20",
            "5\t1\t1\t1\t2\t1\t10\t60\t20\t30\t70\tB.",
            "5\t1\t1\t1\t2\t2\t40\t60\t30\t30\t60.5\t05",
        ]);
        let result = parse_tsv_output(&content).unwrap();

        assert_eq!(result.raw_text, "A. 20\nB. 05");
        assert_eq!(result.words.len(), 4);
        assert_eq!(
            result.words[1],
            WordBox {
                text: "20".to_string(),
                left: 40,
                top: 20,
                right: 70,
                bottom: 50,
            }
        );
        assert!((result.confidence - 0.7525).abs() < 1e-4);
    }

    #[test]
    fn test_parse_tsv_skips_empty_and_unscored_words() {
        let content = tsv(&[
            "5\t1\t1\t1\t1\t1\t10\t20\t20\t30\t95\t ",
            "5\t1\t1\t1\t1\t2\t40\t20\t30\t30\t-1\t21",
            "5\t1\t1\t1\t1\t3\t80\t20\t30\t30\t50\t30",
        ]);
        let result = parse_tsv_output(&content).unwrap();

        assert_eq!(result.raw_text, "21 30");
        assert_eq!(result.words.len(), 2);
        assert!((result.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_parse_tsv_same_line_number_in_new_block() {
        let content = tsv(&[
            "5\t1\t1\t1\t1\t1\t10\t20\t20\t30\t90\tA.",
            "5\t1\t2\t1\t1\t1\t10\t80\t20\t30\t90\tB.",
        ]);
        assert_eq!(parse_tsv_output(&content).unwrap().raw_text, "A.\nB.");
    }

    #[test]
    fn test_parse_tsv_oversized_box_is_clamped() {
        let content = tsv(&["5\t1\t1\t1\t1\t1\t4294967000\t4294967000\t4294967295\t1000\t90\t21"]);
        let result = parse_tsv_output(&content).unwrap();
        assert_eq!(result.words[0].right, u32::MAX);
        assert_eq!(result.words[0].bottom, u32::MAX);
    }

    #[test]
    fn test_parse_tsv_empty_page() {
        let result = parse_tsv_output(&tsv(&[])).unwrap();
        assert!(result.raw_text.is_empty());
        assert!(result.words.is_empty());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_parse_tsv_rejects_garbage() {
        assert!(matches!(
            parse_tsv_output("not tsv at all"),
            Err(RecognitionFailure::UnreadableOutput(_))
        ));
    }

    #[test]
    fn test_normalize_plain_text() {
        assert_eq!(
            normalize_plain_text("A. 20 30  \n\n \nB. 05\n"),
            "A. 20 30\nB. 05"
        );
    }

    #[test]
    fn test_engine_selection() {
        let mut config = ScannerConfig::default();
        let engine = OcrEngine::from_config(&config);
        assert_eq!(engine.name(), "tesseract-block");
        assert!(!engine.is_ready());

        config.engine = EngineKind::Alternate;
        assert_eq!(OcrEngine::from_config(&config).name(), "tesseract-sparse");
    }

    #[test]
    fn test_wait_with_timeout_kills_slow_process() {
        #[cfg(unix)]
        {
            let child = Command::new("sleep")
                .arg("5")
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()
                .unwrap();
            let started = Instant::now();
            let result = wait_with_timeout(child, Duration::from_millis(100));
            assert!(matches!(result, Err(RecognitionFailure::Timeout(_))));
            assert!(started.elapsed() < Duration::from_secs(4));
        }
    }
}
