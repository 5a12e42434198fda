//! Continuous scanning over a stream of frames.
//!
//! A scan session runs on a dedicated worker thread, feeding each new frame
//! through preprocessing, recognition and extraction. Unique number sets
//! accumulate across frames until a stop condition is met. Progress is
//! reported to the caller through an mpsc channel of `ScanEvent`s, and the
//! caller can cancel through a shared stop flag.

pub mod frames;

pub use frames::{DirectoryFrames, FrameSource};

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{ContinuousScanConfig, PreprocessConfig};
use crate::extract::NumberSetExtractor;
use crate::lottery::numbers::{merge_unique, NumberSet};
use crate::ocr::{scan_image, RecognitionFailure, TextRecognizer};

/// Longest uninterrupted sleep, so a stop request is noticed quickly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Why a scan session ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StopReason {
    /// Enough unique sets were collected
    TargetReached,
    /// Progress reached 100 %
    ProgressComplete,
    /// A frame with results was recognized confidently enough
    ConfidenceReached,
    /// The frame limit was used up
    MaxAttempts,
    /// No new frame arrived for too long
    SourceIdle,
    /// The caller asked to stop
    Cancelled,
    /// The recognition engine cannot run at all
    EngineUnavailable,
    /// The frame source failed
    SourceError(String),
}

/// Final state of a scan session.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub numbers: Vec<NumberSet>,
    /// Frames processed
    pub attempts: u32,
    /// Percent, 0-100
    pub progress: u8,
    pub stop_reason: StopReason,
}

/// Progress notifications sent while a session runs.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Started { engine: &'static str },
    FrameProcessed {
        attempt: u32,
        /// Sets found in this frame that were not seen before
        new_sets: Vec<NumberSet>,
        total_sets: usize,
        progress: u8,
        confidence: f32,
    },
    FrameFailed { attempt: u32, error: String },
    Finished(ScanSummary),
}

/// One scanning session: an engine, a frame source and the accumulated results.
pub struct ScanSession<R, S> {
    recognizer: R,
    source: S,
    extractor: NumberSetExtractor,
    preprocess: PreprocessConfig,
    config: ContinuousScanConfig,
    stop: Arc<AtomicBool>,
    numbers: Vec<NumberSet>,
    attempts: u32,
    progress: u8,
}

impl<R: TextRecognizer, S: FrameSource> ScanSession<R, S> {
    pub fn new(
        recognizer: R,
        source: S,
        extractor: NumberSetExtractor,
        preprocess: PreprocessConfig,
        config: ContinuousScanConfig,
    ) -> Self {
        Self {
            recognizer,
            source,
            extractor,
            preprocess,
            config,
            stop: Arc::new(AtomicBool::new(false)),
            numbers: Vec::new(),
            attempts: 0,
            progress: 0,
        }
    }

    /// Flag that cancels the session when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Runs until a stop condition is met. Blocks the calling thread.
    pub fn run(mut self, events: &Sender<ScanEvent>) -> ScanSummary {
        crate::log(&format!(
            "Scanner started: engine={}, interval={}ms, max_attempts={}, target={}",
            self.recognizer.name(),
            self.config.interval_ms,
            self.config.max_attempts,
            self.config.target_sets
        ));
        let _ = events.send(ScanEvent::Started {
            engine: self.recognizer.name(),
        });

        let stop_reason = self.poll_frames(events);
        self.recognizer.shutdown();

        crate::log(&format!(
            "Scanner stopped ({:?}) after {} frame(s): {} set(s), progress {}%",
            stop_reason,
            self.attempts,
            self.numbers.len(),
            self.progress
        ));

        let summary = ScanSummary {
            numbers: self.numbers,
            attempts: self.attempts,
            progress: self.progress,
            stop_reason,
        };
        let _ = events.send(ScanEvent::Finished(summary.clone()));
        summary
    }

    fn poll_frames(&mut self, events: &Sender<ScanEvent>) -> StopReason {
        let interval = Duration::from_millis(self.config.interval_ms);
        let mut idle_polls: u32 = 0;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                return StopReason::Cancelled;
            }
            if self.attempts >= self.config.max_attempts {
                return StopReason::MaxAttempts;
            }

            let frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    crate::log(&format!("Scanner: frame source failed: {:#}", e));
                    return StopReason::SourceError(format!("{:#}", e));
                }
            };

            let Some(bytes) = frame else {
                idle_polls += 1;
                if idle_polls >= self.config.max_idle_polls {
                    return StopReason::SourceIdle;
                }
                self.sleep(interval);
                continue;
            };
            idle_polls = 0;

            if let Some(reason) = self.process_frame(&bytes, events) {
                return reason;
            }
            self.sleep(interval);
        }
    }

    /// Scans one frame and returns a stop reason if the session is done.
    fn process_frame(&mut self, bytes: &[u8], events: &Sender<ScanEvent>) -> Option<StopReason> {
        self.attempts += 1;
        let attempt = self.attempts;

        let outcome = match scan_image(bytes, &mut self.recognizer, &self.extractor, &self.preprocess)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                crate::log(&format!("Scanner: frame {} failed: {:#}", attempt, e));
                let _ = events.send(ScanEvent::FrameFailed {
                    attempt,
                    error: format!("{:#}", e),
                });
                if matches!(
                    e.downcast_ref::<RecognitionFailure>(),
                    Some(RecognitionFailure::NotAvailable)
                ) {
                    return Some(StopReason::EngineUnavailable);
                }
                return None;
            }
        };

        let found_any = !outcome.numbers.is_empty();
        let before = self.numbers.len();
        let added = merge_unique(&mut self.numbers, outcome.numbers);
        let new_sets = self.numbers[before..].to_vec();
        if found_any {
            self.progress = self
                .progress
                .saturating_add(self.config.progress_step)
                .min(100);
        }

        crate::log_debug(&format!(
            "Frame {}: {} new set(s), {} total, progress {}%",
            attempt,
            added,
            self.numbers.len(),
            self.progress
        ));
        let _ = events.send(ScanEvent::FrameProcessed {
            attempt,
            new_sets,
            total_sets: self.numbers.len(),
            progress: self.progress,
            confidence: outcome.confidence,
        });

        if self.numbers.len() >= self.config.target_sets {
            Some(StopReason::TargetReached)
        } else if self.progress >= 100 {
            Some(StopReason::ProgressComplete)
        } else if found_any && outcome.confidence >= self.config.stop_confidence {
            Some(StopReason::ConfidenceReached)
        } else {
            None
        }
    }

    /// Sleeps for `duration`, waking early when a stop is requested.
    fn sleep(&self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() && !self.stop.load(Ordering::SeqCst) {
            let slice = remaining.min(SLEEP_SLICE);
            thread::sleep(slice);
            remaining -= slice;
        }
    }
}

/// Handle to a scan session running on its own thread.
pub struct ScannerHandle {
    pub events: Receiver<ScanEvent>,
    stop: Arc<AtomicBool>,
    thread: JoinHandle<ScanSummary>,
}

impl ScannerHandle {
    /// Asks the session to stop after the current frame.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Waits for the session to finish.
    pub fn join(self) -> Result<ScanSummary> {
        self.thread
            .join()
            .map_err(|_| anyhow!("Scanner thread panicked"))
    }
}

/// Starts `session` on a dedicated worker thread.
pub fn spawn_scanner<R, S>(session: ScanSession<R, S>) -> Result<ScannerHandle>
where
    R: TextRecognizer + Send + 'static,
    S: FrameSource + Send + 'static,
{
    let (sender, receiver) = channel();
    let stop = session.stop_flag();
    let thread = thread::Builder::new()
        .name("scanner".to_string())
        .spawn(move || session.run(&sender))?;

    Ok(ScannerHandle {
        events: receiver,
        stop,
        thread,
    })
}
