//! Frame sources for the continuous scanner.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Supplies encoded image frames, one at a time.
pub trait FrameSource {
    /// The next unseen frame, or None when nothing new is available yet.
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>>;
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Image files appearing in a directory, each yielded once in name order.
///
/// A camera or capture tool writes frames into the directory; files already
/// present when the source is created are yielded too. A file modified
/// within the last `settle` is assumed to be still in progress and is left
/// for a later poll.
pub struct DirectoryFrames {
    dir: PathBuf,
    settle: Duration,
    seen: HashSet<PathBuf>,
}

impl DirectoryFrames {
    pub fn new(dir: impl Into<PathBuf>, settle: Duration) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!("Frame directory not found: {}", dir.display());
        }
        Ok(Self {
            dir,
            settle,
            seen: HashSet::new(),
        })
    }

    /// True once the file has not been modified for `settle`.
    fn is_settled(&self, path: &Path) -> bool {
        if self.settle.is_zero() {
            return true;
        }
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_none_or(|age| age >= self.settle)
    }

    fn pending_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image_file(path) && !self.seen.contains(path))
            .filter(|path| {
                let settled = self.is_settled(path);
                if !settled {
                    crate::log_debug(&format!("Frame {} still being written", path.display()));
                }
                settled
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

impl FrameSource for DirectoryFrames {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.pending_files()?.into_iter().next() else {
            return Ok(None);
        };

        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read frame {}", path.display()))?;
        self.seen.insert(path.clone());
        crate::log_debug(&format!("Frame {} ({} bytes)", path.display(), bytes.len()));
        Ok(Some(bytes))
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
