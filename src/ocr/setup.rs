use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::log;
use crate::paths::get_tesseract_dir;

/// Language data the engines load.
pub const LANGUAGE: &str = "eng";

/// Where Tesseract was found on this machine.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// None lets Tesseract use its compiled-in data location
    pub tessdata: Option<PathBuf>,
}

/// Locates the Tesseract executable and language data.
///
/// Returns None when no executable can be found.
pub fn locate_tesseract() -> Option<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    let tessdata = find_tessdata_dir();

    log(&format!("Tesseract found at: {}", executable.display()));
    match &tessdata {
        Some(dir) => log(&format!("Using tessdata: {}", dir.display())),
        None => log("No tessdata directory found, using Tesseract's default"),
    }

    Some(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable, checking our local dir first, then PATH, then common installs.
pub fn find_tesseract_executable() -> Option<PathBuf> {
    let local_exe = get_tesseract_dir().join(format!("tesseract{}", std::env::consts::EXE_SUFFIX));
    if local_exe.exists() {
        return Some(local_exe);
    }

    let on_path = Command::new("tesseract")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false);
    if on_path {
        return Some(PathBuf::from("tesseract"));
    }

    let common_paths = [
        "/usr/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/opt/homebrew/bin/tesseract",
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    ];
    common_paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Finds a tessdata directory holding the English model.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let mut candidates = vec![get_tesseract_dir().join("tessdata")];

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates.extend(
        [
            "/usr/share/tesseract-ocr/5/tessdata",
            "/usr/share/tesseract-ocr/4.00/tessdata",
            "/usr/share/tessdata",
            "/usr/local/share/tessdata",
            "/opt/homebrew/share/tessdata",
            r"C:\Program Files\Tesseract-OCR\tessdata",
            r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
        ]
        .iter()
        .map(PathBuf::from),
    );

    first_tessdata_dir(&candidates)
}

/// First candidate that contains the language model.
fn first_tessdata_dir(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|dir| has_language(dir)).cloned()
}

fn has_language(dir: &Path) -> bool {
    dir.join(format!("{}.traineddata", LANGUAGE)).is_file()
}
