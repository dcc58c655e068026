//! Per-book cache remembering where the reader last asked for a summary.
//!
//! Files live under `<cache_dir>/<sha256 of book path>/bookmark.toml` so odd
//! book paths never leak into file names. Errors are ignored on both sides:
//! a lost bookmark only means starting from page 1.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub page: usize,
    #[serde(default)]
    pub last_summary: Option<PathBuf>,
}

pub fn load_bookmark(cache_dir: &Path, book: &Path) -> Option<Bookmark> {
    let path = bookmark_path(cache_dir, book);
    let data = fs::read_to_string(&path).ok()?;
    match toml::from_str(&data) {
        Ok(bookmark) => Some(bookmark),
        Err(err) => {
            debug!(path = %path.display(), "Ignoring corrupt bookmark: {err}");
            None
        }
    }
}

pub fn save_bookmark(cache_dir: &Path, book: &Path, bookmark: &Bookmark) {
    let path = bookmark_path(cache_dir, book);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(contents) = toml::to_string(bookmark) {
        if let Err(err) = fs::write(&path, contents) {
            debug!(path = %path.display(), "Failed to write bookmark: {err}");
        }
    }
}

fn book_dir(cache_dir: &Path, book: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(book.as_os_str().to_string_lossy().as_bytes());
    cache_dir.join(format!("{:x}", hasher.finalize()))
}

fn bookmark_path(cache_dir: &Path, book: &Path) -> PathBuf {
    book_dir(cache_dir, book).join("bookmark.toml")
}
