//! Persisted chapter summaries.
//!
//! Each summary is one plain-text file named `<YYYYMMDD_HHMMSS>_<title>.txt`
//! holding three header lines, a blank line and the summary body. Records
//! are append-only: a name collision gets a numeric suffix instead of
//! overwriting. The directory is created on first save, and a missing
//! directory lists as empty.

use crate::error::{RecapError, Result};
use jiff::Zoned;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const HEADER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Length of a `%Y%m%d_%H%M%S` stamp.
const FILE_STAMP_LEN: usize = 15;
const MAX_TITLE_CHARS: usize = 80;
const RECORD_EXTENSION: &str = "txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub chapter_title: String,
    pub timestamp: String,
    pub model: String,
    pub content: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SummaryStore {
    dir: PathBuf,
}

impl SummaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a new record stamped with the current local time.
    pub fn save(&self, chapter_title: &str, content: &str, model: &str) -> Result<PathBuf> {
        self.save_at(&Zoned::now(), chapter_title, content, model)
    }

    pub fn save_at(
        &self,
        now: &Zoned,
        chapter_title: &str,
        content: &str,
        model: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|err| RecapError::io(&self.dir, err))?;

        let stem = format!(
            "{}_{}",
            now.strftime(FILE_STAMP_FORMAT),
            sanitize_title(chapter_title)
        );
        let header_title = single_line(chapter_title);
        let record = format!(
            "Chapter: {}\nDate: {}\nModel: {}\n\n{}\n",
            header_title,
            now.strftime(HEADER_DATE_FORMAT),
            single_line(model),
            content
        );

        // Existing records are never opened for writing.
        let mut n = 1;
        loop {
            let path = if n == 1 {
                self.dir.join(format!("{stem}.{RECORD_EXTENSION}"))
            } else {
                self.dir.join(format!("{stem}-{n}.{RECORD_EXTENSION}"))
            };
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == IoErrorKind::AlreadyExists => {
                    n += 1;
                    continue;
                }
                Err(err) => return Err(RecapError::io(&path, err)),
            };
            file.write_all(record.as_bytes())
                .map_err(|err| RecapError::io(&path, err))?;
            info!(path = %path.display(), title = %header_title, "Saved summary");
            return Ok(path);
        }
    }

    /// All records, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<SummaryRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Summary directory does not exist yet");
                return Ok(Vec::new());
            }
            Err(err) => return Err(RecapError::io(&self.dir, err)),
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_record = path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION));
            if !is_record {
                continue;
            }
            match self.read_record(&path) {
                Ok(record) => records.push(record),
                Err(err) => warn!(path = %path.display(), "Skipping unreadable summary: {err}"),
            }
        }

        records.sort_by(|a, b| sort_key(&b.path).cmp(&sort_key(&a.path)));
        Ok(records)
    }

    /// The summary body stored at `path`.
    pub fn load(&self, path: &Path) -> Result<String> {
        Ok(self.read_record(path)?.content)
    }

    pub fn read_record(&self, path: &Path) -> Result<SummaryRecord> {
        let path = self.resolve(path);
        let raw = fs::read_to_string(&path).map_err(|err| RecapError::io(&path, err))?;
        Ok(parse_record(&raw, path))
    }

    pub fn delete(&self, path: &Path) -> Result<()> {
        let path = self.resolve(path);
        fs::remove_file(&path).map_err(|err| RecapError::io(&path, err))?;
        info!(path = %path.display(), "Deleted summary");
        Ok(())
    }

    /// Bare file names refer to records inside the store directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        let bare = path.parent().is_none_or(|parent| parent.as_os_str().is_empty());
        if bare && !path.exists() {
            self.dir.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

/// File names lead with a sortable timestamp; a `-N` collision suffix marks
/// a later save within the same second.
fn sort_key(path: &Path) -> (String, u32, String) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp: String = stem.chars().take(FILE_STAMP_LEN).collect();
    let collision = stem
        .rsplit_once('-')
        .and_then(|(_, suffix)| suffix.parse::<u32>().ok())
        .unwrap_or(1);
    (stamp, collision, stem)
}

fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_record(raw: &str, path: PathBuf) -> SummaryRecord {
    let file_stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let (stamp, fallback_title) = match file_stem.split_once('_') {
        Some((date, rest)) => match rest.split_once('_') {
            Some((time, title)) => (format!("{date}_{time}"), title.replace('_', " ")),
            None => (file_stem.clone(), String::new()),
        },
        None => (String::new(), file_stem.clone()),
    };

    let mut chapter_title = None;
    let mut timestamp = None;
    let mut model = None;
    let mut body = raw;

    let mut rest = raw;
    while let Some((line, tail)) = rest.split_once('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            body = tail;
            break;
        }
        if let Some(value) = line.strip_prefix("Chapter:") {
            chapter_title = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Date:") {
            timestamp = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Model:") {
            model = Some(value.trim().to_string());
        } else {
            // No header block; the whole file is the summary.
            break;
        }
        rest = tail;
    }
    if chapter_title.is_none() && timestamp.is_none() && model.is_none() {
        body = raw;
    }

    SummaryRecord {
        chapter_title: chapter_title.unwrap_or(fallback_title),
        timestamp: timestamp.unwrap_or(stamp),
        model: model.unwrap_or_default(),
        content: body.trim_end().to_string(),
        path,
    }
}

/// Make `title` safe for a file name.
///
/// Accents are folded to ASCII, everything outside letters, digits, spaces
/// and hyphens is dropped, and whitespace runs become single underscores.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .nfkd()
        .map(|ch| if ch.is_whitespace() { ' ' } else { ch })
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == ' ' || *ch == '-')
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_");
    let capped: String = joined.chars().take(MAX_TITLE_CHARS).collect();
    let capped = capped.trim_end_matches('_');
    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped.to_string()
    }
}
