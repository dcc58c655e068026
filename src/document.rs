//! Document backends consumed by the extractor.
//!
//! The extractor only talks to [`DocumentHandle`]. Backends declare up front
//! whether they can return text between two position markers; callers never
//! probe for optional methods.
//!
//! - [`EpubDocument`] is reflowable: every spine item is one page and
//!   positional extraction is supported.
//! - [`PlainTextDocument`] is fixed-layout: text is paginated once at open
//!   time and chapters are detected from heading lines.

use crate::config::AppConfig;
use crate::pagination::paginate;
use crate::toc::TocEntry;
use anyhow::{Context, Result, bail};
use epub::doc::{EpubDoc, NavPoint};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Stable location inside a reflowable document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionMarker {
    pub page: usize,
}

/// Capability object for a host document. Pages are 1-based.
///
/// Every text-returning call may come back empty; callers must tolerate that
/// per call.
pub trait DocumentHandle {
    fn toc(&self) -> Vec<TocEntry>;

    fn page_count(&self) -> usize;

    fn supports_positional_text(&self) -> bool;

    fn resolve_position(&self, page: usize) -> Option<PositionMarker>;

    /// Text from the start of `start` through the end of the page `end`
    /// points into.
    fn text_between(&self, start: &PositionMarker, end: &PositionMarker) -> Option<String>;

    fn page_text(&self, page: usize) -> Option<String>;
}

/// Open `path` with the backend matching its extension.
pub fn open_document(path: &Path, config: &AppConfig) -> Result<Box<dyn DocumentHandle>> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "epub" => Ok(Box::new(EpubDocument::open(path)?)),
        "txt" | "md" | "markdown" => Ok(Box::new(PlainTextDocument::open(
            path,
            config.text_page_chars,
        )?)),
        other => bail!(
            "Unsupported document type '{}' for {}",
            other,
            path.display()
        ),
    }
}

pub struct EpubDocument {
    pages: Vec<Option<String>>,
    toc: Vec<TocEntry>,
}

impl EpubDocument {
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Opening EPUB");
        let mut doc = EpubDoc::new(path)
            .with_context(|| format!("Failed to open EPUB at {}", path.display()))?;

        let mut toc = Vec::new();
        flatten_nav(&doc, &doc.toc, 0, &mut toc);

        let mut pages = Vec::new();
        loop {
            let page = doc.get_current_str().and_then(|(html, _mime)| {
                match html2text::from_read(html.as_bytes(), 10_000) {
                    Ok(text) => Some(text),
                    Err(err) => {
                        warn!(page = pages.len() + 1, "html2text failed: {err}");
                        None
                    }
                }
            });
            pages.push(page);
            if !doc.go_next() {
                break;
            }
        }

        info!(
            path = %path.display(),
            pages = pages.len(),
            toc_entries = toc.len(),
            "Loaded EPUB"
        );
        Ok(Self { pages, toc })
    }
}

/// Depth-first walk of the nav tree; targets outside the spine are dropped.
fn flatten_nav<R: Read + Seek>(
    doc: &EpubDoc<R>,
    points: &[NavPoint],
    depth: usize,
    out: &mut Vec<TocEntry>,
) {
    for point in points {
        let target = point.content.to_string_lossy();
        let resource = PathBuf::from(target.split('#').next().unwrap_or_default());
        match doc.resource_uri_to_chapter(&resource) {
            Some(idx) => out.push(TocEntry::new(point.label.trim(), idx + 1, depth)),
            None => debug!(label = %point.label, target = %target, "TOC target not in spine"),
        }
        flatten_nav(doc, &point.children, depth + 1, out);
    }
}

impl DocumentHandle for EpubDocument {
    fn toc(&self) -> Vec<TocEntry> {
        self.toc.clone()
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn supports_positional_text(&self) -> bool {
        true
    }

    fn resolve_position(&self, page: usize) -> Option<PositionMarker> {
        (1..=self.pages.len())
            .contains(&page)
            .then_some(PositionMarker { page })
    }

    fn text_between(&self, start: &PositionMarker, end: &PositionMarker) -> Option<String> {
        let first = start.page.checked_sub(1)?;
        if first >= end.page || end.page > self.pages.len() {
            return None;
        }
        let parts: Vec<&str> = self.pages[first..end.page]
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }

    fn page_text(&self, page: usize) -> Option<String> {
        self.pages.get(page.checked_sub(1)?)?.clone()
    }
}

const HEADING_NUMBER: &str = r"([0-9]+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty|thirty|forty|fifty)";

static RE_MD_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#\s+\S").unwrap());
static RE_MD_CHAPTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^##\s+\S").unwrap());
static RE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)^(part|book)\s+{HEADING_NUMBER}\b")).unwrap());
static RE_CHAPTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^((chapter|chap\.)\s+{HEADING_NUMBER}\b|(prologue|epilogue)\s*$)"
    ))
    .unwrap()
});
static RE_CJK_CHAPTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^第\s*[0-9一二三四五六七八九十百千万]+\s*[章回节]").unwrap());

/// Headings longer than this are treated as prose.
const MAX_HEADING_CHARS: usize = 80;

pub struct PlainTextDocument {
    pages: Vec<String>,
    toc: Vec<TocEntry>,
}

impl PlainTextDocument {
    pub fn open(path: &Path, page_chars: usize) -> Result<Self> {
        info!(path = %path.display(), "Loading plain text content");
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc = Self::from_text(&data, page_chars);
        info!(
            pages = doc.pages.len(),
            toc_entries = doc.toc.len(),
            "Finished loading plain text content"
        );
        Ok(doc)
    }

    pub fn from_text(text: &str, page_chars: usize) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let pages = paginate(text, page_chars);
        let toc = detect_headings(&pages);
        Self { pages, toc }
    }
}

fn detect_headings(pages: &[String]) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        for line in page.lines() {
            let line = line.trim();
            if line.is_empty() || line.chars().count() > MAX_HEADING_CHARS {
                continue;
            }
            if let Some(depth) = heading_depth(line) {
                let title = line.trim_start_matches('#').trim();
                toc.push(TocEntry::new(title, idx + 1, depth));
            }
        }
    }
    toc
}

fn heading_depth(line: &str) -> Option<usize> {
    if RE_MD_CHAPTER.is_match(line) {
        Some(1)
    } else if RE_MD_PART.is_match(line) || RE_PART.is_match(line) {
        Some(0)
    } else if RE_CHAPTER.is_match(line) || RE_CJK_CHAPTER.is_match(line) {
        Some(1)
    } else {
        None
    }
}

impl DocumentHandle for PlainTextDocument {
    fn toc(&self) -> Vec<TocEntry> {
        self.toc.clone()
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn supports_positional_text(&self) -> bool {
        false
    }

    fn resolve_position(&self, _page: usize) -> Option<PositionMarker> {
        None
    }

    fn text_between(&self, _start: &PositionMarker, _end: &PositionMarker) -> Option<String> {
        None
    }

    fn page_text(&self, page: usize) -> Option<String> {
        self.pages.get(page.checked_sub(1)?).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> String {
        let filler = "Lorem ipsum dolor sit amet. ".repeat(12);
        [
            "Part One",
            "Chapter 1: Arrival",
            filler.as_str(),
            filler.as_str(),
            "Chapter 2",
            filler.as_str(),
            "Part Two",
            "CHAPTER III The Storm",
            filler.as_str(),
        ]
        .join("\n\n")
    }

    #[test]
    fn detects_parts_and_chapters_with_depth() {
        let doc = PlainTextDocument::from_text(&book(), 400);
        let toc = doc.toc();
        let titles: Vec<(&str, usize)> = toc
            .iter()
            .map(|entry| (entry.title.as_str(), entry.depth))
            .collect();
        assert_eq!(
            titles,
            vec![
                ("Part One", 0),
                ("Chapter 1: Arrival", 1),
                ("Chapter 2", 1),
                ("Part Two", 0),
                ("CHAPTER III The Storm", 1),
            ]
        );
        assert!(toc.windows(2).all(|pair| pair[0].page <= pair[1].page));
        assert_eq!(toc[0].page, 1);
    }

    #[test]
    fn markdown_headings_are_recognized() {
        let doc = PlainTextDocument::from_text("# Book\n\n## First\n\nbody\n\n## Second\n\nmore", 5000);
        let toc = doc.toc();
        assert_eq!(toc.len(), 3);
        assert_eq!(toc[0], TocEntry::new("Book", 1, 0));
        assert_eq!(toc[2], TocEntry::new("Second", 1, 1));
    }

    #[test]
    fn prose_mentioning_chapters_is_ignored() {
        let doc = PlainTextDocument::from_text(
            "Chapter and verse, he said.\n\nBook of hours.\n\nPrologue to a longer argument.",
            5000,
        );
        assert!(doc.toc().is_empty());
    }

    #[test]
    fn plain_text_is_fixed_layout() {
        let doc = PlainTextDocument::from_text(&book(), 400);
        assert!(!doc.supports_positional_text());
        assert!(doc.resolve_position(1).is_none());
        assert!(doc.page_text(0).is_none());
        assert!(doc.page_text(doc.page_count() + 1).is_none());
        assert!(
            doc.page_text(1)
                .expect("first page exists")
                .starts_with("Part One")
        );
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = open_document(Path::new("book.pdf"), &AppConfig::default())
            .err()
            .expect("pdf is not supported");
        assert!(err.to_string().contains("pdf"));
    }

    fn spine(pages: &[Option<&str>]) -> EpubDocument {
        EpubDocument {
            pages: pages.iter().map(|page| page.map(str::to_string)).collect(),
            toc: vec![TocEntry::new("One", 1, 0)],
        }
    }

    #[test]
    fn epub_text_between_is_inclusive_and_skips_unreadable_items() {
        let doc = spine(&[Some("first"), None, Some("third"), Some("fourth")]);
        assert!(doc.supports_positional_text());
        let start = doc.resolve_position(1).expect("page 1 resolves");
        let end = doc.resolve_position(3).expect("page 3 resolves");
        assert_eq!(
            doc.text_between(&start, &end).as_deref(),
            Some("first\n\nthird")
        );
        let single = PositionMarker { page: 4 };
        assert_eq!(doc.text_between(&single, &single).as_deref(), Some("fourth"));
    }

    #[test]
    fn epub_text_between_rejects_bad_ranges() {
        let doc = spine(&[Some("first"), Some("second")]);
        let zero = PositionMarker { page: 0 };
        let one = PositionMarker { page: 1 };
        let two = PositionMarker { page: 2 };
        let past = PositionMarker { page: 3 };
        assert_eq!(doc.text_between(&zero, &one), None);
        assert_eq!(doc.text_between(&zero, &zero), None);
        assert_eq!(doc.text_between(&two, &one), None);
        assert_eq!(doc.text_between(&one, &past), None);
        assert!(doc.resolve_position(0).is_none());
        assert!(doc.resolve_position(3).is_none());

        let unreadable = spine(&[None, None]);
        assert_eq!(unreadable.text_between(&one, &two), None);
    }

    #[test]
    fn epub_page_text_is_one_based() {
        let doc = spine(&[Some("first"), None]);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_text(0), None);
        assert_eq!(doc.page_text(1).as_deref(), Some("first"));
        assert_eq!(doc.page_text(2), None);
        assert_eq!(doc.page_text(3), None);
    }

    const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    const CONTENT_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Harbor Tales</dc:title>
    <dc:identifier id="bookid">urn:uuid:12345678-1234-1234-1234-123456789abc</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch3" href="ch3.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
    <itemref idref="ch3"/>
  </spine>
</package>"#;

    const TOC_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:12345678-1234-1234-1234-123456789abc"/></head>
  <docTitle><text>Harbor Tales</text></docTitle>
  <navMap>
    <navPoint id="p1" playOrder="1">
      <navLabel><text>Part One</text></navLabel>
      <content src="ch1.xhtml"/>
      <navPoint id="c1" playOrder="2">
        <navLabel><text> Dawn </text></navLabel>
        <content src="ch2.xhtml#start"/>
      </navPoint>
      <navPoint id="gone" playOrder="3">
        <navLabel><text>Missing</text></navLabel>
        <content src="missing.xhtml"/>
      </navPoint>
    </navPoint>
    <navPoint id="p2" playOrder="4">
      <navLabel><text>Part Two</text></navLabel>
      <content src="ch3.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

    fn chapter(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>x</title></head>
<body><p>{body}</p></body></html>"#
        )
    }

    fn write_epub(path: &Path) {
        use std::io::Write;
        use zip::CompressionMethod;
        use zip::write::{FileOptions, ZipWriter};

        let file = fs::File::create(path).expect("create epub");
        let mut zip = ZipWriter::new(file);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let entries = [
            ("mimetype", "application/epub+zip".to_string()),
            ("META-INF/container.xml", CONTAINER_XML.to_string()),
            ("OEBPS/content.opf", CONTENT_OPF.to_string()),
            ("OEBPS/toc.ncx", TOC_NCX.to_string()),
            ("OEBPS/ch1.xhtml", chapter("Gulls circled the harbor.")),
            ("OEBPS/ch2.xhtml", chapter("The fishing boats left at dawn.")),
            ("OEBPS/ch3.xhtml", chapter("Years later the town had changed.")),
        ];
        for (name, contents) in entries {
            zip.start_file(name, stored).expect("start zip entry");
            zip.write_all(contents.as_bytes()).expect("write zip entry");
        }
        zip.finish().expect("finish epub");
    }

    #[test]
    fn opens_epub_with_nested_navigation() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("harbor.epub");
        write_epub(&path);

        let doc = open_document(&path, &AppConfig::default()).expect("epub opens");
        assert!(doc.supports_positional_text());
        assert_eq!(doc.page_count(), 3);
        assert_eq!(
            doc.toc(),
            vec![
                TocEntry::new("Part One", 1, 0),
                TocEntry::new("Dawn", 2, 1),
                TocEntry::new("Part Two", 3, 0),
            ]
        );
        assert!(
            doc.page_text(2)
                .expect("spine item 2 readable")
                .contains("The fishing boats left at dawn.")
        );

        let start = doc.resolve_position(1).expect("start resolves");
        let end = doc.resolve_position(2).expect("end resolves");
        let text = doc.text_between(&start, &end).expect("positional text");
        assert!(text.contains("Gulls circled the harbor."));
        assert!(text.contains("The fishing boats left at dawn."));
        assert!(!text.contains("Years later"));
    }
}
