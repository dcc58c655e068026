//! Chapter text extraction.
//!
//! The positional strategy asks the document for everything between the
//! chapter's start and end markers in one call. When the document cannot do
//! that, or the call comes back empty, pages are read one at a time instead.
//! Page-by-page reading is capped at [`MAX_PAGINATED_SPAN`] pages past the
//! start so a TOC entry spanning the whole book stays affordable; the cut is
//! silent because a partial chapter still summarizes usefully.

use crate::document::DocumentHandle;
use crate::error::{RecapError, Result};
use crate::toc::ChapterSpan;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

/// Pages past `start_page` the paginated strategy may read.
pub const MAX_PAGINATED_SPAN: usize = 50;

const PAGE_SEPARATOR: &str = "\n\n";

static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());
static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    Positional,
    Paginated,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExtractionStrategy::Positional => "positional",
            ExtractionStrategy::Paginated => "paginated",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub strategy: ExtractionStrategy,
}

impl ExtractionResult {
    pub fn byte_len(&self) -> usize {
        self.text.len()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Extract and normalize the text of `span`.
pub fn extract(span: &ChapterSpan, doc: &dyn DocumentHandle) -> Result<ExtractionResult> {
    let (raw, strategy) = match positional_text(span, doc) {
        Some(text) => (text, ExtractionStrategy::Positional),
        None => (paginated_text(span, doc), ExtractionStrategy::Paginated),
    };

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        warn!(title = %span.title, %strategy, "Chapter extraction produced no text");
        return Err(RecapError::ExtractionFailed {
            title: span.title.clone(),
        });
    }

    let result = ExtractionResult { text, strategy };
    info!(
        title = %span.title,
        %strategy,
        bytes = result.byte_len(),
        chars = result.char_count(),
        "Extracted chapter text"
    );
    Ok(result)
}

fn positional_text(span: &ChapterSpan, doc: &dyn DocumentHandle) -> Option<String> {
    if !doc.supports_positional_text() {
        return None;
    }
    let Some(start) = doc.resolve_position(span.start_page) else {
        debug!(page = span.start_page, "Start marker did not resolve");
        return None;
    };
    let Some(end) = doc.resolve_position(span.end_page) else {
        debug!(page = span.end_page, "End marker did not resolve");
        return None;
    };
    match doc.text_between(&start, &end) {
        Some(text) if !text.trim().is_empty() => Some(text),
        _ => {
            debug!(
                start = span.start_page,
                end = span.end_page,
                "Positional text unavailable, falling back to pages"
            );
            None
        }
    }
}

fn paginated_text(span: &ChapterSpan, doc: &dyn DocumentHandle) -> String {
    let last = span
        .end_page
        .min(span.start_page.saturating_add(MAX_PAGINATED_SPAN));
    if last < span.end_page {
        debug!(
            requested_end = span.end_page,
            capped_end = last,
            "Capping paginated extraction"
        );
    }

    let mut parts = Vec::new();
    for page in span.start_page..=last {
        match doc.page_text(page) {
            Some(text) if !text.trim().is_empty() => parts.push(text),
            Some(_) => debug!(page, "Skipping blank page"),
            None => debug!(page, "Skipping page whose text could not be read"),
        }
    }
    parts.join(PAGE_SEPARATOR)
}

/// Normalize line endings, squeeze horizontal whitespace runs to one space
/// and cap blank-line runs at one empty line.
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let squeezed = RE_HORIZONTAL_WS.replace_all(&unified, " ");
    let collapsed = RE_EXCESS_NEWLINES.replace_all(&squeezed, "\n\n");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PositionMarker;
    use crate::error::ErrorKind;
    use crate::toc::TocEntry;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct MockDocument {
        pages: usize,
        positional: bool,
        positional_text: Option<String>,
        unresolvable: HashSet<usize>,
        failing_pages: HashSet<usize>,
        page_requests: Arc<Mutex<Vec<usize>>>,
        between_calls: Arc<Mutex<usize>>,
    }

    impl MockDocument {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                positional: false,
                positional_text: None,
                unresolvable: HashSet::new(),
                failing_pages: HashSet::new(),
                page_requests: Arc::new(Mutex::new(Vec::new())),
                between_calls: Arc::new(Mutex::new(0)),
            }
        }

        fn reflowable(mut self, text: &str) -> Self {
            self.positional = true;
            self.positional_text = Some(text.to_string());
            self
        }

        fn page_requests(&self) -> Vec<usize> {
            self.page_requests
                .lock()
                .expect("page_requests lock should be available")
                .clone()
        }

        fn between_calls(&self) -> usize {
            *self
                .between_calls
                .lock()
                .expect("between_calls lock should be available")
        }
    }

    impl DocumentHandle for MockDocument {
        fn toc(&self) -> Vec<TocEntry> {
            Vec::new()
        }

        fn page_count(&self) -> usize {
            self.pages
        }

        fn supports_positional_text(&self) -> bool {
            self.positional
        }

        fn resolve_position(&self, page: usize) -> Option<PositionMarker> {
            (!self.unresolvable.contains(&page)).then_some(PositionMarker { page })
        }

        fn text_between(&self, _start: &PositionMarker, _end: &PositionMarker) -> Option<String> {
            *self
                .between_calls
                .lock()
                .expect("between_calls lock should be available") += 1;
            self.positional_text.clone()
        }

        fn page_text(&self, page: usize) -> Option<String> {
            self.page_requests
                .lock()
                .expect("page_requests lock should be available")
                .push(page);
            if page > self.pages || self.failing_pages.contains(&page) {
                return None;
            }
            Some(format!("Page {page} text."))
        }
    }

    fn span(start: usize, end: usize) -> ChapterSpan {
        ChapterSpan {
            title: "Chapter".to_string(),
            start_page: start,
            end_page: end,
            depth: 0,
        }
    }

    #[test]
    fn positional_strategy_used_when_supported() {
        let doc = MockDocument::new(20).reflowable("Whole   chapter\r\n\r\n\r\n\r\nbody");
        let result = extract(&span(3, 9), &doc).expect("extraction should succeed");
        assert_eq!(result.strategy, ExtractionStrategy::Positional);
        assert_eq!(result.text, "Whole chapter\n\nbody");
        assert!(doc.page_requests().is_empty());
        assert_eq!(doc.between_calls(), 1);
    }

    #[test]
    fn unresolved_marker_falls_back_to_pages() {
        let mut doc = MockDocument::new(20).reflowable("unused");
        doc.unresolvable.insert(9);
        let result = extract(&span(3, 9), &doc).expect("extraction should succeed");
        assert_eq!(result.strategy, ExtractionStrategy::Paginated);
        assert_eq!(doc.between_calls(), 0);
        assert_eq!(doc.page_requests(), (3..=9).collect::<Vec<_>>());
    }

    #[test]
    fn failed_positional_call_falls_back_to_pages() {
        let mut doc = MockDocument::new(20);
        doc.positional = true;
        let result = extract(&span(1, 2), &doc).expect("extraction should succeed");
        assert_eq!(result.strategy, ExtractionStrategy::Paginated);
        assert_eq!(result.text, "Page 1 text.\n\nPage 2 text.");
    }

    #[test]
    fn paginated_reads_at_most_fifty_one_pages() {
        let doc = MockDocument::new(1000);
        let result = extract(&span(10, 900), &doc).expect("extraction should succeed");
        let requested = doc.page_requests();
        assert_eq!(requested.len(), MAX_PAGINATED_SPAN + 1);
        assert_eq!(requested.first(), Some(&10));
        assert_eq!(requested.last(), Some(&60));
        assert!(result.text.ends_with("Page 60 text."));
    }

    #[test]
    fn failing_pages_are_skipped() {
        let mut doc = MockDocument::new(10);
        doc.failing_pages.extend([2, 4]);
        let result = extract(&span(1, 5), &doc).expect("extraction should succeed");
        assert_eq!(
            result.text,
            "Page 1 text.\n\nPage 3 text.\n\nPage 5 text."
        );
        assert_eq!(doc.page_requests(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn nothing_extracted_is_a_recoverable_error() {
        let mut doc = MockDocument::new(10);
        doc.failing_pages.extend(1..=10);
        let err = extract(&span(4, 6), &doc).expect_err("no page yields text");
        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
    }

    #[test]
    fn normalization_rules() {
        assert_eq!(
            normalize_whitespace("a \t\u{00A0} b\r\nc\rd\n\n\n\n\ne"),
            "a b\nc\nd\n\ne"
        );
        assert_eq!(normalize_whitespace("x\n\ny"), "x\n\ny");
    }
}
