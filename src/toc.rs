//! Table-of-contents model and chapter boundary resolution.
//!
//! A TOC is a flat list in document order where `depth` carries nesting
//! (0 = top level). Page numbers are 1-based and are not required to be
//! monotonic; the locator tolerates out-of-order entries.

use crate::error::{RecapError, Result};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub page: usize,
    pub depth: usize,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, page: usize, depth: usize) -> Self {
        Self {
            title: title.into(),
            page,
            depth,
        }
    }
}

/// Inclusive page range attributed to one TOC entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSpan {
    pub title: String,
    pub start_page: usize,
    pub end_page: usize,
    pub depth: usize,
}

impl ChapterSpan {
    pub fn page_count(&self) -> usize {
        self.end_page - self.start_page + 1
    }
}

/// Resolve the chapter enclosing `current_page`.
///
/// The enclosing entry is the last one in TOC order whose page is at or
/// before `current_page`, so entries sharing a page resolve to the later
/// one. The chapter ends one page before the next later entry at the same or
/// a shallower depth, or at `last_page` when no such entry exists.
pub fn locate(toc: &[TocEntry], current_page: usize, last_page: usize) -> Result<ChapterSpan> {
    if toc.is_empty() {
        return Err(RecapError::NoTableOfContents);
    }

    let current_idx = toc
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.page <= current_page)
        .map(|(idx, _)| idx)
        .last()
        .ok_or(RecapError::ChapterNotDetermined { page: current_page })?;
    let current = &toc[current_idx];

    let boundary = toc[current_idx + 1..]
        .iter()
        .find(|entry| entry.depth <= current.depth);

    // Every later entry lies past `current_page`, so `page - 1` never drops
    // below the start page.
    let end_page = match boundary {
        Some(next) => next.page.saturating_sub(1).min(last_page),
        None => last_page,
    }
    .max(current.page);

    debug!(
        title = %current.title,
        start = current.page,
        end = end_page,
        depth = current.depth,
        "Located chapter"
    );

    Ok(ChapterSpan {
        title: current.title.clone(),
        start_page: current.page,
        end_page,
        depth: current.depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample_toc() -> Vec<TocEntry> {
        vec![
            TocEntry::new("A", 1, 0),
            TocEntry::new("B", 10, 1),
            TocEntry::new("C", 10, 0),
            TocEntry::new("D", 20, 0),
        ]
    }

    #[test]
    fn later_entry_wins_page_tie_and_sibling_bounds_end() {
        let span = locate(&sample_toc(), 12, 40).expect("chapter should resolve");
        assert_eq!(
            span,
            ChapterSpan {
                title: "C".to_string(),
                start_page: 10,
                end_page: 19,
                depth: 0,
            }
        );
    }

    #[test]
    fn last_chapter_runs_to_document_end() {
        let span = locate(&sample_toc(), 25, 40).expect("chapter should resolve");
        assert_eq!(span.title, "D");
        assert_eq!((span.start_page, span.end_page), (20, 40));
        assert_eq!(span.page_count(), 21);
    }

    #[test]
    fn deeper_entries_do_not_bound_a_parent() {
        let toc = vec![
            TocEntry::new("Part I", 1, 0),
            TocEntry::new("Chapter 1", 2, 1),
            TocEntry::new("Section 1.1", 5, 2),
            TocEntry::new("Chapter 2", 9, 1),
            TocEntry::new("Part II", 30, 0),
        ];
        let span = locate(&toc, 3, 50).expect("chapter should resolve");
        assert_eq!(span.title, "Chapter 1");
        assert_eq!(span.end_page, 8);

        let span = locate(&toc, 12, 50).expect("chapter should resolve");
        assert_eq!(span.title, "Chapter 2");
        assert_eq!(span.end_page, 29);
    }

    #[test]
    fn empty_toc_is_reported() {
        let err = locate(&[], 3, 10).expect_err("empty toc must fail");
        assert_eq!(err.kind(), ErrorKind::NoTableOfContents);
    }

    #[test]
    fn page_before_first_entry_is_not_determined() {
        let toc = vec![TocEntry::new("One", 5, 0), TocEntry::new("Two", 9, 0)];
        let err = locate(&toc, 3, 20).expect_err("page precedes toc");
        assert_eq!(err.kind(), ErrorKind::ChapterNotDetermined);
    }

    #[test]
    fn tolerates_out_of_order_pages() {
        let toc = vec![
            TocEntry::new("Intro", 3, 0),
            TocEntry::new("Appendix", 40, 0),
            TocEntry::new("Body", 8, 0),
            TocEntry::new("Notes", 60, 0),
        ];
        let span = locate(&toc, 10, 80).expect("chapter should resolve");
        assert_eq!(span.title, "Body");
        assert_eq!((span.start_page, span.end_page), (8, 59));
    }

    #[test]
    fn spans_stay_within_document_for_every_page() {
        let toc = vec![
            TocEntry::new("Cover", 1, 0),
            TocEntry::new("One", 2, 0),
            TocEntry::new("One.a", 2, 1),
            TocEntry::new("One.b", 6, 1),
            TocEntry::new("Two", 11, 0),
            TocEntry::new("Three", 11, 0),
            TocEntry::new("Four", 15, 0),
        ];
        let last_page = 18;
        for page in 1..=last_page {
            let span = locate(&toc, page, last_page).expect("chapter should resolve");
            assert!(span.start_page <= page, "page {page}: {span:?}");
            assert!(span.start_page <= span.end_page, "page {page}: {span:?}");
            assert!(span.end_page <= last_page, "page {page}: {span:?}");
        }
    }
}
