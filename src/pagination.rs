//! Fixed-size pagination for plain-text books.
//!
//! Plain text has no intrinsic pages, so one is synthesized: paragraphs are
//! packed into pages of roughly `page_chars` characters. Paragraphs are never
//! split, which keeps chapter headings at the start of a line.

/// Smallest page size accepted from configuration.
pub const MIN_PAGE_CHARS: usize = 200;
/// Largest page size accepted from configuration.
pub const MAX_PAGE_CHARS: usize = 20_000;

/// Split `text` into pages of about `page_chars` characters.
///
/// An oversized paragraph gets a page of its own. Empty input yields a single
/// empty page so page numbering always starts at 1.
pub fn paginate(text: &str, page_chars: usize) -> Vec<String> {
    let budget = page_chars.clamp(MIN_PAGE_CHARS, MAX_PAGE_CHARS);
    let paragraphs = split_paragraphs(text);
    if paragraphs.is_empty() {
        return vec![String::new()];
    }

    let mut pages = Vec::new();
    let mut page = String::new();
    let mut page_len = 0usize;

    for para in paragraphs {
        let para_len = para.chars().count();
        if !page.is_empty() && page_len + 2 + para_len > budget {
            pages.push(std::mem::take(&mut page));
            page_len = 0;
        }
        if !page.is_empty() {
            page.push_str("\n\n");
            page_len += 2;
        }
        page.push_str(&para);
        page_len += para_len;
    }

    if !page.is_empty() {
        pages.push(page);
    }
    pages
}

/// Paragraphs are runs of non-blank lines.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n"));
                lines.clear();
            }
        } else {
            lines.push(line);
        }
    }
    if !lines.is_empty() {
        paragraphs.push(lines.join("\n"));
    }
    paragraphs
}
