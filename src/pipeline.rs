//! End-to-end flow for one summary request:
//! locate → extract → truncate → summarize → persist.
//!
//! Everything before the network call is fast and CPU-bound; only the
//! summarize stage observes the cancellation token. A failed save is logged
//! and reported through `saved_path = None` so the summary still reaches the
//! reader.

use crate::budget;
use crate::cancellation::CancellationToken;
use crate::client::{SummaryClient, SummaryRequest, SummaryResponse, Transport};
use crate::config::AppConfig;
use crate::document::DocumentHandle;
use crate::error::Result;
use crate::extract::{ExtractionStrategy, extract};
use crate::store::SummaryStore;
use crate::toc::{ChapterSpan, locate};
use std::path::PathBuf;
use tracing::{info, warn};

/// Chapter text ready to send.
#[derive(Debug, Clone)]
pub struct PreparedChapter {
    pub span: ChapterSpan,
    pub strategy: ExtractionStrategy,
    pub text: String,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct ChapterSummary {
    pub span: ChapterSpan,
    pub strategy: ExtractionStrategy,
    pub truncated: bool,
    pub response: SummaryResponse,
    pub saved_path: Option<PathBuf>,
}

/// Locate, extract and budget the chapter around `current_page`.
pub fn prepare_chapter(
    doc: &dyn DocumentHandle,
    current_page: usize,
    config: &AppConfig,
) -> Result<PreparedChapter> {
    let span = locate(&doc.toc(), current_page, doc.page_count())?;
    let extraction = extract(&span, doc)?;

    let truncated = budget::exceeds(&extraction.text, config.max_input_tokens);
    let text = if truncated {
        let text = budget::truncate(&extraction.text, config.max_input_tokens);
        info!(
            title = %span.title,
            estimated_tokens = budget::estimate(&extraction.text),
            budget = config.max_input_tokens,
            "Truncated chapter text to fit the input budget"
        );
        text
    } else {
        extraction.text
    };

    Ok(PreparedChapter {
        span,
        strategy: extraction.strategy,
        text,
        truncated,
    })
}

/// Summarize the chapter enclosing `current_page`, saving the result when a
/// store is given.
pub fn summarize_current_chapter<T: Transport>(
    doc: &dyn DocumentHandle,
    current_page: usize,
    config: &AppConfig,
    client: &SummaryClient<T>,
    store: Option<&SummaryStore>,
    cancel: &CancellationToken,
) -> Result<ChapterSummary> {
    let prepared = prepare_chapter(doc, current_page, config)?;
    let request = SummaryRequest::from_config(config, &prepared.span.title, prepared.text);
    let response = client.summarize(&request, cancel)?;

    let saved_path = store.and_then(|store| {
        match store.save(&prepared.span.title, &response.content, &config.model) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(title = %prepared.span.title, "Summary not saved: {err}");
                None
            }
        }
    });

    Ok(ChapterSummary {
        span: prepared.span,
        strategy: prepared.strategy,
        truncated: prepared.truncated,
        response,
        saved_path,
    })
}
