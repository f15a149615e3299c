pub mod score;

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::lookup::{BookLookupProvider, BookLookupResult, Catalog, CatalogRepository};
use crate::ocr::{CoverAnalysis, OcrProvider};
use score::{book_key, candidate_words, coverage, is_exact_match, normalize_words};

/// Opaque correlation token. Only ever recorded on the tracing span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext(String);

impl RequestContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub candidate: BookLookupResult,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverMatchOutput {
    pub analysis: CoverAnalysis,
    pub matched_books: Vec<MatchCandidate>,
    pub exact_match: Option<BookLookupResult>,
}

impl CoverMatchOutput {
    fn unmatched(analysis: CoverAnalysis) -> Self {
        Self {
            analysis,
            matched_books: Vec::new(),
            exact_match: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("cover analysis was cancelled")]
    Cancelled,
}

/// Identifies the book on a cover image from OCR text and candidate lookups.
#[derive(Clone)]
pub struct CoverMatcher {
    ocr: Arc<dyn OcrProvider>,
    lookup: Arc<dyn BookLookupProvider>,
    catalog: Arc<dyn CatalogRepository>,
}

impl CoverMatcher {
    pub fn new(ocr: Arc<dyn OcrProvider>, lookup: Arc<dyn BookLookupProvider>) -> Self {
        Self {
            ocr,
            lookup,
            catalog: Arc::new(Catalog::default()),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogRepository>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Runs OCR, gathers candidates and picks the exact match, if any.
    ///
    /// An OCR failure is returned as an ordinary output with no candidates and
    /// no lookups performed. Cancelling `cancel` during either collaborator call
    /// aborts the whole analysis.
    pub async fn analyze(
        &self,
        image: &[u8],
        content_type: &str,
        context: &RequestContext,
        cancel: &CancellationToken,
    ) -> Result<CoverMatchOutput, MatchError> {
        let span = info_span!("cover_match", request = %context);
        self.run(image, content_type, cancel).instrument(span).await
    }

    async fn run(
        &self,
        image: &[u8],
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<CoverMatchOutput, MatchError> {
        let analysis = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MatchError::Cancelled),
            analysis = self.ocr.analyze_cover_image(image, content_type) => analysis,
        };

        let (extracted_words, filtered_words) = match analysis {
            CoverAnalysis::Success {
                extracted_words,
                filtered_words,
            } => (extracted_words, filtered_words),
            CoverAnalysis::Failure { reason } => {
                info!("cover OCR failed, skipping lookups: {}", reason);
                return Ok(CoverMatchOutput::unmatched(CoverAnalysis::Failure {
                    reason,
                }));
            }
        };

        let query = filtered_words.join(" ");
        info!(
            "cover OCR found {} words ({} kept); query '{}'",
            extracted_words.len(),
            filtered_words.len(),
            query
        );
        let local = self.catalog.find_candidates(&filtered_words);
        let external = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MatchError::Cancelled),
            result = self.lookup.search_books_by_text(&query) => match result {
                Ok(books) => books,
                Err(err) => {
                    warn!("book lookup failed, using catalog only: {:#}", err);
                    Vec::new()
                }
            },
        };
        debug!(
            "{} catalog and {} external candidates",
            local.len(),
            external.len()
        );

        let candidates = merge_candidates(self.catalog.as_ref(), local, external);
        let extracted = normalize_words(extracted_words.iter().map(|word| word.text.as_str()));
        let matched_books = rank_candidates(&extracted, candidates);
        let exact_match = select_exact_match(&matched_books);
        if let Some(book) = &exact_match {
            info!("exact match: {} by {}", book.title, book.author);
        }

        Ok(CoverMatchOutput {
            analysis: CoverAnalysis::Success {
                extracted_words,
                filtered_words,
            },
            matched_books,
            exact_match,
        })
    }
}

/// Catalog candidates first, then external ones linked to known entries; duplicates dropped.
fn merge_candidates(
    catalog: &dyn CatalogRepository,
    local: Vec<BookLookupResult>,
    external: Vec<BookLookupResult>,
) -> Vec<BookLookupResult> {
    let mut seen = HashSet::new();
    local
        .into_iter()
        .chain(
            external
                .into_iter()
                .map(|book| link_to_catalog(catalog, book)),
        )
        .filter(|book| seen.insert((book.id, book_key(book))))
        .collect()
}

fn link_to_catalog(catalog: &dyn CatalogRepository, book: BookLookupResult) -> BookLookupResult {
    if let Some(id) = book.id {
        return match catalog.find_by_id(id) {
            Some(known) => known,
            None => {
                debug!("lookup returned unknown catalog id {}; treating as external", id);
                BookLookupResult { id: None, ..book }
            }
        };
    }
    catalog
        .find_by_title_and_author(&book.title, &book.author)
        .unwrap_or(book)
}

/// Scores every candidate, keeps non-zero scores, highest first. Ties keep input order.
pub fn rank_candidates(
    extracted: &HashSet<String>,
    candidates: Vec<BookLookupResult>,
) -> Vec<MatchCandidate> {
    let mut ranked = candidates
        .into_iter()
        .map(|candidate| {
            let score = coverage(extracted, &candidate_words(&candidate)).score();
            MatchCandidate { candidate, score }
        })
        .filter(|matched| matched.score > 0.0)
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}

/// Among exact matches, the catalog entry with the lowest id wins, else the first one.
pub fn select_exact_match(ranked: &[MatchCandidate]) -> Option<BookLookupResult> {
    let exact = ranked
        .iter()
        .filter(|matched| is_exact_match(matched.score))
        .map(|matched| &matched.candidate)
        .collect::<Vec<_>>();
    exact
        .iter()
        .filter(|book| book.is_local())
        .min_by_key(|book| book.id)
        .or_else(|| exact.first())
        .map(|book| (*book).clone())
}
