use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

mod catalog;
mod open_library;
mod retry;

pub use catalog::{Catalog, load_catalog};
pub use open_library::{
    DEFAULT_BASE_URL as OPEN_LIBRARY_BASE_URL, DEFAULT_LIMIT as OPEN_LIBRARY_LIMIT, OpenLibrary,
};

/// A candidate book. `id` is set only for entries from the local catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLookupResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl BookLookupResult {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn is_local(&self) -> bool {
        self.id.is_some()
    }
}

pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<BookLookupResult>>> + Send + 'a>>;

/// External book search by free text.
pub trait BookLookupProvider: Send + Sync {
    fn search_books_by_text<'a>(&'a self, query: &'a str) -> LookupFuture<'a>;
}

/// Read-only view of the books already known to the application.
pub trait CatalogRepository: Send + Sync {
    fn find_by_id(&self, id: i64) -> Option<BookLookupResult>;

    fn find_by_title_and_author(&self, title: &str, author: &str) -> Option<BookLookupResult>;

    /// Entries sharing at least one normalized word with `words`, in id order.
    fn find_candidates(&self, words: &[String]) -> Vec<BookLookupResult>;
}

/// Lookup that never finds anything. Used when external search is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl BookLookupProvider for NoLookup {
    fn search_books_by_text<'a>(&'a self, _query: &'a str) -> LookupFuture<'a> {
        Box::pin(async { Ok(Vec::new()) })
    }
}
