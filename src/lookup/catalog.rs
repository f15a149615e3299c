use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{BookLookupResult, CatalogRepository};
use crate::matching::score::{book_key, candidate_words, normalize_words};

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    books: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: i64,
    title: String,
    author: String,
    thumbnail_url: Option<String>,
}

/// In-memory catalog keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: BTreeMap<i64, BookLookupResult>,
}

impl Catalog {
    pub fn from_books(books: impl IntoIterator<Item = BookLookupResult>) -> Result<Self> {
        let mut catalog = Self::default();
        for book in books {
            let id = book
                .id
                .ok_or_else(|| anyhow!("catalog entry '{}' has no id", book.title))?;
            if catalog.books.insert(id, book).is_some() {
                return Err(anyhow!("duplicate catalog id {}", id));
            }
        }
        Ok(catalog)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(content).with_context(|| "failed to parse catalog")?;
        Self::from_books(file.books.into_iter().map(|entry| BookLookupResult {
            id: Some(entry.id),
            title: entry.title,
            author: entry.author,
            thumbnail_url: entry.thumbnail_url.filter(|url| !url.trim().is_empty()),
        }))
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog: {}", path.display()))?;
    Catalog::parse(&content).with_context(|| format!("invalid catalog: {}", path.display()))
}

impl CatalogRepository for Catalog {
    fn find_by_id(&self, id: i64) -> Option<BookLookupResult> {
        self.books.get(&id).cloned()
    }

    fn find_by_title_and_author(&self, title: &str, author: &str) -> Option<BookLookupResult> {
        let key = book_key(&BookLookupResult::new(title, author));
        self.books
            .values()
            .find(|book| book_key(book) == key)
            .cloned()
    }

    fn find_candidates(&self, words: &[String]) -> Vec<BookLookupResult> {
        let query = normalize_words(words.iter().map(String::as_str));
        if query.is_empty() {
            return Vec::new();
        }
        self.books
            .values()
            .filter(|book| !candidate_words(book).is_disjoint(&query))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CATALOG_TOML: &str = r#"
[[books]]
id = 2
title = "Dune Messiah"
author = "Frank Herbert"

[[books]]
id = 1
title = "Mistborn"
author = "Brandon Sanderson"
thumbnail_url = "https://example.com/mistborn.jpg"
"#;

    #[test]
    fn parses_and_orders_by_id() {
        let catalog = Catalog::parse(CATALOG_TOML).unwrap();
        assert_eq!(catalog.len(), 2);
        let mistborn = catalog.find_by_id(1).unwrap();
        assert_eq!(mistborn.title, "Mistborn");
        assert_eq!(
            mistborn.thumbnail_url.as_deref(),
            Some("https://example.com/mistborn.jpg")
        );
        assert!(catalog.find_by_id(3).is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let books = vec![
            BookLookupResult::new("Dune", "Frank Herbert").with_id(1),
            BookLookupResult::new("Emma", "Jane Austen").with_id(1),
        ];
        assert!(Catalog::from_books(books).is_err());
    }

    #[test]
    fn entries_need_an_id() {
        assert!(Catalog::from_books(vec![BookLookupResult::new("Dune", "Frank Herbert")]).is_err());
    }

    #[test]
    fn title_and_author_lookup_ignores_case_and_punctuation() {
        let catalog = Catalog::parse(CATALOG_TOML).unwrap();
        let found = catalog
            .find_by_title_and_author("MISTBORN:", "brandon sanderson")
            .unwrap();
        assert_eq!(found.id, Some(1));
        assert!(catalog.find_by_title_and_author("Mistborn", "Someone Else").is_none());
    }

    #[test]
    fn candidates_share_a_word() {
        let catalog = Catalog::parse(CATALOG_TOML).unwrap();
        let words = vec!["frank".to_string(), "DUNE".to_string()];
        let found = catalog.find_candidates(&words);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, Some(2));
        assert!(catalog.find_candidates(&[]).is_empty());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("catalog.toml");
        fs::write(&path, CATALOG_TOML).expect("write catalog");
        let catalog = load_catalog(&path).expect("load catalog");
        assert!(!catalog.is_empty());
        assert!(load_catalog(&dir.path().join("missing.toml")).is_err());
    }
}
