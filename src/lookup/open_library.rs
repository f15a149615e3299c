use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::debug;

use super::retry::{
    RATE_LIMIT_BASE_DELAY, RATE_LIMIT_MAX_RETRIES, is_rate_limited, retry_after, wait_with_backoff,
};
use super::{BookLookupProvider, BookLookupResult, LookupFuture};

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";
pub const DEFAULT_LIMIT: usize = 10;
const COVERS_BASE_URL: &str = "https://covers.openlibrary.org/b/id";
const SEARCH_FIELDS: &str = "title,author_name,cover_i";

/// Book search against the Open Library `search.json` endpoint.
#[derive(Debug, Clone)]
pub struct OpenLibrary {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl Default for OpenLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenLibrary {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.base_url = trimmed.to_string();
        }
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.limit = limit;
        }
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<BookLookupResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/search.json", self.base_url);
        let limit = self.limit.to_string();

        let mut attempt = 0usize;
        let mut delay = RATE_LIMIT_BASE_DELAY;
        loop {
            attempt += 1;
            let response = self
                .client
                .get(&url)
                .query(&[("q", query), ("limit", limit.as_str()), ("fields", SEARCH_FIELDS)])
                .send()
                .await
                .with_context(|| "failed to call Open Library")?;

            let status = response.status();
            let retry_after = retry_after(response.headers());
            let text = response
                .text()
                .await
                .with_context(|| "failed to read Open Library response")?;
            if status.is_success() {
                let books = parse_search_response(&text)?;
                debug!("open library returned {} candidates for '{}'", books.len(), query);
                return Ok(books);
            }
            if is_rate_limited(status, &text) && attempt < RATE_LIMIT_MAX_RETRIES {
                delay = wait_with_backoff("Open Library", attempt, delay, retry_after).await;
                continue;
            }
            return Err(anyhow!("Open Library error ({}): {}", status, text.trim()));
        }
    }
}

impl BookLookupProvider for OpenLibrary {
    fn search_books_by_text<'a>(&'a self, query: &'a str) -> LookupFuture<'a> {
        Box::pin(self.search(query))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    cover_i: Option<i64>,
}

fn parse_search_response(text: &str) -> Result<Vec<BookLookupResult>> {
    let payload: SearchResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse Open Library response JSON: {}", err))?;
    Ok(payload
        .docs
        .into_iter()
        .filter_map(|doc| {
            let title = doc.title?.trim().to_string();
            if title.is_empty() {
                return None;
            }
            Some(BookLookupResult {
                id: None,
                title,
                author: doc.author_name.join(", "),
                thumbnail_url: doc
                    .cover_i
                    .filter(|cover| *cover > 0)
                    .map(|cover| format!("{}/{}-M.jpg", COVERS_BASE_URL, cover)),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_search_docs_to_candidates() {
        let payload = r#"{
            "numFound": 3,
            "docs": [
                {"title": "Dune", "author_name": ["Frank Herbert"], "cover_i": 11481354},
                {"title": "Dune Messiah", "author_name": ["Frank Herbert", "Brian Herbert"]},
                {"author_name": ["Nobody"]},
                {"title": "   ", "author_name": []}
            ]
        }"#;
        let books = parse_search_response(payload).unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Dune");
        assert_eq!(books[0].author, "Frank Herbert");
        assert_eq!(
            books[0].thumbnail_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/11481354-M.jpg")
        );
        assert!(books[0].id.is_none());
        assert_eq!(books[1].author, "Frank Herbert, Brian Herbert");
        assert!(books[1].thumbnail_url.is_none());
    }

    #[test]
    fn missing_docs_is_empty() {
        assert!(parse_search_response("{}").unwrap().is_empty());
        assert!(parse_search_response("not json").is_err());
    }

    #[test]
    fn builder_ignores_blank_values() {
        let lookup = OpenLibrary::new().with_base_url("  ").with_limit(0);
        assert_eq!(lookup.base_url, DEFAULT_BASE_URL);
        assert_eq!(lookup.limit, DEFAULT_LIMIT);
        let lookup = OpenLibrary::new().with_base_url("http://localhost:8080/");
        assert_eq!(lookup.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn truncated_body_reports_read_failure() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request);
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\n\r\n{\"docs\": [",
                )
                .unwrap();
        });

        let lookup = OpenLibrary {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..OpenLibrary::new().with_base_url(format!("http://{}", addr))
        };
        let err = lookup.search_books_by_text("dune").await.unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read Open Library response"));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn blank_query_skips_request() {
        let lookup = OpenLibrary::new().with_base_url("http://127.0.0.1:9");
        let books = lookup.search_books_by_text("   ").await.unwrap();
        assert!(books.is_empty());
    }
}
