use anyhow::{Context, Result, anyhow};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod data;
pub mod logging;
pub mod lookup;
pub mod matching;
pub mod ocr;
pub mod settings;
mod test_util;

pub use lookup::{BookLookupProvider, BookLookupResult, Catalog, CatalogRepository, NoLookup};
pub use matching::{CoverMatchOutput, CoverMatcher, MatchCandidate, MatchError, RequestContext};
pub use ocr::{CoverAnalysis, ExtractedWord, OcrLine, OcrProvider};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub image_path: Option<String>,
    pub mime: Option<String>,
    pub catalog_path: Option<String>,
    pub settings_path: Option<String>,
    pub ocr_languages: Option<String>,
    pub offline: bool,
    pub json: bool,
    pub show_ocr_languages: bool,
}

pub async fn run(config: Config, cancel: &CancellationToken) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;

    if config.show_ocr_languages {
        let languages = ocr::list_tesseract_languages().await?;
        return Ok(languages.join("\n"));
    }

    let image_path = config
        .image_path
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("cover image path is required"))?;
    if let Some(languages) = config.ocr_languages.as_deref()
        && !languages.trim().is_empty()
    {
        settings.ocr_languages = languages.trim().to_string();
    }

    let image = data::load_cover_image(Path::new(image_path), config.mime.as_deref())?;
    let catalog = match config
        .catalog_path
        .as_deref()
        .or(settings.catalog_path.as_deref())
    {
        Some(path) => lookup::load_catalog(Path::new(path))?,
        None => Catalog::default(),
    };
    info!(
        "analyzing {} ({}, {} catalog entries)",
        image_path,
        image.content_type,
        catalog.len()
    );

    let lookup: Arc<dyn BookLookupProvider> = if config.offline || !settings.lookup_enabled {
        Arc::new(NoLookup)
    } else {
        Arc::new(settings.open_library())
    };
    let matcher = CoverMatcher::new(
        Arc::new(ocr::TesseractOcr::new(settings.tesseract_options())),
        lookup,
    )
    .with_catalog(Arc::new(catalog));

    let context = RequestContext::new(image.name.clone().unwrap_or_else(|| image_path.to_string()));
    let output = matcher
        .analyze(&image.bytes, &image.content_type, &context, cancel)
        .await?;

    if config.json {
        return serde_json::to_string_pretty(&output).with_context(|| "failed to serialize output");
    }
    Ok(format_report(&output))
}

/// Plain-text rendering of a match result, one fact per line.
pub fn format_report(output: &CoverMatchOutput) -> String {
    let mut out = String::new();
    match &output.analysis {
        CoverAnalysis::Failure { reason } => {
            let _ = writeln!(out, "status: failure");
            let _ = writeln!(out, "reason: {}", reason);
        }
        CoverAnalysis::Success {
            extracted_words,
            filtered_words,
        } => {
            let extracted = extracted_words
                .iter()
                .map(|word| word.text.as_str())
                .collect::<Vec<_>>();
            let _ = writeln!(out, "status: success");
            let _ = writeln!(out, "extracted: {}", extracted.join(" "));
            let _ = writeln!(out, "filtered: {}", filtered_words.join(" "));
        }
    }
    match &output.exact_match {
        Some(book) => {
            let _ = writeln!(out, "exact match: {}", describe_book(book));
        }
        None => {
            let _ = writeln!(out, "exact match: none");
        }
    }
    if !output.matched_books.is_empty() {
        let _ = writeln!(out, "candidates:");
        for matched in &output.matched_books {
            let _ = writeln!(
                out,
                "  {:.3}  {}",
                matched.score,
                describe_book(&matched.candidate)
            );
        }
    }
    out.trim_end().to_string()
}

fn describe_book(book: &BookLookupResult) -> String {
    let mut line = match book.id {
        Some(id) => format!("#{} {}", id, book.title),
        None => book.title.clone(),
    };
    if !book.author.trim().is_empty() {
        line.push_str(" / ");
        line.push_str(&book.author);
    }
    if let Some(url) = &book.thumbnail_url {
        line.push_str(" <");
        line.push_str(url);
        line.push('>');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_report_has_reason_and_no_candidates() {
        let output = CoverMatchOutput {
            analysis: CoverAnalysis::failure("tesseract not found"),
            matched_books: Vec::new(),
            exact_match: None,
        };
        assert_eq!(
            format_report(&output),
            "status: failure\nreason: tesseract not found\nexact match: none"
        );
    }

    #[test]
    fn describes_local_and_external_books() {
        let local = BookLookupResult::new("Dune", "Frank Herbert").with_id(3);
        assert_eq!(describe_book(&local), "#3 Dune / Frank Herbert");
        let external = BookLookupResult::new("Dune", "").with_thumbnail("http://img/1.jpg");
        assert_eq!(describe_book(&external), "Dune <http://img/1.jpg>");
    }

    #[test]
    fn missing_image_path_is_an_error() {
        let result = test_util::with_temp_home(|_| {
            let runtime = tokio::runtime::Runtime::new().expect("runtime");
            runtime.block_on(run(Config::default(), &CancellationToken::new()))
        });
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cover image path is required"));
    }
}
