mod engine;
pub mod filter;
pub mod geom;
pub mod parse;

use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

pub use engine::{TesseractOcr, TesseractOptions, list_tesseract_languages};
pub use filter::{DEFAULT_MIN_RELATIVE_SIZE, extract_filtered_text};
pub use parse::parse_tsv_lines;

/// Runs the title filter over parsed lines. No text at all is a failure.
pub fn analyze_lines(lines: &[OcrLine], min_relative_size: f32) -> CoverAnalysis {
    let extracted_words = lines.iter().flat_map(filter::line_words).collect::<Vec<_>>();
    if extracted_words.is_empty() {
        return CoverAnalysis::failure("no text recognized on cover");
    }
    let kept = extract_filtered_text(lines, min_relative_size);
    CoverAnalysis::from_words(extracted_words, &kept)
}

pub fn analyze_tsv(tsv: &str, min_relative_size: f32) -> CoverAnalysis {
    analyze_lines(&parse_tsv_lines(tsv), min_relative_size)
}

/// Four `(x, y)` corners: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingPolygon(pub [i32; 8]);

impl BoundingPolygon {
    pub fn from_envelope(min_left: i32, min_top: i32, max_right: i32, max_bottom: i32) -> Self {
        Self([
            min_left, min_top, max_right, min_top, max_right, max_bottom, min_left, max_bottom,
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrLine {
    pub text: String,
    pub bounding_box: Option<BoundingPolygon>,
}

impl OcrLine {
    pub fn new(text: impl Into<String>, bounding_box: Option<BoundingPolygon>) -> Self {
        Self {
            text: text.into(),
            bounding_box,
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }
}

/// A recognized token. `height` is 0 when the line had no usable geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedWord {
    pub text: String,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoverAnalysis {
    Success {
        extracted_words: Vec<ExtractedWord>,
        filtered_words: Vec<String>,
    },
    Failure {
        reason: String,
    },
}

impl CoverAnalysis {
    pub fn failure(reason: impl Into<String>) -> Self {
        CoverAnalysis::Failure {
            reason: reason.into(),
        }
    }

    /// Builds a success from every recognized word plus the words kept by the title filter.
    pub fn from_words(extracted_words: Vec<ExtractedWord>, kept: &[ExtractedWord]) -> Self {
        CoverAnalysis::Success {
            extracted_words,
            filtered_words: kept.iter().map(|word| word.text.clone()).collect(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CoverAnalysis::Success { .. })
    }
}

pub type OcrFuture<'a> = Pin<Box<dyn Future<Output = CoverAnalysis> + Send + 'a>>;

/// Turns cover image bytes into a [`CoverAnalysis`]. Failures are reported in-band.
pub trait OcrProvider: Send + Sync {
    fn analyze_cover_image<'a>(&'a self, image: &'a [u8], content_type: &'a str) -> OcrFuture<'a>;
}
