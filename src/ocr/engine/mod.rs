mod preprocess;
mod tesseract;

use anyhow::{Context, Result, anyhow};
use image::GenericImageView;
use std::io::Write;
use tracing::{debug, warn};

use super::filter::DEFAULT_MIN_RELATIVE_SIZE;
use super::parse::parse_tsv_lines;
use super::{BoundingPolygon, CoverAnalysis, OcrFuture, OcrLine, OcrProvider, analyze_lines};

pub use tesseract::list_tesseract_languages;

#[derive(Debug, Clone)]
pub struct TesseractOptions {
    pub languages: String,
    pub psm: u32,
    pub upscale: bool,
    pub min_relative_size: f32,
}

impl Default for TesseractOptions {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            psm: 11,
            upscale: true,
            min_relative_size: DEFAULT_MIN_RELATIVE_SIZE,
        }
    }
}

/// OCR provider backed by the local `tesseract` binary.
#[derive(Debug, Clone, Default)]
pub struct TesseractOcr {
    options: TesseractOptions,
}

impl TesseractOcr {
    pub fn new(options: TesseractOptions) -> Self {
        Self { options }
    }

    async fn recognize_lines(&self, image_bytes: &[u8], content_type: &str) -> Result<Vec<OcrLine>> {
        if !content_type.starts_with("image/") {
            return Err(anyhow!("unsupported content type '{}'", content_type));
        }
        let image = image::load_from_memory(image_bytes)
            .with_context(|| "failed to decode cover image")?;
        let (width, height) = image.dimensions();
        let scale = preprocess::ocr_scale(width, self.options.upscale);
        let languages = tesseract::normalize_ocr_languages(&self.options.languages).await?;
        debug!(
            "running tesseract on {}x{} cover (scale {}, languages {})",
            width, height, scale, languages
        );

        let prepared = preprocess::preprocess_for_ocr(image, scale);
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        prepared
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush().ok();

        let tsv = tesseract::run_tesseract_tsv(tmp.path(), &languages, self.options.psm).await?;
        let lines = parse_tsv_lines(&tsv);
        if scale > 1 {
            Ok(scale_lines(lines, scale))
        } else {
            Ok(lines)
        }
    }
}

impl OcrProvider for TesseractOcr {
    fn analyze_cover_image<'a>(&'a self, image: &'a [u8], content_type: &'a str) -> OcrFuture<'a> {
        Box::pin(async move {
            match self.recognize_lines(image, content_type).await {
                Ok(lines) => analyze_lines(&lines, self.options.min_relative_size),
                Err(err) => {
                    warn!("cover OCR failed: {:#}", err);
                    CoverAnalysis::failure(format!("{:#}", err))
                }
            }
        })
    }
}

fn scale_lines(lines: Vec<OcrLine>, scale: u32) -> Vec<OcrLine> {
    let scale = scale as f32;
    lines
        .into_iter()
        .map(|line| OcrLine {
            text: line.text,
            bounding_box: line.bounding_box.map(|polygon| {
                BoundingPolygon(
                    polygon
                        .0
                        .map(|value| (value as f32 / scale).round() as i32),
                )
            }),
        })
        .collect()
}
