use anyhow::{Context, Result, anyhow};
use std::path::Path;

/// Raw cover image bytes plus the content type the OCR stage is told about.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub name: Option<String>,
}

pub fn load_cover_image(path: &Path, mime_hint: Option<&str>) -> Result<CoverImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read cover image: {}", path.display()))?;
    if bytes.is_empty() {
        return Err(anyhow!("cover image is empty: {}", path.display()));
    }
    let content_type = resolve_content_type(mime_hint.unwrap_or("auto"), &bytes, Some(path))?;
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .map(|value| value.to_string());
    Ok(CoverImage {
        bytes,
        content_type,
        name,
    })
}

/// Accepts `auto`, a short format name (`png`, `jpg`, ...) or a full
/// `image/*` content type. Anything that is not an image is rejected.
pub fn resolve_content_type(hint: &str, bytes: &[u8], path: Option<&Path>) -> Result<String> {
    let raw = hint.trim();
    if raw.is_empty() {
        return Err(anyhow!("mime is empty"));
    }
    let lower = raw.to_lowercase();
    if lower == "auto" || lower == "image" || lower == "image/*" {
        return detect_content_type(bytes, path);
    }
    if let Some(mime) = mime_from_extension(&lower) {
        return Ok(mime.to_string());
    }
    if lower.starts_with("image/") {
        return Ok(match lower.as_str() {
            "image/jpg" => "image/jpeg".to_string(),
            _ => lower,
        });
    }
    Err(anyhow!(
        "unsupported --mime '{}' (expected auto, png, jpg, webp, gif, bmp, tiff or image/*)",
        raw
    ))
}

fn detect_content_type(bytes: &[u8], path: Option<&Path>) -> Result<String> {
    if let Some(kind) = infer::get(bytes) {
        let detected = kind.mime_type();
        if !detected.starts_with("image/") {
            return Err(anyhow!("cover must be an image (detected '{}')", detected));
        }
        return Ok(detected.to_string());
    }

    if let Some(mime) = extension_lower(path).and_then(|ext| mime_from_extension(&ext)) {
        return Ok(mime.to_string());
    }

    Err(anyhow!(
        "unable to detect image type for '{}'",
        path.map(|value| value.display().to_string())
            .unwrap_or_else(|| "input".to_string())
    ))
}

fn extension_lower(path: Option<&Path>) -> Option<String> {
    path.and_then(|path| path.extension())
        .and_then(|value| value.to_str())
        .map(|value| value.to_lowercase())
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        _ => None,
    }
}
