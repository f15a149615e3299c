//! Title/author text selection.
//!
//! Covers mix the title and author block with review quotes, blurbs and
//! publisher marks. Those render in visibly smaller type, so lines are kept by
//! their size relative to the largest horizontal line on the cover rather than
//! by an absolute pixel threshold. Vertical lines (spine text) never qualify.

use tracing::debug;

use super::geom;
use super::{ExtractedWord, OcrLine};

/// Lines at least this fraction of the largest text size are kept.
pub const DEFAULT_MIN_RELATIVE_SIZE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterMode {
    Geometric,
    Fallback,
}

/// Returns the words of lines likely to hold the title or author.
///
/// Falls back to every word with `height = 0` when no line carries usable geometry.
pub fn extract_filtered_text(lines: &[OcrLine], min_relative_size: f32) -> Vec<ExtractedWord> {
    if lines.len() <= 1 {
        return lines.iter().flat_map(line_words).collect();
    }

    match select_mode(lines) {
        FilterMode::Fallback => {
            debug!("no usable line geometry; keeping all {} lines", lines.len());
            all_words_without_height(lines)
        }
        FilterMode::Geometric => filter_by_size(lines, min_relative_size),
    }
}

fn all_words_without_height(lines: &[OcrLine]) -> Vec<ExtractedWord> {
    lines
        .iter()
        .flat_map(|line| words_with_height(line, 0.0))
        .collect()
}

fn select_mode(lines: &[OcrLine]) -> FilterMode {
    let has_geometry = lines.iter().any(|line| {
        line.bounding_box
            .as_ref()
            .is_some_and(|polygon| !geom::is_degenerate(polygon))
    });
    if has_geometry {
        FilterMode::Geometric
    } else {
        FilterMode::Fallback
    }
}

fn filter_by_size(lines: &[OcrLine], min_relative_size: f32) -> Vec<ExtractedWord> {
    let sizes = lines
        .iter()
        .map(|line| {
            let polygon = line.bounding_box.as_ref()?;
            if geom::is_degenerate(polygon) || geom::is_vertical(polygon) {
                return None;
            }
            Some(geom::text_size(polygon))
        })
        .collect::<Vec<_>>();

    let max_size = sizes.iter().flatten().copied().fold(0.0f32, f32::max);
    if max_size <= 0.0 {
        debug!("only vertical lines carry geometry; keeping all lines");
        return all_words_without_height(lines);
    }

    let threshold = max_size * min_relative_size;
    let mut words = Vec::new();
    for (line, size) in lines.iter().zip(sizes) {
        let Some(size) = size else {
            continue;
        };
        if size >= threshold {
            words.extend(words_with_height(line, size));
        } else {
            debug!(
                "dropping small line '{}' ({:.0} < {:.1})",
                line.text, size, threshold
            );
        }
    }
    words
}

/// Words of one line tagged with the line's box height, or 0 without a box.
pub fn line_words(line: &OcrLine) -> Vec<ExtractedWord> {
    let height = line
        .bounding_box
        .as_ref()
        .map(|polygon| geom::height(polygon) as f32)
        .unwrap_or(0.0);
    words_with_height(line, height)
}

fn words_with_height(line: &OcrLine, height: f32) -> Vec<ExtractedWord> {
    line.words()
        .map(|text| ExtractedWord {
            text: text.to_string(),
            height,
        })
        .collect()
}
