use anyhow::{Context, Result, anyhow};
use tracing::debug;

use super::{BoundingPolygon, OcrLine};

const TSV_COLUMNS: usize = 12;

type LineKey = (i32, i32, i32, i32);

#[derive(Debug, Clone)]
struct WordRow {
    key: LineKey,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    text: String,
}

#[derive(Debug)]
struct LineGroup {
    key: LineKey,
    words: Vec<WordRow>,
}

/// Groups Tesseract TSV word rows into lines, in order of first appearance.
pub fn parse_tsv_lines(tsv: &str) -> Vec<OcrLine> {
    let mut groups: Vec<LineGroup> = Vec::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let word = match parse_row(row) {
            Ok(Some(word)) => word,
            Ok(None) => continue,
            Err(err) => {
                debug!("skipping tsv row {}: {:#}", idx + 1, err);
                continue;
            }
        };
        match groups.last_mut() {
            Some(group) if group.key == word.key => group.words.push(word),
            _ => groups.push(LineGroup {
                key: word.key,
                words: vec![word],
            }),
        }
    }

    groups
        .iter()
        .filter_map(|group| build_line(&group.words))
        .collect()
}

fn parse_row(row: &str) -> Result<Option<WordRow>> {
    let cols = row.splitn(TSV_COLUMNS, '\t').collect::<Vec<_>>();
    if cols.len() < TSV_COLUMNS {
        return Ok(None);
    }
    let _level: i32 = parse_field(&cols, 0, "level")?;
    let page_num: i32 = parse_field(&cols, 1, "page_num")?;
    let block_num: i32 = parse_field(&cols, 2, "block_num")?;
    let par_num: i32 = parse_field(&cols, 3, "par_num")?;
    let line_num: i32 = parse_field(&cols, 4, "line_num")?;
    let _word_num: i32 = parse_field(&cols, 5, "word_num")?;
    let left: i32 = parse_field(&cols, 6, "left")?;
    let top: i32 = parse_field(&cols, 7, "top")?;
    let width: i32 = parse_field(&cols, 8, "width")?;
    let height: i32 = parse_field(&cols, 9, "height")?;
    let conf: f32 = parse_field(&cols, 10, "conf")?;
    if !conf.is_finite() {
        return Err(anyhow!("invalid conf '{}'", conf));
    }
    let text = cols[11].trim();
    if conf < 0.0 || text.is_empty() {
        return Ok(None);
    }
    if width < 0 || height < 0 {
        return Err(anyhow!("negative box size {}x{}", width, height));
    }
    let right = left
        .checked_add(width)
        .ok_or_else(|| anyhow!("box right edge overflows ({} + {})", left, width))?;
    let bottom = top
        .checked_add(height)
        .ok_or_else(|| anyhow!("box bottom edge overflows ({} + {})", top, height))?;

    Ok(Some(WordRow {
        key: (page_num, block_num, par_num, line_num),
        left,
        top,
        right,
        bottom,
        text: text.to_string(),
    }))
}

fn parse_field<T>(cols: &[&str], idx: usize, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = cols[idx].trim();
    raw.parse::<T>()
        .with_context(|| format!("invalid {} '{}'", name, raw))
}

fn build_line(words: &[WordRow]) -> Option<OcrLine> {
    let first = words.first()?;
    let mut min_left = first.left;
    let mut min_top = first.top;
    let mut max_right = first.right;
    let mut max_bottom = first.bottom;
    for word in &words[1..] {
        min_left = min_left.min(word.left);
        min_top = min_top.min(word.top);
        max_right = max_right.max(word.right);
        max_bottom = max_bottom.max(word.bottom);
    }

    let text = words
        .iter()
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(OcrLine {
        text,
        bounding_box: Some(BoundingPolygon::from_envelope(
            min_left, min_top, max_right, max_bottom,
        )),
    })
}
