//! Pure text-layout helpers shared by every receipt section builder.
//!
//! All functions here are deterministic and side-effect free: they take a
//! width in characters and return strings, never touching the byte stream
//! directly.

use crate::error::ReceiptError;
use crate::escpos::PaperWidth;

/// Narrowest receipt the layout can render legibly.
pub const MIN_LINE_WIDTH: usize = 20;

/// Words shorter than this never trigger the reduced-width wrap path.
const WRAP_FLOOR: usize = 8;

/// Map a physical paper width to the usable character budget for the
/// printer's default font. Unknown positive widths snap to the nearest
/// supported size; zero or negative widths are rejected.
pub fn estimate_characters_per_line(paper_width_mm: i32) -> Result<usize, ReceiptError> {
    if paper_width_mm <= 0 {
        return Err(ReceiptError::InvalidWidth(format!(
            "paper width {paper_width_mm}mm is not positive"
        )));
    }
    Ok(PaperWidth::from_mm(paper_width_mm).chars())
}

/// Fixed two-decimal money formatting, no currency symbol.
pub fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// Quantity formatting: whole numbers drop the fraction, otherwise two
/// decimals (weighed items).
pub fn qty(value: f64) -> String {
    if (value.round() - value).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// A separator line: `ch` repeated exactly `width` times.
pub fn separator(width: usize, ch: char) -> String {
    std::iter::repeat(ch).take(width).collect()
}

/// Wrap text on word boundaries so every line fits in `width` columns.
///
/// A single word longer than `width` is hard-broken rather than allowed to
/// overflow. Wrapping already-wrapped text at the same width is a no-op.
/// Empty or whitespace-only input yields one empty line so callers always
/// have something to emit.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(WRAP_FLOOR);
    let mut out = Vec::new();
    let mut line = String::new();
    for token in text.split_whitespace() {
        for piece in break_word(token, width) {
            if line.is_empty() {
                line = piece;
                continue;
            }
            let next_len = line.chars().count() + 1 + piece.chars().count();
            if next_len > width {
                out.push(std::mem::take(&mut line));
                line = piece;
            } else {
                line.push(' ');
                line.push_str(&piece);
            }
        }
    }
    if !line.is_empty() {
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/// Split an overlong word into `width`-sized chunks; shorter words pass
/// through whole.
fn break_word(word: &str, width: usize) -> Vec<String> {
    if word.chars().count() <= width {
        return vec![word.to_string()];
    }
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Place `left` and `right` on one line of exactly `width` columns, padding
/// the middle with spaces. When the pair does not fit, the label wraps onto
/// preceding line(s) and the value is emitted right-aligned on its own
/// line; the value is never dropped or truncated.
pub fn justify(left: &str, right: &str, width: usize) -> Vec<String> {
    let left_len = left.chars().count();
    let right_len = right.chars().count();
    if left_len + right_len < width {
        let mut line = String::with_capacity(width);
        line.push_str(left);
        for _ in 0..(width - left_len - right_len) {
            line.push(' ');
        }
        line.push_str(right);
        return vec![line];
    }
    let mut out = wrap(left, width.saturating_sub(right_len + 1).max(WRAP_FLOOR));
    let mut value_line = String::with_capacity(width);
    for _ in 0..width.saturating_sub(right_len) {
        value_line.push(' ');
    }
    value_line.push_str(right);
    out.push(value_line);
    out
}
