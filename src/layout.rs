//! Layout engine – fits each badge field into its bounding box by walking the
//! field's font-size ladder and word-wrapping at every candidate size.
//!
//! Everything here is pure: the same text and [`FieldSpec`] always produce
//! the same [`FieldLayout`].

use serde::{Deserialize, Serialize};

use crate::attendee::AttendeeRecord;
use crate::fonts::{line_height, text_width, FontFace};
use crate::geometry::{BadgeGeometry, FieldSpec};

/// Appended to the last kept line when a field overflows its smallest size.
pub const TRUNCATION_MARKER: &str = "\u{2026}";

/// The chosen size and lines for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub font_size: f32,
    pub lines: Vec<String>,
    /// Set when the text did not fit even at the smallest ladder size and
    /// lines were dropped behind a [`TRUNCATION_MARKER`].
    pub truncated: bool,
}

/// Layouts for every text field of a badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub name: FieldLayout,
    pub company: FieldLayout,
    pub title: FieldLayout,
    pub ticket_type: FieldLayout,
}

impl LayoutResult {
    /// Lay out all four fields of `attendee` against `geometry`.
    pub fn for_attendee(attendee: &AttendeeRecord, geometry: &BadgeGeometry) -> Self {
        Self {
            name: compute_layout(&attendee.name, &geometry.name),
            company: compute_layout(&attendee.company, &geometry.company),
            title: compute_layout(&attendee.title, &geometry.title),
            ticket_type: compute_layout(&attendee.ticket_type, &geometry.ticket_type),
        }
    }

    pub fn any_truncated(&self) -> bool {
        [&self.name, &self.company, &self.title, &self.ticket_type]
            .iter()
            .any(|f| f.truncated)
    }
}

/// How many lines of `font_size` text stack inside `height`.
pub fn line_capacity(height: f32, font_size: f32) -> usize {
    if font_size <= 0.0 || height <= 0.0 {
        return 0;
    }
    // Small epsilon so an exact multiple is not floored away by rounding.
    (height / line_height(font_size) + 1e-4).floor() as usize
}

/// Greedy word wrap. Words are whitespace-delimited; a word wider than
/// `max_width` on its own is hard-broken between characters.
pub fn wrap_text(text: &str, font_size: f32, face: FontFace, max_width: f32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() {
            let candidate = format!("{current} {word}");
            if text_width(&candidate, font_size, face) <= max_width {
                current = candidate;
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, font_size, face) <= max_width {
            current = word.to_string();
            continue;
        }

        for ch in word.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            if !current.is_empty() && text_width(&candidate, font_size, face) > max_width {
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            } else {
                current = candidate;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrap `text` at `font_size` and return the lines if they fit `spec`'s box.
pub fn try_fit(text: &str, font_size: f32, spec: &FieldSpec) -> Option<Vec<String>> {
    let lines = wrap_text(text, font_size, spec.face, spec.bounds.width);
    (lines.len() <= line_capacity(spec.bounds.height, font_size)).then_some(lines)
}

fn prepare(text: &str, uppercase: bool) -> String {
    let normalised = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if uppercase {
        normalised.to_uppercase()
    } else {
        normalised
    }
}

/// Trim `line` until it plus the marker fits `max_width`.
fn with_marker(line: &str, font_size: f32, face: FontFace, max_width: f32) -> String {
    let mut kept = line.to_string();
    loop {
        let candidate = format!("{}{}", kept.trim_end(), TRUNCATION_MARKER);
        if kept.is_empty() || text_width(&candidate, font_size, face) <= max_width {
            return candidate;
        }
        kept.pop();
    }
}

/// Choose the largest ladder size at which `text` fits `spec`'s box.
///
/// Falls back to the smallest size with the overflow cut behind a marker.
pub fn compute_layout(text: &str, spec: &FieldSpec) -> FieldLayout {
    let text = prepare(text, spec.uppercase);

    if text.is_empty() {
        return FieldLayout {
            font_size: spec.largest_size(),
            lines: Vec::new(),
            truncated: false,
        };
    }

    for &size in &spec.ladder {
        if let Some(lines) = try_fit(&text, size, spec) {
            log::debug!("'{text}' fits at {size}pt on {} line(s)", lines.len());
            return FieldLayout {
                font_size: size,
                lines,
                truncated: false,
            };
        }
    }

    let size = spec.smallest_size();
    let capacity = line_capacity(spec.bounds.height, size);
    let mut lines = wrap_text(&text, size, spec.face, spec.bounds.width);
    let total = lines.len();
    lines.truncate(capacity);
    if let Some(last) = lines.last_mut() {
        *last = with_marker(last, size, spec.face, spec.bounds.width);
    }
    log::warn!(
        "'{text}' overflows its box at {size}pt ({total} lines, room for {capacity}); truncated"
    );

    FieldLayout {
        font_size: size,
        lines,
        truncated: true,
    }
}
