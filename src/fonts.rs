//! Text measurement for the builtin Helvetica faces.
//!
//! Badges are drawn with the PDF base-14 Helvetica family, so no font file is
//! embedded and glyph advances come from the Adobe AFM metrics below. The
//! layout engine and the renderer both measure through [`text_width`], which
//! works on the exact WinAnsi byte sequence the renderer writes into the page.

use serde::{Deserialize, Serialize};

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Helvetica ascender in 1/1000 em.
const ASCENDER: f32 = 718.0;

/// Width used for any byte without a known advance. No Helvetica glyph in
/// WinAnsi is wider, so measuring with it never under-estimates.
pub const MAX_GLYPH_WIDTH: u16 = 1015;

/// Glyph advances for ASCII 0x20..=0x7E, Helvetica.
#[rustfmt::skip]
const REGULAR_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Glyph advances for ASCII 0x20..=0x7E, Helvetica-Bold.
#[rustfmt::skip]
const BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// The three Helvetica faces a badge uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFace {
    Regular,
    Bold,
    /// Slanted regular; shares the regular advances.
    Oblique,
}

impl FontFace {
    /// The face drawn with `font`, if it is one of ours.
    pub fn from_builtin(font: printpdf::BuiltinFont) -> Option<Self> {
        match font {
            printpdf::BuiltinFont::Helvetica => Some(FontFace::Regular),
            printpdf::BuiltinFont::HelveticaBold => Some(FontFace::Bold),
            printpdf::BuiltinFont::HelveticaOblique => Some(FontFace::Oblique),
            _ => None,
        }
    }

    pub fn builtin(self) -> printpdf::BuiltinFont {
        match self {
            FontFace::Regular => printpdf::BuiltinFont::Helvetica,
            FontFace::Bold => printpdf::BuiltinFont::HelveticaBold,
            FontFace::Oblique => printpdf::BuiltinFont::HelveticaOblique,
        }
    }

    fn ascii_widths(self) -> &'static [u16; 95] {
        match self {
            FontFace::Bold => &BOLD_WIDTHS,
            FontFace::Regular | FontFace::Oblique => &REGULAR_WIDTHS,
        }
    }
}

/// WinAnsiEncoding bytes in 0x80..=0x9F that are not Latin-1.
const WINANSI_EXTRAS: [(u8, char); 19] = [
    (0x80, '\u{20AC}'), // euro
    (0x82, '\u{201A}'), // single low-9 quote
    (0x84, '\u{201E}'), // double low-9 quote
    (0x85, '\u{2026}'), // ellipsis
    (0x8A, '\u{0160}'), // S caron
    (0x8C, '\u{0152}'), // OE
    (0x8E, '\u{017D}'), // Z caron
    (0x91, '\u{2018}'), // left single quote
    (0x92, '\u{2019}'), // right single quote
    (0x93, '\u{201C}'), // left double quote
    (0x94, '\u{201D}'), // right double quote
    (0x95, '\u{2022}'), // bullet
    (0x96, '\u{2013}'), // en-dash
    (0x97, '\u{2014}'), // em-dash
    (0x99, '\u{2122}'), // trademark
    (0x9A, '\u{0161}'), // s caron
    (0x9C, '\u{0153}'), // oe
    (0x9E, '\u{017E}'), // z caron
    (0x9F, '\u{0178}'), // Y diaeresis
];

/// Map one character to its WinAnsiEncoding byte. Characters the encoding
/// cannot express become `?`.
pub fn winansi_byte(c: char) -> u8 {
    if c == '\u{00A0}' {
        return b' ';
    }
    if let Some((byte, _)) = WINANSI_EXTRAS.iter().find(|(_, ch)| *ch == c) {
        return *byte;
    }
    match c {
        c if (c as u32) < 256 => c as u8,
        _ => b'?',
    }
}

/// The character a WinAnsiEncoding byte stands for.
pub fn winansi_char(byte: u8) -> char {
    WINANSI_EXTRAS
        .iter()
        .find(|(b, _)| *b == byte)
        .map_or(byte as char, |(_, ch)| *ch)
}

/// Decode text produced by [`to_winlatin`] back into Unicode, for output
/// paths that draw with system fonts instead of PDF builtin fonts.
pub fn from_winlatin(s: &str) -> String {
    s.bytes().map(winansi_char).collect()
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
pub fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s.chars().map(winansi_byte).collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0xFF; printpdf passes these
    // bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

/// Accented Latin-1 letters take the advance of their base letter.
fn latin1_base(byte: u8) -> Option<u8> {
    let base = match byte {
        0xC0..=0xC5 => b'A',
        0xC7 => b'C',
        0xC8..=0xCB => b'E',
        0xCC..=0xCF => b'I',
        0xD0 => b'D',
        0xD1 => b'N',
        0xD2..=0xD6 | 0xD8 => b'O',
        0xD9..=0xDC => b'U',
        0xDD => b'Y',
        0xE0..=0xE5 => b'a',
        0xE7 => b'c',
        0xE8..=0xEB => b'e',
        0xEC..=0xEF => b'i',
        0xF1 => b'n',
        0xF2..=0xF6 | 0xF8 => b'o',
        0xF9..=0xFC => b'u',
        0xFD | 0xFF => b'y',
        _ => return None,
    };
    Some(base)
}

/// Advance of one WinAnsi byte in 1/1000 em.
pub fn glyph_width(byte: u8, face: FontFace) -> u16 {
    let byte = latin1_base(byte).unwrap_or(byte);
    match byte {
        0x20..=0x7E => face.ascii_widths()[(byte - 0x20) as usize],
        _ => MAX_GLYPH_WIDTH,
    }
}

/// Width of `text` in points at `font_size`.
///
/// This is the only text measurement in the crate; wrapping, ladder selection
/// and horizontal centring all go through it.
pub fn text_width(text: &str, font_size: f32, face: FontFace) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| glyph_width(winansi_byte(c), face) as u32)
        .sum();
    units as f32 * font_size / 1000.0
}

/// Distance between consecutive baselines.
pub fn line_height(font_size: f32) -> f32 {
    font_size * LINE_HEIGHT_FACTOR
}

/// Distance from the top of a line box to its baseline.
pub fn ascent(font_size: f32) -> f32 {
    font_size * ASCENDER / 1000.0
}
