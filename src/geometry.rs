//! Badge geometry – the fixed page description shared by the layout engine
//! and the renderer.
//!
//! All coordinates are PDF points (1 pt = 1/72 inch) measured from the
//! page's top-left corner, with y increasing downward. The renderer flips to
//! PDF's bottom-left origin when it emits drawing ops.

use serde::{Deserialize, Serialize};

use crate::fonts::FontFace;

const INCH: f32 = 72.0;

/// A positioned rectangle on the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge, from the page's left side.
    pub x: f32,
    /// Top edge, from the page's top side.
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Everything the layout engine needs to know about one text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub bounds: BoundingBox,
    /// Font sizes in points, largest first.
    pub ladder: Vec<f32>,
    pub face: FontFace,
    /// Upper-case the text before measuring.
    pub uppercase: bool,
    /// Fill colour, RGB in 0..=1.
    pub color: [f32; 3],
}

impl FieldSpec {
    pub fn largest_size(&self) -> f32 {
        self.ladder.first().copied().unwrap_or(0.0)
    }

    pub fn smallest_size(&self) -> f32 {
        self.ladder.last().copied().unwrap_or(0.0)
    }
}

/// Page size and every fixed region of a badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeGeometry {
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    /// Distance of the printed border from the page edge.
    pub border_inset: f32,
    pub border_width: f32,
    pub name: FieldSpec,
    pub company: FieldSpec,
    pub title: FieldSpec,
    /// The ticket-type label, drawn over [`BadgeGeometry::banner`].
    pub ticket_type: FieldSpec,
    pub banner: BoundingBox,
    pub banner_color: [f32; 3],
    /// Square region for the ticket QR code, quiet zone included.
    pub code: BoundingBox,
}

impl BadgeGeometry {
    /// The 4.15 in × 5.7 in portrait badge stock.
    pub fn standard() -> Self {
        let page_width_pt = 4.15 * INCH;
        let page_height_pt = 5.7 * INCH;
        let side_margin = 0.3 * INCH;
        let text_width = page_width_pt - 2.0 * side_margin;
        let ink = [0.1, 0.1, 0.1];
        let code_size = 64.0;

        Self {
            page_width_pt,
            page_height_pt,
            border_inset: 8.0,
            border_width: 0.75,
            name: FieldSpec {
                bounds: BoundingBox::new(side_margin, 112.0, text_width, 64.0),
                ladder: vec![26.0, 20.0, 16.0],
                face: FontFace::Bold,
                uppercase: true,
                color: ink,
            },
            company: FieldSpec {
                bounds: BoundingBox::new(side_margin, 184.0, text_width, 40.0),
                ladder: vec![15.0],
                face: FontFace::Regular,
                uppercase: true,
                color: ink,
            },
            title: FieldSpec {
                bounds: BoundingBox::new(side_margin, 228.0, text_width, 36.0),
                ladder: vec![14.0],
                face: FontFace::Oblique,
                uppercase: true,
                color: ink,
            },
            code: BoundingBox::new(
                (page_width_pt - code_size) / 2.0,
                272.0,
                code_size,
                code_size,
            ),
            ticket_type: FieldSpec {
                bounds: BoundingBox::new(side_margin, 350.0, text_width, 36.0),
                ladder: vec![24.0, 18.0, 14.0],
                face: FontFace::Bold,
                uppercase: true,
                color: [1.0, 1.0, 1.0],
            },
            banner: BoundingBox::new(16.0, 346.0, page_width_pt - 32.0, 44.0),
            banner_color: [0.1, 0.1, 0.1],
        }
    }

    /// The text fields in drawing order.
    pub fn fields(&self) -> [&FieldSpec; 4] {
        [&self.name, &self.company, &self.title, &self.ticket_type]
    }
}

impl Default for BadgeGeometry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{line_height, MAX_GLYPH_WIDTH};

    fn inside_page(geo: &BadgeGeometry, b: &BoundingBox) -> bool {
        b.x >= 0.0 && b.y >= 0.0 && b.right() <= geo.page_width_pt && b.bottom() <= geo.page_height_pt
    }

    #[test]
    fn regions_lie_within_the_page() {
        let geo = BadgeGeometry::standard();
        for field in geo.fields() {
            assert!(inside_page(&geo, &field.bounds), "{:?}", field.bounds);
        }
        assert!(inside_page(&geo, &geo.code));
        assert!(inside_page(&geo, &geo.banner));
    }

    #[test]
    fn ladders_are_strictly_descending() {
        let geo = BadgeGeometry::standard();
        for field in geo.fields() {
            assert!(!field.ladder.is_empty());
            assert!(field.ladder.windows(2).all(|w| w[0] > w[1]), "{:?}", field.ladder);
        }
    }

    #[test]
    fn every_box_holds_one_widest_glyph_line() {
        // Hard-breaking can always place at least one character per line.
        let geo = BadgeGeometry::standard();
        for field in geo.fields() {
            let size = field.smallest_size();
            let widest = MAX_GLYPH_WIDTH as f32 * size / 1000.0;
            assert!(field.bounds.width >= widest);
            assert!(field.bounds.height >= line_height(size));
        }
    }

    #[test]
    fn text_fields_do_not_overlap() {
        let geo = BadgeGeometry::standard();
        assert!(geo.name.bounds.bottom() <= geo.company.bounds.y);
        assert!(geo.company.bounds.bottom() <= geo.title.bounds.y);
        assert!(geo.title.bounds.bottom() <= geo.code.y);
        assert!(geo.code.bottom() <= geo.banner.y);
    }
}
