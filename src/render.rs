//! Badge renderer – turns a [`LayoutResult`] into a one-page PDF using
//! `printpdf` (v0.8 ops-based API) and draws the ticket QR code with
//! `qrcode`.

use std::ops::Range;
use std::path::{Path, PathBuf};

use printpdf::*;
use sha2::{Digest, Sha256};

use crate::attendee::AttendeeRecord;
use crate::error::{BadgeError, BadgeResult};
use crate::fonts::{self, FontFace};
use crate::geometry::{BadgeGeometry, BoundingBox, FieldSpec};
use crate::layout::{FieldLayout, LayoutResult};

const PT_TO_MM: f32 = 0.352778;

/// Modules of blank margin around the QR symbol.
const QR_QUIET_ZONE: usize = 4;

/// One page of vector drawing ops, in PDF's bottom-left coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgePage {
    pub width_pt: f32,
    pub height_pt: f32,
    pub ops: Vec<Op>,
}

impl BadgePage {
    /// The same page turned 180° about its centre.
    pub fn rotated_180(&self) -> Self {
        let mut ops = Vec::with_capacity(self.ops.len() + 3);
        ops.push(Op::SaveGraphicsState);
        ops.push(Op::SetTransformationMatrix {
            matrix: CurTransMat::Raw([-1.0, 0.0, 0.0, -1.0, self.width_pt, self.height_pt]),
        });
        ops.extend(self.ops.iter().cloned());
        ops.push(Op::RestoreGraphicsState);
        Self {
            width_pt: self.width_pt,
            height_pt: self.height_pt,
            ops,
        }
    }

    /// Serialise as a single-page PDF.
    pub fn to_pdf(&self, title: &str) -> Vec<u8> {
        let mut doc = PdfDocument::new(title);
        let page = PdfPage::new(
            Mm(self.width_pt * PT_TO_MM),
            Mm(self.height_pt * PT_TO_MM),
            self.ops.clone(),
        );
        doc.with_pages(vec![page]);
        let mut bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
        stamp_document_id(&mut bytes);
        bytes
    }
}

/// Overwrite the random trailer `/ID` pair with a digest of the document.
///
/// Both strings keep their length so every xref offset stays valid. The
/// digest is taken with the ID bytes zeroed, so equal pages give equal files.
pub fn stamp_document_id(bytes: &mut [u8]) {
    let Some(ranges) = trailer_id_ranges(bytes) else {
        log::debug!("no trailer /ID found; document left as serialised");
        return;
    };
    for r in &ranges {
        bytes[r.clone()].fill(b'0');
    }
    let hex: Vec<u8> = Sha256::digest(&*bytes)
        .iter()
        .flat_map(|b| format!("{b:02x}").into_bytes())
        .collect();
    for r in ranges {
        for (i, slot) in bytes[r].iter_mut().enumerate() {
            *slot = hex[i % hex.len()];
        }
    }
}

/// Byte ranges of the contents of the two `/ID` strings, hex or literal.
fn trailer_id_ranges(bytes: &[u8]) -> Option<Vec<Range<usize>>> {
    let mut i = bytes.windows(3).rposition(|w| w == b"/ID")? + 3;
    let mut ranges = Vec::with_capacity(2);
    while ranges.len() < 2 && i < bytes.len() {
        match bytes[i] {
            open @ (b'<' | b'(') => {
                let close = if open == b'<' { b'>' } else { b')' };
                let end = i + 1 + bytes[i + 1..].iter().position(|&b| b == close)?;
                ranges.push(i + 1..end);
                i = end + 1;
            }
            b']' => break,
            _ => i += 1,
        }
    }
    (ranges.len() == 2).then_some(ranges)
}

/// A finished badge: its page, the serialised PDF, and where it lives on
/// disk once written.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub ticket_id: String,
    pub title: String,
    pub page: BadgePage,
    pub bytes: Vec<u8>,
    pub path: Option<PathBuf>,
    /// True when the page has been turned for an upside-down print path.
    pub rotated: bool,
}

impl RenderedDocument {
    fn from_page(ticket_id: &str, title: String, page: BadgePage) -> Self {
        let bytes = page.to_pdf(&title);
        Self {
            ticket_id: ticket_id.to_string(),
            title,
            page,
            bytes,
            path: None,
            rotated: false,
        }
    }

    /// A copy turned 180°, re-serialised. The copy is not backed by a file.
    pub fn rotated_180(&self) -> Self {
        let page = self.page.rotated_180();
        Self {
            ticket_id: self.ticket_id.clone(),
            title: self.title.clone(),
            bytes: page.to_pdf(&self.title),
            page,
            path: None,
            rotated: !self.rotated,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Draws badges against a fixed [`BadgeGeometry`].
#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer {
    geometry: BadgeGeometry,
}

impl DocumentRenderer {
    pub fn new(geometry: BadgeGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &BadgeGeometry {
        &self.geometry
    }

    /// Lay out and render `attendee` in one step.
    pub fn render_badge(&self, attendee: &AttendeeRecord) -> BadgeResult<RenderedDocument> {
        let layouts = LayoutResult::for_attendee(attendee, &self.geometry);
        self.render(attendee, &layouts)
    }

    /// Render a badge from precomputed layouts.
    ///
    /// Fails with [`BadgeError::Render`] when the ticket identifier cannot be
    /// encoded; a badge is never produced without its code.
    pub fn render(
        &self,
        attendee: &AttendeeRecord,
        layouts: &LayoutResult,
    ) -> BadgeResult<RenderedDocument> {
        let geo = &self.geometry;
        let page_h = geo.page_height_pt;
        let mut ops = Vec::new();

        // Static artwork
        draw_border(&mut ops, geo);
        fill_rect(&mut ops, &geo.banner, geo.banner_color, page_h);

        draw_field(&mut ops, &layouts.name, &geo.name, page_h);
        draw_field(&mut ops, &layouts.company, &geo.company, page_h);
        draw_field(&mut ops, &layouts.title, &geo.title, page_h);
        draw_field(&mut ops, &layouts.ticket_type, &geo.ticket_type, page_h);

        draw_qr_code(&mut ops, &attendee.ticket_id, &geo.code, page_h)?;

        let page = BadgePage {
            width_pt: geo.page_width_pt,
            height_pt: page_h,
            ops,
        };
        let title = format!("Badge {}", attendee.ticket_id);
        Ok(RenderedDocument::from_page(&attendee.ticket_id, title, page))
    }

    /// A printer pipeline dry-run page: border, heading and timestamp.
    pub fn render_test_page(&self, generated_at: &str) -> RenderedDocument {
        let geo = &self.geometry;
        let page_h = geo.page_height_pt;
        let mut ops = Vec::new();
        draw_border(&mut ops, geo);

        let heading = "EVENT BADGE - TEST";
        let size = 14.0;
        let x = (geo.page_width_pt - fonts::text_width(heading, size, FontFace::Bold)) / 2.0;
        let black = [0.0, 0.0, 0.0];
        write_text(&mut ops, heading, x, page_h - 36.0, size, FontFace::Bold, black);
        write_text(
            &mut ops,
            &format!("Generated at: {generated_at}"),
            36.0,
            page_h - 72.0,
            10.0,
            FontFace::Regular,
            black,
        );

        let page = BadgePage {
            width_pt: geo.page_width_pt,
            height_pt: page_h,
            ops,
        };
        RenderedDocument::from_page("test-page", "Badge printer test page".to_string(), page)
    }
}

fn rgb(color: [f32; 3]) -> Color {
    Color::Rgb(Rgb {
        r: color[0],
        g: color[1],
        b: color[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Corner points of a top-left-origin box, in PDF coordinates.
fn corners(b: &BoundingBox, page_height: f32) -> Vec<LinePoint> {
    let x1 = b.x;
    let x2 = b.right();
    let y_top = page_height - b.y;
    let y_bottom = page_height - b.bottom();
    vec![
        point(x1, y_bottom),
        point(x2, y_bottom),
        point(x2, y_top),
        point(x1, y_top),
    ]
}

fn fill_rect(ops: &mut Vec<Op>, b: &BoundingBox, color: [f32; 3], page_height: f32) {
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: corners(b, page_height),
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

fn draw_border(ops: &mut Vec<Op>, geo: &BadgeGeometry) {
    let inset = geo.border_inset;
    let frame = BoundingBox::new(
        inset,
        inset,
        geo.page_width_pt - 2.0 * inset,
        geo.page_height_pt - 2.0 * inset,
    );
    ops.push(Op::SetOutlineColor {
        col: rgb([0.0, 0.0, 0.0]),
    });
    ops.push(Op::SetOutlineThickness {
        pt: Pt(geo.border_width),
    });
    ops.push(Op::DrawLine {
        line: Line {
            points: corners(&frame, geo.page_height_pt),
            is_closed: true,
        },
    });
}

fn write_text(
    ops: &mut Vec<Op>,
    text: &str,
    x: f32,
    baseline_y: f32,
    size: f32,
    face: FontFace,
    color: [f32; 3],
) {
    let font = face.builtin();
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(x),
            y: Pt(baseline_y),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::SetLineHeight {
        lh: Pt(fonts::line_height(size)),
    });
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(fonts::to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Centre the field's lines horizontally and the line block vertically.
fn draw_field(ops: &mut Vec<Op>, layout: &FieldLayout, spec: &FieldSpec, page_height: f32) {
    if layout.lines.is_empty() {
        return;
    }
    let size = layout.font_size;
    let lh = fonts::line_height(size);
    let b = &spec.bounds;
    let block = lh * layout.lines.len() as f32;
    let top = b.y + (b.height - block).max(0.0) / 2.0;

    for (i, line) in layout.lines.iter().enumerate() {
        let width = fonts::text_width(line, size, spec.face);
        let x = b.x + (b.width - width).max(0.0) / 2.0;
        let baseline = top + i as f32 * lh + (lh - size) / 2.0 + fonts::ascent(size);
        write_text(ops, line, x, page_height - baseline, size, spec.face, spec.color);
    }
}

/// Draw `data` as a QR symbol filling `area`. Dark modules in a row are
/// merged into runs, one polygon ring per run.
fn draw_qr_code(ops: &mut Vec<Op>, data: &str, area: &BoundingBox, page_height: f32) -> BadgeResult<()> {
    let code = qrcode::QrCode::new(data.as_bytes())
        .map_err(|e| BadgeError::Render(format!("cannot encode ticket id '{data}': {e}")))?;
    let modules = code.width();
    let colors = code.to_colors();
    let side = area.width.min(area.height);
    let unit = side / (modules + 2 * QR_QUIET_ZONE) as f32;
    let origin_x = area.x + (area.width - side) / 2.0 + QR_QUIET_ZONE as f32 * unit;
    let origin_y = area.y + (area.height - side) / 2.0 + QR_QUIET_ZONE as f32 * unit;

    let mut rings = Vec::new();
    for row in 0..modules {
        let mut col = 0;
        while col < modules {
            if colors[row * modules + col] != qrcode::Color::Dark {
                col += 1;
                continue;
            }
            let start = col;
            while col < modules && colors[row * modules + col] == qrcode::Color::Dark {
                col += 1;
            }
            let run = BoundingBox::new(
                origin_x + start as f32 * unit,
                origin_y + row as f32 * unit,
                (col - start) as f32 * unit,
                unit,
            );
            rings.push(PolygonRing {
                points: corners(&run, page_height),
            });
        }
    }

    ops.push(Op::SetFillColor {
        col: rgb([0.0, 0.0, 0.0]),
    });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings,
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attendee() -> AttendeeRecord {
        AttendeeRecord::new("A1-0245", "Fazli", "Fazli Corp.", "CEO", "Delegate")
    }

    fn written_text(ops: &[Op]) -> Vec<String> {
        ops.iter()
            .filter_map(|op| match op {
                Op::WriteTextBuiltinFont { items, .. } => Some(
                    items
                        .iter()
                        .filter_map(|item| match item {
                            TextItem::Text(t) => Some(t.clone()),
                            _ => None,
                        })
                        .collect::<String>(),
                ),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn renders_one_pdf_page() {
        let doc = DocumentRenderer::default().render_badge(&attendee()).unwrap();
        assert!(doc.bytes.len() > 100, "PDF should have content");
        assert_eq!(&doc.bytes[0..5], b"%PDF-");
        assert!(doc.path.is_none());
        assert!(!doc.rotated);
    }

    #[test]
    fn draws_every_field() {
        let doc = DocumentRenderer::default().render_badge(&attendee()).unwrap();
        let text = written_text(&doc.page.ops);
        assert_eq!(text, vec!["FAZLI", "FAZLI CORP.", "CEO", "DELEGATE"]);
    }

    #[test]
    fn empty_fields_draw_nothing() {
        let rec = AttendeeRecord::new("T-1", "", "", "", "");
        let doc = DocumentRenderer::default().render_badge(&rec).unwrap();
        assert!(written_text(&doc.page.ops).is_empty());
    }

    #[test]
    fn unencodable_ticket_id_is_a_render_error() {
        let rec = AttendeeRecord::new("X".repeat(8000), "Jo", "", "", "VIP");
        let err = DocumentRenderer::default().render_badge(&rec).unwrap_err();
        assert!(matches!(err, BadgeError::Render(_)), "{err}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = DocumentRenderer::default();
        let a = renderer.render_badge(&attendee()).unwrap();
        let b = renderer.render_badge(&attendee()).unwrap();
        assert_eq!(a.page, b.page);
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn different_badges_get_different_ids() {
        let renderer = DocumentRenderer::default();
        let a = renderer.render_badge(&attendee()).unwrap();
        let other = AttendeeRecord::new("A1-0246", "Fazli", "Fazli Corp.", "CEO", "Delegate");
        let b = renderer.render_badge(&other).unwrap();
        let id = |bytes: &[u8]| {
            let r = trailer_id_ranges(bytes).unwrap();
            bytes[r[0].clone()].to_vec()
        };
        assert_ne!(id(&a.bytes), id(&b.bytes));
    }

    #[test]
    fn stamps_both_id_strings_in_place() {
        let mut hex = b"trailer << /Size 3 /ID [<0123456789abcdef0123456789ABCDEF> <ffffffffffffffffffffffffffffffff>] >>".to_vec();
        let mut literal = b"trailer << /ID [(k3JxQ9pLmZ2vB7nR) (aaaaaaaaaaaaaaaa)] >>".to_vec();
        let (hex_len, literal_len) = (hex.len(), literal.len());
        stamp_document_id(&mut hex);
        stamp_document_id(&mut literal);
        assert_eq!(hex.len(), hex_len);
        assert_eq!(literal.len(), literal_len);

        let r = trailer_id_ranges(&hex).unwrap();
        assert_eq!(r[0].len(), 32);
        assert_eq!(hex[r[0].clone()], hex[r[1].clone()]);
        assert!(hex[r[0].clone()].iter().all(u8::is_ascii_hexdigit));

        let r = trailer_id_ranges(&literal).unwrap();
        assert_eq!(r[0].len(), 16);
        assert_eq!(literal[r[0].clone()], literal[r[1].clone()]);
    }

    #[test]
    fn documents_without_id_are_untouched() {
        let mut bytes = b"%PDF-1.7 trailer << /Size 3 >>".to_vec();
        let before = bytes.clone();
        stamp_document_id(&mut bytes);
        assert_eq!(bytes, before);
    }

    #[test]
    fn rotation_wraps_the_original_ops() {
        let doc = DocumentRenderer::default().render_badge(&attendee()).unwrap();
        let turned = doc.rotated_180();
        let n = turned.page.ops.len();
        assert_eq!(n, doc.page.ops.len() + 3);
        assert_eq!(turned.page.ops[0], Op::SaveGraphicsState);
        assert_eq!(turned.page.ops[n - 1], Op::RestoreGraphicsState);
        assert_eq!(&turned.page.ops[2..n - 1], doc.page.ops.as_slice());
        assert!(turned.rotated);
        assert_eq!(&turned.bytes[0..5], b"%PDF-");
    }

    #[test]
    fn test_page_carries_timestamp() {
        let doc = DocumentRenderer::default().render_test_page("2025-10-21T09:00:00");
        let text = written_text(&doc.page.ops);
        assert_eq!(text[0], "EVENT BADGE - TEST");
        assert_eq!(text[1], "Generated at: 2025-10-21T09:00:00");
    }
}
