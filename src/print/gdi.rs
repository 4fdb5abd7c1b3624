//! Replays a [`BadgePage`] as device drawing commands for the Windows
//! spooler, which draws through a GDI device context instead of taking PDF.
//!
//! [`flatten`] walks the page ops once, applying the transformation matrix
//! and colour state, and yields commands in points from the top-left corner
//! of the page. [`DeviceMapping`] then turns points into device pixels.

use printpdf::{Color, CurTransMat, LinePoint, Op, PaintMode, TextItem};

use crate::fonts::{self, FontFace};
use crate::render::BadgePage;

/// x, y in points from the top-left page corner, y growing downwards.
pub type PagePoint = (f32, f32);

/// One thing to draw, already in page space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Filled rings with no outline.
    Fill {
        rings: Vec<Vec<PagePoint>>,
        color: [u8; 3],
    },
    Stroke {
        points: Vec<PagePoint>,
        closed: bool,
        width: f32,
        color: [u8; 3],
    },
    /// `origin` is the start of the baseline; `angle` is counter-clockwise
    /// in degrees.
    Text {
        origin: PagePoint,
        text: String,
        size: f32,
        face: FontFace,
        angle: f32,
        color: [u8; 3],
    },
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: [f32; 6],
    fill: [u8; 3],
    stroke: [u8; 3],
    line_width: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            fill: [0, 0, 0],
            stroke: [0, 0, 0],
            line_width: 1.0,
        }
    }
}

impl GraphicsState {
    /// User space to PDF page space.
    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.ctm;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Uniform scale factor of the current matrix.
    fn scale(&self) -> f32 {
        let [a, b, c, d, ..] = self.ctm;
        (a * d - b * c).abs().sqrt()
    }

    fn angle(&self) -> f32 {
        let [a, b, ..] = self.ctm;
        let deg = b.atan2(a).to_degrees();
        if deg < 0.0 { deg + 360.0 } else { deg }
    }
}

/// Text state between `StartTextSection` and `EndTextSection`.
#[derive(Debug, Clone, Copy)]
struct TextState {
    cursor: (f32, f32),
    size: f32,
    face: FontFace,
}

/// Flatten `page` into drawing commands.
///
/// Bezier control points are treated as plain vertices and clip paths are
/// ignored; badges use neither.
pub fn flatten(page: &BadgePage) -> Vec<DrawCommand> {
    let page_h = page.height_pt;
    let mut state = GraphicsState::default();
    let mut saved = Vec::new();
    let mut text = TextState {
        cursor: (0.0, 0.0),
        size: 12.0,
        face: FontFace::Regular,
    };
    let mut commands = Vec::new();

    let to_page = |state: &GraphicsState, points: &[LinePoint]| -> Vec<PagePoint> {
        points
            .iter()
            .map(|lp| {
                let (x, y) = state.apply(lp.p.x.0, lp.p.y.0);
                (x, page_h - y)
            })
            .collect()
    };

    for op in &page.ops {
        match op {
            Op::SaveGraphicsState => saved.push(state),
            Op::RestoreGraphicsState => state = saved.pop().unwrap_or_default(),
            Op::SetTransformationMatrix { matrix } => {
                state.ctm = CurTransMat::combine_matrix(matrix.as_array(), state.ctm);
            }
            Op::SetFillColor { col } => state.fill = device_color(col),
            Op::SetOutlineColor { col } => state.stroke = device_color(col),
            Op::SetOutlineThickness { pt } => state.line_width = pt.0,
            Op::DrawPolygon { polygon } => {
                let rings: Vec<Vec<PagePoint>> = polygon
                    .rings
                    .iter()
                    .map(|ring| to_page(&state, &ring.points))
                    .collect();
                if matches!(polygon.mode, PaintMode::Fill | PaintMode::FillStroke) {
                    commands.push(DrawCommand::Fill {
                        rings: rings.clone(),
                        color: state.fill,
                    });
                }
                if matches!(polygon.mode, PaintMode::Stroke | PaintMode::FillStroke) {
                    for points in rings {
                        commands.push(DrawCommand::Stroke {
                            points,
                            closed: true,
                            width: state.line_width * state.scale(),
                            color: state.stroke,
                        });
                    }
                }
            }
            Op::DrawLine { line } => commands.push(DrawCommand::Stroke {
                points: to_page(&state, &line.points),
                closed: line.is_closed,
                width: state.line_width * state.scale(),
                color: state.stroke,
            }),
            Op::StartTextSection => text.cursor = (0.0, 0.0),
            Op::SetTextCursor { pos } => text.cursor = (pos.x.0, pos.y.0),
            Op::SetFontSizeBuiltinFont { size, font } => {
                text.size = size.0;
                text.face = FontFace::from_builtin(*font).unwrap_or(FontFace::Regular);
            }
            Op::WriteTextBuiltinFont { items, font } => {
                let raw: String = items
                    .iter()
                    .filter_map(|item| match item {
                        TextItem::Text(t) => Some(t.as_str()),
                        _ => None,
                    })
                    .collect();
                let (x, y) = state.apply(text.cursor.0, text.cursor.1);
                commands.push(DrawCommand::Text {
                    origin: (x, page_h - y),
                    text: fonts::from_winlatin(&raw),
                    size: text.size * state.scale(),
                    face: FontFace::from_builtin(*font).unwrap_or(text.face),
                    angle: state.angle(),
                    color: state.fill,
                });
            }
            _ => {}
        }
    }
    commands
}

fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn device_color(col: &Color) -> [u8; 3] {
    match col {
        Color::Rgb(c) => [channel(c.r), channel(c.g), channel(c.b)],
        Color::Greyscale(g) => [channel(g.percent); 3],
        Color::Cmyk(c) => {
            let k = 1.0 - c.k;
            [
                channel((1.0 - c.c) * k),
                channel((1.0 - c.m) * k),
                channel((1.0 - c.y) * k),
            ]
        }
        Color::SpotColor(_) => [0, 0, 0],
    }
}

/// Points to device pixels for one printer device context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceMapping {
    pub dpi_x: f32,
    pub dpi_y: f32,
    /// Unprintable margin at the left and top, in device pixels.
    pub offset_x: f32,
    pub offset_y: f32,
}

impl DeviceMapping {
    pub fn new(dpi_x: i32, dpi_y: i32, offset_x: i32, offset_y: i32) -> Self {
        Self {
            dpi_x: dpi_x.max(1) as f32,
            dpi_y: dpi_y.max(1) as f32,
            offset_x: offset_x as f32,
            offset_y: offset_y as f32,
        }
    }

    pub fn point(&self, (x, y): PagePoint) -> (i32, i32) {
        (
            (x * self.dpi_x / 72.0 - self.offset_x).round() as i32,
            (y * self.dpi_y / 72.0 - self.offset_y).round() as i32,
        )
    }

    /// A stroke width, never thinner than one pixel.
    pub fn pen_width(&self, width_pt: f32) -> i32 {
        ((width_pt * self.dpi_x / 72.0).round() as i32).max(1)
    }

    /// Em height in pixels for a font of `size` points.
    pub fn font_height(&self, size: f32) -> i32 {
        (size * self.dpi_y / 72.0).round() as i32
    }
}

/// GDI `lfEscapement`: tenths of a degree, counter-clockwise.
pub fn escapement(angle: f32) -> i32 {
    ((angle * 10.0).round() as i32).rem_euclid(3600)
}

/// GDI `COLORREF` layout, 0x00BBGGRR.
pub fn colorref([r, g, b]: [u8; 3]) -> u32 {
    u32::from(r) | u32::from(g) << 8 | u32::from(b) << 16
}
