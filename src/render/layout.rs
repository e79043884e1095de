//! Page layout for the printed program
//!
//! Layout is separated from painting: [`layout_program`] turns a program and
//! theme into pages of positioned drawing operations, and `pdf.rs` paints
//! them. Everything here is plain arithmetic, so the exact layout can be
//! checked in tests without parsing a PDF.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner.

use super::text::{pdf_safe, printable_decoration, text_width, truncate_to_width, wrap, FontFace, FontSet};
use crate::program::ConcertProgram;
use crate::theme::{HexColor, Layout, Theme, DEFAULT_DECORATION};

/// US Letter
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN_X: f32 = 72.0;
pub const MARGIN_Y: f32 = 60.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_X;
const INCH: f32 = 72.0;

/// Table column widths: # | Performer | Piece | Instrument | Duration
const COLUMN_WIDTHS: [f32; 5] = [0.4 * INCH, 1.5 * INCH, 2.2 * INCH, 1.0 * INCH, 0.7 * INCH];
const CELL_PADDING_X: f32 = 6.0;
const TABLE_FONT_SIZE: f32 = 10.0;

const SEPARATOR_GREY: HexColor = HexColor::rgb(0xcc, 0xcc, 0xcc);
const ZEBRA_GREY: HexColor = HexColor::rgb(0xf8, 0xf9, 0xfa);
const TABLE_ROW_RULE: HexColor = HexColor::rgb(0xee, 0xee, 0xee);
const MINIMAL_ROW_RULE: HexColor = HexColor::rgb(0xdd, 0xdd, 0xdd);
const FOOTER_GREY: HexColor = HexColor::rgb(0x99, 0x99, 0x99);

/// Text shown in the footer under the statistics line
pub const BRAND_LINE: &str = "Generated by Recital";

/// Title block values after overrides have been applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Heading {
    pub title: String,
    pub date: String,
    pub time: String,
    pub venue: String,
}

/// A positioned drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Text with its baseline starting at (x, y)
    Text {
        text: String,
        face: FontFace,
        size: f32,
        x: f32,
        y: f32,
        color: HexColor,
    },
    /// Horizontal rule from x1 to x2 at height y
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
        color: HexColor,
    },
    /// Filled rectangle with its lower-left corner at (x, y)
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: HexColor,
    },
}

/// One page worth of drawing operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// All text on the page, in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Flowing cursor over a growing list of pages
struct Composer {
    pages: Vec<Page>,
    cursor: f32,
}

impl Composer {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            cursor: PAGE_HEIGHT - MARGIN_Y,
        }
    }

    fn page(&mut self) -> &mut Page {
        // pages is never empty
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor = PAGE_HEIGHT - MARGIN_Y;
    }

    /// Start a new page unless `height` still fits above the bottom margin.
    /// Returns true when a page break happened.
    fn ensure(&mut self, height: f32) -> bool {
        let fits = self.cursor - height >= MARGIN_Y;
        if !fits && !self.page().ops.is_empty() {
            self.new_page();
            return true;
        }
        false
    }

    fn space(&mut self, height: f32) {
        self.cursor = (self.cursor - height).max(MARGIN_Y);
    }

    /// Centered, wrapped paragraph. Returns nothing; advances the cursor.
    fn centered(&mut self, text: &str, face: FontFace, size: f32, color: HexColor, space_after: f32) {
        let lines = wrap(text, face, size, CONTENT_WIDTH);
        let leading = size * 1.2;
        self.ensure(leading * lines.len() as f32 + space_after);
        for line in lines {
            let width = text_width(&line, face, size);
            let x = MARGIN_X + (CONTENT_WIDTH - width) / 2.0;
            let y = self.cursor - size;
            self.page().ops.push(DrawOp::Text {
                text: line,
                face,
                size,
                x,
                y,
                color,
            });
            self.cursor -= leading;
        }
        self.space(space_after);
    }

    /// Centered horizontal rule spanning `fraction` of the content width.
    fn rule(&mut self, fraction: f32, thickness: f32, color: HexColor, before: f32, after: f32) {
        self.ensure(before + thickness + after);
        self.space(before);
        let width = CONTENT_WIDTH * fraction;
        let x1 = MARGIN_X + (CONTENT_WIDTH - width) / 2.0;
        let y = self.cursor - thickness / 2.0;
        self.page().ops.push(DrawOp::Rule {
            x1,
            x2: x1 + width,
            y,
            thickness,
            color,
        });
        self.cursor -= thickness;
        self.space(after);
    }

    fn finish(self) -> Vec<Page> {
        self.pages
    }
}

/// Lay out a program with the given theme.
pub fn layout_program(program: &ConcertProgram, theme: &Theme, heading: &Heading) -> Vec<Page> {
    let fonts = FontSet::for_style(theme.font_style);
    let mut composer = Composer::new();

    layout_heading(&mut composer, theme, fonts, heading);

    match theme.layout {
        Layout::List => layout_list(&mut composer, program, theme, fonts),
        Layout::Table | Layout::Minimal => layout_table(&mut composer, program, theme, fonts),
    }

    layout_footer(&mut composer, program, theme, fonts);
    composer.finish()
}

fn layout_heading(composer: &mut Composer, theme: &Theme, fonts: FontSet, heading: &Heading) {
    composer.space(0.3 * INCH);
    composer.rule(0.8, 1.5, theme.accent_color, 0.0, 20.0);
    composer.space(0.2 * INCH);

    composer.centered(
        &pdf_safe(&heading.title),
        fonts.title,
        theme.title_size,
        theme.text_color,
        8.0,
    );
    composer.space(0.1 * INCH);

    let info: Vec<String> = [&heading.date, &heading.time]
        .iter()
        .map(|s| pdf_safe(s.trim()))
        .filter(|s| !s.is_empty())
        .collect();
    if !info.is_empty() {
        composer.centered(&info.join("  |  "), fonts.italic, 12.0, theme.subtitle_color, 4.0);
    }
    let venue = pdf_safe(heading.venue.trim());
    if !venue.is_empty() {
        composer.centered(&venue, fonts.italic, 12.0, theme.subtitle_color, 4.0);
    }
    composer.space(0.15 * INCH);

    let decoration = printable_decoration(&theme.header_decoration)
        .unwrap_or_else(|| DEFAULT_DECORATION.to_string());
    composer.space(16.0);
    composer.centered(&decoration, fonts.title, 14.0, theme.accent_color, 16.0);
    composer.space(0.15 * INCH);
}

fn layout_list(composer: &mut Composer, program: &ConcertProgram, theme: &Theme, fonts: FontSet) {
    let count = program.performances.len();

    for (i, p) in program.performances.iter().enumerate() {
        let piece = pdf_safe(&p.piece_name);
        let mut detail = pdf_safe(&p.student_name);
        if !p.instrument.is_empty() {
            detail.push_str(", ");
            detail.push_str(&pdf_safe(&p.instrument));
        }
        detail.push_str(&format!("  ({} min)", p.minutes_label()));

        // Keep piece and performer on the same page
        let piece_lines = wrap(&piece, fonts.title, 12.0, CONTENT_WIDTH).len().max(1);
        let detail_lines = wrap(&detail, fonts.italic, 10.0, CONTENT_WIDTH).len().max(1);
        let block = piece_lines as f32 * 14.4 + 2.0 + detail_lines as f32 * 12.0 + 8.0;
        composer.ensure(block);

        composer.centered(&piece, fonts.title, 12.0, theme.text_color, 2.0);
        composer.centered(&detail, fonts.italic, 10.0, theme.subtitle_color, 8.0);

        if i + 1 < count {
            composer.rule(0.3, 0.5, SEPARATOR_GREY, 4.0, 10.0);
        }
    }
}

struct TableGeometry {
    x0: f32,
    header_height: f32,
    row_height: f32,
}

impl TableGeometry {
    fn new() -> Self {
        let total: f32 = COLUMN_WIDTHS.iter().sum();
        Self {
            x0: MARGIN_X + (CONTENT_WIDTH - total) / 2.0,
            header_height: 3.0 + TABLE_FONT_SIZE * 1.2 + 12.0,
            row_height: 8.0 + TABLE_FONT_SIZE * 1.2 + 8.0,
        }
    }

    fn width(&self) -> f32 {
        COLUMN_WIDTHS.iter().sum()
    }

    fn column_x(&self, column: usize) -> f32 {
        self.x0 + COLUMN_WIDTHS[..column].iter().sum::<f32>()
    }
}

/// Performer and Piece are left-aligned; the rest are centered.
fn left_aligned(column: usize) -> bool {
    matches!(column, 1 | 2)
}

#[allow(clippy::too_many_arguments)]
fn table_row(
    composer: &mut Composer,
    geometry: &TableGeometry,
    cells: &[String; 5],
    face: FontFace,
    text_color: HexColor,
    background: HexColor,
    height: f32,
    top_padding: f32,
    header: bool,
) {
    let top = composer.cursor;
    let bottom = top - height;
    composer.page().ops.push(DrawOp::Fill {
        x: geometry.x0,
        y: bottom,
        width: geometry.width(),
        height,
        color: background,
    });

    let baseline = top - top_padding - TABLE_FONT_SIZE;
    for (column, cell) in cells.iter().enumerate() {
        let cell_width = COLUMN_WIDTHS[column];
        let text = truncate_to_width(cell, face, TABLE_FONT_SIZE, cell_width - 2.0 * CELL_PADDING_X);
        if text.is_empty() {
            continue;
        }
        let x = if left_aligned(column) && !header {
            geometry.column_x(column) + CELL_PADDING_X
        } else {
            geometry.column_x(column) + (cell_width - text_width(&text, face, TABLE_FONT_SIZE)) / 2.0
        };
        composer.page().ops.push(DrawOp::Text {
            text,
            face,
            size: TABLE_FONT_SIZE,
            x,
            y: baseline,
            color: text_color,
        });
    }
    composer.cursor = bottom;
}

fn row_rule(composer: &mut Composer, geometry: &TableGeometry, thickness: f32, color: HexColor) {
    let y = composer.cursor;
    composer.page().ops.push(DrawOp::Rule {
        x1: geometry.x0,
        x2: geometry.x0 + geometry.width(),
        y,
        thickness,
        color,
    });
}

fn header_row(composer: &mut Composer, geometry: &TableGeometry, theme: &Theme, fonts: FontSet) {
    let cells = ["#", "Performer", "Piece", "Instrument", "Duration"].map(String::from);
    table_row(
        composer,
        geometry,
        &cells,
        fonts.title,
        HexColor::WHITE,
        theme.bg_color,
        geometry.header_height,
        3.0,
        true,
    );
    match theme.layout {
        Layout::Minimal => row_rule(composer, geometry, 0.5, MINIMAL_ROW_RULE),
        _ => row_rule(composer, geometry, 2.0, theme.accent_color),
    }
}

fn layout_table(composer: &mut Composer, program: &ConcertProgram, theme: &Theme, fonts: FontSet) {
    let geometry = TableGeometry::new();
    let count = program.performances.len();

    composer.ensure(geometry.header_height + geometry.row_height);
    header_row(composer, &geometry, theme, fonts);

    for (i, p) in program.performances.iter().enumerate() {
        if composer.ensure(geometry.row_height) {
            header_row(composer, &geometry, theme, fonts);
        }

        let cells = [
            p.order.to_string(),
            pdf_safe(&p.student_name),
            pdf_safe(&p.piece_name),
            pdf_safe(&p.instrument),
            format!("{} min", p.minutes_label()),
        ];
        let background = if i % 2 == 0 { HexColor::WHITE } else { ZEBRA_GREY };
        table_row(
            composer,
            &geometry,
            &cells,
            fonts.body,
            theme.text_color,
            background,
            geometry.row_height,
            8.0,
            false,
        );

        match theme.layout {
            Layout::Minimal => row_rule(composer, &geometry, 0.5, MINIMAL_ROW_RULE),
            _ if i + 1 < count => row_rule(composer, &geometry, 0.5, TABLE_ROW_RULE),
            _ => {}
        }
    }
}

fn layout_footer(composer: &mut Composer, program: &ConcertProgram, theme: &Theme, fonts: FontSet) {
    let decoration = if theme.footer_decoration.trim().is_empty() {
        None
    } else {
        Some(
            printable_decoration(&theme.footer_decoration)
                .unwrap_or_else(|| DEFAULT_DECORATION.to_string()),
        )
    };

    // Decoration, rule and both footer lines stay together
    let decoration_height = if decoration.is_some() { 12.0 * 1.2 + 0.1 * INCH } else { 0.0 };
    let footer_height = 0.4 * INCH + decoration_height + 1.5 + 12.0 + 9.0 * 1.2 * 2.0 + 0.1 * INCH;
    composer.ensure(footer_height);

    composer.space(0.4 * INCH);
    if let Some(decoration) = decoration {
        composer.centered(&decoration, fonts.body, 12.0, theme.accent_color, 0.0);
        composer.space(0.1 * INCH);
    }
    composer.rule(0.8, 1.5, theme.accent_color, 0.0, 12.0);

    let stats = format!(
        "{} performances  \u{b7}  Approximately {} minutes",
        program.performances.len(),
        program.total_minutes()
    );
    composer.centered(&stats, fonts.italic, 9.0, FOOTER_GREY, 0.0);
    composer.space(0.1 * INCH);
    composer.centered(BRAND_LINE, fonts.italic, 9.0, FOOTER_GREY, 0.0);
}
