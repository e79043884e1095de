//! Paints laid-out pages into a PDF document

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point,
    Polygon, Rgb,
};

use super::layout::{DrawOp, Page, PAGE_HEIGHT, PAGE_WIDTH};
use super::text::FontFace;
use super::RenderError;
use crate::theme::HexColor;

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn color(c: HexColor) -> Color {
    let (r, g, b) = c.to_unit();
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn builtin(face: FontFace) -> BuiltinFont {
    match face {
        FontFace::TimesRoman => BuiltinFont::TimesRoman,
        FontFace::TimesBold => BuiltinFont::TimesBold,
        FontFace::TimesItalic => BuiltinFont::TimesItalic,
        FontFace::Helvetica => BuiltinFont::Helvetica,
        FontFace::HelveticaBold => BuiltinFont::HelveticaBold,
        FontFace::HelveticaOblique => BuiltinFont::HelveticaOblique,
    }
}

/// Fonts are registered with the document once, on first use
struct Fonts {
    loaded: Vec<(FontFace, IndirectFontRef)>,
}

impl Fonts {
    fn get(&mut self, doc: &PdfDocumentReference, face: FontFace) -> Result<IndirectFontRef, RenderError> {
        if let Some((_, font)) = self.loaded.iter().find(|(f, _)| *f == face) {
            return Ok(font.clone());
        }
        let font = doc
            .add_builtin_font(builtin(face))
            .map_err(|e| RenderError::Pdf(format!("{:?}", e)))?;
        self.loaded.push((face, font.clone()));
        Ok(font)
    }
}

fn paint(layer: &PdfLayerReference, doc: &PdfDocumentReference, fonts: &mut Fonts, op: &DrawOp) -> Result<(), RenderError> {
    match op {
        DrawOp::Text {
            text,
            face,
            size,
            x,
            y,
            color: c,
        } => {
            let font = fonts.get(doc, *face)?;
            layer.set_fill_color(color(*c));
            layer.use_text(text.as_str(), *size, mm(*x), mm(*y), &font);
        }
        DrawOp::Rule {
            x1,
            x2,
            y,
            thickness,
            color: c,
        } => {
            layer.set_outline_color(color(*c));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![
                    (Point::new(mm(*x1), mm(*y)), false),
                    (Point::new(mm(*x2), mm(*y)), false),
                ],
                is_closed: false,
            });
        }
        DrawOp::Fill {
            x,
            y,
            width,
            height,
            color: c,
        } => {
            layer.set_fill_color(color(*c));
            layer.add_polygon(Polygon {
                rings: vec![vec![
                    (Point::new(mm(*x), mm(*y)), false),
                    (Point::new(mm(*x + *width), mm(*y)), false),
                    (Point::new(mm(*x + *width), mm(*y + *height)), false),
                    (Point::new(mm(*x), mm(*y + *height)), false),
                ]],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
    }
    Ok(())
}

/// Paint `pages` into a new PDF and return its bytes.
pub fn render_pdf(pages: &[Page], title: &str) -> Result<Vec<u8>, RenderError> {
    let (doc, first_page, first_layer) = PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Program");
    let mut fonts = Fonts { loaded: Vec::new() };

    for (index, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Program")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        for op in &page.ops {
            paint(&layer, &doc, &mut fonts, op)?;
        }
    }

    doc.save_to_bytes().map_err(|e| RenderError::Pdf(format!("{:?}", e)))
}
