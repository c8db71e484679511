//! Paints a laid-out [`Document`] with printpdf.

use super::layout::{PAGE_HEIGHT, PAGE_WIDTH};
use super::{Document, Element, Font, RasterImage, Rgb, TextBlock};
use crate::{ClinicError, ClinicResult};
use printpdf::image_crate::DynamicImage;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Pt, Rect,
};

const LAYER_NAME: &str = "Layer 1";

/// Images are placed at 72 dpi so that one pixel is one point before scaling.
const IMAGE_DPI: f32 = 72.0;

fn mm(pt: f32) -> Mm {
    Mm::from(Pt(pt))
}

/// Convert a top-down `y` in points to PDF's bottom-up user space.
fn flip(y: f32) -> Mm {
    mm(PAGE_HEIGHT - y)
}

fn color(rgb: Rgb) -> Color {
    let (r, g, b) = rgb.channels();
    Color::Rgb(printpdf::Rgb::new(r, g, b, None))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, font: Font) -> &IndirectFontRef {
        match font {
            Font::Regular => &self.regular,
            Font::Bold => &self.bold,
            Font::Italic => &self.italic,
        }
    }
}

/// Serialise `document` to PDF bytes.
pub fn write_pdf(document: &Document) -> ClinicResult<Vec<u8>> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        document.title.as_str(),
        mm(PAGE_WIDTH),
        mm(PAGE_HEIGHT),
        LAYER_NAME,
    );
    let doc = doc.with_author(document.author.as_str());

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(ClinicError::PdfFont)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(ClinicError::PdfFont)?,
        italic: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(ClinicError::PdfFont)?,
    };

    for (index, page) in document.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER_NAME);
            doc.get_page(page_index).get_layer(layer_index)
        };

        for element in &page.elements {
            paint(&layer, element, &fonts, &document.images);
        }
    }

    doc.save_to_bytes().map_err(ClinicError::PdfSave)
}

fn paint(layer: &PdfLayerReference, element: &Element, fonts: &Fonts, images: &[RasterImage]) {
    match element {
        Element::Text(block) => paint_text(layer, block, fonts),
        Element::Rect {
            x,
            y,
            w,
            h,
            fill,
            stroke,
        } => {
            let mode = match (fill, stroke) {
                (Some(_), Some(_)) => PaintMode::FillStroke,
                (Some(_), None) => PaintMode::Fill,
                (None, Some(_)) => PaintMode::Stroke,
                (None, None) => return,
            };
            if let Some(fill) = fill {
                layer.set_fill_color(color(*fill));
            }
            if let Some((stroke, width)) = stroke {
                layer.set_outline_color(color(*stroke));
                layer.set_outline_thickness(*width);
            }
            let rect = Rect::new(mm(*x), flip(*y + *h), mm(*x + *w), flip(*y)).with_mode(mode);
            layer.add_rect(rect);
        }
        Element::Rule {
            x1,
            y1,
            x2,
            y2,
            color: rule_color,
            width,
        } => {
            layer.set_outline_color(color(*rule_color));
            layer.set_outline_thickness(*width);
            layer.add_line(Line {
                points: vec![
                    (Point::new(mm(*x1), flip(*y1)), false),
                    (Point::new(mm(*x2), flip(*y2)), false),
                ],
                is_closed: false,
            });
        }
        Element::Image { image, x, y, w, h } => {
            let Some(raster) = images.get(*image) else {
                tracing::warn!("image {image} missing from document, not drawn");
                return;
            };
            let (width_px, height_px) = raster.pixels.dimensions();
            let embedded =
                Image::from_dynamic_image(&DynamicImage::ImageRgb8(raster.pixels.clone()));
            embedded.add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(mm(*x)),
                    translate_y: Some(flip(*y + *h)),
                    scale_x: Some(*w / width_px.max(1) as f32),
                    scale_y: Some(*h / height_px.max(1) as f32),
                    dpi: Some(IMAGE_DPI),
                    ..Default::default()
                },
            );
        }
    }
}

fn paint_text(layer: &PdfLayerReference, block: &TextBlock, fonts: &Fonts) {
    layer.set_fill_color(color(block.color));
    layer.use_text(
        printable(&block.text),
        block.size,
        mm(block.x),
        flip(block.y),
        fonts.get(block.font),
    );
}

/// Builtin fonts drop anything outside Windows-1252; control characters are replaced here.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::image::tests::TINY_PNG_BASE64;
    use crate::render::{render_prescription, RenderRequest};
    use clinic_types::NonEmptyText;

    fn pdf_for(prescription: &str, with_images: bool) -> Vec<u8> {
        let (patient, mut hospital, visit) = fixtures::jane_doe();
        if with_images {
            hospital.branding.logo = NonEmptyText::new(TINY_PNG_BASE64).ok();
            hospital.doctor_signature = NonEmptyText::new(TINY_PNG_BASE64).ok();
        }
        let request = RenderRequest {
            prescription,
            patient: &patient,
            hospital: &hospital,
            visit: &visit,
            platform_name: "Clinic Health Platform",
            generated_at: fixtures::generated_at(),
        };
        let (document, _) = render_prescription(&request);
        write_pdf(&document).unwrap()
    }

    #[test]
    fn test_writes_pdf_magic() {
        let bytes = pdf_for("Paracetamol 500mg twice daily\nRest and fluids", false);
        assert_eq!(&bytes[..4], b"%PDF");
    }

    #[test]
    fn test_writes_pdf_with_images() {
        let bytes = pdf_for("Rest", true);
        assert_eq!(&bytes[..4], b"%PDF");
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn test_writes_multi_page_pdf() {
        let long = (1..=60)
            .map(|i| format!("Medicine {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = pdf_for(&long, false);
        assert_eq!(&bytes[..4], b"%PDF");
    }

    #[test]
    fn test_printable_replaces_control_characters() {
        assert_eq!(printable("a\tb\u{7}c"), "a b c");
    }
}
