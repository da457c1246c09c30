// printpdf backend: replays each page's draw operations into a PDF layer.
// The display list is top-down in inches; PDF space is bottom-up in mm.

use crate::canvas::{DrawOp, Ink, Page};
use crate::error::AppError;
use crate::metrics::{Face, PT_PER_INCH};
use ::image::{DynamicImage, Rgba, RgbImage};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;

const MM_PER_INCH: f32 = 25.4;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Italic => &self.italic,
        }
    }
}

fn mm(inches: f32) -> Mm {
    Mm(inches * MM_PER_INCH)
}

fn color(ink: Ink) -> Color {
    Color::Rgb(Rgb::new(
        ink.r as f32 / 255.0,
        ink.g as f32 / 255.0,
        ink.b as f32 / 255.0,
        None,
    ))
}

/// Serializes the pages to PDF bytes. Width and height are in inches.
pub fn render_pdf(title: &str, width: f32, height: f32, pages: &[Page]) -> Result<Vec<u8>, AppError> {
    if pages.is_empty() {
        return Err(AppError::PdfError("document has no pages".to_string()));
    }

    let (doc, page1, layer1) = PdfDocument::new(title, mm(width), mm(height), "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::PdfError(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::PdfError(e.to_string()))?,
        italic: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| AppError::PdfError(e.to_string()))?,
    };

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (p, l) = doc.add_page(mm(width), mm(height), "Layer 1");
            doc.get_page(p).get_layer(l)
        };
        draw_page(&layer, &fonts, height, page);
    }

    doc.save_to_bytes().map_err(|e| AppError::PdfError(e.to_string()))
}

fn draw_page(layer: &PdfLayerReference, fonts: &Fonts, height: f32, page: &Page) {
    for op in &page.ops {
        match op {
            DrawOp::Text { x, baseline, text, font, color: ink } => {
                layer.set_fill_color(color(*ink));
                layer.use_text(text.as_str(), font.size, mm(*x), mm(height - baseline), fonts.get(font.face));
            }
            DrawOp::FillRect { x, y, w, h, color: ink } => {
                layer.set_fill_color(color(*ink));
                let (left, right) = (*x, x + w);
                let (top, bottom) = (height - y, height - y - h);
                let ring = vec![
                    (Point::new(mm(left), mm(bottom)), false),
                    (Point::new(mm(right), mm(bottom)), false),
                    (Point::new(mm(right), mm(top)), false),
                    (Point::new(mm(left), mm(top)), false),
                ];
                layer.add_polygon(Polygon {
                    rings: vec![ring],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                });
            }
            DrawOp::Line { x1, y1, x2, y2, width, color: ink } => {
                layer.set_outline_color(color(*ink));
                layer.set_outline_thickness(width * PT_PER_INCH);
                draw_line(layer, *x1, height - y1, *x2, height - y2);
            }
            DrawOp::Image { x, y, w, h, image } => {
                embed_image(layer, image, *x, height - y - h, *w);
            }
        }
    }
}

fn draw_line(layer: &PdfLayerReference, x1: f32, y1: f32, x2: f32, y2: f32) {
    let points = vec![
        (Point::new(mm(x1), mm(y1)), false),
        (Point::new(mm(x2), mm(y2)), false),
    ];
    let line = Line {
        points,
        is_closed: false,
    };
    layer.add_line(line);
}

/// Places an image with its bottom-left corner at (`x`, `bottom`) scaled to
/// `width` inches. Transparency is composited onto white.
fn embed_image(layer: &PdfLayerReference, image: &DynamicImage, x: f32, bottom: f32, width: f32) {
    let rgb_image = flatten_onto_white(image);
    let (width_px, height_px) = rgb_image.dimensions();
    if width_px == 0 || height_px == 0 || width <= 0.0 {
        return;
    }

    let image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: rgb_image.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI = pixels / inches
    let dpi = width_px as f32 / width;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(mm(x)),
            translate_y: Some(mm(bottom)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba_image = image.to_rgba8();
    let (width_px, height_px) = rgba_image.dimensions();
    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, ::image::Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb_image
}
