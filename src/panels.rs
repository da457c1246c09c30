// Front matter (cover text, logo, format legend, auxiliary entries, footer),
// the rear contact panel and fold guides.

use crate::canvas::{Align, Canvas, Ink};
use crate::config::PanelContent;
use crate::geometry::{Geometry, Region};
use crate::metrics::Face;
use crate::record::FormatEntry;
use crate::scrape::AuxEntry;
use ::image::DynamicImage;
use std::sync::Arc;

// ============================================================================
// Constants
// ============================================================================

const FRONT_TOP_PAD: f32 = 0.125;
const BLOCK_BAR_HEIGHT: f32 = 0.18;
const BLOCK_TITLE_SIZE: f32 = 9.0;
const BLOCK_GAP: f32 = 0.25;
const LEGEND_ROW_HEIGHT: f32 = 0.13;
/// Indent of the format name relative to its code.
const LEGEND_NAME_INDENT: f32 = 0.2875;
/// Panels at least this wide get a two-column legend.
const LEGEND_TWO_COLUMN_WIDTH: f32 = 3.0;
const LEGEND_GUTTER: f32 = 0.125;
pub const LEGEND_TITLE: &str = "FORMAT LEGEND";
const FOOTER_MIN_SIZE: f32 = 4.0;
const PHONE_ROW_SPACING: f32 = 0.3;
const PHONE_RULE_WIDTH: f32 = 0.02;
const GUIDE_WIDTH: f32 = 0.005;

// ============================================================================
// Front matter
// ============================================================================

/// Everything drawn on the front panel.
pub struct FrontMatter<'a> {
    pub content: &'a PanelContent,
    pub logo: Option<Arc<DynamicImage>>,
    pub formats: &'a [FormatEntry],
    pub aux_header: &'a str,
    pub aux: &'a [AuxEntry],
    /// Fixed font size; front and rear text never shrinks.
    pub font_size: f32,
    pub header_fill: Ink,
}

impl FrontMatter<'_> {
    /// Draws the whole panel and returns the y below the last block.
    pub fn draw(&self, canvas: &mut Canvas, region: &Region) -> f32 {
        let mut y = self.draw_cover(canvas, region);
        y = draw_legend(canvas, region.left, y, region.width(), self.formats, self.font_size, self.header_fill);
        y = draw_aux_block(
            canvas,
            region.left,
            y,
            region.width(),
            self.aux_header,
            self.aux,
            self.font_size,
            self.header_fill,
        );
        if let Some(footer) = self.content.footer.as_deref() {
            draw_footer(canvas, region, footer, self.font_size);
        }
        y
    }

    /// Cover lines and logo, centered. Missing lines take no space.
    pub fn draw_cover(&self, canvas: &mut Canvas, region: &Region) -> f32 {
        let base = self.font_size;
        let c = self.content;
        let banner_pair = match (c.banner_2.as_deref(), c.banner_3.as_deref()) {
            (Some(a), Some(b)) => Some(format!("{} {}", a, b)),
            (Some(a), None) | (None, Some(a)) => Some(a.to_string()),
            (None, None) => None,
        };

        canvas.set_text_color(Ink::BLACK);
        let mut y = region.top + FRONT_TOP_PAD;
        y = centered_line(canvas, region, y, c.date_line.as_deref(), Face::Bold, base - 2.5, 0.1);
        y = centered_line(canvas, region, y, c.credits.as_deref(), Face::Bold, base - 2.0, 0.2);
        y = centered_line(canvas, region, y, c.banner_1.as_deref(), Face::Bold, base + 5.5, 0.2);
        y = centered_line(canvas, region, y, banner_pair.as_deref(), Face::Bold, base - 0.5, 0.125);

        if let Some(logo) = &self.logo {
            let size = (region.width() / 2.0).min(region.height() / 2.0);
            let (w, h) = fit_square(logo, size);
            let left = region.left + (region.width() - w) / 2.0;
            canvas.image(logo.clone(), left, y + (size - h) / 2.0, w, h);
            y += size + 0.125;
        }

        y = centered_line(canvas, region, y, c.web_url.as_deref(), Face::Bold, base + 0.5, 0.2);
        y = centered_line(canvas, region, y, c.helpline.as_deref(), Face::Regular, base + 0.5, 0.0);
        y + BLOCK_GAP
    }
}

fn centered_line(
    canvas: &mut Canvas,
    region: &Region,
    y: f32,
    text: Option<&str>,
    face: Face,
    size: f32,
    advance: f32,
) -> f32 {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return y;
    };
    canvas.set_font(face, size);
    let center = (region.left + region.right) / 2.0;
    let x = center - canvas.string_width(text) / 2.0;
    canvas.cell(x, y, 0.0, 0.0, text, Align::Left, false);
    y + advance
}

/// Largest box with the image's aspect ratio inside a `size` square.
fn fit_square(image: &DynamicImage, size: f32) -> (f32, f32) {
    let (w, h) = (image.width().max(1) as f32, image.height().max(1) as f32);
    if w >= h {
        (size, size * h / w)
    } else {
        (size * w / h, size)
    }
}

/// Filled bar with a centered white title. Returns the y of the title row.
fn block_title(canvas: &mut Canvas, left: f32, top: f32, width: f32, title: &str, fill: Ink) -> f32 {
    canvas.set_fill_color(fill);
    canvas.fill_rect(left, top, width, BLOCK_BAR_HEIGHT);
    let y = top + 0.08;
    canvas.set_font(Face::Bold, BLOCK_TITLE_SIZE);
    canvas.set_text_color(Ink::WHITE);
    let x = left + (width - canvas.string_width(title)) / 2.0;
    canvas.cell(x, y + 0.0125, 0.0, 0.0, title, Align::Left, false);
    canvas.set_text_color(Ink::BLACK);
    y
}

/// Format codes and names under a title bar, split into two columns on wide
/// panels. Returns the y below the longer column.
pub fn draw_legend(
    canvas: &mut Canvas,
    left: f32,
    top: f32,
    width: f32,
    formats: &[FormatEntry],
    font_size: f32,
    fill: Ink,
) -> f32 {
    if formats.is_empty() {
        return top;
    }
    let start = block_title(canvas, left, top, width, LEGEND_TITLE, fill) + BLOCK_GAP;
    let size = font_size - 2.0;

    let (columns, column_width) = if width >= LEGEND_TWO_COLUMN_WIDTH {
        (2, (width - LEGEND_GUTTER) / 2.0)
    } else {
        (1, width)
    };
    let split = if columns == 2 { formats.len().div_ceil(2) } else { formats.len() };

    let mut bottom = start;
    for (column, chunk) in [&formats[..split], &formats[split..]].iter().enumerate() {
        let x = left + column as f32 * (column_width + LEGEND_GUTTER);
        let mut y = start;
        for format in chunk.iter() {
            canvas.set_font(Face::Bold, size);
            canvas.cell(x, y, 0.0, LEGEND_ROW_HEIGHT, &format.key, Align::Left, false);
            canvas.set_font(Face::Regular, size);
            let name = if format.name.is_empty() { &format.description } else { &format.name };
            y = canvas.multi_cell(
                x + LEGEND_NAME_INDENT,
                y,
                column_width - LEGEND_NAME_INDENT,
                LEGEND_ROW_HEIGHT,
                name,
                Align::Left,
            );
            if name.trim().is_empty() {
                y += LEGEND_ROW_HEIGHT;
            }
            y += 0.01;
        }
        bottom = bottom.max(y);
    }
    bottom
}

/// Scraped entries under their own title bar. Nothing is drawn without entries.
#[allow(clippy::too_many_arguments)]
pub fn draw_aux_block(
    canvas: &mut Canvas,
    left: f32,
    top: f32,
    width: f32,
    header: &str,
    entries: &[AuxEntry],
    font_size: f32,
    fill: Ink,
) -> f32 {
    if entries.is_empty() {
        return top;
    }
    let size = font_size - 2.0;
    let mut y = block_title(canvas, left, top + BLOCK_GAP, width, header, fill) + 0.125;
    for entry in entries {
        canvas.set_font(Face::Bold, size + 1.0);
        let h = (size + 1.0) / 72.0 * 1.07;
        canvas.cell(left, y + 0.005, width, h, &entry.name, Align::Left, false);
        y += h + 0.02;
        canvas.set_font(Face::Regular, size);
        y = canvas.multi_cell(left, y, width, size / 72.0, &entry.description, Align::Left);
        y += 0.1;
    }
    y
}

/// Italic note centered along the bottom of a panel, shrunk until it fits.
pub fn draw_footer(canvas: &mut Canvas, region: &Region, text: &str, font_size: f32) -> f32 {
    let mut size = font_size - 2.0;
    canvas.set_font(Face::Italic, size);
    while canvas.string_width(text) > region.width() && size > FOOTER_MIN_SIZE {
        size -= 0.5;
        canvas.set_font(Face::Italic, size);
    }
    canvas.set_text_color(Ink::BLACK);
    canvas.cell(region.left, region.bottom + 0.005, region.width(), 0.125, text, Align::Center, false);
    size
}

// ============================================================================
// Rear panel
// ============================================================================

/// "Name" / "Phone #" header and ruled lines for writing in contacts.
pub fn draw_rear_panel(canvas: &mut Canvas, region: &Region, font_size: f32) -> usize {
    let mut y = region.top + BLOCK_GAP;
    canvas.set_text_color(Ink::BLACK);
    canvas.set_font(Face::Bold, font_size + 1.0);
    canvas.cell(region.left, y, 0.0, 0.0, "Name", Align::Left, false);
    canvas.cell(region.left, y, region.width(), 0.0, "Phone #", Align::Right, false);
    y += BLOCK_GAP;

    canvas.set_draw_color(Ink::BLACK);
    canvas.set_line_width(PHONE_RULE_WIDTH);
    let mut rules = 0;
    while y < region.bottom - BLOCK_GAP {
        canvas.line(region.left + 0.0625, y, region.right, y);
        y += PHONE_ROW_SPACING;
        rules += 1;
    }
    rules
}

/// Light vertical lines where the sheet is folded.
pub fn draw_fold_guides(canvas: &mut Canvas, geometry: &Geometry) {
    canvas.set_draw_color(Ink::GUIDE);
    canvas.set_line_width(GUIDE_WIDTH);
    for x in geometry.fold_lines() {
        canvas.line(x, geometry.margin, x, geometry.height - geometry.margin);
    }
    canvas.set_draw_color(Ink::BLACK);
}
