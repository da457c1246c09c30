// Display list the layout engine draws into. Coordinates are inches with the
// origin at the top-left corner of the page; render.rs flips them for PDF.

use crate::metrics::{self, Face, PT_PER_INCH};
use ::image::DynamicImage;
use std::sync::Arc;

/// Horizontal padding inside a cell (1mm).
pub const CELL_MARGIN: f32 = 0.03937;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ink {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Ink {
    pub const BLACK: Ink = Ink { r: 0, g: 0, b: 0 };
    pub const WHITE: Ink = Ink { r: 255, g: 255, b: 255 };
    pub const GUIDE: Ink = Ink { r: 200, g: 200, b: 200 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Ink { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub face: Face,
    pub size: f32,
}

impl Font {
    pub fn new(face: Face, size: f32) -> Self {
        Font { face, size }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone)]
pub enum DrawOp {
    Text {
        x: f32,
        baseline: f32,
        text: String,
        font: Font,
        color: Ink,
    },
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Ink,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Ink,
    },
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        image: Arc<DynamicImage>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

#[cfg(test)]
impl Page {
    pub fn is_blank(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A multi-page drawing surface with FPDF-like cell semantics.
#[derive(Debug, Clone)]
pub struct Canvas {
    pages: Vec<Page>,
    current: usize,
    font: Font,
    text_color: Ink,
    fill_color: Ink,
    draw_color: Ink,
    line_width: f32,
}

impl Canvas {
    /// An empty canvas; drawing starts after the first `add_page`.
    pub fn new() -> Self {
        Canvas {
            pages: Vec::new(),
            current: 0,
            font: Font::new(Face::Regular, 10.0),
            text_color: Ink::BLACK,
            fill_color: Ink::BLACK,
            draw_color: Ink::BLACK,
            line_width: 0.01,
        }
    }

    /// Appends a blank page and makes it current. Returns its index.
    pub fn add_page(&mut self) -> usize {
        self.pages.push(Page::default());
        self.current = self.pages.len() - 1;
        self.current
    }

    /// Switches drawing to an existing page.
    pub fn set_page(&mut self, index: usize) {
        if index < self.pages.len() {
            self.current = index;
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current
    }

    #[cfg(test)]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    pub fn set_font(&mut self, face: Face, size: f32) {
        self.font = Font::new(face, size);
    }

    pub fn set_text_color(&mut self, ink: Ink) {
        self.text_color = ink;
    }

    pub fn set_fill_color(&mut self, ink: Ink) {
        self.fill_color = ink;
    }

    pub fn set_draw_color(&mut self, ink: Ink) {
        self.draw_color = ink;
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    pub fn string_width(&self, text: &str) -> f32 {
        metrics::string_width(text, self.font.face, self.font.size)
    }

    fn push(&mut self, op: DrawOp) {
        debug_assert!(!self.pages.is_empty(), "drawing before the first page");
        if let Some(page) = self.pages.get_mut(self.current) {
            page.ops.push(op);
        }
    }

    /// Places `text` at an absolute baseline.
    pub fn text(&mut self, x: f32, baseline: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        let op = DrawOp::Text {
            x,
            baseline,
            text: text.to_string(),
            font: self.font,
            color: self.text_color,
        };
        self.push(op);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let op = DrawOp::FillRect { x, y, w, h, color: self.fill_color };
        self.push(op);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let op = DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width: self.line_width,
            color: self.draw_color,
        };
        self.push(op);
    }

    pub fn image(&mut self, image: Arc<DynamicImage>, x: f32, y: f32, w: f32, h: f32) {
        self.push(DrawOp::Image { x, y, w, h, image });
    }

    /// One-line cell of height `h` starting at (`x`, `y`). Text is vertically
    /// centered in the cell; a zero width means "as wide as the text".
    pub fn cell(&mut self, x: f32, y: f32, w: f32, h: f32, text: &str, align: Align, fill: bool) {
        let text_width = self.string_width(text);
        let w = if w <= 0.0 { text_width + 2.0 * CELL_MARGIN } else { w };
        if fill {
            self.fill_rect(x, y, w, h);
        }
        let dx = match align {
            Align::Left => CELL_MARGIN,
            Align::Center => (w - text_width) / 2.0,
            Align::Right => w - CELL_MARGIN - text_width,
        };
        let baseline = y + 0.5 * h + 0.3 * (self.font.size / PT_PER_INCH);
        self.text(x + dx, baseline, text);
    }

    /// Wrapped text block. Returns the y just below the last line; empty
    /// text takes no space.
    pub fn multi_cell(&mut self, x: f32, y: f32, w: f32, h: f32, text: &str, align: Align) -> f32 {
        if text.trim().is_empty() {
            return y;
        }
        let lines = self.wrap(text, w);
        let mut y = y;
        for line in &lines {
            self.cell(x, y, w, h, line, align, false);
            y += h;
        }
        y
    }

    /// Lines `text` would occupy in a multi-cell of width `w`.
    pub fn wrap(&self, text: &str, w: f32) -> Vec<String> {
        let inner = (w - 2.0 * CELL_MARGIN).max(0.0);
        metrics::wrap(text, self.font.face, self.font.size, inner)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas::new()
    }
}
