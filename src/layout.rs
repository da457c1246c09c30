// Flows sorted meetings into the columns of a list area, with group headers,
// continuation marks and a running estimate of record height per column.

use crate::canvas::{Align, Canvas, Ink};
use crate::geometry::ListArea;
use crate::metrics::Face;
use crate::qr::QrSource;
use crate::record::Meeting;
use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

pub const HEADER_HEIGHT: f32 = 0.15;
/// Header label sizes, tried in order until one fits.
pub const HEADER_SIZES: [f32; 3] = [8.0, 7.0, 6.0];
/// Labels must leave this much of the column free.
pub const HEADER_SLACK: f32 = 0.125;
/// Space above a header that does not start a column.
pub const HEADER_GAP: f32 = 0.075;
/// Space above the separator rule between two records of one group.
pub const RULE_GAP: f32 = 0.05;
/// Space between a header or rule and the record body.
pub const BODY_GAP: f32 = 0.05;
/// Width kept free at the right of a record for its QR code.
pub const QR_RESERVE: f32 = 0.55;
pub const QR_SIZE: f32 = 0.5;
/// Record body font is this much smaller than the variable font.
pub const BODY_FONT_OFFSET: f32 = 1.5;
/// Font size over this gives the record line height in inches.
const LINE_DIVISOR: f32 = 70.0;

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];
pub const WEEKDAY_SHORT: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
pub const CONTINUED: &str = "Continued";
pub const CONTINUED_SHORT: &str = "Cont'd";
pub const UNKNOWN_CITY: &str = "Unknown City";

// ============================================================================
// Grouping
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    Weekday,
    City,
}

impl GroupMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekday" | "day" | "" => Some(GroupMode::Weekday),
            "city" | "town" | "municipality" => Some(GroupMode::City),
            _ => None,
        }
    }

    /// Value compared between consecutive records to decide on a new header.
    pub fn group_key(&self, meeting: &Meeting) -> String {
        match self {
            GroupMode::Weekday => meeting.weekday.unwrap_or(1).to_string(),
            GroupMode::City => city_name(meeting).to_lowercase(),
        }
    }

    /// Header labels from longest to shortest.
    pub fn labels(&self, meeting: &Meeting, continued: bool) -> [String; 3] {
        match self {
            GroupMode::Weekday => {
                let day = (meeting.weekday.unwrap_or(1).clamp(1, 7) - 1) as usize;
                let (full, short) = (WEEKDAY_NAMES[day], WEEKDAY_SHORT[day]);
                if continued {
                    [
                        format!("{} ({})", full, CONTINUED),
                        format!("{} ({})", short, CONTINUED),
                        format!("{} ({})", short, CONTINUED_SHORT),
                    ]
                } else {
                    [full.to_string(), short.to_string(), short.to_string()]
                }
            }
            GroupMode::City => {
                let city = city_name(meeting);
                if continued {
                    [
                        format!("{} ({})", city, CONTINUED),
                        format!("{} ({})", city, CONTINUED_SHORT),
                        city.to_string(),
                    ]
                } else {
                    [city.to_string(), city.to_string(), city.to_string()]
                }
            }
        }
    }
}

fn city_name(meeting: &Meeting) -> &str {
    let city = meeting.municipality.trim();
    if city.is_empty() {
        UNKNOWN_CITY
    } else {
        city
    }
}

// ============================================================================
// Cursor and trace
// ============================================================================

/// Where the flow stands within the sorted records.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutCursor {
    pub index: usize,
    pub at_start: bool,
    pub exhausted: bool,
    pub current_group: Option<String>,
}

impl LayoutCursor {
    pub fn new(total: usize) -> Self {
        LayoutCursor {
            index: 0,
            at_start: true,
            exhausted: total == 0,
            current_group: None,
        }
    }
}

/// Running average of record heights within one column.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnStats {
    total: f32,
    count: u32,
}

impl ColumnStats {
    pub fn record(&mut self, height: f32) {
        self.total += height;
        self.count += 1;
    }

    pub fn projected(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f32
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub record: usize,
    pub page: usize,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMark {
    pub label: String,
    pub key: String,
    pub continued: bool,
    pub page: usize,
    pub column: u32,
}

/// Record of what went where, for logging and tests.
#[derive(Debug, Clone, Default)]
pub struct FlowTrace {
    pub placements: Vec<Placement>,
    pub headers: Vec<HeaderMark>,
}

// ============================================================================
// Flow
// ============================================================================

/// Everything the flow needs besides the canvas and cursor.
pub struct ListFlow<'a> {
    pub meetings: &'a [Meeting],
    pub mode: GroupMode,
    /// Variable font size for this attempt.
    pub font_size: f32,
    pub header_fill: Ink,
    pub qr: Option<&'a mut dyn QrSource>,
}

impl ListFlow<'_> {
    /// Fills every column of `area` until the records run out. Returns the
    /// number of records placed.
    pub fn flow_area(
        &mut self,
        canvas: &mut Canvas,
        area: &ListArea,
        cursor: &mut LayoutCursor,
        trace: &mut FlowTrace,
    ) -> usize {
        let body_size = self.font_size - BODY_FONT_OFFSET;
        let y_limit = area.region.bottom - body_size / LINE_DIVISOR;
        let column_width = area.column_width();
        let page = canvas.current_page();
        let meetings = self.meetings;
        let mut placed = 0;

        if cursor.at_start {
            cursor.current_group = None;
            cursor.index = 0;
            cursor.at_start = false;
        }

        for column in 0..area.columns {
            if cursor.exhausted {
                break;
            }
            let left = area.column_left(column);
            let top = area.region.top;
            let mut y = top;
            let mut stats = ColumnStats::default();
            let mut column_start = true;

            while !cursor.exhausted && y + stats.projected() < y_limit {
                let meeting = &meetings[cursor.index];
                let key = self.mode.group_key(meeting);
                let same_group = cursor.current_group.as_deref() == Some(key.as_str());

                if !same_group || column_start {
                    if !column_start {
                        y += HEADER_GAP;
                    }
                    let labels = self.mode.labels(meeting, same_group);
                    let (bottom, label) =
                        draw_group_header(canvas, left, y, column_width, &labels, self.header_fill);
                    y = bottom;
                    trace.headers.push(HeaderMark {
                        label,
                        key: key.clone(),
                        continued: same_group,
                        page,
                        column,
                    });
                    cursor.current_group = Some(key);
                } else {
                    y += RULE_GAP;
                    canvas.set_draw_color(Ink::BLACK);
                    canvas.set_line_width(0.01);
                    canvas.line(left, y, left + column_width, y);
                }

                y += BODY_GAP;
                let start = y;
                let qr = match (&mut self.qr, meeting.virtual_link.as_deref()) {
                    (Some(source), Some(link)) => source.qr_for(link),
                    _ => None,
                };
                y = draw_meeting(canvas, left, y, column_width, meeting, body_size, qr);
                stats.record(y - start);
                trace.placements.push(Placement { record: cursor.index, page, column });
                placed += 1;
                column_start = false;

                cursor.index += 1;
                if cursor.index >= meetings.len() {
                    cursor.exhausted = true;
                }
            }
            trace!(page, column, projected = stats.projected(), "Column filled");
        }
        placed
    }
}

/// Filled header bar with a white label. Returns the y below the bar and the
/// label that fit.
pub fn draw_group_header(
    canvas: &mut Canvas,
    left: f32,
    top: f32,
    width: f32,
    labels: &[String; 3],
    fill: Ink,
) -> (f32, String) {
    canvas.set_fill_color(fill);
    canvas.fill_rect(left, top, width, HEADER_HEIGHT);

    let mut chosen = (labels[2].as_str(), HEADER_SIZES[2]);
    for (label, size) in labels.iter().zip(HEADER_SIZES) {
        canvas.set_font(Face::Bold, size);
        if canvas.string_width(label) < width - HEADER_SLACK {
            chosen = (label.as_str(), size);
            break;
        }
    }
    let (label, size) = chosen;
    canvas.set_font(Face::Bold, size);
    let text_left = left + (width - canvas.string_width(label)) / 2.0;
    canvas.set_text_color(Ink::WHITE);
    canvas.cell(text_left, top, 0.0, HEADER_HEIGHT, label, Align::Left, false);
    canvas.set_text_color(Ink::BLACK);
    (top + HEADER_HEIGHT, label.to_string())
}

/// Draws one record body and returns the y below it.
pub fn draw_meeting(
    canvas: &mut Canvas,
    left: f32,
    top: f32,
    width: f32,
    meeting: &Meeting,
    body_size: f32,
    qr: Option<std::sync::Arc<::image::DynamicImage>>,
) -> f32 {
    let line = body_size / LINE_DIVISOR;
    let small_line = (body_size - 1.0) / LINE_DIVISOR;
    let text_width = if qr.is_some() { width - QR_RESERVE } else { width };

    canvas.set_text_color(Ink::BLACK);
    canvas.set_font(Face::Bold, body_size);
    let mut y = top;
    y = canvas.multi_cell(left, y, text_width, line, &meeting.municipality, Align::Left);
    y = canvas.multi_cell(left, y, text_width, line, &meeting.time_line(), Align::Left);
    y = canvas.multi_cell(left, y, text_width, line, &meeting.title_line(), Align::Left);

    canvas.set_font(Face::Regular, body_size);
    y = canvas.multi_cell(left, y, text_width, line, &meeting.neighborhood, Align::Left);
    y = canvas.multi_cell(left, y, text_width, line, &meeting.address_line(), Align::Left);

    let comments = meeting.comment_line();
    if !comments.is_empty() {
        canvas.set_font(Face::Italic, body_size - 1.0);
        y = canvas.multi_cell(left, y, text_width, small_line, &comments, Align::Left);
    }

    match (qr, meeting.virtual_link.as_deref()) {
        (Some(image), _) => {
            canvas.image(image, left + width - QR_SIZE, top, QR_SIZE, QR_SIZE);
            y = y.max(top + QR_SIZE);
        }
        (None, Some(link)) => {
            canvas.set_font(Face::Regular, body_size - 1.0);
            y = canvas.multi_cell(left, y, text_width, small_line, &format!("Virtual: {}", link), Align::Left);
        }
        (None, None) => {}
    }
    y
}
