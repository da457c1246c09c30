// Document assembly: one session owns the settings, sorted records and the
// degraded-or-loaded extras (logo, scraped entries, QR cache), and runs the
// shrink-and-retry loop until the list fits the fold style's page budget.

use crate::canvas::{Canvas, Page};
use crate::config::{DocumentSettings, QrMode};
use crate::error::AppError;
use crate::geometry::{PagePlan, PanelKind};
use crate::http::HttpClient;
use crate::layout::{FlowTrace, LayoutCursor, ListFlow};
use crate::panels::{draw_fold_guides, draw_rear_panel, FrontMatter};
use crate::qr::{QrProvider, QrSource};
use crate::record::Catalog;
use crate::scrape::{fetch_entries, AuxEntry};
use crate::sort::sort_meetings;
use crate::source::open_source;
use ::image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Variable font step between attempts, in points.
pub const SHRINK_STEP: f32 = 0.125;
pub const MIN_VARIABLE_FONT: f32 = 5.0;
pub const MAX_ATTEMPTS: u32 = 64;

/// Where an attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    FrontMatter,
    Records(u32),
    Done,
}

pub struct Session {
    pub settings: DocumentSettings,
    pub catalog: Catalog,
    pub logo: Option<Arc<DynamicImage>>,
    pub aux: Vec<AuxEntry>,
    pub qr: Option<QrProvider>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub attempts: u32,
    pub font_size: f32,
    pub records: usize,
    pub pages: usize,
}

pub struct Assembly {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<Page>,
    pub trace: FlowTrace,
    pub report: AssemblyReport,
}

struct Attempt {
    canvas: Canvas,
    trace: FlowTrace,
    rear_drawn: bool,
}

impl Session {
    /// Fetches everything the document needs. Only the record fetch may fail;
    /// logo, scrape and QR problems leave those parts out.
    pub fn open(settings: DocumentSettings, http: &HttpClient) -> Result<Self, AppError> {
        let source = open_source(&settings.source, settings.format, http);
        let catalog = source.fetch(&settings.query)?;
        let logo = settings
            .content
            .logo_path
            .as_deref()
            .and_then(|path| load_logo(path, http));
        let aux = settings
            .aux
            .as_ref()
            .map(|source| fetch_entries(http, source))
            .unwrap_or_default();
        let qr = match settings.qr {
            QrMode::Off => None,
            ref mode => Some(QrProvider::new(mode.clone(), http.clone())),
        };
        Ok(Session::new(settings, catalog, logo, aux, qr))
    }

    pub fn new(
        settings: DocumentSettings,
        mut catalog: Catalog,
        logo: Option<Arc<DynamicImage>>,
        aux: Vec<AuxEntry>,
        qr: Option<QrProvider>,
    ) -> Self {
        catalog.normalize_formats(&settings.query.language);
        sort_meetings(&mut catalog.meetings, &settings.sort);
        Session { settings, catalog, logo, aux, qr }
    }

    /// Lays the document out, shrinking the variable font until the list fits.
    pub fn assemble(&mut self) -> Result<Assembly, AppError> {
        let geometry = self.settings.geometry.clone();
        let limit = geometry.page_limit() as usize;
        let mut size = self.settings.variable_font;
        let mut attempts = 0;

        let mut attempt = loop {
            attempts += 1;
            let attempt = self.run_attempt(size, limit)?;
            let used = attempt.canvas.page_count();
            if used <= limit {
                break attempt;
            }
            if attempts >= MAX_ATTEMPTS || size - SHRINK_STEP < MIN_VARIABLE_FONT {
                return Err(AppError::Overflow { page_max: geometry.page_max, font_size: size });
            }
            debug!(font_size = size, pages = used, limit, "List overflows, shrinking font");
            size -= SHRINK_STEP;
        };

        let canvas = &mut attempt.canvas;
        if !self.catalog.meetings.is_empty() {
            while (canvas.page_count() as u32) < geometry.padding_target() {
                canvas.add_page();
            }
        }
        if !attempt.rear_drawn {
            if let Some(plan) = geometry.closing_plan() {
                canvas.add_page();
                attempt.rear_drawn |= self.draw_panels(canvas, &plan);
            }
        }
        if self.settings.fold_guides {
            for index in 0..canvas.page_count() {
                canvas.set_page(index);
                draw_fold_guides(canvas, &geometry);
            }
        }

        let report = AssemblyReport {
            attempts,
            font_size: size,
            records: self.catalog.meetings.len(),
            pages: canvas.page_count(),
        };
        info!(
            attempts = report.attempts,
            font_size = report.font_size,
            records = report.records,
            pages = report.pages,
            "Assembled document"
        );
        Ok(Assembly {
            width: geometry.width,
            height: geometry.height,
            pages: attempt.canvas.into_pages(),
            trace: attempt.trace,
            report,
        })
    }

    /// One pass at a fixed variable font size. Stops early once the page
    /// count passes `limit`, since the attempt is discarded anyway.
    fn run_attempt(&mut self, font_size: f32, limit: usize) -> Result<Attempt, AppError> {
        let geometry = self.settings.geometry.clone();
        let mut canvas = Canvas::new();
        canvas.add_page();
        let mut cursor = LayoutCursor::new(self.catalog.meetings.len());
        let mut trace = FlowTrace::default();
        let mut rear_drawn = false;
        let mut phase = Phase::NotStarted;

        loop {
            trace!(?phase, font_size, "Attempt phase");
            phase = match phase {
                Phase::NotStarted => Phase::FrontMatter,
                Phase::FrontMatter => {
                    canvas.add_page();
                    let plan = geometry.plan(0);
                    rear_drawn |= self.draw_panels(&mut canvas, &plan);
                    self.flow_lists(&mut canvas, &plan, &mut cursor, &mut trace, font_size);
                    if cursor.exhausted {
                        Phase::Done
                    } else {
                        Phase::Records(1)
                    }
                }
                Phase::Records(index) => {
                    canvas.add_page();
                    let plan = geometry.plan(index);
                    let placed = self.flow_lists(&mut canvas, &plan, &mut cursor, &mut trace, font_size);
                    if placed == 0 {
                        return Err(AppError::Layout(format!(
                            "page {} has no room for a single meeting at {}pt",
                            index + 1,
                            font_size
                        )));
                    }
                    rear_drawn |= self.draw_panels(&mut canvas, &plan);
                    if cursor.exhausted || canvas.page_count() > limit {
                        Phase::Done
                    } else {
                        Phase::Records(index + 1)
                    }
                }
                Phase::Done => break,
            };
        }
        Ok(Attempt { canvas, trace, rear_drawn })
    }

    fn flow_lists(
        &mut self,
        canvas: &mut Canvas,
        plan: &PagePlan,
        cursor: &mut LayoutCursor,
        trace: &mut FlowTrace,
        font_size: f32,
    ) -> usize {
        let Session { settings, catalog, qr, .. } = self;
        let mut flow = ListFlow {
            meetings: &catalog.meetings,
            mode: settings.group_mode,
            font_size,
            header_fill: settings.header_fill,
            qr: qr.as_mut().map(|q| q as &mut dyn QrSource),
        };
        let mut placed = 0;
        for area in &plan.lists {
            if cursor.exhausted {
                break;
            }
            placed += flow.flow_area(canvas, area, cursor, trace);
        }
        placed
    }

    /// Draws the plan's panels. Returns whether the rear panel was among them.
    fn draw_panels(&self, canvas: &mut Canvas, plan: &PagePlan) -> bool {
        for (kind, region) in &plan.panels {
            match kind {
                PanelKind::Front => {
                    let front = FrontMatter {
                        content: &self.settings.content,
                        logo: self.logo.clone(),
                        formats: &self.catalog.formats,
                        aux_header: self.settings.aux.as_ref().map(|a| a.header.as_str()).unwrap_or(""),
                        aux: &self.aux,
                        font_size: self.settings.fixed_font,
                        header_fill: self.settings.header_fill,
                    };
                    front.draw(canvas, region);
                }
                PanelKind::Rear => {
                    draw_rear_panel(canvas, region, self.settings.fixed_font);
                }
            }
        }
        plan.has_panel(PanelKind::Rear)
    }
}

/// Loads the cover logo from a file or URL. A missing or unreadable logo is
/// left out of the document.
pub fn load_logo(path: &str, http: &HttpClient) -> Option<Arc<DynamicImage>> {
    let bytes = if path.starts_with("http://") || path.starts_with("https://") {
        http.get_bytes(path)
    } else {
        std::fs::read(path).map_err(|e| format!("{}: {}", path, e))
    };
    let decoded = bytes.and_then(|bytes| {
        ::image::load_from_memory(&bytes).map_err(|e| format!("Failed to decode image: {}", e))
    });
    match decoded {
        Ok(image) => Some(Arc::new(image)),
        Err(e) => {
            warn!(logo = %path, error = %e, "Logo unavailable, skipping");
            None
        }
    }
}
