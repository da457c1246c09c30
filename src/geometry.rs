// Physical fold presets and the per-page carve-up into panels and list areas.

use crate::error::AppError;

/// Default page margin in inches.
pub const PAGE_MARGIN: f32 = 0.25;

/// Axis-aligned area on a page, in inches from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Region {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Region { left, top, right, bottom }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_valid(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStyle {
    /// One panel per page: cover page, list pages, contact page.
    Single,
    /// Contact and cover panels side by side on the first page.
    Bifold,
    /// Landscape sheet folded into quarters.
    FourSection,
    /// Landscape sheet folded into thirds.
    Trifold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRule {
    /// Round a positive hint up to a multiple, never below the minimum.
    RoundUp { multiple: u32, min: u32, default: u32 },
    Fixed(u32),
}

/// Largest page count a caller may ask for.
pub const MAX_PAGES: u32 = 64;

impl PageRule {
    /// Hints outside 1..=64 are ignored.
    pub fn resolve(&self, hint: Option<i64>) -> u32 {
        match *self {
            PageRule::Fixed(pages) => pages,
            PageRule::RoundUp { multiple, min, default } => match hint {
                Some(h) if (1..=MAX_PAGES as i64).contains(&h) => {
                    (h as u32).div_ceil(multiple).saturating_mul(multiple).max(min)
                }
                _ => default,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    Hint { default: u32, cap: u32 },
    Fixed(u32),
}

/// Largest column count a caller may ask for.
pub const MAX_COLUMNS: u32 = 8;

impl ColumnRule {
    /// Hints outside 1..=8 are ignored; accepted hints are capped by the preset.
    pub fn resolve(&self, hint: Option<i64>) -> u32 {
        match *self {
            ColumnRule::Fixed(columns) => columns,
            ColumnRule::Hint { default, cap } => match hint {
                Some(h) if (1..=MAX_COLUMNS as i64).contains(&h) => (h as u32).min(cap),
                _ => default,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldPreset {
    pub name: &'static str,
    pub width: f32,
    pub height: f32,
    /// Orientation requests are ignored.
    pub locked: bool,
    pub style: FoldStyle,
    pub pages: PageRule,
    pub columns: ColumnRule,
}

const SINGLE_PAGES: PageRule = PageRule::RoundUp { multiple: 4, min: 4, default: 4 };
const SINGLE_COLUMNS: ColumnRule = ColumnRule::Hint { default: 4, cap: MAX_COLUMNS };
const NARROW_COLUMNS: ColumnRule = ColumnRule::Hint { default: 2, cap: MAX_COLUMNS };

pub static PRESETS: [FoldPreset; 9] = [
    FoldPreset {
        name: "usletter",
        width: 8.5,
        height: 11.0,
        locked: false,
        style: FoldStyle::Single,
        pages: SINGLE_PAGES,
        columns: SINGLE_COLUMNS,
    },
    FoldPreset {
        name: "uslegal",
        width: 8.5,
        height: 14.0,
        locked: false,
        style: FoldStyle::Single,
        pages: SINGLE_PAGES,
        columns: SINGLE_COLUMNS,
    },
    FoldPreset {
        name: "tabloid",
        width: 11.0,
        height: 17.0,
        locked: false,
        style: FoldStyle::Single,
        pages: SINGLE_PAGES,
        columns: SINGLE_COLUMNS,
    },
    FoldPreset {
        name: "booklet",
        width: 4.5,
        height: 8.0,
        locked: true,
        style: FoldStyle::Single,
        pages: SINGLE_PAGES,
        columns: NARROW_COLUMNS,
    },
    FoldPreset {
        name: "chapbook",
        width: 5.5,
        height: 8.5,
        locked: true,
        style: FoldStyle::Single,
        pages: SINGLE_PAGES,
        columns: NARROW_COLUMNS,
    },
    FoldPreset {
        name: "two-fold-tabloid",
        width: 8.5,
        height: 11.0,
        locked: true,
        style: FoldStyle::Bifold,
        pages: PageRule::Fixed(5),
        columns: ColumnRule::Hint { default: 4, cap: 4 },
    },
    FoldPreset {
        name: "two-fold-us-letter",
        width: 11.0,
        height: 8.5,
        locked: true,
        style: FoldStyle::FourSection,
        pages: PageRule::Fixed(3),
        columns: ColumnRule::Fixed(2),
    },
    FoldPreset {
        name: "two-fold-us-legal",
        width: 14.0,
        height: 8.5,
        locked: true,
        style: FoldStyle::FourSection,
        pages: PageRule::Fixed(3),
        columns: ColumnRule::Hint { default: 2, cap: 4 },
    },
    FoldPreset {
        name: "trifold",
        width: 11.0,
        height: 8.5,
        locked: true,
        style: FoldStyle::Trifold,
        pages: PageRule::RoundUp { multiple: 2, min: 2, default: 2 },
        columns: ColumnRule::Fixed(3),
    },
];

impl FoldPreset {
    /// Case-insensitive lookup, including the older alias names.
    pub fn lookup(name: &str) -> Option<&'static FoldPreset> {
        let name = name.trim().to_ascii_lowercase();
        let canonical = match name.as_str() {
            "letter" => "usletter",
            "legal" => "uslegal",
            "bifold-tabloid" => "two-fold-tabloid",
            "bifold-letter" => "two-fold-us-letter",
            "bifold-legal" => "two-fold-us-legal",
            other => other,
        };
        PRESETS.iter().find(|p| p.name == canonical)
    }

    pub fn default_preset() -> &'static FoldPreset {
        &PRESETS[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Front,
    Rear,
}

/// A region split into equal columns separated by a gutter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListArea {
    pub region: Region,
    pub columns: u32,
    pub gutter: f32,
}

impl ListArea {
    pub fn column_width(&self) -> f32 {
        let n = self.columns.max(1) as f32;
        (self.region.width() - (n - 1.0) * self.gutter) / n
    }

    pub fn column_left(&self, column: u32) -> f32 {
        self.region.left + column as f32 * (self.column_width() + self.gutter)
    }
}

/// What goes where on one physical page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub panels: Vec<(PanelKind, Region)>,
    pub lists: Vec<ListArea>,
}

impl PagePlan {
    pub fn has_panel(&self, kind: PanelKind) -> bool {
        self.panels.iter().any(|(k, _)| *k == kind)
    }
}

/// Resolved physical layout for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub columns: u32,
    pub page_max: u32,
    pub style: FoldStyle,
}

impl Geometry {
    fn content(&self) -> Region {
        let m = self.margin;
        Region::new(m, m, self.width - m, self.height - m)
    }

    fn gutter(&self) -> f32 {
        match self.style {
            FoldStyle::Trifold => 2.0 * self.margin,
            _ => self.margin,
        }
    }

    /// Vertical strip `[from, to)` of the page width, inset by half a margin
    /// on inner edges and a full margin on the outer ones.
    fn strip(&self, from: f32, to: f32) -> Region {
        let m = self.margin;
        let left = if from <= 0.0 { m } else { self.width * from + m / 2.0 };
        let right = if to >= 1.0 { self.width - m } else { self.width * to - m / 2.0 };
        Region::new(left, m, right, self.height - m)
    }

    fn trifold_panel(&self, index: u32) -> Region {
        let third = self.width / 3.0;
        let m = self.margin;
        Region::new(third * index as f32 + m, m, third * (index + 1) as f32 - m, self.height - m)
    }

    fn list(&self, region: Region, columns: u32) -> ListArea {
        ListArea { region, columns, gutter: self.gutter() }
    }

    /// Plan for the page at `index` (0 = the cover page).
    pub fn plan(&self, index: u32) -> PagePlan {
        let mut plan = PagePlan::default();
        match (self.style, index) {
            (FoldStyle::Single, 0) => plan.panels.push((PanelKind::Front, self.content())),
            (FoldStyle::Bifold, 0) => {
                plan.panels.push((PanelKind::Rear, self.strip(0.0, 0.5)));
                plan.panels.push((PanelKind::Front, self.strip(0.5, 1.0)));
            }
            (FoldStyle::Single, _) | (FoldStyle::Bifold, _) => {
                plan.lists.push(self.list(self.content(), self.columns))
            }
            (FoldStyle::FourSection, 0) => {
                plan.lists.push(self.list(self.strip(0.0, 0.5), self.columns));
                plan.panels.push((PanelKind::Rear, self.strip(0.5, 0.75)));
                plan.panels.push((PanelKind::Front, self.strip(0.75, 1.0)));
            }
            (FoldStyle::FourSection, _) => {
                plan.lists.push(self.list(self.strip(0.0, 0.5), self.columns));
                plan.lists.push(self.list(self.strip(0.5, 1.0), self.columns));
            }
            (FoldStyle::Trifold, 0) => {
                let list = Region { right: self.trifold_panel(1).right, ..self.trifold_panel(0) };
                plan.lists.push(self.list(list, 2));
                plan.panels.push((PanelKind::Front, self.trifold_panel(2)));
            }
            (FoldStyle::Trifold, i) if i + 1 >= self.page_max => {
                let list = Region { right: self.trifold_panel(1).right, ..self.trifold_panel(0) };
                plan.lists.push(self.list(list, 2));
                plan.panels.push((PanelKind::Rear, self.trifold_panel(2)));
            }
            (FoldStyle::Trifold, _) => plan.lists.push(self.list(self.content(), self.columns)),
        }
        plan
    }

    /// Most pages the list may use before the font has to shrink.
    pub fn page_limit(&self) -> u32 {
        match self.style {
            FoldStyle::Trifold => self.page_max,
            _ => self.page_max.saturating_sub(1).max(1),
        }
    }

    /// Blank pages are added until this many pages exist.
    pub fn padding_target(&self) -> u32 {
        self.page_max.saturating_sub(1)
    }

    /// Page appended after the list when the contact panel has not been drawn yet.
    pub fn closing_plan(&self) -> Option<PagePlan> {
        match self.style {
            FoldStyle::Single => Some(PagePlan {
                panels: vec![(PanelKind::Rear, self.content())],
                lists: vec![],
            }),
            FoldStyle::Trifold => Some(PagePlan {
                panels: vec![(PanelKind::Rear, self.trifold_panel(2))],
                lists: vec![],
            }),
            FoldStyle::Bifold | FoldStyle::FourSection => None,
        }
    }

    /// x positions of the folds, for the optional guide lines.
    pub fn fold_lines(&self) -> Vec<f32> {
        let fractions: &[f32] = match self.style {
            FoldStyle::Single => &[],
            FoldStyle::Bifold => &[0.5],
            FoldStyle::FourSection => &[0.25, 0.5, 0.75],
            FoldStyle::Trifold => &[1.0 / 3.0, 2.0 / 3.0],
        };
        fractions.iter().map(|f| self.width * f).collect()
    }

    /// Every region on every page the style can produce must be non-empty and
    /// regions on one page must not overlap.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.width <= 0.0 || self.height <= 0.0 || self.margin < 0.0 {
            return Err(AppError::Config(format!(
                "page {}x{} with margin {} is not drawable",
                self.width, self.height, self.margin
            )));
        }
        let mut plans: Vec<PagePlan> = (0..self.page_max.max(2)).map(|i| self.plan(i)).collect();
        plans.extend(self.closing_plan());
        for plan in &plans {
            let mut regions: Vec<Region> = plan.panels.iter().map(|(_, r)| *r).collect();
            for area in &plan.lists {
                if area.columns == 0 || area.column_width() <= 0.0 {
                    return Err(AppError::Config(format!(
                        "{} columns do not fit in {:.2}in",
                        area.columns,
                        area.region.width()
                    )));
                }
                regions.push(area.region);
            }
            for (i, region) in regions.iter().enumerate() {
                if !region.is_valid() {
                    return Err(AppError::Config(format!(
                        "page region {:?} has no drawable interior",
                        region
                    )));
                }
                if regions[i + 1..].iter().any(|other| region.overlaps(other)) {
                    return Err(AppError::Config("page regions overlap".to_string()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(name: &str, columns: Option<i64>, pages: Option<i64>) -> Geometry {
        let preset = FoldPreset::lookup(name).unwrap();
        Geometry {
            width: preset.width,
            height: preset.height,
            margin: PAGE_MARGIN,
            columns: preset.columns.resolve(columns),
            page_max: preset.pages.resolve(pages),
            style: preset.style,
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_knows_aliases() {
        assert_eq!(FoldPreset::lookup("TriFold").unwrap().name, "trifold");
        assert_eq!(FoldPreset::lookup("bifold-legal").unwrap().name, "two-fold-us-legal");
        assert_eq!(FoldPreset::lookup("letter").unwrap().name, "usletter");
        assert!(FoldPreset::lookup("a4").is_none());
    }

    #[test]
    fn column_hints_are_clamped() {
        let rule = SINGLE_COLUMNS;
        assert_eq!(rule.resolve(Some(3)), 3);
        assert_eq!(rule.resolve(Some(13)), 4);
        assert_eq!(rule.resolve(Some(0)), 4);
        assert_eq!(rule.resolve(Some(-2)), 4);
        let capped = FoldPreset::lookup("two-fold-tabloid").unwrap().columns;
        assert_eq!(capped.resolve(Some(8)), 4);
        assert_eq!(ColumnRule::Fixed(3).resolve(Some(5)), 3);
    }

    #[test]
    fn page_hints_round_up() {
        assert_eq!(SINGLE_PAGES.resolve(Some(5)), 8);
        assert_eq!(SINGLE_PAGES.resolve(Some(8)), 8);
        assert_eq!(SINGLE_PAGES.resolve(Some(1)), 4);
        assert_eq!(SINGLE_PAGES.resolve(None), 4);
        let trifold = FoldPreset::lookup("trifold").unwrap().pages;
        assert_eq!(trifold.resolve(Some(3)), 4);
        assert_eq!(PageRule::Fixed(5).resolve(Some(12)), 5);
        assert_eq!(SINGLE_PAGES.resolve(Some(64)), 64);
    }

    #[test]
    fn oversized_page_hints_are_ignored() {
        assert_eq!(SINGLE_PAGES.resolve(Some(65)), 4);
        assert_eq!(SINGLE_PAGES.resolve(Some(100_000_000)), 4);
        assert_eq!(SINGLE_PAGES.resolve(Some(i64::MAX)), 4);
        let g = geometry("usletter", None, Some(100_000_000));
        assert_eq!(g.page_max, 4);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn every_preset_validates() {
        for preset in PRESETS.iter() {
            let g = geometry(preset.name, None, Some(6));
            g.validate().unwrap_or_else(|e| panic!("{}: {}", preset.name, e));
        }
    }

    #[test]
    fn bifold_cover_holds_both_panels() {
        let g = geometry("two-fold-tabloid", None, None);
        let plan = g.plan(0);
        assert!(plan.has_panel(PanelKind::Rear));
        assert!(plan.has_panel(PanelKind::Front));
        assert!(plan.lists.is_empty());
        assert_eq!(g.plan(1).lists[0].columns, 4);
        assert!(g.closing_plan().is_none());
        assert_eq!(g.page_limit(), 4);
    }

    #[test]
    fn trifold_columns_line_up_with_panels() {
        let g = geometry("trifold", None, Some(4));
        let cover = g.plan(0);
        let middle = g.plan(1);
        let last = g.plan(3);
        let first_col = cover.lists[0].column_width();
        assert!((first_col - middle.lists[0].column_width()).abs() < 1e-4);
        assert!((cover.lists[0].column_left(1) - middle.lists[0].column_left(1)).abs() < 1e-4);
        assert!(last.has_panel(PanelKind::Rear));
        assert_eq!(last.lists[0].columns, 2);
        assert_eq!(g.page_limit(), 4);
    }

    #[test]
    fn four_section_uses_both_halves_after_the_cover() {
        let g = geometry("two-fold-us-letter", Some(4), None);
        assert_eq!(g.columns, 2);
        assert_eq!(g.plan(0).lists.len(), 1);
        assert_eq!(g.plan(1).lists.len(), 2);
        assert_eq!(g.fold_lines().len(), 3);
    }

    #[test]
    fn too_many_columns_fail_validation() {
        let mut g = geometry("booklet", None, None);
        g.columns = 40;
        g.margin = 0.5;
        assert!(matches!(g.validate(), Err(AppError::Config(_))));
    }
}
