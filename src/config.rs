// Profiles, request parameters, and the resolver that turns them into
// concrete document settings.

use crate::canvas::Ink;
use crate::error::AppError;
use crate::compose::MIN_VARIABLE_FONT;
use crate::geometry::{FoldPreset, Geometry, MAX_PAGES, PAGE_MARGIN};
use crate::layout::GroupMode;
use crate::sort::{SortField, SortKey, SortSpec, TieBreak};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const NY_ROOT_SERVER: &str = "https://bmlt.newyorkna.org/main_server/";
pub const NY_HELPLINE: &str = "Regional Helpline: (212) 929-NANA (6262)";
pub const BRANDED_FILENAME: &str = "Printable_PDF_NA_Meeting_List_{date}.pdf";
pub const REVISED_DATE_FORMAT: &str = "Revised %B, %Y";

/// Header bar color used when the color scheme is on.
pub const ACCENT_RED: Ink = Ink::rgb(190, 32, 45);

// ============================================================================
// Profiles
// ============================================================================

/// Page scraped for extra content under the format legend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxSource {
    pub url: String,
    pub container_id: String,
    pub header: String,
}

/// A named bundle of defaults. Profile files only need the fields they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub root_server: String,
    pub service_bodies: Vec<i64>,
    pub recursive: bool,
    pub helpline: String,
    pub credits: String,
    pub web_url: String,
    pub banner_1: String,
    pub banner_2: String,
    pub banner_3: String,
    pub date_format: String,
    pub filename_template: String,
    pub logo_path: String,
    pub color_logo_path: String,
    pub week_starts: u8,
    pub font_size: f32,
    pub variable_font_size: Option<f32>,
    pub layout: String,
    /// Layout and columns that requests cannot change.
    pub forced_layout: Option<String>,
    pub forced_columns: Option<u32>,
    pub group_by: String,
    pub aux_source: Option<AuxSource>,
    pub footer: String,
    pub county_tie_break: bool,
    pub language: String,
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            name: "custom".to_string(),
            root_server: String::new(),
            service_bodies: Vec::new(),
            recursive: false,
            helpline: String::new(),
            credits: String::new(),
            web_url: String::new(),
            banner_1: String::new(),
            banner_2: String::new(),
            banner_3: String::new(),
            date_format: REVISED_DATE_FORMAT.to_string(),
            filename_template: "meeting_list_{date}.pdf".to_string(),
            logo_path: String::new(),
            color_logo_path: String::new(),
            week_starts: 1,
            font_size: 10.0,
            variable_font_size: None,
            layout: "usletter".to_string(),
            forced_layout: None,
            forced_columns: None,
            group_by: "weekday".to_string(),
            aux_source: None,
            footer: String::new(),
            county_tie_break: false,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

pub const BUILTIN_PROFILES: [&str; 4] = ["generic", "flex", "nsli", "gnyr"];

impl Profile {
    pub fn builtin(name: &str) -> Option<Profile> {
        match name.trim().to_ascii_lowercase().as_str() {
            "generic" => Some(Profile {
                name: "generic".to_string(),
                helpline: "Helpline: Contact your local area".to_string(),
                credits: "Meeting List Generated from BMLT".to_string(),
                banner_1: "NA Meetings".to_string(),
                ..Profile::default()
            }),
            "flex" => Some(Profile {
                name: "flex".to_string(),
                root_server: "<URI>".to_string(),
                service_bodies: vec![1001, 1002, 1003, 1004, 1067],
                helpline: "<HELPLINE>".to_string(),
                credits: "<CREDITS>".to_string(),
                web_url: "<WEB SITE>".to_string(),
                banner_1: "<BANNER 1>".to_string(),
                banner_2: "<BANNER 2>".to_string(),
                banner_3: "<BANNER 3>".to_string(),
                filename_template: BRANDED_FILENAME.to_string(),
                logo_path: "images/Sunburst_Cover_Logo.png".to_string(),
                week_starts: 2,
                ..Profile::default()
            }),
            "nsli" => Some(Profile {
                name: "nsli".to_string(),
                root_server: NY_ROOT_SERVER.to_string(),
                service_bodies: vec![1001, 1002, 1003, 1004, 1067],
                helpline: NY_HELPLINE.to_string(),
                credits: "Meeting List Printed by the Heart of Long Island Area".to_string(),
                web_url: "Web Site: https://heartoflongislandna.org".to_string(),
                banner_1: "NA Meetings".to_string(),
                banner_2: "On".to_string(),
                banner_3: "Long Island, New York".to_string(),
                filename_template: BRANDED_FILENAME.to_string(),
                logo_path: "images/HOLI.png".to_string(),
                color_logo_path: "images/HOLI-Color.png".to_string(),
                week_starts: 2,
                variable_font_size: Some(9.0),
                forced_layout: Some("two-fold-tabloid".to_string()),
                forced_columns: Some(4),
                aux_source: Some(AuxSource {
                    url: "https://heartoflongislandna.org/subcommittee-meetings/".to_string(),
                    container_id: "meeting_times".to_string(),
                    header: "COMMITTEE MEETINGS".to_string(),
                }),
                footer: "NA meetings are 90 minutes (an hour and a half) long, unless otherwise noted (in parentheses).".to_string(),
                ..Profile::default()
            }),
            "gnyr" => Some(Profile {
                name: "gnyr".to_string(),
                root_server: NY_ROOT_SERVER.to_string(),
                service_bodies: vec![
                    1, 2, 1001, 1002, 1003, 1004, 1005, 1006, 1007, 1008, 1010, 1011, 1012, 1013,
                    1014, 1015, 1016, 1017, 1045, 1064, 1067,
                ],
                helpline: NY_HELPLINE.to_string(),
                credits: "Meeting List Printed by the Greater New York Region".to_string(),
                web_url: "Web Site: https://newyorkna.org".to_string(),
                banner_1: "NA Meetings".to_string(),
                banner_2: "In".to_string(),
                banner_3: "Downstate New York".to_string(),
                filename_template: BRANDED_FILENAME.to_string(),
                logo_path: "images/NYNALogo.png".to_string(),
                week_starts: 2,
                county_tie_break: true,
                ..Profile::default()
            }),
            _ => None,
        }
    }

    /// Reads a JSON profile file. Missing fields take the defaults.
    pub fn load(path: &Path) -> Result<Profile, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Invalid profile {}: {}", path.display(), e)))
    }
}

// ============================================================================
// Request parameters
// ============================================================================

/// Tri-state string override: not given, explicitly blanked, or replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOverride {
    Unset,
    Empty,
    Value(String),
}

/// Sentinel that blanks a line a profile would otherwise print.
pub const EMPTY_SENTINEL: &str = "-";

impl TextOverride {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            None => TextOverride::Unset,
            Some(v) if v.trim().is_empty() || v.trim() == EMPTY_SENTINEL => TextOverride::Empty,
            Some(v) => TextOverride::Value(v.trim().to_string()),
        }
    }

    /// Applies the override to a profile default. `<...>` placeholders count
    /// as empty.
    pub fn resolve(&self, default: &str) -> Option<String> {
        match self {
            TextOverride::Empty => None,
            TextOverride::Value(v) => Some(v.clone()),
            TextOverride::Unset => {
                let d = default.trim();
                if d.is_empty() || is_placeholder(d) {
                    None
                } else {
                    Some(d.to_string())
                }
            }
        }
    }
}

fn is_placeholder(value: &str) -> bool {
    value.starts_with('<') && value.ends_with('>')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    #[default]
    Json,
    Csv,
}

impl SourceFormat {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SourceFormat::Json),
            "csv" => Ok(SourceFormat::Csv),
            other => Err(AppError::Config(format!("Unknown source format: {}", other))),
        }
    }
}

/// Everything a caller may ask for. Absent fields fall back to the profile.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    pub server_url: Option<String>,
    /// Raw entries; each may itself be a comma-separated list.
    pub service_bodies: Vec<String>,
    pub recursive: Option<bool>,
    pub group_by: Option<String>,
    pub week_starts: Option<i64>,
    pub layout: Option<String>,
    pub orientation: Option<String>,
    pub pages: Option<i64>,
    pub columns: Option<i64>,
    pub banner_1: Option<String>,
    pub banner_2: Option<String>,
    pub banner_3: Option<String>,
    pub credits: Option<String>,
    pub helpline: Option<String>,
    pub web_url: Option<String>,
    pub footer: Option<String>,
    pub date_format: Option<String>,
    pub logo_path: Option<String>,
    pub filename: Option<String>,
    pub qr: bool,
    pub qr_service: Option<String>,
    pub color: bool,
    pub fold_guides: bool,
    pub language: Option<String>,
    pub records_file: Option<PathBuf>,
    pub source_format: SourceFormat,
    pub timeout_secs: Option<u64>,
}

// ============================================================================
// Resolved settings
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum QrMode {
    Off,
    Local,
    Remote(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Remote { root: String },
    File(PathBuf),
}

/// What a record source is asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub services: Vec<i64>,
    pub recursive: bool,
    pub language: String,
}

/// Strings for the front matter. `None` lines are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelContent {
    pub date_line: Option<String>,
    pub credits: Option<String>,
    pub banner_1: Option<String>,
    pub banner_2: Option<String>,
    pub banner_3: Option<String>,
    pub web_url: Option<String>,
    pub helpline: Option<String>,
    pub footer: Option<String>,
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub profile: String,
    pub preset: &'static str,
    pub geometry: Geometry,
    pub group_mode: GroupMode,
    pub sort: SortSpec,
    pub query: SearchQuery,
    pub source: SourceKind,
    pub format: SourceFormat,
    pub content: PanelContent,
    pub aux: Option<AuxSource>,
    pub fixed_font: f32,
    pub variable_font: f32,
    pub qr: QrMode,
    pub header_fill: Ink,
    pub fold_guides: bool,
    pub filename: String,
    pub timeout: Duration,
}

// ============================================================================
// Resolver
// ============================================================================

pub fn resolve(
    profile: &Profile,
    params: &RequestParams,
    today: NaiveDate,
) -> Result<DocumentSettings, AppError> {
    let geometry_layout = profile
        .forced_layout
        .clone()
        .or_else(|| params.layout.clone())
        .unwrap_or_else(|| profile.layout.clone());
    let preset = match FoldPreset::lookup(&geometry_layout) {
        Some(preset) => preset,
        None => {
            warn!(layout = %geometry_layout, "Unknown layout, using US Letter");
            FoldPreset::default_preset()
        }
    };

    let (mut width, mut height) = (preset.width, preset.height);
    if !preset.locked {
        if let Some(orientation) = params.orientation.as_deref() {
            let o = orientation.trim().to_ascii_lowercase();
            if o == "l" || o == "landscape" {
                std::mem::swap(&mut width, &mut height);
            }
        }
    }

    let column_hint = profile.forced_columns.map(|c| c as i64).or(params.columns);
    if let Some(pages) = params.pages.filter(|p| *p > MAX_PAGES as i64) {
        warn!(pages, max = MAX_PAGES, "Ignoring page count over the maximum");
    }
    let geometry = Geometry {
        width,
        height,
        margin: PAGE_MARGIN,
        columns: preset.columns.resolve(column_hint),
        page_max: preset.pages.resolve(params.pages),
        style: preset.style,
    };
    geometry.validate()?;

    let week_starts = match params.week_starts {
        Some(w) if (1..=7).contains(&w) => w as u8,
        Some(w) => {
            warn!(week_starts = w, "Ignoring week start outside 1..=7");
            profile.week_starts
        }
        None => profile.week_starts,
    };

    let group_name = params.group_by.clone().unwrap_or_else(|| profile.group_by.clone());
    let group_mode = GroupMode::parse(&group_name).unwrap_or_else(|| {
        warn!(group_by = %group_name, "Unknown grouping, using weekday");
        GroupMode::Weekday
    });

    let sort = SortSpec {
        keys: sort_keys_for(group_mode),
        week_starts,
        tie_break: profile.county_tie_break.then_some(TieBreak::County),
    };

    let services = if params.service_bodies.is_empty() {
        profile.service_bodies.iter().copied().filter(|id| *id > 0).collect()
    } else {
        coerce_service_bodies(&params.service_bodies)
    };
    if services.is_empty() {
        return Err(AppError::Config(
            "At least one service body must be selected".to_string(),
        ));
    }

    let source = match &params.records_file {
        Some(path) => SourceKind::File(path.clone()),
        None => {
            let root = TextOverride::from_param(params.server_url.as_deref())
                .resolve(&profile.root_server)
                .ok_or_else(|| AppError::Config("Server URL is required".to_string()))?;
            SourceKind::Remote { root: normalize_root(&root) }
        }
    };

    let query = SearchQuery {
        services,
        recursive: params.recursive.unwrap_or(profile.recursive),
        language: params
            .language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| profile.language.clone()),
    };

    let text = |param: &Option<String>, default: &str| {
        TextOverride::from_param(param.as_deref()).resolve(default)
    };

    let date_line = match text(&params.date_format, &profile.date_format) {
        Some(fmt) => Some(format_date(today, &fmt)?),
        None => None,
    };

    let logo_default = if params.color && !profile.color_logo_path.is_empty() {
        &profile.color_logo_path
    } else {
        &profile.logo_path
    };

    let content = PanelContent {
        date_line,
        credits: text(&params.credits, &profile.credits),
        banner_1: text(&params.banner_1, &profile.banner_1),
        banner_2: text(&params.banner_2, &profile.banner_2),
        banner_3: text(&params.banner_3, &profile.banner_3),
        web_url: text(&params.web_url, &profile.web_url),
        helpline: text(&params.helpline, &profile.helpline),
        footer: text(&params.footer, &profile.footer),
        logo_path: text(&params.logo_path, logo_default),
    };

    let filename = match params.filename.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => profile
            .filename_template
            .replace("{date}", &today.format("%Y_%m_%d").to_string()),
    };

    let qr = match (params.qr, params.qr_service.as_deref()) {
        (false, _) => QrMode::Off,
        (true, Some(url)) if !url.trim().is_empty() => QrMode::Remote(url.trim().to_string()),
        (true, _) => QrMode::Local,
    };

    let fixed_font = profile.font_size;
    let variable_font = profile.variable_font_size.unwrap_or(fixed_font + 2.0);
    if fixed_font <= 0.0 {
        return Err(AppError::Config("Font sizes must be positive".to_string()));
    }
    if variable_font < MIN_VARIABLE_FONT {
        return Err(AppError::Config(format!(
            "Variable font size {}pt is below the {}pt minimum",
            variable_font, MIN_VARIABLE_FONT
        )));
    }

    let settings = DocumentSettings {
        profile: profile.name.clone(),
        preset: preset.name,
        geometry,
        group_mode,
        sort,
        query,
        source,
        format: params.source_format,
        content,
        aux: profile.aux_source.clone().filter(|a| !a.url.trim().is_empty()),
        fixed_font,
        variable_font,
        qr,
        header_fill: if params.color { ACCENT_RED } else { Ink::BLACK },
        fold_guides: params.fold_guides,
        filename,
        timeout: Duration::from_secs(params.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    };
    debug!(
        preset = settings.preset,
        columns = settings.geometry.columns,
        page_max = settings.geometry.page_max,
        "Resolved document settings"
    );
    Ok(settings)
}

pub fn sort_keys_for(mode: GroupMode) -> Vec<SortKey> {
    let town = || SortKey::asc(SortField::from_name("location_municipality"));
    match mode {
        GroupMode::Weekday => vec![
            SortKey::asc(SortField::Weekday),
            SortKey::asc(SortField::StartTime),
            town(),
        ],
        GroupMode::City => vec![
            town(),
            SortKey::asc(SortField::Weekday),
            SortKey::asc(SortField::StartTime),
        ],
    }
}

/// Splits comma lists, drops blanks, zeros and anything non-numeric.
pub fn coerce_service_bodies(raw: &[String]) -> Vec<i64> {
    raw.iter()
        .flat_map(|entry| entry.split(','))
        .filter_map(|id| id.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .collect()
}

pub fn normalize_root(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

/// Formats `date` with a strftime pattern, rejecting malformed patterns
/// instead of panicking inside chrono.
pub fn format_date(date: NaiveDate, pattern: &str) -> Result<String, AppError> {
    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(AppError::Config(format!("Invalid date format: {}", pattern)));
    }
    Ok(date.format_with_items(items.into_iter()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FoldStyle;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    fn generic_params() -> RequestParams {
        RequestParams {
            server_url: Some("https://bmlt.example.org/main_server".to_string()),
            service_bodies: vec!["12, 0, x".to_string(), "14".to_string()],
            ..Default::default()
        }
    }

    fn generic() -> Profile {
        Profile::builtin("generic").unwrap()
    }

    #[test]
    fn generic_defaults() {
        let s = resolve(&generic(), &generic_params(), today()).unwrap();
        assert_eq!(s.preset, "usletter");
        assert_eq!(s.geometry.columns, 4);
        assert_eq!(s.geometry.page_max, 4);
        assert_eq!(s.query.services, vec![12, 14]);
        assert_eq!(
            s.source,
            SourceKind::Remote { root: "https://bmlt.example.org/main_server/".to_string() }
        );
        assert_eq!(s.content.date_line.as_deref(), Some("Revised March, 2025"));
        assert_eq!(s.content.banner_1.as_deref(), Some("NA Meetings"));
        assert_eq!(s.content.banner_2, None);
        assert_eq!(s.filename, "meeting_list_2025_03_09.pdf");
        assert_eq!(s.variable_font, 12.0);
        assert_eq!(s.qr, QrMode::Off);
    }

    #[test]
    fn empty_service_bodies_are_rejected() {
        let mut params = generic_params();
        params.service_bodies = vec!["0, abc".to_string()];
        let err = resolve(&generic(), &params, today()).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("service body"));
    }

    #[test]
    fn server_url_required_without_records_file() {
        let mut params = generic_params();
        params.server_url = None;
        assert!(matches!(resolve(&generic(), &params, today()), Err(AppError::Config(_))));

        params.records_file = Some(PathBuf::from("meetings.json"));
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!(s.source, SourceKind::File(PathBuf::from("meetings.json")));
    }

    #[test]
    fn sentinel_suppresses_profile_strings() {
        let mut params = generic_params();
        params.helpline = Some("-".to_string());
        params.credits = Some("   ".to_string());
        params.banner_2 = Some("In".to_string());
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!(s.content.helpline, None);
        assert_eq!(s.content.credits, None);
        assert_eq!(s.content.banner_2.as_deref(), Some("In"));
    }

    #[test]
    fn placeholders_count_as_empty() {
        let flex = Profile::builtin("flex").unwrap();
        let params = RequestParams {
            server_url: Some("https://example.org/main_server/".to_string()),
            ..Default::default()
        };
        let s = resolve(&flex, &params, today()).unwrap();
        assert_eq!(s.content.helpline, None);
        assert_eq!(s.content.banner_1, None);
        assert_eq!(s.sort.week_starts, 2);

        let no_root = resolve(&flex, &RequestParams::default(), today());
        assert!(matches!(no_root, Err(AppError::Config(_))));
    }

    #[test]
    fn orientation_swaps_unless_locked() {
        let mut params = generic_params();
        params.orientation = Some("L".to_string());
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!((s.geometry.width, s.geometry.height), (11.0, 8.5));

        params.layout = Some("booklet".to_string());
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!((s.geometry.width, s.geometry.height), (4.5, 8.0));
        assert_eq!(s.geometry.columns, 2);
    }

    #[test]
    fn column_and_page_hints() {
        let mut params = generic_params();
        params.columns = Some(3);
        params.pages = Some(5);
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!(s.geometry.columns, 3);
        assert_eq!(s.geometry.page_max, 8);

        params.columns = Some(13);
        assert_eq!(resolve(&generic(), &params, today()).unwrap().geometry.columns, 4);

        params.layout = Some("Two-Fold-Tabloid".to_string());
        params.columns = Some(8);
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!(s.geometry.style, FoldStyle::Bifold);
        assert_eq!(s.geometry.columns, 4);
        assert_eq!(s.geometry.page_max, 5);
    }

    #[test]
    fn unknown_layout_falls_back_to_letter() {
        let mut params = generic_params();
        params.layout = Some("a4".to_string());
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!(s.preset, "usletter");
        assert_eq!(s.geometry.height, 11.0);
    }

    #[test]
    fn nsli_forces_its_layout_and_colors() {
        let nsli = Profile::builtin("NSLI").unwrap();
        let params = RequestParams {
            layout: Some("trifold".to_string()),
            columns: Some(2),
            color: true,
            ..Default::default()
        };
        let s = resolve(&nsli, &params, today()).unwrap();
        assert_eq!(s.preset, "two-fold-tabloid");
        assert_eq!(s.geometry.columns, 4);
        assert_eq!(s.variable_font, 9.0);
        assert_eq!(s.header_fill, ACCENT_RED);
        assert_eq!(s.content.logo_path.as_deref(), Some("images/HOLI-Color.png"));
        assert_eq!(s.filename, "Printable_PDF_NA_Meeting_List_2025_03_09.pdf");
        assert!(s.aux.is_some());
    }

    #[test]
    fn oversized_page_hint_keeps_the_preset_budget() {
        let mut params = generic_params();
        params.pages = Some(100_000_000);
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!(s.geometry.page_max, 4);
    }

    #[test]
    fn variable_font_below_the_shrink_floor_is_rejected() {
        let small = Profile { variable_font_size: Some(1.0), ..generic() };
        let err = resolve(&small, &generic_params(), today()).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("minimum")));

        let floor = Profile { variable_font_size: Some(MIN_VARIABLE_FONT), ..generic() };
        assert_eq!(resolve(&floor, &generic_params(), today()).unwrap().variable_font, MIN_VARIABLE_FONT);
    }

    #[test]
    fn city_grouping_changes_sort_keys() {
        let mut params = generic_params();
        params.group_by = Some("city".to_string());
        let s = resolve(&generic(), &params, today()).unwrap();
        assert_eq!(s.group_mode, GroupMode::City);
        assert_eq!(s.sort.keys[0].field, SortField::Text("location_municipality".into()));
    }

    #[test]
    fn gnyr_uses_county_tie_break() {
        let gnyr = Profile::builtin("gnyr").unwrap();
        let s = resolve(&gnyr, &RequestParams::default(), today()).unwrap();
        assert_eq!(s.sort.tie_break, Some(TieBreak::County));
        assert_eq!(s.query.services.len(), 21);
    }

    #[test]
    fn bad_date_format_is_a_config_error() {
        let mut params = generic_params();
        params.date_format = Some("%Q %Y".to_string());
        assert!(matches!(resolve(&generic(), &params, today()), Err(AppError::Config(_))));
    }

    #[test]
    fn qr_mode_follows_service_url() {
        let mut params = generic_params();
        params.qr = true;
        assert_eq!(resolve(&generic(), &params, today()).unwrap().qr, QrMode::Local);
        params.qr_service = Some("https://qr.example.org/v1/create-qr-code/".to_string());
        assert!(matches!(
            resolve(&generic(), &params, today()).unwrap().qr,
            QrMode::Remote(_)
        ));
    }

    #[test]
    fn profile_files_only_need_changed_fields() {
        let profile: Profile =
            serde_json::from_str(r#"{"name": "area", "banner_1": "Area Meetings", "week_starts": 2}"#)
                .unwrap();
        assert_eq!(profile.banner_1, "Area Meetings");
        assert_eq!(profile.font_size, 10.0);
        assert_eq!(profile.layout, "usletter");
    }

    #[test]
    fn profile_file_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, r#"{"root_server": "https://x.org/main_server", "service_bodies": [3]}"#)
            .unwrap();
        let profile = Profile::load(&path).unwrap();
        assert_eq!(profile.service_bodies, vec![3]);
        assert!(Profile::load(&dir.path().join("missing.json")).is_err());
    }
}
