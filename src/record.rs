// Typed meeting records, validated once when a source hands them over.

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Duration that goes unmentioned on the printed list.
pub const DEFAULT_DURATION_MINUTES: u32 = 90;

/// One schedule entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meeting {
    pub id: Option<i64>,
    /// 1 = Sunday .. 7 = Saturday
    pub weekday: Option<u8>,
    pub start_time: Option<NaiveTime>,
    pub duration_minutes: Option<u32>,
    pub service_body_id: Option<i64>,
    pub shared_group_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: String,
    pub municipality: String,
    pub neighborhood: String,
    pub location_text: String,
    pub location_info: String,
    pub location_street: String,
    pub comments: String,
    /// Comma-separated format codes as delivered by the server.
    pub formats: String,
    pub virtual_link: Option<String>,
    pub city_subsection: String,
    pub sub_province: String,
    /// Every field we do not model explicitly, kept for text sort keys.
    pub extra: BTreeMap<String, String>,
}

impl Meeting {
    /// Builds a meeting from raw string fields. Blank values count as absent.
    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        let mut meeting = Meeting::default();
        for (key, raw) in fields {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "id_bigint" => meeting.id = value.parse().ok(),
                "weekday_tinyint" => {
                    meeting.weekday = value.parse::<u8>().ok().filter(|d| (1..=7).contains(d))
                }
                "start_time" => meeting.start_time = parse_time_of_day(value),
                "duration_time" => meeting.duration_minutes = parse_duration_minutes(value),
                "service_body_bigint" => meeting.service_body_id = value.parse().ok(),
                "shared_group_id_bigint" => meeting.shared_group_id = value.parse().ok(),
                "latitude" => meeting.latitude = value.parse().ok(),
                "longitude" => meeting.longitude = value.parse().ok(),
                "meeting_name" => meeting.name = value.to_string(),
                "location_municipality" => meeting.municipality = value.to_string(),
                "location_neighborhood" => meeting.neighborhood = value.to_string(),
                "location_text" => meeting.location_text = value.to_string(),
                "location_info" => meeting.location_info = value.to_string(),
                "location_street" => meeting.location_street = value.to_string(),
                "comments" => meeting.comments = value.to_string(),
                "formats" => meeting.formats = value.to_string(),
                "virtual_meeting_link" => meeting.virtual_link = Some(value.to_string()),
                "location_city_subsection" => meeting.city_subsection = value.to_string(),
                "location_sub_province" => meeting.sub_province = value.to_string(),
                _ => {
                    meeting.extra.insert(key, value.to_string());
                }
            }
        }
        meeting
    }

    /// Builds a meeting from one JSON object of the search response.
    pub fn from_json(object: &serde_json::Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .filter_map(|(k, v)| json_scalar(v).map(|s| (k.clone(), s)))
            .collect();
        Self::from_fields(fields)
    }

    /// Looks up a text field by its server-side name.
    pub fn text_field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "meeting_name" => self.name.as_str(),
            "location_municipality" => self.municipality.as_str(),
            "location_neighborhood" => self.neighborhood.as_str(),
            "location_text" => self.location_text.as_str(),
            "location_info" => self.location_info.as_str(),
            "location_street" => self.location_street.as_str(),
            "comments" => self.comments.as_str(),
            "formats" => self.formats.as_str(),
            "virtual_meeting_link" => self.virtual_link.as_deref().unwrap_or(""),
            "location_city_subsection" => self.city_subsection.as_str(),
            "location_sub_province" => self.sub_province.as_str(),
            other => self.extra.get(other).map(String::as_str).unwrap_or(""),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// County used by the regional tie-break: city subsection, else sub-province.
    pub fn county(&self) -> Option<&str> {
        self.text_field("location_city_subsection")
            .or_else(|| self.text_field("location_sub_province"))
    }

    pub fn start_seconds(&self) -> Option<u32> {
        self.start_time.map(|t| t.num_seconds_from_midnight())
    }

    /// "7:30 PM", with the special cases the printed lists have always used.
    pub fn time_label(&self) -> String {
        match self.start_time {
            Some(t) => format_start_time(t),
            None => String::new(),
        }
    }

    /// Time line: start time plus a duration note when it is not the usual 90 minutes.
    pub fn time_line(&self) -> String {
        let mut line = self.time_label();
        if let Some(minutes) = self.duration_minutes {
            if minutes != DEFAULT_DURATION_MINUTES && minutes > 0 {
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(&format!("({})", format_duration(minutes)));
            }
        }
        line
    }

    /// Name line with the parenthesized format codes.
    pub fn title_line(&self) -> String {
        let codes = arrange_format_codes(&self.formats);
        match (self.name.is_empty(), codes.is_empty()) {
            (_, true) => self.name.clone(),
            (true, false) => format!("({})", codes),
            (false, false) => format!("{} ({})", self.name, codes),
        }
    }

    /// "Location (info), street" with empty parts dropped.
    pub fn address_line(&self) -> String {
        let mut head = self.location_text.clone();
        if !self.location_info.is_empty() {
            if !head.is_empty() {
                head.push(' ');
            }
            head.push_str(&format!("({})", self.location_info));
        }
        match (head.is_empty(), self.location_street.is_empty()) {
            (true, _) => self.location_street.clone(),
            (false, true) => head,
            (false, false) => format!("{}, {}", head, self.location_street),
        }
    }

    pub fn comment_line(&self) -> String {
        normalize_comments(&self.comments)
    }
}

/// Format legend entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatEntry {
    pub key: String,
    pub name: String,
    pub description: String,
    pub lang: String,
}

impl FormatEntry {
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Option<Self> {
        let get = |k: &str| fields.get(k).map(|s| s.trim().to_string()).unwrap_or_default();
        let key = get("key_string");
        if key.is_empty() {
            return None;
        }
        Some(FormatEntry {
            key,
            name: get("name_string"),
            description: get("description_string"),
            lang: get("lang"),
        })
    }

    pub fn from_json(object: &serde_json::Map<String, Value>) -> Option<Self> {
        let fields = object
            .iter()
            .filter_map(|(k, v)| json_scalar(v).map(|s| (k.clone(), s)))
            .collect();
        Self::from_fields(&fields)
    }
}

/// Everything a record source delivers for one document.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub meetings: Vec<Meeting>,
    pub formats: Vec<FormatEntry>,
}

impl Catalog {
    /// Keeps formats in the requested language (or untagged ones), one per code,
    /// sorted by code.
    pub fn normalize_formats(&mut self, lang: &str) {
        let mut seen = std::collections::BTreeSet::new();
        let mut kept: Vec<FormatEntry> = self
            .formats
            .drain(..)
            .filter(|f| f.lang.is_empty() || f.lang.eq_ignore_ascii_case(lang))
            .filter(|f| seen.insert(f.key.clone()))
            .collect();
        kept.sort_by(|a, b| a.key.cmp(&b.key));
        self.formats = kept;
    }
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1".to_string() } else { "0".to_string() }),
        _ => None,
    }
}

pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// "01:30:00" -> 90. Hours may exceed 23.
pub fn parse_duration_minutes(value: &str) -> Option<u32> {
    let mut parts = value.split(':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = match parts.next() {
        Some(m) => m.trim().parse().ok()?,
        None => 0,
    };
    hours.checked_mul(60)?.checked_add(minutes)
}

pub fn format_start_time(t: NaiveTime) -> String {
    if t.hour() == 12 && t.minute() == 0 && t.second() == 0 {
        "Noon".to_string()
    } else if t.hour() == 23 && t.minute() > 45 {
        "Midnight".to_string()
    } else {
        t.format("%-I:%M %p").to_string()
    }
}

pub fn format_duration(total_minutes: u32) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{} hour", hours));
        if hours > 1 {
            out.push('s');
        }
        if minutes > 0 {
            out.push_str(" and ");
        }
    }
    if minutes > 0 {
        out.push_str(&format!("{} minutes", minutes));
    }
    out
}

/// Sorted, trimmed format codes. Closed/open defaults to closed, and any
/// literature-study format implies the book study code.
pub fn arrange_format_codes(raw: &str) -> String {
    let mut codes: Vec<String> = raw
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if codes.is_empty() {
        return String::new();
    }
    let has = |codes: &[String], code: &str| codes.iter().any(|c| c == code);
    if !has(&codes, "C") && !has(&codes, "O") {
        codes.push("C".to_string());
    }
    if !has(&codes, "BK") && ["BT", "IW", "JT", "SG"].iter().any(|c| has(&codes, c)) {
        codes.push("BK".to_string());
    }
    codes.sort();
    codes.join(",")
}

static DOUBLED_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*,").unwrap());

/// Collapses line breaks into commas and strips escape backslashes.
pub fn normalize_comments(raw: &str) -> String {
    let mut text = raw.trim().replace("\r\n", ", ").replace(['\n', '\r'], ", ");
    while DOUBLED_COMMA.is_match(&text) {
        text = DOUBLED_COMMA.replace_all(&text, ",").into_owned();
    }
    text.replace('\\', "").trim().trim_end_matches(',').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_typed_fields_and_keeps_extras() {
        let m = Meeting::from_fields(fields(&[
            ("id_bigint", "42"),
            ("weekday_tinyint", "3"),
            ("start_time", "19:30:00"),
            ("duration_time", "01:00:00"),
            ("meeting_name", "Just For Today"),
            ("location_municipality", " Hempstead "),
            ("location_province", "NY"),
            ("comments", ""),
        ]));
        assert_eq!(m.id, Some(42));
        assert_eq!(m.weekday, Some(3));
        assert_eq!(m.start_seconds(), Some(19 * 3600 + 30 * 60));
        assert_eq!(m.duration_minutes, Some(60));
        assert_eq!(m.municipality, "Hempstead");
        assert_eq!(m.text_field("location_province"), Some("NY"));
        assert_eq!(m.text_field("comments"), None);
    }

    #[test]
    fn out_of_range_weekday_is_absent() {
        let m = Meeting::from_fields(fields(&[("weekday_tinyint", "9")]));
        assert_eq!(m.weekday, None);
    }

    #[test]
    fn json_numbers_become_fields() {
        let value: Value = serde_json::json!({
            "id_bigint": 7,
            "weekday_tinyint": "2",
            "latitude": 40.7,
            "meeting_name": "Noon Group",
        });
        let m = Meeting::from_json(value.as_object().unwrap());
        assert_eq!(m.id, Some(7));
        assert_eq!(m.weekday, Some(2));
        assert_eq!(m.latitude, Some(40.7));
    }

    #[test]
    fn time_labels_handle_noon_and_midnight() {
        let t = |s| parse_time_of_day(s).unwrap();
        assert_eq!(format_start_time(t("12:00:00")), "Noon");
        assert_eq!(format_start_time(t("23:59:00")), "Midnight");
        assert_eq!(format_start_time(t("23:30:00")), "11:30 PM");
        assert_eq!(format_start_time(t("07:05")), "7:05 AM");
    }

    #[test]
    fn duration_note_skips_the_default() {
        let mut m = Meeting::from_fields(fields(&[("start_time", "19:00:00")]));
        m.duration_minutes = Some(90);
        assert_eq!(m.time_line(), "7:00 PM");
        m.duration_minutes = Some(60);
        assert_eq!(m.time_line(), "7:00 PM (1 hour)");
        m.duration_minutes = Some(150);
        assert_eq!(m.time_line(), "7:00 PM (2 hours and 30 minutes)");
        m.duration_minutes = Some(45);
        assert_eq!(m.time_line(), "7:00 PM (45 minutes)");
    }

    #[test]
    fn durations_parse_and_reject_garbage() {
        assert_eq!(parse_duration_minutes("01:30:00"), Some(90));
        assert_eq!(parse_duration_minutes("25:00"), Some(1500));
        assert_eq!(parse_duration_minutes("2"), Some(120));
        assert_eq!(parse_duration_minutes("99999999:00"), None);
        assert_eq!(parse_duration_minutes("71582788:16"), None);
        assert_eq!(parse_duration_minutes("an hour"), None);
    }

    #[test]
    fn format_codes_get_implied_entries() {
        assert_eq!(arrange_format_codes("O, BT"), "BK,BT,O");
        assert_eq!(arrange_format_codes("D,W"), "C,D,W");
        assert_eq!(arrange_format_codes(" , "), "");
    }

    #[test]
    fn comments_are_flattened() {
        assert_eq!(
            normalize_comments("Use side door\n\nWheelchair accessible,\r\nNo smoking"),
            "Use side door, Wheelchair accessible, No smoking"
        );
        assert_eq!(normalize_comments("It\\'s upstairs"), "It's upstairs");
    }

    #[test]
    fn address_line_drops_missing_parts() {
        let mut m = Meeting::default();
        m.location_text = "St. Mary's".into();
        m.location_info = "basement".into();
        m.location_street = "12 Main St".into();
        assert_eq!(m.address_line(), "St. Mary's (basement), 12 Main St");
        m.location_text.clear();
        m.location_info.clear();
        assert_eq!(m.address_line(), "12 Main St");
    }

    #[test]
    fn formats_are_filtered_by_language_and_deduplicated() {
        let entry = |key: &str, lang: &str| FormatEntry {
            key: key.into(),
            name: key.to_lowercase(),
            description: String::new(),
            lang: lang.into(),
        };
        let mut catalog = Catalog {
            meetings: vec![],
            formats: vec![entry("O", "en"), entry("C", "en"), entry("C", "en"), entry("O", "es")],
        };
        catalog.normalize_formats("en");
        let keys: Vec<_> = catalog.formats.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, ["C", "O"]);
    }
}
