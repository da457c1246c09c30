// Multi-key meeting comparator.

use crate::record::Meeting;
use std::cmp::Ordering;

/// A field the comparator knows how to read from a meeting.
#[derive(Debug, Clone, PartialEq)]
pub enum SortField {
    Weekday,
    StartTime,
    Duration,
    Id,
    SharedGroupId,
    ServiceBody,
    Latitude,
    Longitude,
    /// Any other field, compared case-insensitively as text.
    Text(String),
}

impl SortField {
    /// Maps a server-side field name onto a typed field.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "weekday_tinyint" => SortField::Weekday,
            "start_time" => SortField::StartTime,
            "duration_time" => SortField::Duration,
            "id_bigint" => SortField::Id,
            "shared_group_id_bigint" => SortField::SharedGroupId,
            "service_body_bigint" => SortField::ServiceBody,
            "latitude" => SortField::Latitude,
            "longitude" => SortField::Longitude,
            other => SortField::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// City subsection, falling back to sub-province.
    County,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: SortField,
    pub ascending: bool,
}

impl SortKey {
    pub fn asc(field: SortField) -> Self {
        SortKey { field, ascending: true }
    }

    #[cfg(test)]
    pub fn desc(field: SortField) -> Self {
        SortKey { field, ascending: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
    /// 1 = Sunday .. 7 = Saturday
    pub week_starts: u8,
    pub tie_break: Option<TieBreak>,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            keys: vec![
                SortKey::asc(SortField::Weekday),
                SortKey::asc(SortField::StartTime),
            ],
            week_starts: 1,
            tie_break: None,
        }
    }
}

/// Position of `weekday` in a week that begins on `week_starts`, 1-based.
pub fn rotate_weekday(weekday: u8, week_starts: u8) -> i32 {
    let v = weekday as i32;
    if !(2..=7).contains(&week_starts) {
        return v;
    }
    let shifted = v - week_starts as i32;
    if shifted < 0 {
        shifted + 8
    } else {
        shifted + 1
    }
}

/// Compares two meetings. The first key (in declared order) that differs
/// decides; keys missing on either side are skipped.
pub fn compare(a: &Meeting, b: &Meeting, spec: &SortSpec) -> Ordering {
    for key in &spec.keys {
        let ord = match compare_field(a, b, &key.field, spec.week_starts) {
            Some(ord) => ord,
            None => continue,
        };
        let ord = if key.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    match spec.tie_break {
        Some(TieBreak::County) => match (a.county(), b.county()) {
            (Some(x), Some(y)) => cmp_text(x, y),
            _ => Ordering::Equal,
        },
        None => Ordering::Equal,
    }
}

/// Stable sort by `spec`.
pub fn sort_meetings(meetings: &mut [Meeting], spec: &SortSpec) {
    meetings.sort_by(|a, b| compare(a, b, spec));
}

fn compare_field(a: &Meeting, b: &Meeting, field: &SortField, week_starts: u8) -> Option<Ordering> {
    match field {
        SortField::Weekday => {
            let (x, y) = (a.weekday?, b.weekday?);
            Some(rotate_weekday(x, week_starts).cmp(&rotate_weekday(y, week_starts)))
        }
        SortField::StartTime => Some(a.start_seconds()?.cmp(&b.start_seconds()?)),
        SortField::Duration => Some(a.duration_minutes?.cmp(&b.duration_minutes?)),
        SortField::Id => Some(a.id?.cmp(&b.id?)),
        SortField::SharedGroupId => Some(a.shared_group_id?.cmp(&b.shared_group_id?)),
        SortField::ServiceBody => Some(a.service_body_id?.cmp(&b.service_body_id?)),
        SortField::Latitude => a.latitude?.partial_cmp(&b.latitude?),
        SortField::Longitude => a.longitude?.partial_cmp(&b.longitude?),
        SortField::Text(name) => Some(cmp_text(a.text_field(name)?, b.text_field(name)?)),
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_time_of_day;

    fn meeting(day: u8, time: &str, town: &str) -> Meeting {
        Meeting {
            weekday: Some(day),
            start_time: parse_time_of_day(time),
            municipality: town.to_string(),
            ..Default::default()
        }
    }

    fn town_spec() -> SortSpec {
        SortSpec {
            keys: vec![
                SortKey::asc(SortField::Weekday),
                SortKey::asc(SortField::StartTime),
                SortKey::asc(SortField::from_name("location_municipality")),
            ],
            week_starts: 1,
            tie_break: None,
        }
    }

    #[test]
    fn rotation_moves_week_start_to_front() {
        assert_eq!(rotate_weekday(2, 2), 1);
        assert_eq!(rotate_weekday(7, 2), 6);
        assert_eq!(rotate_weekday(1, 2), 7);
        assert_eq!(rotate_weekday(1, 1), 1);
        assert_eq!(rotate_weekday(4, 9), 4);
    }

    #[test]
    fn earlier_keys_dominate() {
        let spec = town_spec();
        let a = meeting(2, "20:00:00", "Albany");
        let b = meeting(3, "07:00:00", "Albany");
        assert_eq!(compare(&a, &b, &spec), Ordering::Less);

        let c = meeting(2, "19:00:00", "zebra");
        let d = meeting(2, "19:00:00", "Apple");
        assert_eq!(compare(&c, &d, &spec), Ordering::Greater);
    }

    #[test]
    fn monday_start_puts_sunday_last() {
        let mut spec = town_spec();
        spec.week_starts = 2;
        let sunday = meeting(1, "10:00:00", "A");
        let monday = meeting(2, "10:00:00", "A");
        assert_eq!(compare(&sunday, &monday, &spec), Ordering::Greater);
        assert_eq!(compare(&monday, &sunday, &spec), Ordering::Less);
    }

    #[test]
    fn comparison_is_reflexive_and_antisymmetric() {
        let spec = town_spec();
        let rows = [
            meeting(1, "10:00:00", "Bay Shore"),
            meeting(1, "10:00:00", "bay shore"),
            meeting(5, "08:30:00", "Islip"),
            meeting(7, "23:00:00", ""),
        ];
        for a in &rows {
            assert_eq!(compare(a, a, &spec), Ordering::Equal);
            for b in &rows {
                assert_eq!(compare(a, b, &spec), compare(b, a, &spec).reverse());
            }
        }
    }

    #[test]
    fn blank_fields_are_skipped() {
        let spec = SortSpec {
            keys: vec![
                SortKey::asc(SortField::from_name("location_municipality")),
                SortKey::asc(SortField::StartTime),
            ],
            ..Default::default()
        };
        let a = meeting(1, "09:00:00", "");
        let b = meeting(1, "08:00:00", "Zion");
        assert_eq!(compare(&a, &b, &spec), Ordering::Greater);
    }

    #[test]
    fn descending_key_only_flips_itself() {
        let spec = SortSpec {
            keys: vec![
                SortKey::desc(SortField::Weekday),
                SortKey::asc(SortField::StartTime),
            ],
            ..Default::default()
        };
        let mut rows = vec![
            meeting(1, "09:00:00", ""),
            meeting(3, "12:00:00", ""),
            meeting(3, "08:00:00", ""),
        ];
        sort_meetings(&mut rows, &spec);
        let order: Vec<_> = rows.iter().map(|m| (m.weekday, m.time_label())).collect();
        assert_eq!(
            order,
            [
                (Some(3), "8:00 AM".to_string()),
                (Some(3), "Noon".to_string()),
                (Some(1), "9:00 AM".to_string()),
            ]
        );
    }

    #[test]
    fn county_tie_break_applies_only_on_full_tie() {
        let mut spec = town_spec();
        spec.tie_break = Some(TieBreak::County);
        let mut a = meeting(2, "19:00:00", "Bronx");
        a.city_subsection = "Queens".into();
        let mut b = meeting(2, "19:00:00", "Bronx");
        b.sub_province = "Bronx".into();
        assert_eq!(compare(&a, &b, &spec), Ordering::Greater);

        let c = meeting(1, "19:00:00", "Bronx");
        assert_eq!(compare(&c, &a, &spec), Ordering::Less);
    }

    #[test]
    fn numeric_and_geo_fields() {
        let spec = SortSpec {
            keys: vec![
                SortKey::asc(SortField::from_name("latitude")),
                SortKey::asc(SortField::from_name("id_bigint")),
            ],
            ..Default::default()
        };
        let a = Meeting { latitude: Some(40.5), id: Some(9), ..Default::default() };
        let b = Meeting { latitude: Some(40.5), id: Some(10), ..Default::default() };
        let c = Meeting { latitude: Some(39.9), id: Some(11), ..Default::default() };
        assert_eq!(compare(&a, &b, &spec), Ordering::Less);
        assert_eq!(compare(&c, &a, &spec), Ordering::Less);
    }
}
