// Record sources: the BMLT JSON and legacy CSV endpoints, local files, and
// the discovery listings used by the `servers` and `service-bodies` commands.

use crate::config::{SearchQuery, SourceFormat, SourceKind};
use crate::error::AppError;
use crate::http::{encode_query, HttpClient};
use crate::record::{Catalog, FormatEntry, Meeting};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const AGGREGATOR_SERVER_LIST: &str =
    "https://raw.githubusercontent.com/bmlt-enabled/aggregator/refs/heads/main/serverList.json";

/// Anything that can deliver the meetings and formats for a query.
pub trait RecordSource {
    fn fetch(&self, query: &SearchQuery) -> Result<Catalog, AppError>;
}

/// Picks the adapter for the resolved settings.
pub fn open_source(
    kind: &SourceKind,
    format: SourceFormat,
    http: &HttpClient,
) -> Box<dyn RecordSource> {
    match (kind, format) {
        (SourceKind::File(path), _) => Box::new(FileSource { path: path.clone() }),
        (SourceKind::Remote { root }, SourceFormat::Json) => Box::new(JsonSource {
            root: root.clone(),
            http: http.clone(),
        }),
        (SourceKind::Remote { root }, SourceFormat::Csv) => Box::new(CsvSource {
            root: root.clone(),
            http: http.clone(),
        }),
    }
}

fn search_params(query: &SearchQuery) -> String {
    let mut params: Vec<String> = query
        .services
        .iter()
        .map(|id| format!("services%5B%5D={}", id))
        .collect();
    params.push(format!("recursive={}", if query.recursive { 1 } else { 0 }));
    params.push("sort_key=time".to_string());
    params.push(format!("lang_enum={}", encode_query(&query.language)));
    params.join("&")
}

// ============================================================================
// JSON
// ============================================================================

pub struct JsonSource {
    pub root: String,
    pub http: HttpClient,
}

impl JsonSource {
    pub fn search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}client_interface/json/?switcher=GetSearchResults&{}&get_used_formats=1",
            self.root,
            search_params(query)
        )
    }
}

impl RecordSource for JsonSource {
    fn fetch(&self, query: &SearchQuery) -> Result<Catalog, AppError> {
        let url = self.search_url(query);
        let body: Value = self.http.get_json(&url).map_err(AppError::Upstream)?;
        let catalog = parse_search_response(&body)?;
        info!(
            meetings = catalog.meetings.len(),
            formats = catalog.formats.len(),
            "Fetched meetings"
        );
        Ok(catalog)
    }
}

/// Accepts `{"meetings": [...], "formats": [...]}` or a bare meeting array.
pub fn parse_search_response(body: &Value) -> Result<Catalog, AppError> {
    let (meetings, formats) = match body {
        Value::Array(rows) => (rows.as_slice(), &[][..]),
        Value::Object(map) => {
            let meetings = match map.get("meetings") {
                Some(Value::Array(rows)) => rows.as_slice(),
                Some(_) => {
                    return Err(AppError::Upstream("\"meetings\" is not an array".to_string()))
                }
                None => &[][..],
            };
            let formats = match map.get("formats") {
                Some(Value::Array(rows)) => rows.as_slice(),
                _ => &[][..],
            };
            (meetings, formats)
        }
        _ => {
            return Err(AppError::Upstream(
                "Unexpected search response shape".to_string(),
            ))
        }
    };
    Ok(Catalog {
        meetings: meetings
            .iter()
            .filter_map(Value::as_object)
            .map(Meeting::from_json)
            .collect(),
        formats: formats
            .iter()
            .filter_map(Value::as_object)
            .filter_map(FormatEntry::from_json)
            .collect(),
    })
}

// ============================================================================
// CSV
// ============================================================================

pub struct CsvSource {
    pub root: String,
    pub http: HttpClient,
}

impl CsvSource {
    fn rows(&self, url: &str) -> Result<Vec<BTreeMap<String, String>>, AppError> {
        let text = self.http.get_text(url).map_err(AppError::Upstream)?;
        parse_csv_rows(&text)
    }
}

impl RecordSource for CsvSource {
    fn fetch(&self, query: &SearchQuery) -> Result<Catalog, AppError> {
        let search = format!(
            "{}client_interface/csv/?switcher=GetSearchResults&{}",
            self.root,
            search_params(query)
        );
        let formats = format!(
            "{}client_interface/csv/?switcher=GetFormats&lang_enum={}",
            self.root,
            encode_query(&query.language)
        );
        let meetings: Vec<Meeting> = self.rows(&search)?.into_iter().map(Meeting::from_fields).collect();
        let formats: Vec<FormatEntry> = self
            .rows(&formats)?
            .iter()
            .filter_map(FormatEntry::from_fields)
            .collect();
        info!(meetings = meetings.len(), formats = formats.len(), "Fetched meetings (csv)");
        Ok(Catalog { meetings, formats })
    }
}

/// Header row plus quoted records; an empty body means no rows.
pub fn parse_csv_rows(text: &str) -> Result<Vec<BTreeMap<String, String>>, AppError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| AppError::Upstream(format!("Invalid CSV header: {}", e)))?
        .clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::Upstream(format!("Invalid CSV row: {}", e)))?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.trim().to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

// ============================================================================
// Local file
// ============================================================================

/// A saved search response. Meetings outside the requested service bodies are
/// dropped; rows without a service body are kept.
pub struct FileSource {
    pub path: PathBuf,
}

impl RecordSource for FileSource {
    fn fetch(&self, query: &SearchQuery) -> Result<Catalog, AppError> {
        let mut catalog = read_catalog_file(&self.path)?;
        let before = catalog.meetings.len();
        catalog.meetings.retain(|m| match m.service_body_id {
            Some(id) => query.services.contains(&id),
            None => true,
        });
        debug!(
            path = %self.path.display(),
            kept = catalog.meetings.len(),
            dropped = before - catalog.meetings.len(),
            "Loaded meetings from file"
        );
        Ok(catalog)
    }
}

fn read_catalog_file(path: &Path) -> Result<Catalog, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        let meetings = parse_csv_rows(&content)?.into_iter().map(Meeting::from_fields).collect();
        return Ok(Catalog { meetings, formats: Vec::new() });
    }
    let body: Value = serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("Invalid records file {}: {}", path.display(), e)))?;
    parse_search_response(&body)
}

// ============================================================================
// Discovery
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerEntry {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceBody {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_id: Option<i64>,
    pub description: String,
}

pub fn fetch_server_list(http: &HttpClient, url: &str) -> Result<Vec<ServerEntry>, AppError> {
    let body: Value = http.get_json(url).map_err(AppError::Upstream)?;
    parse_server_list(&body)
}

pub fn parse_server_list(body: &Value) -> Result<Vec<ServerEntry>, AppError> {
    let rows = body
        .as_array()
        .ok_or_else(|| AppError::Upstream("Server list is not an array".to_string()))?;
    let mut servers: Vec<ServerEntry> = rows
        .iter()
        .filter_map(Value::as_object)
        .map(|row| ServerEntry {
            id: scalar(row.get("id")).unwrap_or_default(),
            name: scalar(row.get("name")).unwrap_or_else(|| "Unknown Server".to_string()),
            url: scalar(row.get("url")).unwrap_or_default(),
        })
        .collect();
    servers.sort_by_key(|s| s.name.to_lowercase());
    Ok(servers)
}

pub fn fetch_service_bodies(http: &HttpClient, root: &str) -> Result<Vec<ServiceBody>, AppError> {
    let url = format!("{}client_interface/json/?switcher=GetServiceBodies", root);
    let body: Value = http.get_json(&url).map_err(AppError::Upstream)?;
    parse_service_bodies(&body)
}

pub fn parse_service_bodies(body: &Value) -> Result<Vec<ServiceBody>, AppError> {
    let rows = body
        .as_array()
        .ok_or_else(|| AppError::Upstream("Service body list is not an array".to_string()))?;
    let mut bodies: Vec<ServiceBody> = rows
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|row| {
            let id = scalar(row.get("id"))?.parse().ok()?;
            Some(ServiceBody {
                id,
                name: scalar(row.get("name")).unwrap_or_default(),
                kind: scalar(row.get("type"))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "AS".to_string()),
                parent_id: scalar(row.get("parent_id"))
                    .and_then(|p| p.parse().ok())
                    .filter(|p: &i64| *p > 0),
                description: scalar(row.get("description")).unwrap_or_default(),
            })
        })
        .collect();
    bodies.sort_by_key(|b| b.name.to_lowercase());
    Ok(bodies)
}

fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn query(services: Vec<i64>) -> SearchQuery {
        SearchQuery { services, recursive: true, language: "en".to_string() }
    }

    #[test]
    fn search_url_lists_every_service_body() {
        let source = JsonSource {
            root: "https://bmlt.example.org/main_server/".to_string(),
            http: HttpClient::new(Duration::from_secs(1)),
        };
        assert_eq!(
            source.search_url(&query(vec![3, 7])),
            "https://bmlt.example.org/main_server/client_interface/json/?switcher=GetSearchResults\
             &services%5B%5D=3&services%5B%5D=7&recursive=1&sort_key=time&lang_enum=en&get_used_formats=1"
        );
    }

    #[test]
    fn search_response_with_formats() {
        let body = json!({
            "meetings": [
                {"id_bigint": "5", "weekday_tinyint": "2", "start_time": "19:30:00",
                 "meeting_name": "Hope", "formats": "O,D"},
                "junk"
            ],
            "formats": [
                {"key_string": "O", "name_string": "Open", "lang": "en"},
                {"name_string": "no key"}
            ]
        });
        let catalog = parse_search_response(&body).unwrap();
        assert_eq!(catalog.meetings.len(), 1);
        assert_eq!(catalog.meetings[0].id, Some(5));
        assert_eq!(catalog.meetings[0].weekday, Some(2));
        assert_eq!(catalog.formats.len(), 1);
        assert_eq!(catalog.formats[0].name, "Open");
    }

    #[test]
    fn bare_arrays_are_meetings_only() {
        let catalog = parse_search_response(&json!([{"meeting_name": "A"}])).unwrap();
        assert_eq!(catalog.meetings.len(), 1);
        assert!(catalog.formats.is_empty());
        assert!(parse_search_response(&json!("nope")).is_err());
        assert!(parse_search_response(&json!({"meetings": 3})).is_err());
    }

    #[test]
    fn csv_rows_keep_quoted_commas() {
        let text = "\"id_bigint\",\"meeting_name\",\"location_street\"\n\
                    \"1\",\"Hope\",\"12 Main St, Suite 4\"\n";
        let rows = parse_csv_rows(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["location_street"], "12 Main St, Suite 4");
        assert!(parse_csv_rows("  ").unwrap().is_empty());
    }

    #[test]
    fn file_source_filters_service_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meetings.json");
        let body = json!({"meetings": [
            {"meeting_name": "A", "service_body_bigint": "1"},
            {"meeting_name": "B", "service_body_bigint": "2"},
            {"meeting_name": "C"}
        ]});
        std::fs::write(&path, body.to_string()).unwrap();
        let catalog = FileSource { path }.fetch(&query(vec![2])).unwrap();
        let names: Vec<&str> = catalog.meetings.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["B", "C"]);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let source = FileSource { path: PathBuf::from("/nonexistent/meetings.json") };
        assert!(matches!(source.fetch(&query(vec![1])), Err(AppError::Config(_))));
    }

    #[test]
    fn server_list_sorted_by_name() {
        let body = json!([
            {"id": "2", "name": "zeta", "url": "https://z.org/main_server/"},
            {"id": 1, "name": "Alpha", "url": "https://a.org/main_server/"},
            {"id": "3", "url": "https://u.org/"}
        ]);
        let servers = parse_server_list(&body).unwrap();
        let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Unknown Server", "zeta"]);
        assert_eq!(servers[0].id, "1");
    }

    #[test]
    fn service_bodies_default_type_and_parent() {
        let body = json!([
            {"id": "12", "name": "suffolk", "type": "", "parent_id": "0"},
            {"id": "4", "name": "Nassau", "type": "RS", "parent_id": "1", "description": "Region"},
            {"name": "no id"}
        ]);
        let bodies = parse_service_bodies(&body).unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].name, "Nassau");
        assert_eq!(bodies[0].parent_id, Some(1));
        assert_eq!(bodies[1].kind, "AS");
        assert_eq!(bodies[1].parent_id, None);
        let json = serde_json::to_value(&bodies[0]).unwrap();
        assert_eq!(json["type"], "RS");
    }
}
