// Auxiliary entries scraped from an HTML page: a container element whose
// paragraphs start a new entry at each `class="first"`.

use crate::config::AuxSource;
use crate::http::HttpClient;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p(\s[^>]*)?>(.*?)</p\s*>").unwrap());
static FIRST_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)class\s*=\s*["'][^"']*\bfirst\b"#).unwrap());
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:b|strong)\b[^>]*>(.*?)</(?:b|strong)\s*>").unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").unwrap());
static TAG_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<([A-Za-z][A-Za-z0-9]*)").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct AuxEntry {
    pub name: String,
    pub description: String,
}

/// Fetches and parses the page. Any failure yields no entries.
pub fn fetch_entries(http: &HttpClient, source: &AuxSource) -> Vec<AuxEntry> {
    match http.get_text(&source.url) {
        Ok(html) => {
            let entries = parse_entries(&html, &source.container_id);
            debug!(url = %source.url, entries = entries.len(), "Scraped auxiliary entries");
            entries
        }
        Err(e) => {
            warn!(url = %source.url, error = %e, "Auxiliary page unavailable");
            Vec::new()
        }
    }
}

pub fn parse_entries(html: &str, container_id: &str) -> Vec<AuxEntry> {
    let Some(container) = find_container(html, container_id) else {
        return Vec::new();
    };

    let mut entries: Vec<AuxEntry> = Vec::new();
    let mut details: Vec<String> = Vec::new();

    for caps in PARAGRAPH.captures_iter(container) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let inner = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        if FIRST_CLASS.is_match(attrs) {
            if let Some(last) = entries.last_mut() {
                last.description = details.join("\n");
            }
            details.clear();

            let (name, rest) = match BOLD.captures(inner) {
                Some(bold) => {
                    let name = bold.get(1).map(|m| m.as_str()).unwrap_or("");
                    (html_text(name), html_text(&BOLD.replace(inner, "")))
                }
                None => (html_text(inner), String::new()),
            };
            if !rest.is_empty() {
                details.push(rest);
            }
            entries.push(AuxEntry { name, description: String::new() });
        } else if !entries.is_empty() {
            let text = html_text(inner);
            if !text.is_empty() {
                details.push(text);
            }
        }
    }
    if let Some(last) = entries.last_mut() {
        last.description = details.join("\n");
    }
    entries.retain(|e| !e.name.is_empty());
    entries
}

/// Inner HTML of the element with the given id, matched to its closing tag.
fn find_container<'a>(html: &'a str, id: &str) -> Option<&'a str> {
    let pattern = format!(r#"(?i)\bid\s*=\s*["']{}["']"#, regex::escape(id));
    let id_attr = Regex::new(&pattern).ok()?.find(html)?;
    let open_start = html[..id_attr.start()].rfind('<')?;
    let tag = TAG_NAME.captures(&html[open_start..])?.get(1)?.as_str().to_ascii_lowercase();
    let body_start = open_start + html[open_start..].find('>')? + 1;

    let nested = Regex::new(&format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(&tag))).ok()?;
    let mut depth = 1;
    for m in nested.captures_iter(&html[body_start..]) {
        let whole = m.get(0)?;
        let closing = m.get(1).map(|c| !c.as_str().is_empty()).unwrap_or(false);
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some(&html[body_start..body_start + whole.start()]);
            }
        } else if !whole.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    Some(&html[body_start..])
}

/// Visible text of an HTML fragment, one line per `<br>`.
pub fn html_text(fragment: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(fragment, "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);
    decoded
        .lines()
        .map(|line| SPACES.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&rsquo;", "'")
        .replace("&quot;", "\"")
        .replace("&ndash;", "-")
        .replace("&#8211;", "-")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
