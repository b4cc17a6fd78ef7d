//! Parsing of caption metadata and caption track markup.

use crate::transcript::Segment;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// One caption track listed in the player metadata.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    /// URL returning the track markup.
    pub base_url: String,
    /// Language code such as "de" or "en-GB".
    pub language_code: String,
    /// "asr" for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    name: Option<serde_json::Value>,
}

impl CaptionTrack {
    pub fn new(base_url: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            language_code: language_code.into(),
            kind: None,
            name: None,
        }
    }

    /// Human-readable track name, when the metadata carries one.
    pub fn display_name(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        if let Some(simple) = name["simpleText"].as_str() {
            return Some(simple.to_string());
        }
        let runs = name["runs"].as_array()?;
        Some(
            runs.iter()
                .filter_map(|r| r["text"].as_str())
                .collect::<String>(),
        )
    }

    /// Whether the track was generated by speech recognition.
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Language family of a code: "de-AT" -> "de".
fn language_family(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// Select a track: exact language, then same family, then English, then the first one.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], preferred: &str) -> Option<&'a CaptionTrack> {
    let preferred = preferred.trim();
    let family = language_family(preferred).to_lowercase();

    tracks
        .iter()
        .find(|t| t.language_code.eq_ignore_ascii_case(preferred))
        .or_else(|| {
            tracks
                .iter()
                .find(|t| !family.is_empty() && language_family(&t.language_code).eq_ignore_ascii_case(&family))
        })
        .or_else(|| tracks.iter().find(|t| t.language_code.eq_ignore_ascii_case("en")))
        .or_else(|| tracks.iter().find(|t| language_family(&t.language_code).eq_ignore_ascii_case("en")))
        .or_else(|| tracks.first())
}

/// Locate the `ytInitialPlayerResponse` object literal in a watch page.
pub fn extract_player_response(html: &str) -> Option<serde_json::Value> {
    const MARKER: &str = "ytInitialPlayerResponse";

    let mut search_from = 0;
    while let Some(found) = html[search_from..].find(MARKER) {
        let after_marker = search_from + found + MARKER.len();
        let rest = &html[after_marker..];
        let trimmed = rest.trim_start();

        if let Some(assigned) = trimmed.strip_prefix('=') {
            let assigned = assigned.trim_start();
            if assigned.starts_with('{') {
                let offset = html.len() - assigned.len();
                if let Some(object) = balanced_object(&html[offset..]) {
                    if let Ok(value) = serde_json::from_str(object) {
                        return Some(value);
                    }
                }
            }
        }
        search_from = after_marker;
    }

    None
}

/// Slice of `input` (which starts with `{`) up to its matching closing brace.
fn balanced_object(input: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&input[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Caption tracks listed in a player response.
///
/// Returns `None` when the response has no caption metadata at all, and an
/// empty list when the metadata exists without tracks.
pub fn caption_tracks(player_response: &serde_json::Value) -> Option<Vec<CaptionTrack>> {
    let captions = player_response.get("captions")?;
    let tracks = &captions["playerCaptionsTracklistRenderer"]["captionTracks"];

    Some(
        tracks
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|t| serde_json::from_value::<CaptionTrack>(t.clone()).ok())
                    .collect()
            })
            .unwrap_or_default(),
    )
}

fn text_element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<text([^>]*)>([^<]*)</text>").expect("valid caption regex"))
}

fn start_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"start="([\d.]+)""#).expect("valid start regex"))
}

fn dur_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"dur="([\d.]+)""#).expect("valid dur regex"))
}

fn numeric_entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#(x[0-9a-fA-F]+|\d+);").expect("valid entity regex"))
}

fn attribute(re: &Regex, attrs: &str) -> f64 {
    re.captures(attrs)
        .and_then(|c| c[1].parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Unescape the XML entities used by caption tracks.
///
/// `&amp;` is replaced first so doubly escaped sequences such as `&amp;#39;`
/// come out as plain characters.
pub fn unescape_xml(input: &str) -> String {
    let named = input
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    numeric_entity_regex()
        .replace_all(&named, |caps: &regex::Captures| {
            let raw = &caps[1];
            let code = match raw.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => raw.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Parse `<text start=".." dur="..">content</text>` elements into segments.
///
/// Elements with blank content are skipped; missing timing attributes read as zero.
pub fn parse_caption_xml(xml: &str) -> Vec<Segment> {
    text_element_regex()
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let content = caps.get(2).map_or("", |m| m.as_str());

            if content.trim().is_empty() {
                return None;
            }

            Some(Segment::new(
                unescape_xml(content),
                attribute(start_regex(), attrs),
                attribute(dur_regex(), attrs),
            ))
        })
        .collect()
}
