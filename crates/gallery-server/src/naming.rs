//! Display-name extraction from video file names.
//!
//! Everything here is a pure string function; no filesystem access.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+p|\d+k|\d+m|4k|fhd|uhd|hd)").expect("quality regex")
});

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+min|\d+m|\d+s|\d+:\d+)").expect("duration regex")
});

/// Presentation fields derived from a file name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Title-cased name with quality/duration markers removed. May be empty.
    pub title: String,
    /// First quality marker, uppercased.
    pub quality: Option<String>,
    /// First duration marker, as written.
    pub duration_label: Option<String>,
}

/// Derive a [`DisplayInfo`] from a file name such as `my_clip-1080p.mp4`.
pub fn extract(file_name: &str) -> DisplayInfo {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let quality_spans = quality_matches(stem);
    let quality = quality_spans
        .first()
        .map(|&(start, end)| stem[start..end].to_uppercase());
    let duration_label = DURATION_RE.find(stem).map(|m| m.as_str().to_string());

    let without_quality = remove_spans(stem, &quality_spans);
    let cleaned = DURATION_RE.replace_all(&without_quality, "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    DisplayInfo {
        title: format_name(&collapsed),
        quality,
        duration_label,
    }
}

/// Title-case a raw name: `_` and `-` become spaces, each word is capitalized.
pub fn format_name(raw: &str) -> String {
    raw.replace(['_', '-'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Quality marker spans. A `<digits>m` hit that is really the start of a
/// `<digits>min` duration token is not a quality marker.
fn quality_matches(stem: &str) -> Vec<(usize, usize)> {
    QUALITY_RE
        .find_iter(stem)
        .filter(|m| {
            let is_minutes = m.as_str().to_ascii_lowercase().ends_with('m')
                && stem[m.end()..].to_ascii_lowercase().starts_with("in");
            !is_minutes
        })
        .map(|m| (m.start(), m.end()))
        .collect()
}

fn remove_spans(text: &str, spans: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(start, end) in spans {
        out.push_str(&text[cursor..start]);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}
