use regex::Regex;
use std::sync::LazyLock;

static DOI_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:dx\.)?doi\.org/(.+)$").unwrap());

static YEAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[5-9]\d{2}|2\d{3})\b").unwrap());

static POSTAL_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{0,2}-?\d[\d\- ]*\b").unwrap());

/// Country spellings found in exports, mapped to one canonical name.
const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("usa", "United States"),
    ("u.s.a.", "United States"),
    ("united states of america", "United States"),
    ("uk", "United Kingdom"),
    ("u.k.", "United Kingdom"),
    ("england", "United Kingdom"),
    ("scotland", "United Kingdom"),
    ("p.r. china", "China"),
    ("pr china", "China"),
    ("people's republic of china", "China"),
    ("republic of korea", "South Korea"),
    ("korea", "South Korea"),
    ("the netherlands", "Netherlands"),
];

/// Formats a DOI string by removing URL prefixes and [doi] suffixes
///
/// # Arguments
///
/// * `doi_str` - The DOI string to format
pub fn format_doi(doi_str: &str) -> Option<String> {
    if doi_str.is_empty() {
        return None;
    }
    let doi = doi_str
        .trim()
        .trim_end_matches("[doi]")
        .trim()
        .replace(|c: char| c.is_whitespace(), "")
        .to_lowercase();

    // A DOI starts at the first "10." prefix
    let pos = doi.find("10.")?;
    let doi = &doi[pos..];
    match DOI_URL_REGEX.captures(doi) {
        Some(captures) => Some(captures[1].to_string()),
        None => Some(doi.to_string()),
    }
}

/// Helper function to parse author names in various formats
pub fn parse_author_name(name: &str) -> (String, String) {
    // "Lastname, Firstname" keeps the comma split; "Firstname Lastname" puts
    // the last word first.
    if name.contains(',') {
        let mut parts = name.splitn(2, ',');
        let family = parts.next().unwrap_or_default().trim().to_string();
        let given = parts.next().unwrap_or_default().trim().to_string();
        return (family, given);
    }

    let words: Vec<&str> = name.split_whitespace().collect();
    match words.as_slice() {
        [] => (String::new(), String::new()),
        [single] => (single.to_string(), String::new()),
        [given @ .., family] => (family.to_string(), given.join(" ")),
    }
}

/// Extracts the first plausible four digit year from a date-like string.
pub fn parse_year(value: &str) -> Option<i32> {
    YEAR_REGEX
        .captures(value.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// Removes a UTF-8 byte-order mark, which IEEE exports start with.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Derives a country from an affiliation address: the last comma-separated
/// segment with postal codes removed.
pub fn country_from_affiliation(affiliation: &str) -> Option<String> {
    let last = affiliation.rsplit(',').next()?.trim();
    let cleaned = POSTAL_CODE_REGEX.replace_all(last, "");
    let cleaned = cleaned.trim().trim_end_matches('.').trim();
    if cleaned.is_empty() || cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let lower = cleaned.to_lowercase();
    let canonical = COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| cleaned.to_string());
    Some(canonical)
}

/// Splits a `;`-separated export cell into trimmed, non-empty values.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(';').map(str::trim).filter(|s| !s.is_empty())
}
