//! CSV column mappings and dialect options.

use crate::SourceDatabase;
use std::collections::HashMap;

/// Default header mappings for common CSV column names
const DEFAULT_HEADERS: &[(&str, &[&str])] = &[
    ("title", &["title", "article title", "document title"]),
    ("authors", &["author", "authors", "creator", "creators"]),
    ("affiliations", &["affiliation", "affiliations", "author affiliations"]),
    ("source", &["journal", "source title", "publication title", "venue"]),
    ("year", &["year", "publication year", "pub year"]),
    ("doi", &["doi", "digital object identifier"]),
    ("abstract", &["abstract", "summary"]),
    ("keywords", &["keywords", "tags", "author keywords"]),
    ("language", &["language", "lang"]),
    ("publisher", &["publisher"]),
    ("url", &["url", "link"]),
    ("citation_count", &["cited by", "citation count"]),
];

/// Column names of an IEEE Xplore export.
const IEEE_HEADERS: &[(&str, &[&str])] = &[
    ("title", &["Document Title"]),
    ("authors", &["Authors"]),
    ("affiliations", &["Author Affiliations"]),
    ("source", &["Publication Title"]),
    ("year", &["Publication Year"]),
    ("doi", &["DOI"]),
    ("abstract", &["Abstract"]),
    ("keywords", &["Author Keywords", "IEEE Terms"]),
    ("publisher", &["Publisher"]),
    ("url", &["PDF Link"]),
    ("citation_count", &["Article Citation Count"]),
    ("issn", &["ISSN"]),
];

/// Column names of a SpringerLink search export.
const SPRINGER_HEADERS: &[(&str, &[&str])] = &[
    ("title", &["Item Title"]),
    ("authors", &["Authors"]),
    ("source", &["Publication Title", "Book Series Title"]),
    ("year", &["Publication Year"]),
    ("doi", &["Item DOI"]),
    ("url", &["URL"]),
    ("type", &["Content Type"]),
];

/// Configuration for CSV parsing with custom header mappings.
///
/// Allows customization of how CSV columns are mapped to document fields,
/// along with general CSV parsing options like delimiters and header presence.
///
/// # Examples
///
/// ```
/// use litreview::csv::CsvConfig;
///
/// let mut config = CsvConfig::new();
/// config.set_header_mapping("title", vec!["Article Name".to_string()]);
/// config.set_delimiter(b';');
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Custom header mappings for CSV columns
    header_map: HashMap<String, Vec<String>>,
    /// Delimiter to use for parsing the CSV
    pub(crate) delimiter: u8,
    /// Whether the CSV has headers
    pub(crate) has_header: bool,
    /// Whether to trim whitespace around values
    pub(crate) trim: bool,
    /// Whether records may have more fields than headers
    pub(crate) flexible: bool,
    /// Whether the authors column separates names with `;`
    pub(crate) split_authors: bool,
    /// Database tag stored on every parsed document
    pub(crate) database: Option<SourceDatabase>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvConfig {
    /// Creates a new CSV configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::with_headers(DEFAULT_HEADERS, None)
    }

    /// Column mapping of IEEE Xplore "Export to CSV".
    #[must_use]
    pub fn ieee() -> Self {
        let mut config = Self::with_headers(IEEE_HEADERS, Some(SourceDatabase::Ieee));
        config.flexible = true;
        config
    }

    /// Column mapping of the SpringerLink search result CSV.
    ///
    /// Springer concatenates author names without any separator, so the
    /// authors column is not split into individual names.
    #[must_use]
    pub fn springer() -> Self {
        let mut config = Self::with_headers(SPRINGER_HEADERS, Some(SourceDatabase::Springer));
        config.split_authors = false;
        config
    }

    fn with_headers(headers: &[(&str, &[&str])], database: Option<SourceDatabase>) -> Self {
        let header_map = headers
            .iter()
            .map(|(field, aliases)| {
                (
                    field.to_string(),
                    aliases.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();

        Self {
            header_map,
            delimiter: b',',
            has_header: true,
            trim: true,
            flexible: false,
            split_authors: true,
            database,
        }
    }

    /// Sets a custom header mapping
    pub fn set_header_mapping(&mut self, field: &str, aliases: Vec<String>) -> &mut Self {
        self.header_map.insert(field.to_string(), aliases);
        self
    }

    /// Sets the delimiter character
    pub fn set_delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether the CSV has headers
    pub fn set_has_header(&mut self, has_header: bool) -> &mut Self {
        self.has_header = has_header;
        self
    }

    /// Sets whether values are trimmed
    pub fn set_trim(&mut self, trim: bool) -> &mut Self {
        self.trim = trim;
        self
    }

    /// Sets whether records longer than the header row are accepted
    pub fn set_flexible(&mut self, flexible: bool) -> &mut Self {
        self.flexible = flexible;
        self
    }

    /// Finds the field name for a given header
    pub(crate) fn get_field_for_header(&self, header: &str) -> Option<&str> {
        let header_lower = header.trim().to_lowercase();
        self.header_map
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a.to_lowercase() == header_lower))
            .map(|(field, _)| field.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CsvConfig::ieee(), "Document Title", Some("title"))]
    #[case(CsvConfig::ieee(), "IEEE Terms", Some("keywords"))]
    #[case(CsvConfig::ieee(), "Mesh_Terms", None)]
    #[case(CsvConfig::springer(), "Item DOI", Some("doi"))]
    #[case(CsvConfig::springer(), "book series title", Some("source"))]
    #[case(CsvConfig::new(), " Publication Year ", Some("year"))]
    fn test_header_lookup(
        #[case] config: CsvConfig,
        #[case] header: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(config.get_field_for_header(header), expected);
    }

    #[test]
    fn test_custom_mapping_overrides_default() {
        let mut config = CsvConfig::new();
        config.set_header_mapping("title", vec!["Article Name".to_string()]);
        assert_eq!(config.get_field_for_header("article name"), Some("title"));
        assert_eq!(config.get_field_for_header("title"), None);
    }
}
