//! CSV format data structures.
//!
//! This module defines intermediate data structures used during CSV parsing.

use crate::csv::config::CsvConfig;
use crate::utils::{format_doi, parse_year, split_list};
use crate::{Affiliation, Author, Document, ParseError};
use csv::StringRecord;
use std::collections::HashMap;

/// Structured raw data from one CSV record.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawCsvData {
    /// Single-valued fields; the first non-empty column mapped to a field wins
    pub(crate) fields: HashMap<String, String>,
    pub(crate) authors: Vec<String>,
    pub(crate) affiliations: Vec<String>,
    pub(crate) keywords: Vec<String>,
    pub(crate) urls: Vec<String>,
    /// Columns without a mapping, stored under their header
    pub(crate) unmapped: HashMap<String, Vec<String>>,
    /// Line number for error reporting
    pub(crate) line_number: usize,
}

impl RawCsvData {
    /// Create a new RawCsvData from a CSV record and headers.
    pub(crate) fn from_record(
        headers: &[String],
        record: &StringRecord,
        config: &CsvConfig,
        line_number: usize,
    ) -> Result<Self, ParseError> {
        let mut raw = RawCsvData {
            line_number,
            ..Default::default()
        };

        if record.len() > headers.len() && !config.flexible {
            return Err(ParseError::MalformedInput {
                message: format!(
                    "Record has more fields ({}) than headers ({})",
                    record.len(),
                    headers.len()
                ),
                line: line_number,
            });
        }

        for (header, value) in headers.iter().zip(record.iter()) {
            let value = if config.trim { value.trim() } else { value };
            if value.is_empty() {
                continue;
            }

            match config.get_field_for_header(header) {
                Some("authors") if config.split_authors => {
                    raw.authors.extend(split_list(value).map(String::from));
                }
                Some("affiliations") => {
                    raw.affiliations.extend(split_list(value).map(String::from));
                }
                Some("keywords") => {
                    raw.keywords.extend(split_list(value).map(String::from));
                }
                Some("url") => raw.urls.push(value.to_string()),
                Some(field) => {
                    raw.fields
                        .entry(field.to_string())
                        .or_insert_with(|| value.to_string());
                }
                None => {
                    raw.unmapped
                        .entry(header.clone())
                        .or_default()
                        .push(value.to_string());
                }
            }
        }

        Ok(raw)
    }

    /// Get a field value by name.
    pub(crate) fn get_field(&self, field: &str) -> Option<&String> {
        self.fields.get(field)
    }

    /// Check if the record has any meaningful content.
    pub(crate) fn has_content(&self) -> bool {
        !self.fields.is_empty() || !self.authors.is_empty()
    }

    /// Authors with affiliations attached in column order.
    ///
    /// Exports list one affiliation per author; a single affiliation is shared
    /// by all authors.
    fn build_authors(&self) -> Vec<Author> {
        let shared = match self.affiliations.as_slice() {
            [only] if self.authors.len() > 1 => Some(only),
            _ => None,
        };

        self.authors
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut author = Author::from_name(name);
                author.affiliation = shared
                    .or_else(|| self.affiliations.get(i))
                    .filter(|a| !a.eq_ignore_ascii_case("NA"))
                    .map(|a| Affiliation::from_name(a));
                author
            })
            .collect()
    }

    /// Convert to a Document using the configuration's database tag.
    pub(crate) fn into_document(self, config: &CsvConfig) -> Result<Document, ParseError> {
        let title = self
            .get_field("title")
            .cloned()
            .ok_or_else(|| {
                ParseError::MissingField(format!("title (line {})", self.line_number))
            })?;

        let authors = self.build_authors();
        let mut fields = self.fields;
        let mut extra_fields = self.unmapped;
        if let Some(kind) = fields.remove("type") {
            extra_fields.insert("type".to_string(), vec![kind]);
        }
        if let Some(issn) = fields.remove("issn") {
            extra_fields.insert("issn".to_string(), vec![issn]);
        }
        if !config.split_authors {
            if let Some(raw_authors) = fields.remove("authors") {
                extra_fields.insert("authors".to_string(), vec![raw_authors]);
            }
        }

        Ok(Document {
            id: nanoid::nanoid!(),
            title,
            authors,
            year: fields.get("year").and_then(|y| parse_year(y)),
            source: fields.remove("source"),
            publisher: fields.remove("publisher"),
            language: fields.remove("language"),
            doi: fields.get("doi").and_then(|d| format_doi(d)),
            abstract_text: fields.remove("abstract"),
            keywords: self.keywords,
            urls: self.urls,
            citation_count: fields
                .get("citation_count")
                .and_then(|c| c.trim().parse().ok()),
            database: config.database,
            extra_fields,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create_test_record(fields: &[&str]) -> StringRecord {
        let mut record = StringRecord::new();
        for field in fields {
            record.push_field(field);
        }
        record
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_record_basic() {
        let record = create_test_record(&["Test Article", "Smith, John"]);
        let config = CsvConfig::new();

        let raw =
            RawCsvData::from_record(&headers(&["Title", "Author"]), &record, &config, 1).unwrap();

        assert_eq!(raw.get_field("title"), Some(&"Test Article".to_string()));
        assert_eq!(raw.authors, vec!["Smith, John"]);
        assert!(raw.has_content());
    }

    #[test]
    fn test_affiliations_follow_author_order() {
        let record = create_test_record(&[
            "A Paper",
            "J. Smith; A. Doe",
            "MIT, Cambridge, MA, USA; University of Tokyo, Tokyo, Japan",
        ]);
        let config = CsvConfig::ieee();
        let raw = RawCsvData::from_record(
            &headers(&["Document Title", "Authors", "Author Affiliations"]),
            &record,
            &config,
            2,
        )
        .unwrap();
        let document = raw.into_document(&config).unwrap();

        assert_eq!(document.authors.len(), 2);
        assert_eq!(document.authors[1].family_name, "Doe");
        let countries: Vec<_> = document
            .affiliations()
            .filter_map(|a| a.country.as_deref())
            .collect();
        assert_eq!(countries, vec!["United States", "Japan"]);
    }

    #[test]
    fn test_too_many_fields_strict() {
        let record = create_test_record(&["Test Article", "Extra Field"]);
        let config = CsvConfig::new();

        let result = RawCsvData::from_record(&headers(&["Title"]), &record, &config, 1);
        assert!(matches!(
            result,
            Err(ParseError::MalformedInput { line: 1, .. })
        ));
    }

    #[test]
    fn test_too_many_fields_flexible() {
        let record = create_test_record(&["Test Article", "Extra Field"]);
        let mut config = CsvConfig::new();
        config.set_flexible(true);

        let raw = RawCsvData::from_record(&headers(&["Title"]), &record, &config, 1).unwrap();
        assert_eq!(raw.get_field("title"), Some(&"Test Article".to_string()));
    }

    #[test]
    fn test_missing_title_error() {
        let record = create_test_record(&["Smith, John"]);
        let config = CsvConfig::new();

        let raw = RawCsvData::from_record(&headers(&["Author"]), &record, &config, 3).unwrap();
        let result = raw.into_document(&config);
        assert!(matches!(result, Err(ParseError::MissingField(msg)) if msg.contains("line 3")));
    }
}
