//! RIS format data structures.
//!
//! Prioritized fields (title, source, date, abstract) keep the value of the
//! highest-priority tag seen; repeated tags (authors, keywords, URLs) append.

use crate::ris::tags::RisField;
use crate::utils::{format_doi, parse_year};
use crate::{Affiliation, Author, Document, ParseError, SourceDatabase};
use std::collections::HashMap;

/// Structured raw data of one RIS record.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawRisData {
    /// Best value so far of each prioritized field, with its priority
    prioritized: HashMap<RisField, (u8, String)>,
    pub(crate) authors: Vec<Author>,
    pub(crate) keywords: Vec<String>,
    pub(crate) urls: Vec<String>,
    pub(crate) addresses: Vec<String>,
    pub(crate) extra_fields: HashMap<String, Vec<String>>,
    /// Invalid lines with their line numbers
    pub(crate) ignored_lines: Vec<(usize, String)>,
    /// Line of the `TY` tag opening the record
    pub(crate) start_line: usize,
}

impl RawRisData {
    pub(crate) fn new(start_line: usize) -> Self {
        Self {
            start_line,
            ..Default::default()
        }
    }

    /// Records a tag value.
    pub(crate) fn add(&mut self, field: RisField, value: String) {
        if value.is_empty() {
            return;
        }
        match field {
            RisField::Author => self.authors.push(Author::from_name(&value)),
            RisField::Keyword => self.keywords.push(value),
            RisField::Url => self.urls.push(value),
            RisField::Address => self.addresses.push(value),
            RisField::Other(tag) => self.extra_fields.entry(tag).or_default().push(value),
            RisField::EndOfReference => {}
            RisField::Title(priority)
            | RisField::Source(priority)
            | RisField::Date(priority)
            | RisField::Abstract(priority) => {
                let key = Self::slot(&field);
                match self.prioritized.get(&key) {
                    Some((existing, _)) if *existing <= priority => {}
                    _ => {
                        self.prioritized.insert(key, (priority, value));
                    }
                }
            }
            RisField::Type | RisField::Doi | RisField::Language | RisField::Publisher => {
                self.prioritized.entry(field).or_insert((0, value));
            }
        }
    }

    /// Priority-free key under which a prioritized field is stored.
    fn slot(field: &RisField) -> RisField {
        match field {
            RisField::Title(_) => RisField::Title(0),
            RisField::Source(_) => RisField::Source(0),
            RisField::Date(_) => RisField::Date(0),
            RisField::Abstract(_) => RisField::Abstract(0),
            other => other.clone(),
        }
    }

    pub(crate) fn add_ignored_line(&mut self, line_number: usize, line: String) {
        self.ignored_lines.push((line_number, line));
    }

    /// Value of a field, if any tag provided it.
    pub(crate) fn get(&self, field: &RisField) -> Option<&String> {
        self.prioritized.get(&Self::slot(field)).map(|(_, v)| v)
    }

    /// Check if the record contains any content.
    pub(crate) fn has_content(&self) -> bool {
        !self.prioritized.is_empty() || !self.authors.is_empty()
    }
}

impl TryFrom<RawRisData> for Document {
    type Error = ParseError;

    fn try_from(mut raw: RawRisData) -> Result<Self, Self::Error> {
        let title = raw
            .get(&RisField::Title(0))
            .cloned()
            .ok_or_else(|| ParseError::MissingField(format!(
                "title (record starting at line {})",
                raw.start_line
            )))?;

        // AD lines carry author addresses in author order
        for (author, address) in raw.authors.iter_mut().zip(&raw.addresses) {
            author.affiliation = Some(Affiliation::from_name(address));
        }

        // DOI from the dedicated tag first, then from doi.org links
        let doi = raw
            .get(&RisField::Doi)
            .and_then(|d| format_doi(d))
            .or_else(|| {
                raw.urls
                    .iter()
                    .filter(|u| u.contains("doi.org"))
                    .find_map(|u| format_doi(u))
            });

        if let Some(kind) = raw.get(&RisField::Type).cloned() {
            raw.extra_fields.insert("TY".to_string(), vec![kind]);
        }

        Ok(Document {
            id: nanoid::nanoid!(),
            title,
            year: raw.get(&RisField::Date(0)).and_then(|d| parse_year(d)),
            source: raw.get(&RisField::Source(0)).cloned(),
            publisher: raw.get(&RisField::Publisher).cloned(),
            language: raw.get(&RisField::Language).cloned(),
            doi,
            abstract_text: raw.get(&RisField::Abstract(0)).cloned(),
            authors: raw.authors,
            keywords: raw.keywords,
            urls: raw.urls,
            database: Some(SourceDatabase::Ris),
            extra_fields: raw.extra_fields,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_record_is_empty() {
        let raw = RawRisData::new(1);
        assert!(!raw.has_content());
        assert!(raw.ignored_lines.is_empty());
    }

    #[test]
    fn test_source_priority_independent_of_order() {
        let mut raw = RawRisData::new(1);
        raw.add(RisField::from_tag("JO"), "Alt Journal".to_string());
        raw.add(RisField::from_tag("JF"), "Main Journal".to_string());
        raw.add(RisField::from_tag("T2"), "Secondary".to_string());

        assert_eq!(
            raw.get(&RisField::Source(0)),
            Some(&"Main Journal".to_string())
        );
    }

    #[test]
    fn test_conversion_to_document() {
        let mut raw = RawRisData::new(1);
        raw.add(RisField::Type, "JOUR".to_string());
        raw.add(RisField::Title(1), "Test Article".to_string());
        raw.add(RisField::Author, "Smith, John".to_string());
        raw.add(RisField::Address, "ETH Zurich, Zurich, Switzerland".to_string());
        raw.add(RisField::Date(0), "2023/12/25".to_string());

        let document: Document = raw.try_into().unwrap();
        assert_eq!(document.title, "Test Article");
        assert_eq!(document.year, Some(2023));
        assert_eq!(document.authors.len(), 1);
        assert_eq!(
            document.authors[0]
                .affiliation
                .as_ref()
                .and_then(|a| a.country.as_deref()),
            Some("Switzerland")
        );
        assert_eq!(document.extra_fields["TY"], vec!["JOUR"]);
    }

    #[test]
    fn test_missing_title_error() {
        let mut raw = RawRisData::new(7);
        raw.add(RisField::Author, "Smith, John".to_string());
        let result: Result<Document, _> = raw.try_into();
        assert!(matches!(result, Err(ParseError::MissingField(msg)) if msg.contains("line 7")));
    }

    #[test]
    fn test_doi_extraction_prioritizes_doi_field() {
        let mut raw = RawRisData::new(1);
        raw.add(RisField::Title(0), "Test Article".to_string());
        raw.add(RisField::Url, "https://doi.org/10.1234/secondary".to_string());

        let from_url: Document = raw.clone().try_into().unwrap();
        assert_eq!(from_url.doi.as_deref(), Some("10.1234/secondary"));

        raw.add(RisField::Doi, "10.5678/primary".to_string());
        let from_field: Document = raw.try_into().unwrap();
        assert_eq!(from_field.doi.as_deref(), Some("10.5678/primary"));
    }
}
