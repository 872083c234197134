//! BibTeX parser implementation.
//!
//! Entries are read with the `biblatex` crate; this module maps their fields
//! onto [`Document`]s.
//!
//! # Example
//!
//! ```
//! use litreview::{DocumentParser, BibtexParser};
//!
//! let input = r#"@article{smith2021,
//!   title = {Travel {Demand} Forecasting},
//!   author = {Smith, John and Doe, Jane},
//!   journal = {Transportation Research},
//!   year = {2021},
//! }"#;
//!
//! let documents = BibtexParser::new().parse(input).unwrap();
//! assert_eq!(documents[0].title, "Travel Demand Forecasting");
//! assert_eq!(documents[0].authors.len(), 2);
//! ```

use crate::utils::{format_doi, parse_year};
use crate::{Author, Document, DocumentParser, ParseError, Reference, Result, SourceDatabase};
use biblatex::{Bibliography, ChunksExt, Entry};
use std::collections::HashMap;
use tracing::warn;

/// Fields mapped onto [`Document`] members; everything else goes to
/// `extra_fields`.
const MAPPED_FIELDS: &[&str] = &[
    "title", "author", "year", "date", "journal", "journaltitle", "booktitle",
    "doi", "abstract", "keywords", "language", "langid", "publisher", "url",
    "references",
];

/// Parser for BibTeX / BibLaTeX files, such as Zotero library exports.
#[derive(Debug, Clone, Default)]
pub struct BibtexParser;

impl BibtexParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn field(entry: &Entry, name: &str) -> Option<String> {
        entry
            .fields
            .get(name)
            .map(|chunks| clean_text(&chunks.format_verbatim()))
            .filter(|value| !value.is_empty())
    }

    fn first_field(entry: &Entry, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| Self::field(entry, name))
    }

    fn parse_entry(entry: &Entry) -> Result<Document> {
        let title = Self::field(entry, "title").ok_or_else(|| {
            ParseError::MissingField(format!("title (entry '{}')", entry.key))
        })?;

        let authors = Self::field(entry, "author")
            .map(|names| {
                names
                    .split(" and ")
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(Author::from_name)
                    .collect()
            })
            .unwrap_or_default();

        let keywords = Self::field(entry, "keywords")
            .map(|k| {
                k.split([',', ';'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        // Zotero exports the works a record cites in a `references` field,
        // one per line; the raw text keeps the line breaks.
        let references = entry
            .fields
            .get("references")
            .map(|chunks| parse_references(&chunks.format_verbatim()))
            .unwrap_or_default();

        let mut extra_fields: HashMap<String, Vec<String>> = entry
            .fields
            .iter()
            .filter(|(name, _)| !MAPPED_FIELDS.contains(&name.as_str()))
            .map(|(name, chunks)| (name.clone(), vec![clean_text(&chunks.format_verbatim())]))
            .collect();
        extra_fields.insert("key".to_string(), vec![entry.key.clone()]);
        extra_fields.insert("type".to_string(), vec![entry.entry_type.to_string()]);

        Ok(Document {
            id: nanoid::nanoid!(),
            title,
            authors,
            year: Self::first_field(entry, &["year", "date"]).and_then(|y| parse_year(&y)),
            source: Self::first_field(entry, &["journal", "journaltitle", "booktitle"]),
            publisher: Self::field(entry, "publisher"),
            language: Self::first_field(entry, &["language", "langid"]),
            doi: Self::field(entry, "doi").and_then(|d| format_doi(&d)),
            abstract_text: Self::field(entry, "abstract"),
            keywords,
            urls: Self::field(entry, "url").into_iter().collect(),
            references,
            database: Some(SourceDatabase::Bibtex),
            extra_fields,
            ..Default::default()
        })
    }
}

/// Splits a raw `references` field into one reference per line, comma or
/// semicolon. A line of whitespace separated DOIs yields one reference each.
fn parse_references(raw: &str) -> Vec<Reference> {
    raw.split(['\n', ',', ';'])
        .map(clean_text)
        .flat_map(|item| {
            let words: Vec<&str> = item.split_whitespace().collect();
            if words.len() > 1 && words.iter().all(|w| looks_like_doi(w)) {
                words.into_iter().map(String::from).collect()
            } else {
                vec![item]
            }
        })
        .filter(|item| !item.is_empty())
        .map(|item| {
            if looks_like_doi(&item) {
                Reference {
                    doi: format_doi(&item),
                    ..Default::default()
                }
            } else {
                Reference {
                    title: Some(item),
                    ..Default::default()
                }
            }
        })
        .collect()
}

fn looks_like_doi(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value.starts_with("10.") || value.contains("doi.org/10.")
}

/// Removes leftover braces and collapses whitespace.
fn clean_text(value: &str) -> String {
    value
        .replace(['{', '}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl DocumentParser for BibtexParser {
    fn parse(&self, input: &str) -> Result<Vec<Document>> {
        let bibliography = Bibliography::parse(input)?;

        let mut documents = Vec::with_capacity(bibliography.len());
        for entry in bibliography.iter() {
            match Self::parse_entry(entry) {
                Ok(document) => documents.push(document),
                Err(ParseError::MissingField(field)) => {
                    warn!("Skipping BibTeX entry without {}", field);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(documents)
    }
}
