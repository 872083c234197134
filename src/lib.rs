//! A pipeline for bibliometric literature reviews.
//!
//! `litreview` loads exported citation records from several bibliographic
//! databases, merges them into one corpus, removes curated exclusions,
//! optionally enriches every record against Scopus, and produces descriptive
//! statistics, a co-citation network and a topic-model based relevance
//! classification of the corpus.
//!
//! # Key Features
//!
//! - **Multiple Format Support**: Load documents from:
//!   - IEEE Xplore CSV exports
//!   - SpringerLink CSV exports
//!   - BibTeX (e.g. a Zotero library export)
//!   - RIS (used for exclusion lists)
//!
//! - **Set Algebra on Documents**:
//!   - Union and difference keyed on document identity (DOI, Scopus id, title)
//!   - Property tagging producing a new collection
//!
//! - **Analysis**:
//!   - Histograms over years, authors, affiliations, countries, languages, venues
//!   - Co-citation network
//!   - NMF topic model and keyword-driven relevance tagging
//!
//! # Basic Usage
//!
//! ```rust
//! use litreview::{DocumentParser, RisParser};
//!
//! let input = r#"TY  - JOUR
//! TI  - Example Article
//! AU  - Smith, John
//! ER  -"#;
//!
//! let parser = RisParser::new();
//! let documents = parser.parse(input).unwrap();
//! println!("Title: {}", documents[0].title);
//! ```
//!
//! # Merging Sources
//!
//! ```rust
//! use litreview::{DocumentCollection, DocumentParser, csv::CsvParser};
//!
//! let ieee = CsvParser::ieee()
//!     .parse("Document Title,Publication Year,DOI\nA Paper,2021,10.1000/a")
//!     .unwrap();
//! let springer = CsvParser::springer()
//!     .parse("Item Title,Publication Year,Item DOI\nA paper.,2021,10.1000/A")
//!     .unwrap();
//!
//! let merged = DocumentCollection::from(ieee).union(&DocumentCollection::from(springer));
//! assert_eq!(merged.len(), 1);
//! ```
//!
//! # Error Handling
//!
//! Parsers return the crate [`Result`] type wrapping [`ParseError`]. The
//! pipeline stages never propagate errors; they report a
//! [`pipeline::StageStatus`] instead, and only a run without any loadable
//! source fails with [`pipeline::PipelineError`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

extern crate csv as csv_crate;

pub mod bibtex;
pub mod collection;
pub mod config;
pub mod corpus;
pub mod csv;
pub mod identity;
pub mod network;
pub mod pipeline;
pub mod plot;
pub mod refine;
pub mod ris;
pub mod stats;
pub mod topic;
mod utils;

// Reexports
pub use bibtex::BibtexParser;
pub use collection::DocumentCollection;
pub use csv::CsvParser;
pub use identity::DocumentIdentity;
pub use ris::RisParser;

/// A specialized Result type for document parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while reading a bibliographic export.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Malformed input: {message} at line {line}")]
    MalformedInput { message: String, line: usize },
}

impl From<csv_crate::Error> for ParseError {
    fn from(err: csv_crate::Error) -> Self {
        ParseError::InvalidFormat(err.to_string())
    }
}

impl From<biblatex::ParseError> for ParseError {
    fn from(err: biblatex::ParseError) -> Self {
        ParseError::InvalidFormat(format!("{:?}", err.kind))
    }
}

/// An institution an author is affiliated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    /// Full affiliation string as exported
    pub name: String,
    /// Country, when it can be determined
    pub country: Option<String>,
}

impl Affiliation {
    /// Creates an affiliation, deriving the country from the last address segment.
    pub fn from_name(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            country: utils::country_from_affiliation(name),
        }
    }
}

/// Represents an author of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// The author's family name (surname)
    pub family_name: String,
    /// The author's given name (first name)
    pub given_name: String,
    /// Optional affiliation
    pub affiliation: Option<Affiliation>,
}

impl Author {
    /// Parses "Family, Given" or "Given Family" style names.
    pub fn from_name(name: &str) -> Self {
        let (family_name, given_name) = utils::parse_author_name(name);
        Self {
            family_name,
            given_name,
            affiliation: None,
        }
    }

    /// Display name in "Given Family" order.
    pub fn full_name(&self) -> String {
        if self.given_name.is_empty() {
            self.family_name.clone()
        } else {
            format!("{} {}", self.given_name, self.family_name)
        }
    }
}

/// A work cited by a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: Option<String>,
    pub doi: Option<String>,
    pub scopus_id: Option<String>,
}

impl Reference {
    /// Key used to recognise the same cited work across documents.
    pub fn key(&self) -> Option<String> {
        if let Some(id) = self.scopus_id.as_deref().filter(|s| !s.is_empty()) {
            return Some(format!("scopus:{id}"));
        }
        if let Some(doi) = self.doi.as_deref().and_then(utils::format_doi) {
            return Some(format!("doi:{doi}"));
        }
        self.title
            .as_deref()
            .map(identity::normalize_title)
            .filter(|t| !t.is_empty())
            .map(|t| format!("title:{t}"))
    }
}

/// Database a document was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceDatabase {
    Ieee,
    Springer,
    Bibtex,
    Ris,
    Scopus,
}

/// A value attached to every member of a collection by property tagging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Category(String),
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Category(value.to_string())
    }
}

/// Represents a single bibliographic record with its metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Title of the work
    pub title: String,
    /// List of authors
    pub authors: Vec<Author>,
    /// Publication year
    pub year: Option<i32>,
    /// Journal, proceedings or book the work appeared in
    pub source: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    /// Digital Object Identifier
    pub doi: Option<String>,
    pub scopus_id: Option<String>,
    /// Abstract text
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub urls: Vec<String>,
    /// Works cited by this document
    pub references: Vec<Reference>,
    pub citation_count: Option<u64>,
    /// Database the record was loaded from
    pub database: Option<SourceDatabase>,
    /// Properties attached by [`DocumentCollection::with_property`]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Additional fields not covered by standard fields
    pub extra_fields: HashMap<String, Vec<String>>,
}

impl Document {
    /// The identity used by set operations on collections.
    pub fn identity(&self) -> DocumentIdentity {
        DocumentIdentity::of(self)
    }

    /// Boolean property lookup; absent or categorical properties are `None`.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.properties.get(name) {
            Some(PropertyValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Affiliations of all authors, in author order.
    pub fn affiliations(&self) -> impl Iterator<Item = &Affiliation> {
        self.authors.iter().filter_map(|a| a.affiliation.as_ref())
    }

    /// Fills fields that are missing on `self` from `other`.
    pub(crate) fn fill_missing_from(&mut self, other: &Document) {
        fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }

        if self.title.is_empty() {
            self.title.clone_from(&other.title);
        }
        fill(&mut self.year, &other.year);
        fill(&mut self.source, &other.source);
        fill(&mut self.publisher, &other.publisher);
        fill(&mut self.language, &other.language);
        fill(&mut self.doi, &other.doi);
        fill(&mut self.scopus_id, &other.scopus_id);
        fill(&mut self.abstract_text, &other.abstract_text);
        fill(&mut self.citation_count, &other.citation_count);

        if self.authors.is_empty() {
            self.authors.clone_from(&other.authors);
        } else if self.affiliations().next().is_none() && self.authors.len() == other.authors.len()
        {
            for (mine, theirs) in self.authors.iter_mut().zip(&other.authors) {
                fill(&mut mine.affiliation, &theirs.affiliation);
            }
        }
        if self.keywords.is_empty() {
            self.keywords.clone_from(&other.keywords);
        }
        if self.references.is_empty() {
            self.references.clone_from(&other.references);
        }
        for url in &other.urls {
            if !self.urls.contains(url) {
                self.urls.push(url.clone());
            }
        }
    }
}

/// Trait for implementing bibliographic export parsers.
pub trait DocumentParser {
    /// Parse a string containing one or more records.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is malformed
    fn parse(&self, input: &str) -> Result<Vec<Document>>;

    /// Reads and parses a file, stripping a leading byte-order mark.
    fn parse_file(&self, path: &std::path::Path) -> Result<Vec<Document>> {
        let text = std::fs::read_to_string(path)?;
        self.parse(utils::strip_bom(&text))
    }
}
