//! Document identity.
//!
//! Two records exported by different databases rarely agree byte for byte.
//! [`DocumentIdentity`] captures the normalized keys that decide whether two
//! records refer to the same paper:
//!
//! 1. Equal DOIs, or equal Scopus ids, always match.
//! 2. Records carrying two different DOIs never match.
//! 3. Otherwise, equal normalized titles match when the years agree or at least
//!    one year is unknown.
//!
//! ```
//! use litreview::{Document, DocumentIdentity};
//!
//! let a = Document {
//!     title: "Deep <i>Learning</i>: A Survey".into(),
//!     year: Some(2020),
//!     ..Default::default()
//! };
//! let b = Document { title: "Deep learning - a survey.".into(), ..Default::default() };
//! assert!(DocumentIdentity::of(&a).matches(&DocumentIdentity::of(&b)));
//! ```

use crate::Document;
use crate::utils::format_doi;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static UNICODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<U\+([0-9A-Fa-f]+)>").unwrap());

static MARKUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?(?:sup|sub|inf|i|b|em|strong|mml:[a-z]+)>").unwrap());

const ENTITY_REPLACEMENTS: [(&str, &str); 8] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
    ("α", "a"),
    ("β", "b"),
    ("ß", "b"),
    ("γ", "g"),
    ("{", ""),
];

/// Normalized keys of a document used for identity comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentIdentity {
    pub doi: Option<String>,
    pub scopus_id: Option<String>,
    /// Lower-cased alphanumeric characters of the title
    pub title: String,
    pub year: Option<i32>,
}

impl DocumentIdentity {
    pub fn of(document: &Document) -> Self {
        Self {
            doi: document.doi.as_deref().and_then(format_doi),
            scopus_id: document
                .scopus_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            title: normalize_title(&document.title),
            year: document.year,
        }
    }

    /// Whether both identities refer to the same paper.
    pub fn matches(&self, other: &DocumentIdentity) -> bool {
        if let (Some(a), Some(b)) = (&self.doi, &other.doi) {
            if a == b {
                return true;
            }
        }
        if let (Some(a), Some(b)) = (&self.scopus_id, &other.scopus_id) {
            if a == b {
                return true;
            }
        }
        if self.doi.is_some() && other.doi.is_some() {
            return false;
        }

        let years_agree = match (self.year, other.year) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        !self.title.is_empty() && self.title == other.title && years_agree
    }
}

/// Normalizes a title for comparison: decodes `<U+XXXX>` escapes, strips
/// markup, lower-cases and keeps only alphanumeric characters.
pub fn normalize_title(title: &str) -> String {
    let decoded = UNICODE_REGEX.replace_all(title, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    let mut s = decoded.trim().to_lowercase();
    for (from, to) in ENTITY_REPLACEMENTS {
        s = s.replace(from, to);
    }
    let s = MARKUP_REGEX.replace_all(&s, "");

    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Lookup from identity keys to positions in a document list.
#[derive(Debug, Default)]
pub(crate) struct IdentityIndex {
    identities: Vec<DocumentIdentity>,
    by_doi: HashMap<String, Vec<usize>>,
    by_scopus: HashMap<String, Vec<usize>>,
    by_title: HashMap<String, Vec<usize>>,
}

impl IdentityIndex {
    pub(crate) fn build<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut index = Self::default();
        for document in documents {
            index.insert(document.identity());
        }
        index
    }

    pub(crate) fn insert(&mut self, identity: DocumentIdentity) {
        let position = self.identities.len();
        if let Some(doi) = &identity.doi {
            self.by_doi.entry(doi.clone()).or_default().push(position);
        }
        if let Some(id) = &identity.scopus_id {
            self.by_scopus.entry(id.clone()).or_default().push(position);
        }
        if !identity.title.is_empty() {
            self.by_title
                .entry(identity.title.clone())
                .or_default()
                .push(position);
        }
        self.identities.push(identity);
    }

    /// Position of the first indexed document matching `identity`.
    pub(crate) fn find(&self, identity: &DocumentIdentity) -> Option<usize> {
        let candidates = [
            identity.doi.as_ref().and_then(|k| self.by_doi.get(k)),
            identity.scopus_id.as_ref().and_then(|k| self.by_scopus.get(k)),
            self.by_title.get(&identity.title),
        ];

        candidates
            .into_iter()
            .flatten()
            .flatten()
            .copied()
            .filter(|&position| self.identities[position].matches(identity))
            .min()
    }
}
