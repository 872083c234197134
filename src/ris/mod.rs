//! RIS format parser implementation.
//!
//! The pipeline reads its exclusion list from a RIS export.
//!
//! # Example
//!
//! ```
//! use litreview::{DocumentParser, RisParser};
//!
//! let input = r#"TY  - JOUR
//! TI  - Example Title
//! AU  - Smith, John
//! ER  -"#;
//!
//! let parser = RisParser::new();
//! let documents = parser.parse(input).unwrap();
//! assert_eq!(documents[0].title, "Example Title");
//! ```

mod parse;
mod structure;
mod tags;

use crate::{Document, DocumentParser, ParseError, Result};
use parse::ris_parse;
use tracing::{debug, warn};

/// Parser for RIS format records.
///
/// RIS uses two-letter tags at the start of each line to denote fields.
#[derive(Debug, Clone, Default)]
pub struct RisParser;

impl RisParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for RisParser {
    /// Parses a string containing zero or more RIS records.
    ///
    /// Records without a title are skipped with a warning.
    fn parse(&self, input: &str) -> Result<Vec<Document>> {
        let records = ris_parse(input);

        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            for (line, content) in &record.ignored_lines {
                debug!("Ignored RIS line {}: {}", line, content);
            }
            match Document::try_from(record) {
                Ok(document) => documents.push(document),
                Err(ParseError::MissingField(field)) => {
                    warn!("Skipping RIS record without {}", field);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceDatabase;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_ris() {
        let input = r#"TY  - JOUR
TI  - Test Article Title
AU  - Smith, John
JO  - Test Journal
PY  - 2023/12/25/Christmas edition
VL  - 10
DO  - 10.1000/test
AB  - This is a test abstract.
KW  - Keyword1
KW  - Keyword2
LA  - English
ER  -

"#;
        let documents = RisParser::new().parse(input).unwrap();
        assert_eq!(documents.len(), 1);
        let document = &documents[0];
        assert_eq!(document.title, "Test Article Title");
        assert_eq!(document.authors[0].family_name, "Smith");
        assert_eq!(document.year, Some(2023));
        assert_eq!(document.source.as_deref(), Some("Test Journal"));
        assert_eq!(document.doi.as_deref(), Some("10.1000/test"));
        assert_eq!(document.keywords, vec!["Keyword1", "Keyword2"]);
        assert_eq!(document.language.as_deref(), Some("English"));
        assert_eq!(document.extra_fields["VL"], vec!["10"]);
        assert_eq!(document.database, Some(SourceDatabase::Ris));
    }

    #[test]
    fn test_parse_with_metadata() {
        let input = r#"Record #1 of 2
Provider: Some Provider
Content: text/plain; charset="UTF-8"

TY  - JOUR
TI  - Test Article
AU  - Smith, John
ER  -

Record #2 of 2
Provider: Some Provider
Content: text/plain; charset="UTF-8"

TY  - BOOK
TI  - Another Test
AU  - Doe, Jane
ER  -"#;

        let documents = RisParser::new().parse(input).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].title, "Test Article");
        assert_eq!(documents[1].title, "Another Test");
    }

    #[test]
    fn test_parse_gs_format() {
        let input = r#"TY  - JOUR
T1  - Albendazole therapy in children with focal seizures
A1  - Baranwal, Arun K
A1  - Singhi, Pratibha D
JO  - The Pediatric infectious disease journal
Y1  - 1998///
PB  - LWW
ER  -


TY  - JOUR
T1  - High-dose praziquantel with cimetidine for refractory neurocysticercosis
A1  - Yee, Thomas
Y1  - 1999
ER  -
"#;
        let documents = RisParser::new().parse(input).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].year, Some(1998));
        assert_eq!(documents[0].authors.len(), 2);
        assert_eq!(documents[1].year, Some(1999));
    }

    #[test]
    fn test_empty_input_yields_no_documents() {
        assert!(RisParser::new().parse("").unwrap().is_empty());
    }

    #[test]
    fn test_record_without_title_is_skipped() {
        let input = "TY  - JOUR\nAU  - Smith, John\nER  -\nTY  - JOUR\nTI  - Ride Sharing\nER  -";
        let documents = RisParser::new().parse(input).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].title, "Ride Sharing");
    }
}
