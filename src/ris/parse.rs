//! RIS format parsing implementation.
//!
//! This module handles the low-level parsing of RIS formatted text.

use crate::ParseError;
use crate::ris::structure::RawRisData;
use crate::ris::tags::RisField;

/// Parse the content of a RIS formatted file, returning structured data.
pub(crate) fn ris_parse(text: &str) -> Vec<RawRisData> {
    let mut records = Vec::new();
    let mut current = RawRisData::new(1);

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();

        if line.is_empty() || is_metadata_line(line) {
            continue;
        }

        match parse_ris_line(line, line_number) {
            Ok((RisField::Type, content)) => {
                if current.has_content() {
                    records.push(std::mem::replace(
                        &mut current,
                        RawRisData::new(line_number),
                    ));
                }
                current.start_line = line_number;
                current.add(RisField::Type, content);
            }
            Ok((RisField::EndOfReference, _)) => {
                if current.has_content() {
                    records.push(std::mem::replace(
                        &mut current,
                        RawRisData::new(line_number + 1),
                    ));
                }
            }
            Ok((field, content)) => current.add(field, content),
            Err(_) => current.add_ignored_line(line_number, line.to_string()),
        }
    }

    if current.has_content() {
        records.push(current);
    }

    records
}

/// Parse a single RIS line into a field and content.
fn parse_ris_line(line: &str, line_number: usize) -> Result<(RisField, String), ParseError> {
    let malformed = |message: String| ParseError::MalformedInput {
        message,
        line: line_number,
    };

    let tag = line
        .get(..2)
        .filter(|t| t.chars().all(|c| c.is_ascii_alphanumeric()))
        .ok_or_else(|| malformed(format!("Invalid RIS tag: '{}'", line)))?;

    // "TY  - JOUR", "ER  -", "TY- JOUR" and "TY-JOUR" are all accepted
    let rest = &line[2..];
    let content = match rest.trim_start().strip_prefix('-') {
        Some(content) => content,
        None if rest.starts_with(' ') => rest,
        None => {
            return Err(malformed(format!(
                "RIS line missing separator after tag: '{}'",
                line
            )));
        }
    };

    Ok((RisField::from_tag(tag), content.trim().to_string()))
}

/// Check if a line is export metadata that should be ignored.
fn is_metadata_line(line: &str) -> bool {
    line.starts_with("Record #")
        || line.starts_with("Provider:")
        || line.starts_with("Content:")
        || line.starts_with("Database:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("TY  - JOUR", RisField::Type, "JOUR")]
    #[case("TI  - Test Title", RisField::Title(0), "Test Title")]
    #[case("AU  - Smith, John", RisField::Author, "Smith, John")]
    #[case("ER  -", RisField::EndOfReference, "")]
    #[case("DO  - 10.1000/test", RisField::Doi, "10.1000/test")]
    #[case("TY Content", RisField::Type, "Content")]
    #[case("TY-Content", RisField::Type, "Content")]
    fn test_parse_ris_line_valid(
        #[case] line: &str,
        #[case] expected_field: RisField,
        #[case] expected_content: &str,
    ) {
        let (field, content) = parse_ris_line(line, 1).unwrap();
        assert_eq!(field, expected_field);
        assert_eq!(content, expected_content);
    }

    #[rstest]
    #[case("")]
    #[case("A")]
    #[case("!!  - Invalid tag")]
    #[case("TYNoSeparator")]
    fn test_parse_ris_line_invalid(#[case] line: &str) {
        assert!(parse_ris_line(line, 1).is_err());
    }

    #[rstest]
    #[case("Record #1 of 10", true)]
    #[case("Provider: Some Provider", true)]
    #[case("Database: Scopus", true)]
    #[case("TY  - JOUR", false)]
    fn test_is_metadata_line(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_metadata_line(line), expected);
    }

    #[test]
    fn test_parse_multiple_records() {
        let input = "TY  - JOUR
TI  - First Article
AU  - Smith, John
ER  -

TY  - BOOK
TI  - Second Article
AU  - Doe, Jane
ER  -";

        let records = ris_parse(input);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(&RisField::Type), Some(&"JOUR".to_string()));
        assert_eq!(records[1].get(&RisField::Type), Some(&"BOOK".to_string()));
        assert_eq!(records[1].start_line, 6);
    }

    #[test]
    fn test_record_without_end_tag() {
        let input = "TY  - JOUR
TI  - First
TY  - JOUR
TI  - Second";

        let records = ris_parse(input);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get(&RisField::Title(0)), Some(&"Second".to_string()));
    }

    #[test]
    fn test_invalid_lines_are_kept_for_reporting() {
        let input = "TY  - JOUR
TI  - Test Article
!! - This is truly invalid
ER  -";

        let records = ris_parse(input);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ignored_lines, vec![(3, "!! - This is truly invalid".to_string())]);
    }

    #[test]
    fn test_empty_input() {
        assert!(ris_parse("").is_empty());
        assert!(ris_parse("Record #1 of 0\nProvider: Test").is_empty());
    }
}
