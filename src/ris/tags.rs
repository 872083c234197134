//! RIS tags grouped by the document field they fill.
//!
//! See: http://en.wikipedia.org/wiki/RIS_(file_format)

/// Document field a RIS tag contributes to.
///
/// Several tags describe the same field (`TI`/`T1`, `JF`/`T2`/`JO`, ...); the
/// `u8` carried by those variants is the tag's priority, lower wins.
#[derive(Debug, Eq, PartialEq, Hash, Clone)]
pub(crate) enum RisField {
    /// TY
    Type,
    /// TI (0), T1 (1)
    Title(u8),
    /// AU, A1, A2, A3, A4
    Author,
    /// JF (0), T2 (1), JO (2), JA (3), J2 (4)
    Source(u8),
    /// PY (0), Y1 (1), DA (2)
    Date(u8),
    /// DO
    Doi,
    /// AB (0), N2 (1)
    Abstract(u8),
    /// KW
    Keyword,
    /// LA
    Language,
    /// PB
    Publisher,
    /// UR, L1, L2, LK
    Url,
    /// AD
    Address,
    /// ER
    EndOfReference,
    /// Any other tag, kept verbatim
    Other(String),
}

impl RisField {
    /// Maps a two-character tag to its field.
    pub(crate) fn from_tag(tag: &str) -> Self {
        match tag {
            "TY" => RisField::Type,
            "TI" => RisField::Title(0),
            "T1" => RisField::Title(1),
            "AU" | "A1" | "A2" | "A3" | "A4" => RisField::Author,
            "JF" => RisField::Source(0),
            "T2" => RisField::Source(1),
            "JO" => RisField::Source(2),
            "JA" => RisField::Source(3),
            "J2" => RisField::Source(4),
            "PY" => RisField::Date(0),
            "Y1" => RisField::Date(1),
            "DA" => RisField::Date(2),
            "DO" => RisField::Doi,
            "AB" => RisField::Abstract(0),
            "N2" => RisField::Abstract(1),
            "KW" => RisField::Keyword,
            "LA" => RisField::Language,
            "PB" => RisField::Publisher,
            "UR" | "L1" | "L2" | "LK" => RisField::Url,
            "AD" => RisField::Address,
            "ER" => RisField::EndOfReference,
            _ => RisField::Other(tag.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("TY", RisField::Type)]
    #[case("T1", RisField::Title(1))]
    #[case("A2", RisField::Author)]
    #[case("JO", RisField::Source(2))]
    #[case("L1", RisField::Url)]
    #[case("ER", RisField::EndOfReference)]
    #[case("M3", RisField::Other("M3".to_string()))]
    fn test_from_tag(#[case] input: &str, #[case] expected: RisField) {
        assert_eq!(RisField::from_tag(input), expected);
    }
}
