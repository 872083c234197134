//! Descriptive statistics over a document collection.
//!
//! Every `compute_*_histogram` function counts documents per label of one
//! metadata field. A document contributes once to every distinct label it
//! carries (an author appears once per paper however often the name is
//! repeated). With [`Groups`], counts are split into one series per group.

use crate::Document;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Chooses documents by a boolean property, optionally negated.
///
/// A document without the property counts as `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub property: String,
    pub negated: bool,
}

impl Selector {
    /// Parses `"name"` or `"not name"`.
    pub fn parse(expression: &str) -> Self {
        let expression = expression.trim();
        match expression.strip_prefix("not ") {
            Some(property) => Self {
                property: property.trim().to_string(),
                negated: true,
            },
            None => Self {
                property: expression.to_string(),
                negated: false,
            },
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.flag(&self.property).unwrap_or(false) != self.negated
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not {}", self.property)
        } else {
            f.write_str(&self.property)
        }
    }
}

/// Ordered named groups of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups(pub Vec<(String, Selector)>);

impl Groups {
    /// Builds groups from `(label, selector expression)` pairs.
    pub fn parse<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(label, expression)| (label.to_string(), Selector::parse(expression)))
                .collect(),
        )
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Options shared by all histogram computations.
#[derive(Debug, Clone, Default)]
pub struct HistogramOptions {
    /// Keep only the `limit` labels with the highest total count
    pub limit: Option<usize>,
    /// Split counts into groups
    pub groups: Option<Groups>,
}

impl HistogramOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            groups: None,
        }
    }

    pub fn with_groups(mut self, groups: Groups) -> Self {
        self.groups = Some(groups);
        self
    }
}

/// Label ordering of a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramOrder {
    /// Highest total count first
    ByCount,
    /// Chronological, gaps filled with zero counts
    ByYear,
}

/// Counts per label, one series per group.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub title: String,
    /// Name of the counted field, used as axis label
    pub field: String,
    pub order: HistogramOrder,
    pub labels: Vec<String>,
    /// Group names; empty for an ungrouped histogram
    pub groups: Vec<String>,
    /// One series per group (a single series when ungrouped), aligned with
    /// `labels`
    pub counts: Vec<Vec<usize>>,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Sum over groups for each label.
    pub fn totals(&self) -> Vec<usize> {
        (0..self.labels.len())
            .map(|i| self.counts.iter().map(|series| series[i]).sum())
            .collect()
    }

    /// Count of `label` in the series of group `group`.
    pub fn count(&self, group: usize, label: &str) -> Option<usize> {
        let position = self.labels.iter().position(|l| l == label)?;
        self.counts.get(group).map(|series| series[position])
    }
}

fn compute_histogram<'a, I, F>(
    documents: I,
    options: &HistogramOptions,
    title: &str,
    field: &str,
    order: HistogramOrder,
    labels_of: F,
) -> Histogram
where
    I: IntoIterator<Item = &'a Document>,
    F: Fn(&Document) -> Vec<String>,
{
    let groups = options.groups.clone().unwrap_or_default();
    let series = groups.0.len().max(1);
    let mut counts: HashMap<String, Vec<usize>> = HashMap::new();

    for document in documents {
        let memberships: Vec<usize> = if groups.is_empty() {
            vec![0]
        } else {
            groups
                .0
                .iter()
                .enumerate()
                .filter(|(_, (_, selector))| selector.matches(document))
                .map(|(i, _)| i)
                .collect()
        };
        if memberships.is_empty() {
            continue;
        }

        for label in labels_of(document).into_iter().unique() {
            let row = counts.entry(label).or_insert_with(|| vec![0; series]);
            for &group in &memberships {
                row[group] += 1;
            }
        }
    }

    let rows: Vec<(String, Vec<usize>)> = match order {
        HistogramOrder::ByCount => counts
            .into_iter()
            .sorted_by(|(la, ca), (lb, cb)| {
                let (ta, tb): (usize, usize) = (ca.iter().sum(), cb.iter().sum());
                tb.cmp(&ta).then_with(|| la.cmp(lb))
            })
            .take(options.limit.unwrap_or(usize::MAX))
            .collect(),
        HistogramOrder::ByYear => fill_years(counts, series),
    };

    let mut histogram = Histogram {
        title: title.to_string(),
        field: field.to_string(),
        order,
        labels: Vec::with_capacity(rows.len()),
        groups: groups.labels(),
        counts: vec![Vec::with_capacity(rows.len()); series],
    };
    for (label, row) in rows {
        histogram.labels.push(label);
        for (series, count) in histogram.counts.iter_mut().zip(row) {
            series.push(count);
        }
    }
    histogram
}

/// Chronological rows from the first to the last year, gaps included.
fn fill_years(counts: HashMap<String, Vec<usize>>, series: usize) -> Vec<(String, Vec<usize>)> {
    let by_year: BTreeMap<i32, Vec<usize>> = counts
        .into_iter()
        .filter_map(|(label, row)| Some((label.parse().ok()?, row)))
        .collect();
    let (Some(&first), Some(&last)) = (by_year.keys().next(), by_year.keys().next_back()) else {
        return Vec::new();
    };
    (first..=last)
        .map(|year| {
            let row = by_year.get(&year).cloned().unwrap_or_else(|| vec![0; series]);
            (year.to_string(), row)
        })
        .collect()
}

/// Documents per publication year.
pub fn compute_year_histogram<'a, I>(documents: I, options: &HistogramOptions) -> Histogram
where
    I: IntoIterator<Item = &'a Document>,
{
    compute_histogram(
        documents,
        options,
        "Publications per year",
        "Year",
        HistogramOrder::ByYear,
        |doc| doc.year.map(|y| y.to_string()).into_iter().collect(),
    )
}

/// Documents per author affiliation.
pub fn compute_affiliation_histogram<'a, I>(documents: I, options: &HistogramOptions) -> Histogram
where
    I: IntoIterator<Item = &'a Document>,
{
    compute_histogram(
        documents,
        options,
        "Publications per affiliation",
        "Affiliation",
        HistogramOrder::ByCount,
        |doc| doc.affiliations().map(|a| a.name.clone()).collect(),
    )
}

/// Documents per author.
pub fn compute_author_histogram<'a, I>(documents: I, options: &HistogramOptions) -> Histogram
where
    I: IntoIterator<Item = &'a Document>,
{
    compute_histogram(
        documents,
        options,
        "Publications per author",
        "Author",
        HistogramOrder::ByCount,
        |doc| {
            doc.authors
                .iter()
                .map(|a| a.full_name())
                .filter(|name| !name.is_empty())
                .collect()
        },
    )
}

/// Documents per language.
pub fn compute_language_histogram<'a, I>(documents: I, options: &HistogramOptions) -> Histogram
where
    I: IntoIterator<Item = &'a Document>,
{
    compute_histogram(
        documents,
        options,
        "Publications per language",
        "Language",
        HistogramOrder::ByCount,
        |doc| doc.language.iter().map(|l| l.trim().to_string()).collect(),
    )
}

/// Documents per country of the authors' affiliations.
pub fn compute_country_histogram<'a, I>(documents: I, options: &HistogramOptions) -> Histogram
where
    I: IntoIterator<Item = &'a Document>,
{
    compute_histogram(
        documents,
        options,
        "Publications per country",
        "Country",
        HistogramOrder::ByCount,
        |doc| doc.affiliations().filter_map(|a| a.country.clone()).collect(),
    )
}

/// Documents per publication source (journal, proceedings, book).
pub fn compute_source_histogram<'a, I>(documents: I, options: &HistogramOptions) -> Histogram
where
    I: IntoIterator<Item = &'a Document>,
{
    compute_histogram(
        documents,
        options,
        "Publications per source",
        "Source",
        HistogramOrder::ByCount,
        |doc| doc.source.iter().map(|s| s.trim().to_string()).collect(),
    )
}

/// Share of documents carrying a boolean property, for one label.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceRow {
    pub label: String,
    pub total: usize,
    pub relevant: usize,
}

impl RelevanceRow {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.relevant as f64 / self.total as f64
        }
    }
}

fn relevance_rows<'a, I, F>(documents: I, property: &str, label_of: F) -> Vec<RelevanceRow>
where
    I: IntoIterator<Item = &'a Document>,
    F: Fn(&Document) -> Option<String>,
{
    let mut rows: BTreeMap<String, RelevanceRow> = BTreeMap::new();
    for document in documents {
        let Some(label) = label_of(document) else {
            continue;
        };
        let row = rows.entry(label.clone()).or_insert(RelevanceRow {
            label,
            total: 0,
            relevant: 0,
        });
        row.total += 1;
        if document.flag(property).unwrap_or(false) {
            row.relevant += 1;
        }
    }
    rows.into_values().collect()
}

/// Per-year share of documents with `property` set, chronologically.
pub fn relevance_by_year<'a, I>(documents: I, property: &str) -> Vec<RelevanceRow>
where
    I: IntoIterator<Item = &'a Document>,
{
    relevance_rows(documents, property, |doc| doc.year.map(|y| y.to_string()))
}

/// Per-source share of documents with `property` set, for sources with at
/// least `min_total` documents, highest share first.
pub fn relevance_by_source<'a, I>(
    documents: I,
    property: &str,
    min_total: usize,
) -> Vec<RelevanceRow>
where
    I: IntoIterator<Item = &'a Document>,
{
    relevance_rows(documents, property, |doc| {
        doc.source.as_deref().map(str::trim).map(String::from)
    })
    .into_iter()
    .filter(|row| row.total >= min_total)
    .sorted_by(|a, b| {
        b.ratio()
            .total_cmp(&a.ratio())
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| a.label.cmp(&b.label))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Affiliation, Author, PropertyValue};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn document(year: Option<i32>, source: &str, authors: &[(&str, &str)]) -> Document {
        Document {
            year,
            source: Some(source.to_string()),
            authors: authors
                .iter()
                .map(|(name, affiliation)| Author {
                    affiliation: Some(Affiliation::from_name(affiliation)),
                    ..Author::from_name(name)
                })
                .collect(),
            ..Default::default()
        }
    }

    fn relevant(mut doc: Document, value: bool) -> Document {
        doc.properties
            .insert("is_relevant_topic".to_string(), PropertyValue::Bool(value));
        doc
    }

    fn sample() -> Vec<Document> {
        vec![
            relevant(
                document(
                    Some(2018),
                    "Transportation Research",
                    &[
                        ("Smith, John", "ETH Zurich, Switzerland"),
                        ("Doe, Jane", "TU Delft, The Netherlands"),
                    ],
                ),
                true,
            ),
            relevant(
                document(
                    Some(2020),
                    "Transportation Research",
                    &[("Smith, John", "ETH Zurich, Switzerland")],
                ),
                false,
            ),
            relevant(
                document(Some(2020), "ITSC", &[("Lee, Ann", "MIT, Cambridge, MA 02139, USA")]),
                true,
            ),
            document(None, "ITSC", &[]),
        ]
    }

    #[rstest]
    #[case("is_relevant_topic", "is_relevant_topic", false)]
    #[case("not is_relevant_topic", "is_relevant_topic", true)]
    #[case("  not   flag ", "flag", true)]
    fn test_selector_parse(#[case] input: &str, #[case] property: &str, #[case] negated: bool) {
        let selector = Selector::parse(input);
        assert_eq!(selector.property, property);
        assert_eq!(selector.negated, negated);
    }

    #[test]
    fn test_selector_missing_property_is_false() {
        let doc = Document::default();
        assert!(!Selector::parse("flag").matches(&doc));
        assert!(Selector::parse("not flag").matches(&doc));
    }

    #[test]
    fn test_year_histogram_fills_gaps() {
        let histogram = compute_year_histogram(&sample(), &HistogramOptions::default());
        assert_eq!(histogram.labels, vec!["2018", "2019", "2020"]);
        assert_eq!(histogram.counts, vec![vec![1, 0, 2]]);
        assert!(histogram.groups.is_empty());
    }

    #[test]
    fn test_author_histogram_sorted_and_limited() {
        let histogram = compute_author_histogram(&sample(), &HistogramOptions::limit(2));
        assert_eq!(histogram.labels, vec!["John Smith", "Ann Lee"]);
        assert_eq!(histogram.totals(), vec![2, 1]);
    }

    #[test]
    fn test_country_and_affiliation_histograms() {
        let countries = compute_country_histogram(&sample(), &HistogramOptions::limit(15));
        assert_eq!(countries.count(0, "Switzerland"), Some(2));
        assert_eq!(countries.count(0, "Netherlands"), Some(1));
        assert_eq!(countries.count(0, "United States"), Some(1));

        let affiliations = compute_affiliation_histogram(&sample(), &HistogramOptions::limit(1));
        assert_eq!(affiliations.labels, vec!["ETH Zurich, Switzerland"]);
    }

    #[test]
    fn test_grouped_histograms() {
        let groups = Groups::parse([
            ("Relevant", "is_relevant_topic"),
            ("Other", "not is_relevant_topic"),
        ]);
        let options = HistogramOptions::limit(25).with_groups(groups);

        let sources = compute_source_histogram(&sample(), &options);
        assert_eq!(sources.groups, vec!["Relevant", "Other"]);
        assert_eq!(sources.labels, vec!["ITSC", "Transportation Research"]);
        assert_eq!(sources.counts, vec![vec![1, 1], vec![1, 1]]);

        let years = compute_year_histogram(&sample(), &options);
        assert_eq!(years.count(0, "2020"), Some(1));
        assert_eq!(years.count(1, "2020"), Some(1));
        assert_eq!(years.count(1, "2019"), Some(0));
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = compute_language_histogram(&sample(), &HistogramOptions::default());
        assert!(histogram.is_empty());
        assert_eq!(histogram.counts, vec![Vec::<usize>::new()]);
    }

    #[test]
    fn test_relevance_tables() {
        let by_year = relevance_by_year(&sample(), "is_relevant_topic");
        assert_eq!(by_year.len(), 2);
        assert_eq!(by_year[1].label, "2020");
        assert_eq!(by_year[1].ratio(), 0.5);

        let by_source = relevance_by_source(&sample(), "is_relevant_topic", 2);
        let labels: Vec<&str> = by_source.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["ITSC", "Transportation Research"]);
        assert!(relevance_by_source(&sample(), "is_relevant_topic", 5).is_empty());
    }
}
