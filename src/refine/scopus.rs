//! Scopus lookups through the Elsevier REST APIs.
//!
//! Each document is searched by DOI when it has one and by exact title
//! otherwise. A hit replaces the bibliographic fields with the Scopus record
//! and the cited works are fetched from the abstract retrieval API.

use super::{MetadataService, RefineError, Refinement};
use crate::utils::{format_doi, parse_year};
use crate::{Affiliation, Document, DocumentCollection, Reference, SourceDatabase};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-els-apikey";
const SERVICE_NAME: &str = "Scopus";

/// Configuration for the Scopus client
#[derive(Debug, Clone)]
pub struct ScopusConfig {
    /// API base (e.g., "https://api.elsevier.com/content")
    pub base_url: String,
    /// Elsevier API key
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of search results requested per lookup
    pub max_results: usize,
    /// Whether to fetch the references of every hit
    pub fetch_references: bool,
}

impl Default for ScopusConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elsevier.com/content".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_results: 1,
            fetch_references: true,
        }
    }
}

/// Scopus search response format
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "search-results")]
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    entry: Option<Vec<SearchEntry>>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchEntry {
    #[serde(rename = "dc:identifier")]
    identifier: Option<String>,
    #[serde(rename = "dc:title")]
    title: Option<String>,
    #[serde(rename = "prism:doi")]
    doi: Option<String>,
    #[serde(rename = "prism:publicationName")]
    publication_name: Option<String>,
    #[serde(rename = "prism:coverDate")]
    cover_date: Option<String>,
    #[serde(rename = "citedby-count")]
    cited_by_count: Option<String>,
    affiliation: Option<Vec<SearchAffiliation>>,
    /// Set on the placeholder entry of an empty result set
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchAffiliation {
    affilname: Option<String>,
    #[serde(rename = "affiliation-country")]
    country: Option<String>,
}

impl SearchEntry {
    fn scopus_id(&self) -> Option<String> {
        self.identifier
            .as_deref()
            .map(|id| id.trim_start_matches("SCOPUS_ID:").trim().to_string())
            .filter(|id| !id.is_empty())
    }
}

/// Scopus-backed [`MetadataService`].
#[derive(Debug, Clone)]
pub struct ScopusClient {
    config: ScopusConfig,
}

impl ScopusClient {
    pub fn new(config: ScopusConfig) -> Self {
        Self { config }
    }

    fn build_client(&self) -> Result<Client, RefineError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RefineError::MissingCredentials(SERVICE_NAME.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(API_KEY_HEADER),
            HeaderValue::from_str(api_key)
                .map_err(|e| RefineError::Http(format!("Invalid API key format: {}", e)))?,
        );

        Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| RefineError::Http(format!("Failed to build HTTP client: {}", e)))
    }

    /// Searches one document; `Ok(None)` when Scopus has no record of it.
    fn lookup(
        &self,
        client: &Client,
        document: &Document,
    ) -> Result<Option<Document>, RefineError> {
        let Some(query) = search_query(document) else {
            return Ok(None);
        };
        debug!("Scopus query: {}", query);

        let count = self.config.max_results.to_string();
        let response = client
            .get(format!("{}/search/scopus", self.config.base_url))
            .query(&[
                ("query", query.as_str()),
                ("count", count.as_str()),
            ])
            .send()
            .map_err(|e| RefineError::Http(e.to_string()))?;

        if !check_status(response.status())? {
            return Ok(None);
        }

        let body = response
            .text()
            .map_err(|e| RefineError::Http(e.to_string()))?;
        let Some(entry) = parse_search_response(&body)? else {
            return Ok(None);
        };

        let mut refined = apply_entry(document, entry);
        if self.config.fetch_references {
            if let Some(id) = refined.scopus_id.clone() {
                match self.references(client, &id) {
                    Ok(references) => refined.references = references,
                    Err(e) => debug!("No references for SCOPUS_ID:{}: {}", id, e),
                }
            }
        }
        Ok(Some(refined))
    }

    fn references(
        &self,
        client: &Client,
        scopus_id: &str,
    ) -> Result<Vec<Reference>, RefineError> {
        let response = client
            .get(format!(
                "{}/abstract/scopus_id/{}",
                self.config.base_url, scopus_id
            ))
            .query(&[("view", "REF")])
            .send()
            .map_err(|e| RefineError::Http(e.to_string()))?;

        if !check_status(response.status())? {
            return Ok(Vec::new());
        }

        let body: Value = response
            .json()
            .map_err(|e| RefineError::InvalidResponse(e.to_string()))?;
        Ok(parse_references(&body))
    }
}

impl MetadataService for ScopusClient {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    fn refine(&self, documents: &DocumentCollection) -> Result<Refinement, RefineError> {
        let client = self.build_client()?;
        info!("Looking up {} documents on Scopus", documents.len());

        let mut refinement = Refinement::default();
        for (index, document) in documents.iter().enumerate() {
            match self.lookup(&client, document)? {
                Some(refined) => refinement.found.push(Some(refined)),
                None => {
                    debug!("Not found on Scopus: {}", document.title);
                    refinement.not_found.push(document.clone());
                }
            }
            if (index + 1) % 50 == 0 {
                info!("Scopus lookup progress: {}/{}", index + 1, documents.len());
            }
        }

        Ok(refinement)
    }
}

/// Search expression for a document, by DOI or else by exact title.
fn search_query(document: &Document) -> Option<String> {
    if let Some(doi) = document.doi.as_deref().and_then(format_doi) {
        return Some(format!("DOI({})", doi));
    }
    let title: String = document
        .title
        .chars()
        .filter(|c| !matches!(c, '"' | '{' | '}'))
        .collect();
    let title = title.trim();
    (!title.is_empty()).then(|| format!("TITLE(\"{}\")", title))
}

/// `Ok(true)` for a usable response, `Ok(false)` for "no such record".
fn check_status(status: StatusCode) -> Result<bool, RefineError> {
    match status {
        s if s.is_success() => Ok(true),
        StatusCode::NOT_FOUND => Ok(false),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RefineError::Unauthorized {
            service: SERVICE_NAME.to_string(),
            status: status.as_u16(),
        }),
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Scopus quota exhausted");
            Err(RefineError::RateLimited(SERVICE_NAME.to_string()))
        }
        s => Err(RefineError::Http(format!("Scopus returned HTTP {}", s.as_u16()))),
    }
}

/// First real entry of a search response, if any.
fn parse_search_response(body: &str) -> Result<Option<SearchEntry>, RefineError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| RefineError::InvalidResponse(e.to_string()))?;
    Ok(response
        .results
        .entry
        .unwrap_or_default()
        .into_iter()
        .find(|entry| entry.error.is_none()))
}

/// Copy of `document` with the Scopus record applied.
fn apply_entry(document: &Document, entry: SearchEntry) -> Document {
    let mut refined = document.clone();
    refined.scopus_id = entry.scopus_id().or(refined.scopus_id);

    if let Some(title) = entry.title.filter(|t| !t.trim().is_empty()) {
        refined.title = title;
    }
    if let Some(year) = entry.cover_date.as_deref().and_then(parse_year) {
        refined.year = Some(year);
    }
    if let Some(source) = entry.publication_name.filter(|s| !s.trim().is_empty()) {
        refined.source = Some(source);
    }
    if let Some(doi) = entry.doi.as_deref().and_then(format_doi) {
        refined.doi = Some(doi);
    }
    if let Some(count) = entry.cited_by_count.and_then(|c| c.trim().parse().ok()) {
        refined.citation_count = Some(count);
    }

    let affiliations: Vec<Affiliation> = entry
        .affiliation
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let name = a.affilname.filter(|n| !n.trim().is_empty())?;
            let mut affiliation = Affiliation::from_name(&name);
            if let Some(country) = a.country.filter(|c| !c.trim().is_empty()) {
                affiliation.country = Some(country);
            }
            Some(affiliation)
        })
        .collect();
    if refined.affiliations().next().is_none() && !affiliations.is_empty() {
        for (index, author) in refined.authors.iter_mut().enumerate() {
            author.affiliation = if affiliations.len() == 1 {
                affiliations.first().cloned()
            } else {
                affiliations.get(index).cloned()
            };
        }
    }

    refined.database = Some(SourceDatabase::Scopus);
    refined
}

/// Cited works listed in an abstract retrieval response (`view=REF`).
fn parse_references(body: &Value) -> Vec<Reference> {
    let items = &body["abstracts-retrieval-response"]["references"]["reference"];
    let items: Vec<&Value> = match items {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![items],
        _ => Vec::new(),
    };

    let text = |value: &Value, keys: &[&str]| {
        keys.iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    items
        .into_iter()
        .map(|item| Reference {
            title: text(item, &["title", "sourcetitle"]),
            doi: text(item, &["ce:doi", "doi"]).and_then(|d| format_doi(&d)),
            scopus_id: text(item, &["scopus-id"]),
        })
        .filter(|reference| reference.key().is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Author;
    use mockito::{Matcher, Mock, Server};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    const SEARCH_HIT: &str = r#"{
      "search-results": {
        "opensearch:totalResults": "1",
        "entry": [{
          "dc:identifier": "SCOPUS_ID:85012345678",
          "eid": "2-s2.0-85012345678",
          "dc:title": "Travel Demand Forecasting",
          "prism:publicationName": "Transportation Research Part C",
          "prism:coverDate": "2021-03-01",
          "prism:doi": "10.1016/J.TRC.2021.01.001",
          "citedby-count": "42",
          "affiliation": [
            {
              "affilname": "ETH Zurich",
              "affiliation-city": "Zurich",
              "affiliation-country": "Switzerland"
            }
          ]
        }]
      }
    }"#;

    const SEARCH_EMPTY: &str = r#"{
      "search-results": {
        "opensearch:totalResults": "0",
        "entry": [{"@_fa": "true", "error": "Result set was empty"}]
      }
    }"#;

    #[test]
    fn test_parse_search_hit() {
        let entry = parse_search_response(SEARCH_HIT).unwrap().unwrap();
        assert_eq!(entry.scopus_id().as_deref(), Some("85012345678"));
        assert_eq!(entry.cited_by_count.as_deref(), Some("42"));
    }

    #[test]
    fn test_parse_empty_result_set() {
        assert!(parse_search_response(SEARCH_EMPTY).unwrap().is_none());
    }

    #[test]
    fn test_parse_invalid_response() {
        assert!(matches!(
            parse_search_response("<html>"),
            Err(RefineError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_apply_entry() {
        let document = Document {
            title: "travel demand forecasting".to_string(),
            authors: vec![Author::from_name("Smith, John"), Author::from_name("Doe, Jane")],
            ..Default::default()
        };
        let entry = parse_search_response(SEARCH_HIT).unwrap().unwrap();
        let refined = apply_entry(&document, entry);

        assert_eq!(refined.title, "Travel Demand Forecasting");
        assert_eq!(refined.year, Some(2021));
        assert_eq!(refined.doi.as_deref(), Some("10.1016/j.trc.2021.01.001"));
        assert_eq!(refined.citation_count, Some(42));
        assert_eq!(refined.database, Some(SourceDatabase::Scopus));
        assert_eq!(refined.affiliations().count(), 2);
        assert_eq!(
            refined.authors[1].affiliation.as_ref().and_then(|a| a.country.as_deref()),
            Some("Switzerland")
        );
    }

    #[test]
    fn test_parse_references() {
        let body = json!({
            "abstracts-retrieval-response": {
                "references": {
                    "reference": [
                        {"scopus-id": "111", "title": "First"},
                        {"title": "Second", "ce:doi": "10.1/ABC"},
                        {"@id": "3"}
                    ]
                }
            }
        });
        let references = parse_references(&body);
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].key().as_deref(), Some("scopus:111"));
        assert_eq!(references[1].doi.as_deref(), Some("10.1/abc"));

        let single = json!({
            "abstracts-retrieval-response": {
                "references": {"reference": {"scopus-id": "222"}}
            }
        });
        assert_eq!(parse_references(&single).len(), 1);
        assert!(parse_references(&json!({})).is_empty());
    }

    #[rstest]
    #[case(Some("10.1000/xyz"), "A Title", Some("DOI(10.1000/xyz)"))]
    #[case(None, "Say \"hello\"", Some("TITLE(\"Say hello\")"))]
    #[case(None, "  ", None)]
    fn test_search_query(
        #[case] doi: Option<&str>,
        #[case] title: &str,
        #[case] expected: Option<&str>,
    ) {
        let document = Document {
            title: title.to_string(),
            doi: doi.map(String::from),
            ..Default::default()
        };
        assert_eq!(search_query(&document).as_deref(), expected);
    }

    #[rstest]
    #[case(StatusCode::OK, Some(true))]
    #[case(StatusCode::NOT_FOUND, Some(false))]
    #[case(StatusCode::UNAUTHORIZED, None)]
    #[case(StatusCode::TOO_MANY_REQUESTS, None)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, None)]
    fn test_check_status(#[case] status: StatusCode, #[case] expected: Option<bool>) {
        assert_eq!(check_status(status).ok(), expected);
    }

    #[test]
    fn test_missing_credentials() {
        let client = ScopusClient::new(ScopusConfig::default());
        let result = client.refine(&DocumentCollection::new());
        assert!(matches!(result, Err(RefineError::MissingCredentials(_))));
    }

    fn client(server: &Server, fetch_references: bool) -> ScopusClient {
        ScopusClient::new(ScopusConfig {
            base_url: server.url(),
            api_key: Some("test-key".to_string()),
            fetch_references,
            ..Default::default()
        })
    }

    fn search_mock(server: &mut Server, doi: &str, status: usize, body: &str) -> Mock {
        server
            .mock("GET", "/search/scopus")
            .match_query(Matcher::UrlEncoded(
                "query".to_string(),
                format!("DOI({})", doi),
            ))
            .match_header(API_KEY_HEADER, "test-key")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }

    fn documents(dois: &[&str]) -> DocumentCollection {
        dois.iter()
            .map(|doi| Document {
                title: format!("Paper {}", doi),
                doi: Some(doi.to_string()),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_refine_splits_found_and_not_found() {
        let mut server = Server::new();
        let hit = search_mock(&mut server, "10.1000/a", 200, SEARCH_HIT);
        let missing = search_mock(&mut server, "10.1000/b", 404, "");
        let empty = search_mock(&mut server, "10.1000/c", 200, SEARCH_EMPTY);
        let references = server
            .mock("GET", "/abstract/scopus_id/85012345678")
            .match_query(Matcher::UrlEncoded("view".to_string(), "REF".to_string()))
            .with_status(500)
            .create();

        let refinement = client(&server, true)
            .refine(&documents(&["10.1000/a", "10.1000/b", "10.1000/c"]))
            .unwrap();

        for mock in [hit, missing, empty, references] {
            mock.assert();
        }
        assert_eq!(refinement.found.len(), 1);
        assert_eq!(refinement.not_found.len(), 2);

        // A failed reference fetch keeps the record without references
        let found = refinement.found[0].as_ref().unwrap();
        assert_eq!(found.title, "Travel Demand Forecasting");
        assert_eq!(found.scopus_id.as_deref(), Some("85012345678"));
        assert!(found.references.is_empty());

        let missed: Vec<_> = refinement.not_found.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(missed, vec!["Paper 10.1000/b", "Paper 10.1000/c"]);
    }

    #[rstest]
    #[case(401)]
    #[case(403)]
    fn test_rejected_key_aborts_refinement(#[case] status: usize) {
        let mut server = Server::new();
        let _rejected = search_mock(&mut server, "10.1000/a", status, "");
        let skipped = search_mock(&mut server, "10.1000/b", 200, SEARCH_HIT);

        let result = client(&server, false).refine(&documents(&["10.1000/a", "10.1000/b"]));
        assert!(matches!(
            result,
            Err(RefineError::Unauthorized { status: s, .. }) if s as usize == status
        ));
        assert!(!skipped.matched());
    }

    #[test]
    fn test_quota_exhausted_midway_aborts_refinement() {
        let mut server = Server::new();
        let first = search_mock(&mut server, "10.1000/a", 200, SEARCH_HIT);
        let limited = search_mock(&mut server, "10.1000/b", 429, "");

        let result = client(&server, false).refine(&documents(&["10.1000/a", "10.1000/b"]));
        first.assert();
        limited.assert();
        assert!(matches!(result, Err(RefineError::RateLimited(_))));
    }
}
