// 📚 PDF search - subject catalog + provider seam
//
// Fetching results (headless browser, search API) lives behind
// `PdfSearchProvider`. This module owns the parts that are plain data:
// which subjects exist, how a query is phrased, which links count as PDFs,
// and how the hit count is read out of an API response.

use crate::error::{Result, SplitBillError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NO_TITLE: &str = "No title available";

const CUSTOM_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

// ============================================================================
// QUERY & RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub subject: String,
}

impl SearchQuery {
    pub fn for_subject(subject: &str) -> Self {
        Self {
            subject: subject.trim().to_string(),
        }
    }

    /// Query text restricted to PDF documents
    pub fn text(&self) -> String {
        format!("{} filetype:pdf", self.subject)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfLink {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub total_hits: u64,
    pub links: Vec<PdfLink>,
}

/// Anything that can turn a query into PDF links
pub trait PdfSearchProvider {
    fn search(&self, query: &SearchQuery) -> Result<SearchResults>;
}

// ============================================================================
// SUBJECT CATALOG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectCatalog {
    categories: Vec<Category>,
}

impl Default for SubjectCatalog {
    fn default() -> Self {
        let category = |name: &str, subjects: &[&str]| Category {
            name: name.to_string(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            categories: vec![
                category(
                    "Engineering",
                    &["Chemical Engineering", "Civil Engineering", "Mechanical Engineering"],
                ),
                category("Medical Science", &["Anatomy", "Cardiology", "Pharmacology"]),
            ],
        }
    }
}

impl SubjectCatalog {
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn subjects(&self, category: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.subjects.as_slice())
    }

    pub fn contains(&self, category: &str, subject: &str) -> bool {
        self.subjects(category)
            .map(|subjects| subjects.iter().any(|s| s == subject))
            .unwrap_or(false)
    }
}

// ============================================================================
// RESULT HELPERS
// ============================================================================

/// Keep anchors that point at PDFs. Each item is `(href, title)`.
pub fn collect_pdf_links<I>(anchors: I) -> Vec<PdfLink>
where
    I: IntoIterator<Item = (Option<String>, Option<String>)>,
{
    anchors
        .into_iter()
        .filter_map(|(href, title)| {
            let href = href?;
            if !href.contains("pdf") {
                return None;
            }
            let title = title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| NO_TITLE.to_string());
            Some(PdfLink { title, link: href })
        })
        .collect()
}

/// Read `queries.request[0].totalResults` (a string in the API response).
/// Anything missing or malformed counts as zero hits.
pub fn parse_total_hits(response: &Value) -> u64 {
    let total = &response["queries"]["request"][0]["totalResults"];
    match total {
        Value::String(s) => s.parse().unwrap_or(0),
        Value::Number(n) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

// ============================================================================
// SEARCH CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
}

impl SearchConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.engine_id.is_some()
    }

    /// Request URL for the hit count of `query` (one result is enough)
    pub fn total_hits_url(&self, query: &SearchQuery) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SplitBillError::Config("GOOGLE_API_KEY is not set".to_string()))?;
        let engine_id = self
            .engine_id
            .as_deref()
            .ok_or_else(|| SplitBillError::Config("GOOGLE_CSE_ID is not set".to_string()))?;

        Ok(format!(
            "{}?q={}&key={}&cx={}&num=1",
            CUSTOM_SEARCH_ENDPOINT,
            urlencoding::encode(&query.text()),
            urlencoding::encode(api_key),
            urlencoding::encode(engine_id),
        ))
    }
}

/// Search one catalog subject through `provider`
pub fn find_pdfs(
    provider: &dyn PdfSearchProvider,
    catalog: &SubjectCatalog,
    category: &str,
    subject: &str,
) -> Result<SearchResults> {
    if !catalog.contains(category, subject) {
        return Err(SplitBillError::Search(format!(
            "'{}' is not a subject of '{}'",
            subject, category
        )));
    }

    let query = SearchQuery::for_subject(subject);
    tracing::info!(query = %query.text(), "searching for PDFs");
    let results = provider.search(&query)?;
    tracing::info!(links = results.links.len(), total_hits = results.total_hits, "search finished");

    Ok(results)
}
