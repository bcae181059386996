//! Document retrieval over the employee manual. The similarity search
//! itself lives in an external vector-search service; this module is the
//! client plus the startup seeding of manual content.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// A ranked snippet returned for a query. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedDocument {
    pub text: String,
    pub similarity_score: f64,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top-k snippets semantically closest to the query, best first.
    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<RetrievedDocument>>;

    /// Add document texts to the index.
    async fn add_documents(&self, texts: Vec<String>) -> anyhow::Result<()>;
}

/// Client for an HTTP vector-search sidecar exposing
/// `POST /search {query, topK}` and `POST /documents {documents}`.
pub struct HttpRetriever {
    http: Client,
    base_url: String,
}

impl HttpRetriever {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<RetrievedDocument>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&SearchRequest { query, top_k })
            .send()
            .await?
            .error_for_status()?;

        let documents = response.json().await?;
        Ok(documents)
    }

    async fn add_documents(&self, texts: Vec<String>) -> anyhow::Result<()> {
        let url = format!("{}/documents", self.base_url);
        self.http
            .post(&url)
            .json(&serde_json::json!({ "documents": texts }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Used when no retriever backend is configured: every search returns
/// empty context and the chat degrades to plain conversation.
pub struct NoopRetriever;

#[async_trait]
impl Retriever for NoopRetriever {
    async fn search(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<RetrievedDocument>> {
        Ok(Vec::new())
    }

    async fn add_documents(&self, _texts: Vec<String>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Built-in policy snippets for when the manual file is missing.
fn fallback_manual_sections() -> Vec<String> {
    [
        "Annual leave policy: Employees are entitled to 25 days of annual leave per year. \
         Leave must be requested at least 2 weeks in advance.",
        "Sick leave policy: Employees can take up to 10 days of sick leave per year. \
         Medical certificate required for absences longer than 3 consecutive days.",
        "Billable hours policy: All client work must be accurately recorded and billed. \
         Time should be recorded in 15-minute increments.",
        "Travel reimbursement: Mileage reimbursement €0.35 per kilometer for car travel, \
         €0.10 per kilometer for bike travel.",
        "Working from home: Maximum 3 days per week working from home with manager approval. \
         Company laptop provided for remote work.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Split the manual into sections on blank lines.
fn split_sections(content: &str) -> Vec<String> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Seed the retriever with the employee manual at startup. Failures are
/// logged and swallowed; chat must keep working without context.
pub async fn seed_employee_manual(retriever: &dyn Retriever, manual_path: &Path) {
    let sections = match std::fs::read_to_string(manual_path) {
        Ok(content) => {
            let sections = split_sections(&content);
            info!(
                path = %manual_path.display(),
                sections = sections.len(),
                "loading employee manual into retriever"
            );
            sections
        }
        Err(e) => {
            warn!(
                path = %manual_path.display(),
                error = %e,
                "employee manual not found, seeding fallback content"
            );
            fallback_manual_sections()
        }
    };

    if let Err(e) = retriever.add_documents(sections).await {
        warn!(error = %e, "failed to seed retriever, continuing without manual content");
    }
}
