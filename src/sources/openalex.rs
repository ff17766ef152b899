//! OpenAlex search client.
//!
//! Turns a keyword search over a publication-date window into
//! [`PaperInput`]s. Pages are fetched one after another until enough papers
//! are collected or the result set is exhausted.
//!
//! API notes (per OpenAlex docs):
//! - `mailto` puts requests in the polite pool
//! - `per-page` is capped at 200
//! - 429 responses are retried with exponential backoff

use crate::config::UserConfig;
use crate::error::{PaperTaskError, Result};
use crate::paper::{Author, PaperInput};
use crate::sources::subjects;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// OpenAlex API base URL
pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Maximum results per page (OpenAlex limit)
const MAX_PER_PAGE: usize = 200;

const MAX_RATE_LIMIT_RETRIES: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SELECT_FIELDS: &str = "id,display_name,title,publication_date,doi,abstract_inverted_index,authorships,primary_location,primary_topic";

/// What to search for
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Matched with OR
    pub keywords: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_papers: usize,
    /// arXiv subject codes, mapped onto OpenAlex subfields
    pub research_categories: Vec<String>,
    pub base_url: String,
    /// Contact address for the polite pool
    pub mailto: Option<String>,
}

impl SearchOptions {
    pub fn from_config(config: &UserConfig) -> Result<Self> {
        config.validate()?;
        let (start_date, end_date) = config.date_range()?;
        Ok(Self {
            keywords: config.search_keywords.clone(),
            start_date,
            end_date,
            max_papers: config.max_papers,
            research_categories: config.research_categories.clone(),
            base_url: OPENALEX_API_BASE.to_string(),
            mailto: None,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_mailto(mut self, mailto: Option<String>) -> Self {
        self.mailto = mailto;
        self
    }

    /// Keywords joined into one boolean OpenAlex search; phrases are quoted.
    pub fn search_expression(&self) -> String {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(|k| {
                if k.contains(char::is_whitespace) {
                    format!("\"{}\"", k)
                } else {
                    k.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// The `filter` parameter: publication window plus subject subfields.
    fn filter_expression(&self) -> String {
        let mut filter = format!(
            "from_publication_date:{},to_publication_date:{}",
            self.start_date, self.end_date
        );
        if let Some(ids) = subjects::openalex_subfields(&self.research_categories).filter(|ids| !ids.is_empty()) {
            let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
            filter.push_str(",primary_topic.subfield.id:");
            filter.push_str(&ids.join("|"));
        }
        filter
    }

    fn per_page(&self) -> usize {
        self.max_papers.clamp(1, MAX_PER_PAGE)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAlexResponse {
    meta: OpenAlexMeta,
    #[serde(default)]
    results: Vec<OpenAlexWork>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexMeta {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    id: Option<String>,
    title: Option<String>,
    display_name: Option<String>,
    publication_date: Option<String>,
    doi: Option<String>,
    abstract_inverted_index: Option<serde_json::Value>,
    #[serde(default)]
    authorships: Vec<OpenAlexAuthorship>,
    primary_location: Option<OpenAlexLocation>,
    primary_topic: Option<OpenAlexTopic>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthorship {
    author: Option<OpenAlexAuthor>,
    #[serde(default)]
    institutions: Vec<OpenAlexInstitution>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexInstitution {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexLocation {
    landing_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexTopic {
    display_name: Option<String>,
    subfield: Option<OpenAlexSubfield>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexSubfield {
    display_name: Option<String>,
}

/// Search OpenAlex and return at most `options.max_papers` distinct papers.
pub async fn search(options: &SearchOptions) -> Result<Vec<PaperInput>> {
    let expression = options.search_expression();
    if expression.is_empty() {
        return Err(PaperTaskError::Validation(
            "at least one search keyword is required".to_string(),
        ));
    }

    if subjects::openalex_subfields(&options.research_categories).is_none() {
        warn!(
            categories = ?options.research_categories,
            "Research categories without an OpenAlex subfield, searching all subfields"
        );
    }

    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("rustpapertask/", env!("CARGO_PKG_VERSION")))
        .build()?;

    info!(
        query = %expression,
        start = %options.start_date,
        end = %options.end_date,
        max_papers = options.max_papers,
        "Starting OpenAlex search"
    );

    let mut papers = Vec::new();
    let mut seen = HashSet::new();
    let mut page = 1;

    while papers.len() < options.max_papers {
        let url = build_search_url(options, &expression, page)?;
        debug!(url = %url, page = page, "Fetching OpenAlex page");
        let body = fetch_page(&client, url.as_str()).await?;
        let response: OpenAlexResponse = serde_json::from_str(&body).map_err(|e| {
            PaperTaskError::Parse(format!("Failed to parse OpenAlex response: {}", e))
        })?;

        let fetched = response.results.len();
        for work in response.results {
            let Some(paper) = work_to_paper(work) else {
                continue;
            };
            let id = paper.id.clone().unwrap_or_else(|| paper.title.to_lowercase());
            if !seen.insert(id) {
                debug!(title = %paper.title, "Skipping duplicate work");
                continue;
            }
            papers.push(paper);
            if papers.len() >= options.max_papers {
                break;
            }
        }

        info!(page = page, fetched = fetched, collected = papers.len(), "Parsed OpenAlex page");

        let exhausted = (page * options.per_page()) as u64 >= response.meta.count;
        if fetched == 0 || exhausted {
            break;
        }
        page += 1;
    }

    info!(total = papers.len(), "OpenAlex search complete");
    Ok(papers)
}

fn build_search_url(options: &SearchOptions, expression: &str, page: usize) -> Result<Url> {
    let base = options.base_url.trim_end_matches('/');
    let mut url = Url::parse(&format!("{}/works", base))
        .map_err(|e| PaperTaskError::Config(format!("invalid OpenAlex base URL '{}': {}", base, e)))?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("search", expression)
            .append_pair("filter", &options.filter_expression())
            .append_pair("sort", "publication_date:desc")
            .append_pair("per-page", &options.per_page().to_string())
            .append_pair("page", &page.to_string())
            .append_pair("select", SELECT_FIELDS);
        if let Some(mailto) = &options.mailto {
            query.append_pair("mailto", mailto);
        }
    }
    Ok(url)
}

/// Fetch one page, backing off on 429.
async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let mut retries = 0;

    loop {
        let response = client.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.text().await?);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if retries < MAX_RATE_LIMIT_RETRIES {
                let backoff = Duration::from_secs(2u64.pow(retries));
                warn!(
                    retries = retries,
                    backoff_secs = backoff.as_secs(),
                    "Rate limited, backing off"
                );
                tokio::time::sleep(backoff).await;
                retries += 1;
                continue;
            }
            return Err(PaperTaskError::RateLimited(60));
        }

        return Err(PaperTaskError::Api {
            code: status.as_u16(),
            message: format!("OpenAlex API error: {}", status),
        });
    }
}

fn work_to_paper(work: OpenAlexWork) -> Option<PaperInput> {
    let title = work
        .display_name
        .or(work.title)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())?;

    let authors = work
        .authorships
        .into_iter()
        .filter_map(|a| {
            let name = a.author?.display_name?;
            let affiliation = a.institutions.into_iter().find_map(|i| i.display_name);
            Some(Author::Detailed { name, affiliation })
        })
        .collect();

    let source_url = work
        .primary_location
        .and_then(|l| l.landing_page_url)
        .or(work.doi)
        .or_else(|| work.id.clone());

    let categories: Vec<String> = work
        .primary_topic
        .map(|t| {
            [t.subfield.and_then(|s| s.display_name), t.display_name]
                .into_iter()
                .flatten()
                .collect()
        })
        .unwrap_or_default();

    Some(PaperInput {
        id: work.id,
        title,
        abstract_text: work
            .abstract_inverted_index
            .as_ref()
            .map(reconstruct_abstract)
            .unwrap_or_default(),
        authors,
        categories,
        published: work.publication_date,
        source_url,
    })
}

/// Rebuild plaintext from OpenAlex's `{word: [positions]}` abstract index.
fn reconstruct_abstract(inverted_index: &serde_json::Value) -> String {
    let Some(obj) = inverted_index.as_object() else {
        return String::new();
    };

    let mut words: Vec<(i64, &str)> = obj
        .iter()
        .filter_map(|(word, positions)| positions.as_array().map(|p| (word, p)))
        .flat_map(|(word, positions)| {
            positions
                .iter()
                .filter_map(|p| p.as_i64())
                .map(move |p| (p, word.as_str()))
        })
        .collect();

    words.sort_by_key(|(pos, _)| *pos);
    words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ")
}
