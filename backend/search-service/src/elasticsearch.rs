use crate::config::SearchConfig;
use crate::models::{HitKind, SearchHit};
use async_trait::async_trait;
use elasticsearch::{
    http::transport::{BuildError, SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch, SearchParts,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid Elasticsearch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build transport: {0}")]
    TransportBuild(#[from] BuildError),
    #[error("transport error: {0}")]
    Transport(#[from] elasticsearch::Error),
    #[error("search returned status {0}")]
    Status(u16),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Which indexed fields a query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    All,
    Username,
    Content,
}

impl SearchScope {
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            SearchScope::All => &["username", "content"],
            SearchScope::Username => &["username"],
            SearchScope::Content => &["content"],
        }
    }
}

/// Full-text search over the post and user indices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// One query, hits returned in index order.
    async fn search(&self, query: &str, scope: SearchScope) -> Result<Vec<SearchHit>, SearchError>;
}

#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Elasticsearch,
    post_index: String,
    user_index: String,
    max_hits: i64,
}

impl ElasticsearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let parsed = Url::parse(&config.url)?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let transport = TransportBuilder::new(pool).build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            post_index: config.post_index.clone(),
            user_index: config.user_index.clone(),
            max_hits: config.max_hits,
        })
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchClient {
    async fn search(&self, query: &str, scope: SearchScope) -> Result<Vec<SearchHit>, SearchError> {
        let body = build_query_body(query, scope, self.max_hits);

        let response = self
            .client
            .search(SearchParts::Index(&[
                self.post_index.as_str(),
                self.user_index.as_str(),
            ]))
            .body(body)
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let raw: Value = response.json().await?;
        let parsed: SearchResponse = serde_json::from_value(raw)?;
        let hits = into_search_hits(parsed, &self.post_index, &self.user_index);

        debug!(query = %query, hits = hits.len(), "Elasticsearch query completed");
        Ok(hits)
    }
}

fn build_query_body(query: &str, scope: SearchScope, size: i64) -> Value {
    json!({
        "size": size,
        "query": {
            "multi_match": {
                "query": query,
                "fields": scope.fields(),
                "fuzziness": "AUTO"
            }
        }
    })
}

fn into_search_hits(response: SearchResponse, post_index: &str, user_index: &str) -> Vec<SearchHit> {
    response
        .hits
        .hits
        .into_iter()
        .filter_map(|hit| {
            let kind = if hit.index == post_index {
                HitKind::Post
            } else if hit.index == user_index {
                HitKind::User
            } else {
                HitKind::from_tag(&hit.index)
            };
            hit.source.map(|source| SearchHit::new(kind, source))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: InnerHits,
}

#[derive(Debug, Deserialize)]
struct InnerHits {
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_source")]
    source: Option<Map<String, Value>>,
}
