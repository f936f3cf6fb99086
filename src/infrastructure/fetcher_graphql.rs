#![allow(non_snake_case)]

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};

use crate::{
    FetchError, PageFetcher, RateLimitSnapshot, Repository, RepositoryPage, SearchPageRequest,
    StdResult,
};

/// The GraphQL production endpoint for GitHub.
pub const GITHUB_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

/// Substring marking a rate-limit error in the provider's `errors` payload.
const RATE_LIMIT_PATTERN: &str = "rate limit";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SEARCH_QUERY: &str = r#"
query ($searchQuery: String!, $first: Int!, $after: String) {
  search(query: $searchQuery, type: REPOSITORY, first: $first, after: $after) {
    edges {
      node {
        ... on Repository {
          id
          nameWithOwner
          stargazerCount
          createdAt
        }
      }
    }
    pageInfo {
      endCursor
      hasNextPage
    }
  }
  rateLimit {
    limit
    cost
    remaining
    resetAt
  }
}
"#;

/// Variables attached to the search query. The filter always travels as a
/// variable, never interpolated into the query text.
#[derive(Debug, Serialize)]
struct SearchQueryVariables {
    searchQuery: String,
    first: u16,
    after: Option<String>,
}

impl From<&SearchPageRequest> for SearchQueryVariables {
    fn from(request: &SearchPageRequest) -> Self {
        Self {
            searchQuery: request.query.to_owned(),
            first: request.first,
            after: request.after.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequestBody {
    query: &'static str,
    variables: SearchQueryVariables,
}

#[derive(Deserialize, Debug)]
struct GraphQlResponseBody {
    data: Option<SearchQueryData>,
    errors: Option<Vec<GraphQlResponseError>>,
}

#[derive(Deserialize, Debug)]
struct GraphQlResponseError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct SearchQueryData {
    search: SearchResult,
    rateLimit: Option<RateLimit>,
}

#[derive(Deserialize, Debug)]
struct SearchResult {
    edges: Vec<Option<SearchEdge>>,
    pageInfo: PageInfo,
}

#[derive(Deserialize, Debug)]
struct SearchEdge {
    node: RepositoryNode,
}

#[derive(Deserialize, Debug)]
struct RepositoryNode {
    id: String,
    nameWithOwner: String,
    stargazerCount: u32,
    createdAt: String,
}

#[derive(Deserialize, Debug)]
struct PageInfo {
    endCursor: Option<String>,
    hasNextPage: bool,
}

#[derive(Deserialize, Debug)]
struct RateLimit {
    limit: i32,
    cost: i32,
    remaining: i32,
    resetAt: String,
}

impl TryFrom<RateLimit> for RateLimitSnapshot {
    type Error = FetchError;

    fn try_from(rate_limit: RateLimit) -> Result<Self, Self::Error> {
        let reset_at = parse_timestamp(&rate_limit.resetAt, "resetAt")?;
        Ok(Self {
            limit: rate_limit.limit,
            cost: rate_limit.cost,
            remaining: rate_limit.remaining,
            reset_at,
        })
    }
}

impl TryFrom<RepositoryNode> for Repository {
    type Error = FetchError;

    fn try_from(node: RepositoryNode) -> Result<Self, Self::Error> {
        let created_at = parse_timestamp(&node.createdAt, "createdAt")?;
        Ok(Repository::new(
            &node.id,
            &node.nameWithOwner,
            node.stargazerCount,
            created_at,
        ))
    }
}

impl TryFrom<SearchQueryData> for RepositoryPage {
    type Error = FetchError;

    fn try_from(data: SearchQueryData) -> Result<Self, Self::Error> {
        let rate_limit = data.rateLimit.map(RateLimitSnapshot::try_from).transpose()?;
        let repositories = data
            .search
            .edges
            .into_iter()
            .flatten()
            .map(|edge| Repository::try_from(edge.node))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RepositoryPage::new(
            repositories,
            data.search.pageInfo.hasNextPage,
            data.search.pageInfo.endCursor,
            rate_limit,
        ))
    }
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, FetchError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| FetchError::Fatal(format!("Invalid {field} timestamp '{value}': {error}")))
}

/// Issues one search request per call and classifies the response.
pub struct GraphQlPageFetcher {
    client: Client,
    endpoint: String,
    bearer_token: String,
}

impl GraphQlPageFetcher {
    /// Creates a new `GraphQlPageFetcher` with the bearer token taken from
    /// the `GITHUB_API_TOKEN` environment variable.
    pub fn try_new(endpoint: &str) -> StdResult<Self> {
        let api_token = std::env::var("GITHUB_API_TOKEN")
            .with_context(|| "Missing GITHUB_API_TOKEN environment variable")?;

        Self::try_new_with_token(endpoint, &api_token)
    }

    /// Creates a new `GraphQlPageFetcher` with an explicit bearer token.
    pub fn try_new_with_token(endpoint: &str, api_token: &str) -> StdResult<Self> {
        let client = Client::builder()
            .user_agent("star-crawler")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            bearer_token: format!("Bearer {api_token}"),
        })
    }

    fn classify_status(status: StatusCode) -> Option<FetchError> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Some(FetchError::RateLimited(format!("HTTP status {status}")))
        } else if status.is_server_error() {
            Some(FetchError::Transport(format!("HTTP status {status}")))
        } else if !status.is_success() {
            Some(FetchError::Fatal(format!("Unexpected HTTP status {status}")))
        } else {
            None
        }
    }

    fn classify_errors(errors: &[GraphQlResponseError]) -> FetchError {
        let messages = errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        if messages.to_lowercase().contains(RATE_LIMIT_PATTERN) {
            FetchError::RateLimited(messages)
        } else {
            FetchError::Fatal(messages)
        }
    }
}

#[async_trait::async_trait]
impl PageFetcher for GraphQlPageFetcher {
    async fn fetch_page(
        &self,
        request: &SearchPageRequest,
    ) -> Result<RepositoryPage, FetchError> {
        let body = GraphQlRequestBody {
            query: SEARCH_QUERY,
            variables: request.into(),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, &self.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;

        if let Some(error) = Self::classify_status(response.status()) {
            return Err(error);
        }

        let raw_body = response
            .text()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;
        let parsed: GraphQlResponseBody = serde_json::from_str(&raw_body)
            .map_err(|error| FetchError::Fatal(format!("Malformed response body: {error}")))?;

        if let Some(errors) = parsed.errors.filter(|errors| !errors.is_empty()) {
            return Err(Self::classify_errors(&errors));
        }
        let data = parsed
            .data
            .ok_or_else(|| FetchError::Fatal("Response carries neither data nor errors".to_string()))?;

        data.try_into()
    }
}
