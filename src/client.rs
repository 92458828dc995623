//! GitHub REST API access
//!
//! [`GitHubClient`] issues the individual page requests. [`RunSource`] is the
//! seam between the concurrent executor and the network: the executor only
//! ever asks a source to resolve one [`FetchJob`] into a [`JobOutcome`].

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::sync::Arc;
use url::Url;

use crate::config::{ApiConfig, RetryConfig};
use crate::error::{Error, FetchError, Result};
use crate::pagination::paginate;
use crate::plan::created_filter_value;
use crate::retry::with_retry;
use crate::types::{FetchJob, JobOutcome, JobWarning, RawRun, RepoSummary, RunsPage};

/// Resolves fetch jobs into run records
#[async_trait]
pub trait RunSource: Send + Sync {
    /// Fetch every page of runs for one job
    ///
    /// Failures never escape as errors; they come back as
    /// [`JobOutcome::Warning`] carrying whatever was gathered before.
    async fn fetch_runs(&self, job: &FetchJob) -> JobOutcome;
}

/// Authenticated client for the GitHub REST API
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    accept: String,
    per_page: u32,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Create a client from API settings
    ///
    /// # Errors
    /// Returns error if no token is configured, the base URL is unusable, or
    /// the HTTP client cannot be created
    pub fn new(api: &ApiConfig, retry: RetryConfig) -> Result<Self> {
        let token = api
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingCredential)?
            .to_string();

        let base_url = Url::parse(&api.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(
                "api.base_url",
                format!("{} cannot be used as an API root", api.base_url),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(api.request_timeout)
            .user_agent(api.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            token,
            accept: api.accept.clone(),
            per_page: api.per_page,
            retry,
        })
    }

    /// Build `<base>/<segments...>`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, &self.accept)
    }

    /// List every repository of an organization, most recently updated first
    ///
    /// Any non-success page is fatal: without the repository list no fetch job
    /// can be planned.
    pub async fn list_repositories(&self, org: &str) -> Result<Vec<RepoSummary>> {
        let url = self.endpoint(&["orgs", org, "repos"]);

        let outcome = paginate(move |page| {
            let url = url.clone();
            async move {
                with_retry(&self.retry, || self.repos_page(url.clone(), org, page)).await
            }
        })
        .await;

        tracing::debug!(
            org,
            pages = outcome.requests,
            repos = outcome.items.len(),
            "Repository listing finished"
        );

        outcome.into_result()
    }

    async fn repos_page(&self, url: Url, org: &str, page: u32) -> Result<Vec<RepoSummary>> {
        let response = self
            .get(url)
            .query(&[
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Enumeration {
                namespace: org.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch one page of workflow runs for a job
    pub async fn runs_page(
        &self,
        org: &str,
        job: &FetchJob,
        page: u32,
    ) -> std::result::Result<Vec<RawRun>, FetchError> {
        let url = self.endpoint(&["repos", org, job.group.as_str(), "actions", "runs"]);

        tracing::trace!(repo = %job.group, status = %job.filter, page, "Requesting runs page");

        let response = self
            .get(url)
            .query(&runs_query(job, self.per_page, page))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let page: RunsPage =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(page.workflow_runs)
    }

    /// Fetch every page of a job, retrying transient page failures
    pub async fn job_runs(&self, org: &str, job: &FetchJob) -> JobOutcome {
        let outcome = paginate(move |page| async move {
            with_retry(&self.retry, || self.runs_page(org, job, page)).await
        })
        .await;

        match outcome.error {
            None => JobOutcome::Complete {
                runs: outcome.items,
            },
            Some(error) => JobOutcome::Warning {
                runs: outcome.items,
                warning: JobWarning {
                    group: job.group.clone(),
                    filter: job.filter,
                    error,
                },
            },
        }
    }
}

/// Query parameters of a runs page request
pub(crate) fn runs_query(job: &FetchJob, per_page: u32, page: u32) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("status", job.filter.as_query_value().to_string()),
        ("per_page", per_page.to_string()),
        ("page", page.to_string()),
    ];
    if let Some(since) = job.effective_created_since() {
        query.push(("created", created_filter_value(since)));
    }
    query
}

/// Production [`RunSource`] querying one organization's repositories
pub struct GitHubRunSource {
    client: Arc<GitHubClient>,
    org: String,
}

impl GitHubRunSource {
    /// Create a source for the given organization
    pub fn new(client: Arc<GitHubClient>, org: impl Into<String>) -> Self {
        Self {
            client,
            org: org.into(),
        }
    }
}

#[async_trait]
impl RunSource for GitHubRunSource {
    async fn fetch_runs(&self, job: &FetchJob) -> JobOutcome {
        self.client.job_runs(&self.org, job).await
    }
}
