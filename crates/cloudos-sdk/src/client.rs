// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! CloudosClient for interacting with the CloudOS REST API.

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::cohort::{Cohort, CreateCohortOptions, outgoing_query};
use crate::config::SdkConfig;
use crate::error::{Result, SdkError};
use crate::query::QueryNode;
use crate::types::{JobInfo, ListJobsOptions, ListJobsResult, SubmitJobOptions, SubmitJobResult};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "apikey";

/// Client for CloudOS jobs and cohort-browser cohorts.
///
/// Every request is scoped to the configured workspace and authenticated with
/// the configured API key. Requests are not retried.
pub struct CloudosClient {
    http: reqwest::Client,
    config: SdkConfig,
}

#[derive(Deserialize)]
struct ListJobsResponse {
    jobs: Vec<JobInfo>,
    #[serde(default, rename = "paginationMetadata")]
    pagination: Option<PaginationMetadata>,
}

#[derive(Deserialize)]
struct PaginationMetadata {
    #[serde(default, rename = "Pagination-Count")]
    count: Option<u64>,
}

#[derive(Deserialize)]
struct ParticipantCount {
    count: u64,
}

impl CloudosClient {
    /// Create a new client with the given configuration.
    pub fn new(config: SdkConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(SdkError::Config("api_key is required".to_string()));
        }
        if config.workspace_id.is_empty() {
            return Err(SdkError::Config("workspace_id is required".to_string()));
        }

        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| SdkError::Config(format!("invalid api_key: {}", e)))?;
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.skip_cert_verification)
            .build()
            .map_err(|e| SdkError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = SdkConfig::from_env()?;
        Self::new(config)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.config.endpoint(path))
            .query(&[("teamId", self.config.workspace_id.as_str())])
    }

    fn transport_error(&self, err: reqwest::Error) -> SdkError {
        if !err.is_timeout() {
            return SdkError::Connection(err.to_string());
        }
        let limit = if err.is_connect() {
            self.config.connect_timeout
        } else {
            self.config.request_timeout
        };
        SdkError::Timeout(limit.as_millis() as u64)
    }

    /// Send a request, turning non-success statuses into `SdkError::Server`.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(SdkError::Server {
            code: status.as_u16().to_string(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&body).map_err(|e| SdkError::UnexpectedResponse(e.to_string()))
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Submit a workflow job.
    #[instrument(skip(self, options), fields(project_id = %options.project_id, workflow_id = %options.workflow_id))]
    pub async fn submit_job(&self, options: SubmitJobOptions) -> Result<SubmitJobResult> {
        info!(name = %options.name, "Submitting job");

        if options.project_id.is_empty() || options.workflow_id.is_empty() {
            return Err(SdkError::InvalidInput(
                "project_id and workflow_id are required".to_string(),
            ));
        }

        let result: SubmitJobResult = self
            .send_json(
                self.request(Method::POST, "/api/v2/jobs")
                    .json(&options.to_request_body()),
            )
            .await?;

        info!(job_id = %result.job_id, "Job submitted");
        Ok(result)
    }

    /// Get status and details of a job.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobInfo> {
        debug!("Getting job status");

        self.send_json(self.request(Method::GET, &format!("/api/v1/jobs/{}", job_id)))
            .await
            .map_err(|e| not_found(e, || SdkError::JobNotFound(job_id.to_string())))
    }

    /// List one page of jobs.
    #[instrument(skip(self))]
    pub async fn list_jobs(&self, options: ListJobsOptions) -> Result<ListJobsResult> {
        debug!("Listing jobs");

        let response: ListJobsResponse = self
            .send_json(
                self.request(Method::GET, "/api/v2/jobs")
                    .query(&options.to_query_params()),
            )
            .await?;

        Ok(ListJobsResult {
            jobs: response.jobs,
            total_count: response.pagination.and_then(|p| p.count),
        })
    }

    /// Abort a running job.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn abort_job(&self, job_id: &str) -> Result<()> {
        info!("Aborting job");

        self.send(self.request(Method::PUT, &format!("/api/v1/jobs/{}/abort", job_id)))
            .await
            .map_err(|e| not_found(e, || SdkError::JobNotFound(job_id.to_string())))?;
        Ok(())
    }

    /// Archive jobs so they no longer show in the default job list.
    pub async fn archive_jobs(&self, job_ids: &[&str]) -> Result<()> {
        self.set_archived(job_ids, true).await
    }

    /// Move archived jobs back to the job list.
    pub async fn unarchive_jobs(&self, job_ids: &[&str]) -> Result<()> {
        self.set_archived(job_ids, false).await
    }

    #[instrument(skip(self), fields(count = job_ids.len()))]
    async fn set_archived(&self, job_ids: &[&str], archived: bool) -> Result<()> {
        if job_ids.is_empty() {
            return Err(SdkError::InvalidInput("no job IDs given".to_string()));
        }
        info!(archived, "Updating job archive status");

        let mut archive = json!({ "status": archived });
        if archived {
            archive["archivalTimestamp"] = Value::String(Utc::now().to_rfc3339());
        }
        let body = json!({
            "jobIds": job_ids,
            "update": { "archived": archive },
        });

        self.send(self.request(Method::PUT, "/api/v1/jobs").json(&body))
            .await?;
        Ok(())
    }

    /// Wait for a job to reach a terminal state.
    ///
    /// Returns the final job info once it is completed, failed or aborted.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        poll_interval: std::time::Duration,
    ) -> Result<JobInfo> {
        loop {
            let info = self.get_job_status(job_id).await?;
            if info.status.is_terminal() {
                return Ok(info);
            }
            debug!(status = info.status.as_str(), "Job still in progress");
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Submit a job and wait for completion.
    pub async fn run_job(
        &self,
        options: SubmitJobOptions,
        poll_interval: std::time::Duration,
    ) -> Result<JobInfo> {
        let result = self.submit_job(options).await?;
        self.wait_for_completion(&result.job_id, poll_interval)
            .await
    }

    // =========================================================================
    // Cohorts
    // =========================================================================

    /// Fetch a cohort and its current query.
    ///
    /// A stored query that cannot be parsed yields `SdkError::MalformedPredicate`.
    #[instrument(skip(self), fields(cohort_id = %cohort_id))]
    pub async fn get_cohort(&self, cohort_id: &str) -> Result<Cohort> {
        debug!("Getting cohort");

        let raw: Value = self
            .send_json(self.request(
                Method::GET,
                &format!("/cohort-browser/v2/cohort/{}", cohort_id),
            ))
            .await
            .map_err(|e| not_found(e, || SdkError::CohortNotFound(cohort_id.to_string())))?;

        cohort_from_response(raw)
    }

    /// Create an empty cohort.
    #[instrument(skip(self, options), fields(name = %options.name))]
    pub async fn create_cohort(&self, options: CreateCohortOptions) -> Result<Cohort> {
        info!("Creating cohort");

        let raw: Value = self
            .send_json(self.request(Method::POST, "/cohort-browser/v2/cohort").json(&options))
            .await?;

        cohort_from_response(raw)
    }

    /// Store the cohort's current query and columns, returning the updated cohort.
    #[instrument(skip(self, cohort), fields(cohort_id = %cohort.id))]
    pub async fn save_cohort_query(&self, cohort: &Cohort) -> Result<Cohort> {
        info!("Saving cohort query");

        let raw: Value = self
            .send_json(
                self.request(
                    Method::PUT,
                    &format!("/cohort-browser/v2/cohort/{}/filters", cohort.id),
                )
                .json(&cohort.filter_body()),
            )
            .await
            .map_err(|e| not_found(e, || SdkError::CohortNotFound(cohort.id.clone())))?;

        cohort_from_response(raw)
    }

    /// Count the participants a query would select, without saving it.
    #[instrument(skip(self, query), fields(cohort_id = %cohort_id))]
    pub async fn preview_participant_count(
        &self,
        cohort_id: &str,
        query: Option<&QueryNode>,
    ) -> Result<u64> {
        let query = outgoing_query(query);
        if let Some(query) = &query {
            debug!(query = %query, "Previewing participant count");
        }

        let response: ParticipantCount = self
            .send_json(
                self.request(
                    Method::POST,
                    &format!(
                        "/cohort-browser/v2/cohort/{}/filter/participants/count",
                        cohort_id
                    ),
                )
                .json(&json!({ "query": query })),
            )
            .await
            .map_err(|e| not_found(e, || SdkError::CohortNotFound(cohort_id.to_string())))?;

        Ok(response.count)
    }
}

/// Replace a 404 server error with a specific not-found error.
fn not_found(err: SdkError, not_found: impl FnOnce() -> SdkError) -> SdkError {
    match err {
        SdkError::Server { code, .. } if code == "404" => not_found(),
        other => other,
    }
}

/// Build a cohort from an API response, parsing its query separately so a bad
/// query surfaces as `SdkError::MalformedPredicate`.
fn cohort_from_response(mut raw: Value) -> Result<Cohort> {
    let query = match raw.get_mut("query").map(Value::take) {
        None | Some(Value::Null) => None,
        Some(query) => Some(QueryNode::parse(&query)?),
    };

    let mut cohort: Cohort = serde_json::from_value(raw)
        .map_err(|e| SdkError::UnexpectedResponse(format!("invalid cohort: {}", e)))?;
    cohort.set_stored_query(query);
    Ok(cohort)
}
