// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job types for the CloudOS client.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Instance type requested when none is set.
pub const DEFAULT_INSTANCE_TYPE: &str = "c5.xlarge";

/// Job name used when none is set.
pub const DEFAULT_JOB_NAME: &str = "new_job";

/// Job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is being provisioned.
    Initializing,
    /// Job is queued on an HPC/batch scheduler.
    Scheduled,
    /// Job is currently executing.
    Running,
    /// Job finished successfully.
    Completed,
    /// Job finished with error.
    Failed,
    /// An abort was requested and is in progress.
    Aborting,
    /// Job was aborted.
    Aborted,
    /// Status string not known to this SDK.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Aborted
        )
    }

    /// Wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Initializing => "initializing",
            JobStatus::Scheduled => "scheduled",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Aborting => "aborting",
            JobStatus::Aborted => "aborted",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        match value {
            "initializing" => JobStatus::Initializing,
            "scheduled" => JobStatus::Scheduled,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "aborting" => JobStatus::Aborting,
            "aborted" => JobStatus::Aborted,
            _ => JobStatus::Unknown,
        }
    }
}

/// A named resource embedded in a job (workflow, project, user).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Job details, as returned by the status and list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    /// Job ID.
    #[serde(rename = "_id")]
    pub job_id: String,
    /// Job name.
    #[serde(default)]
    pub name: Option<String>,
    /// Current status.
    pub status: JobStatus,
    /// Workflow the job runs.
    #[serde(default)]
    pub workflow: Option<NamedRef>,
    /// Project the job belongs to.
    #[serde(default)]
    pub project: Option<NamedRef>,
    /// When the job was submitted.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the job started executing.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// When the job finished.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Failure reason, if any.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobInfo {
    /// Wall-clock run time, once both start and end are known.
    pub fn run_time(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Result of listing jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobsResult {
    /// Jobs on the requested page.
    pub jobs: Vec<JobInfo>,
    /// Total number of matching jobs, when reported.
    pub total_count: Option<u64>,
}

/// A workflow parameter passed as `--name value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameter {
    pub name: String,
    pub value: String,
}

impl JobParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    fn to_wire(&self) -> Value {
        json!({
            "prefix": "--",
            "name": self.name,
            "parameterKind": "textValue",
            "textValue": self.value,
        })
    }
}

/// Options for submitting a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobOptions {
    /// Project ID the job is submitted to.
    pub project_id: String,
    /// Workflow ID to run.
    pub workflow_id: String,
    /// Job name.
    pub name: String,
    /// Workflow parameters, in order.
    pub parameters: Vec<JobParameter>,
    /// Instance type of the master node.
    pub instance_type: String,
    /// Whether the job can be resumed after failure.
    pub resumable: bool,
    /// Request a spot instance for the master node.
    pub spot: bool,
}

impl SubmitJobOptions {
    /// Create new options with required fields.
    pub fn new(project_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            workflow_id: workflow_id.into(),
            name: DEFAULT_JOB_NAME.to_string(),
            parameters: Vec::new(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            resumable: false,
            spot: false,
        }
    }

    /// Set the job name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a workflow parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(JobParameter::new(name, value));
        self
    }

    /// Set the master instance type.
    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = instance_type.into();
        self
    }

    /// Make the job resumable.
    pub fn with_resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }

    /// Request a spot master instance.
    pub fn with_spot(mut self, spot: bool) -> Self {
        self.spot = spot;
        self
    }

    /// Body for the job submission endpoint.
    pub fn to_request_body(&self) -> Value {
        json!({
            "project": self.project_id,
            "workflow": self.workflow_id,
            "name": self.name,
            "parameters": self.parameters.iter().map(JobParameter::to_wire).collect::<Vec<_>>(),
            "resumable": self.resumable,
            "masterInstance": {
                "requestedInstance": {
                    "type": self.instance_type,
                    "asSpot": self.spot,
                }
            },
        })
    }
}

/// Result of submitting a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResult {
    /// ID of the new job.
    #[serde(rename = "_id")]
    pub job_id: String,
}

/// Options for listing jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobsOptions {
    /// Page number, starting at 1.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Filter by status.
    pub status: Option<JobStatus>,
    /// Filter by project ID.
    pub project_id: Option<String>,
    /// List archived jobs instead of active ones.
    pub archived: bool,
}

impl Default for ListJobsOptions {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            project_id: None,
            archived: false,
        }
    }
}

impl ListJobsOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Filter by status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by project.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// List archived jobs.
    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }

    /// Query string parameters for the list endpoint.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("archived.status", self.archived.to_string()),
        ];
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(project_id) = &self.project_id {
            params.push(("project.id", project_id.clone()));
        }
        params
    }
}
