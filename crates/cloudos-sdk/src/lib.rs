// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! CloudOS SDK
//!
//! Client library for the CloudOS bioinformatics platform.
//!
//! # Architecture
//!
//! - [`query`]: cohort filter expressions (phenotype leaves combined with
//!   `AND`/`OR`/`NOT`), their normalization and their JSON wire format
//! - [`Cohort`]: a cohort-browser cohort owning its current query
//! - [`CloudosClient`]: REST calls for jobs (submit, status, list, abort,
//!   archive) and cohorts (load, create, save query, preview counts)
//!
//! # Example
//!
//! ```no_run
//! use cloudos_sdk::{CloudosClient, Phenotype, SubmitJobOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CloudosClient::from_env()?;
//!
//! // Narrow a cohort to women aged 40 to 65
//! let mut cohort = client.get_cohort("64f1c2e8a1").await?;
//! cohort.apply_query(
//!     Phenotype::discrete(31, ["Female"]) & Phenotype::range(21022, 40, 65),
//!     true,
//! );
//! let count = client
//!     .preview_participant_count(&cohort.id, cohort.query())
//!     .await?;
//! println!("{} participants", count);
//! let cohort = client.save_cohort_query(&cohort).await?;
//!
//! // Submit a job and check on it
//! let options = SubmitJobOptions::new("project-id", "workflow-id")
//!     .with_name("gwas-run")
//!     .with_parameter("cohort", &cohort.id);
//! let submitted = client.submit_job(options).await?;
//! let info = client.get_job_status(&submitted.job_id).await?;
//! println!("Status: {:?}", info.status);
//! # Ok(())
//! # }
//! ```

mod client;
mod cohort;
mod config;
mod error;
pub mod query;
mod types;

pub use client::CloudosClient;
pub use cohort::{Cohort, CreateCohortOptions};
pub use config::{DEFAULT_BASE_URL, SdkConfig};
pub use error::{Result, SdkError};
pub use query::{
    FieldId, MalformedPredicateError, Operator, Phenotype, PhenotypeValue, Query, QueryNode,
};
pub use types::{
    DEFAULT_INSTANCE_TYPE, DEFAULT_JOB_NAME, JobInfo, JobParameter, JobStatus, ListJobsOptions,
    ListJobsResult, NamedRef, SubmitJobOptions, SubmitJobResult,
};
