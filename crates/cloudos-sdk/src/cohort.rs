// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cohort-browser cohorts and their filter state.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::query::{Phenotype, QueryNode};

/// A cohort as stored by the cohort browser.
///
/// The cohort owns its current filter query. Deserializing a cohort whose
/// stored query is not a valid predicate tree fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    /// Cohort ID.
    #[serde(rename = "_id")]
    pub id: String,
    /// Cohort name.
    pub name: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Participants matching the stored query, as last computed by CloudOS.
    #[serde(
        default,
        rename = "numberOfParticipants",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_participants: Option<u64>,
    #[serde(default)]
    query: Option<QueryNode>,
    /// Table columns, echoed back to the API untouched.
    #[serde(default)]
    pub columns: Vec<Value>,
}

impl Cohort {
    /// Create an unfiltered cohort.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            num_participants: None,
            query: None,
            columns: Vec::new(),
        }
    }

    /// The current filter, if any.
    pub fn query(&self) -> Option<&QueryNode> {
        self.query.as_ref()
    }

    /// Every phenotype filter in the current query.
    pub fn phenotypes(&self) -> Vec<&Phenotype> {
        self.query
            .as_ref()
            .map(QueryNode::phenotypes)
            .unwrap_or_default()
    }

    /// Install `query` as the cohort filter.
    ///
    /// With `keep_existing`, the new query is combined with the current one
    /// (`existing AND query`) instead of replacing it. The stored result is
    /// normalized.
    pub fn apply_query(&mut self, query: impl Into<QueryNode>, keep_existing: bool) {
        let query = query.into();
        let combined = match self.query.take() {
            Some(existing) if keep_existing => QueryNode::from(existing.and(query)),
            _ => query,
        };
        let normalized = combined.normalize();
        debug!(cohort_id = %self.id, query = %normalized, "Applied cohort query");
        self.query = Some(normalized);
    }

    /// Remove the current filter.
    pub fn clear_query(&mut self) {
        self.query = None;
    }

    /// The query as it should be sent: normalized, and `None` when nothing
    /// is left to filter on.
    pub fn normalized_query(&self) -> Option<QueryNode> {
        outgoing_query(self.query.as_ref())
    }

    pub(crate) fn set_stored_query(&mut self, query: Option<QueryNode>) {
        self.query = query;
    }

    /// Body for the cohort filters endpoint.
    pub fn filter_body(&self) -> Value {
        json!({
            "query": self.normalized_query(),
            "columns": self.columns,
        })
    }
}

/// Normalize a query for sending; an empty composite becomes `None`.
pub(crate) fn outgoing_query(query: Option<&QueryNode>) -> Option<QueryNode> {
    query
        .cloned()
        .map(QueryNode::normalize)
        .filter(|query| !query.is_empty())
}

/// Options for creating a cohort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCohortOptions {
    /// Cohort name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateCohortOptions {
    /// Create options for a cohort named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
