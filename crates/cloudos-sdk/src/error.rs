// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for cloudos-sdk.

use thiserror::Error;

use crate::query::MalformedPredicateError;

/// Result type using SdkError.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors that can occur when using the SDK.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The request could not reach CloudOS.
    #[error("connection error: {0}")]
    Connection(String),

    /// Request timed out. Holds the configured limit that was exceeded, in
    /// milliseconds: the connect timeout if the connection was never made,
    /// otherwise the request timeout.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// CloudOS answered with a non-success status.
    #[error("server error [{code}]: {message}")]
    Server { code: String, message: String },

    /// Response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// Cohort not found.
    #[error("cohort not found: {0}")]
    CohortNotFound(String),

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A cohort query could not be parsed.
    #[error(transparent)]
    MalformedPredicate(#[from] MalformedPredicateError),
}
