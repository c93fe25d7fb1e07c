// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for design-API retrieval and viewability resolution.

use thiserror::Error;

/// Failures while retrieving elements from one source tier.
///
/// Transient failures and oversized batches are recovered locally (the
/// fallback ladder, or an automatic batch split); a missing design is
/// fatal for the run and aborts the ladder immediately.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("Design not found: {0}")]
    DesignNotFound(String),

    #[error("Transient fetch error: {0}")]
    Transient(String),

    #[error("Batch too large at offset {offset} (limit {limit})")]
    BatchTooLarge { offset: usize, limit: usize },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Client-level error types.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Retrieval failed: {0}")]
    Retrieve(#[from] RetrieveError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
