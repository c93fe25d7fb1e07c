// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the takeoff core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum Error {
    /// An element object could not be normalized. Callers skip the
    /// element and count it in the run's skipped tally.
    #[error("Malformed element: {0}")]
    MalformedElement(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
