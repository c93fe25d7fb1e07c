// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client configuration loaded from environment variables.

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the design API.
    pub base_url: String,
    /// Bearer token supplied by the authentication collaborator.
    pub access_token: String,
    /// Elements requested per page.
    pub batch_size: usize,
    /// Hard cap on pages fetched per run; hitting it yields a
    /// truncation warning, not a failure.
    pub max_batches: usize,
    /// Timeout for each outbound request in seconds.
    pub request_timeout_secs: u64,
    /// Opt-in: synthesize placeholder elements when every real tier
    /// fails. Results from this path are always flagged as synthetic.
    pub allow_placeholder_data: bool,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TAKEOFF_BASE_URL")
                .unwrap_or_else(|_| "https://developer.api.example.com".into()),
            access_token: std::env::var("TAKEOFF_ACCESS_TOKEN").unwrap_or_default(),
            batch_size: std::env::var("TAKEOFF_BATCH_SIZE")
                .unwrap_or_else(|_| "1000".into())
                .parse()
                .unwrap_or(1000),
            max_batches: std::env::var("TAKEOFF_MAX_BATCHES")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
            request_timeout_secs: std::env::var("TAKEOFF_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            allow_placeholder_data: std::env::var("TAKEOFF_ALLOW_PLACEHOLDER")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
