// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Viewability resolution: determine whether a displayable derivative
//! already exists for a design without triggering a billable
//! conversion.
//!
//! The invariant is structural: this crate exposes no translate/submit
//! operation, so no path from the resolver can start a conversion job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::{DesignApiClient, DesignInfo, ProbeOutcome};
use crate::error::{ClientError, RetrieveError};

/// File extensions the viewer can display natively, without the
/// standard derivative pipeline.
const NATIVE_VIEWABLE_EXTENSIONS: &[&str] = &["ifc", "dwg", "dxf", "nwd"];

/// Viewability status for one design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewStatus {
    /// A derivative exists; the viewer reference is usable now.
    Ready,
    /// A derivative is being produced by a job someone else started.
    Processing,
    /// Derivative production failed upstream.
    Failed,
    /// Nothing displayable exists and nothing was requested.
    NotViewable,
}

/// Per-design viewability answer. Ephemeral; recomputed on each check
/// and never cached beyond the caller's request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewableModel {
    pub design_id: String,
    pub status: ViewStatus,
    /// Standard viewer reference, when ready via the derivative path.
    pub viewer_ref: Option<String>,
    /// Native-viewer path, when ready via a natively-viewable format.
    pub native_path: bool,
    pub message: String,
}

/// Metadata operations the resolver depends on. [`DesignApiClient`]
/// implements this; tests inject doubles.
#[async_trait]
pub trait DesignMetadata: Send + Sync {
    async fn get_design(
        &self,
        project_id: &str,
        design_id: &str,
    ) -> Result<DesignInfo, RetrieveError>;

    async fn probe_manifest(&self, viewer_urn: &str) -> ProbeOutcome;
}

#[async_trait]
impl DesignMetadata for DesignApiClient {
    async fn get_design(
        &self,
        project_id: &str,
        design_id: &str,
    ) -> Result<DesignInfo, RetrieveError> {
        DesignApiClient::get_design(self, project_id, design_id).await
    }

    async fn probe_manifest(&self, viewer_urn: &str) -> ProbeOutcome {
        DesignApiClient::probe_manifest(self, viewer_urn).await
    }
}

/// Resolves viewability through metadata checks only.
pub struct ViewabilityResolver<A: DesignMetadata> {
    api: A,
}

impl<A: DesignMetadata> ViewabilityResolver<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Determine whether a design is already viewable.
    ///
    /// Order: for a ready design, probe the derivative manifest; for a
    /// natively-viewable source format, use the native path; otherwise
    /// not viewable. A design still processing is reported not viewable
    /// rather than waited on or translated.
    pub async fn resolve(
        &self,
        project_id: &str,
        design_id: &str,
    ) -> Result<ViewableModel, ClientError> {
        let design = self.api.get_design(project_id, design_id).await?;

        match design.status {
            crate::api::ProcessingStatus::Ready => {
                let urn = viewer_urn(project_id, design_id);
                match self.api.probe_manifest(&urn).await {
                    ProbeOutcome::Exists => {
                        return Ok(ViewableModel {
                            design_id: design_id.to_string(),
                            status: ViewStatus::Ready,
                            viewer_ref: Some(urn),
                            native_path: false,
                            message: "Derivative exists; model is viewable".into(),
                        });
                    }
                    ProbeOutcome::Pending => {
                        return Ok(ViewableModel {
                            design_id: design_id.to_string(),
                            status: ViewStatus::Processing,
                            viewer_ref: None,
                            native_path: false,
                            message: "Derivative generation already in progress".into(),
                        });
                    }
                    ProbeOutcome::Absent | ProbeOutcome::Inconclusive => {
                        tracing::debug!(design_id, "No derivative found; checking native formats");
                    }
                }
            }
            crate::api::ProcessingStatus::Failed => {
                return Ok(ViewableModel {
                    design_id: design_id.to_string(),
                    status: ViewStatus::Failed,
                    viewer_ref: None,
                    native_path: false,
                    message: "Upstream processing failed".into(),
                });
            }
            crate::api::ProcessingStatus::Processing => {
                return Ok(ViewableModel {
                    design_id: design_id.to_string(),
                    status: ViewStatus::NotViewable,
                    viewer_ref: None,
                    native_path: false,
                    message: "Design is still processing; no conversion was requested".into(),
                });
            }
            crate::api::ProcessingStatus::Unknown => {}
        }

        if let Some(extension) = design.file_name.as_deref().and_then(file_extension) {
            if NATIVE_VIEWABLE_EXTENSIONS.contains(&extension.as_str()) {
                return Ok(ViewableModel {
                    design_id: design_id.to_string(),
                    status: ViewStatus::Ready,
                    viewer_ref: None,
                    native_path: true,
                    message: format!("Viewable natively as .{extension}"),
                });
            }
        }

        Ok(ViewableModel {
            design_id: design_id.to_string(),
            status: ViewStatus::NotViewable,
            viewer_ref: None,
            native_path: false,
            message: "No displayable representation exists".into(),
        })
    }
}

/// Deterministic viewer reference for a (project, design) pair.
fn viewer_urn(project_id: &str, design_id: &str) -> String {
    format!("urn:takeoff.viewable:{project_id}.{design_id}")
}

fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}
