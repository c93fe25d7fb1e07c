// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Takeoff Client
//!
//! Design-API side of the takeoff pipeline: batched element retrieval
//! with a multi-tier fallback ladder, viewability resolution without
//! billable conversions, and orchestration of the `takeoff-core`
//! stages into a full run.
//!
//! ## Retrieval ladder
//!
//! Element sources are tried in priority order: the rich structured
//! query service, then the simplified listing service, then (opt-in
//! only) deterministic placeholder data. Each tier is a strategy behind
//! the [`retrieve::ElementSource`] trait, so the ladder is data and
//! each tier is independently testable.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use takeoff_client::{ClientConfig, TakeoffPipeline};
//! use takeoff_client::retrieve::{CancelToken, ElementFilter};
//! use takeoff_core::{carbon::CarbonOptions, default_factor_table};
//!
//! let config = ClientConfig::from_env();
//! let pipeline = TakeoffPipeline::from_config(
//!     &config,
//!     default_factor_table().into(),
//!     CarbonOptions::default(),
//! )?;
//! let run = pipeline
//!     .run("design-urn", &ElementFilter::default(), &CancelToken::new())
//!     .await?;
//! println!("{} kgCO2e", run.carbon.total_kg_co2e);
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod retrieve;
pub mod sources;
pub mod viewability;

pub use api::{DesignApiClient, DesignInfo, ProbeOutcome, ProcessingStatus};
pub use config::ClientConfig;
pub use error::{ClientError, Result, RetrieveError};
pub use pipeline::{TakeoffPipeline, TakeoffRun};
pub use retrieve::{
    CancelToken, DataProvenance, ElementFilter, ElementPage, ElementRetriever, ElementSource,
    FetchResult,
};
pub use sources::{PlaceholderSource, SimpleListSource, StructuredQuerySource};
pub use viewability::{DesignMetadata, ViewStatus, ViewableModel, ViewabilityResolver};
