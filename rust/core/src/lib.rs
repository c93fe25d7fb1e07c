// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Takeoff Core
//!
//! Quantity takeoff and embodied-carbon calculation for building
//! models. This crate is pure computation: it consumes normalized
//! [`Element`]s and produces aggregated quantities, element-type
//! groupings with classification codes, and an embodied-carbon result.
//! Retrieval from a design API lives in `takeoff-client`.
//!
//! ## Pipeline stages
//!
//! - **Classification** ([`classify`]): material-name extraction from
//!   the raw property bag, then material-type classification.
//! - **Aggregation** ([`aggregate`]): (material, category) buckets and
//!   (family, type mark) element-type groups with classification-code
//!   derivation.
//! - **Carbon** ([`carbon`]): three-tier factor matching with
//!   data-quality scoring.
//! - **Export** ([`export`]): CSV rows for the presentation layer.
//!
//! ## Quick Start
//!
//! ```rust
//! use takeoff_core::{aggregate, carbon, reference, Element};
//!
//! let elements: Vec<Element> = vec![/* normalized elements */];
//! let materials = aggregate::aggregate_materials(&elements);
//! let factors = reference::default_factor_table();
//! let result = carbon::calculate_embodied_carbon(
//!     &materials,
//!     &factors,
//!     &carbon::CarbonOptions::default(),
//! );
//! assert_eq!(result.total_kg_co2e, 0.0);
//! ```

pub mod aggregate;
pub mod carbon;
pub mod classify;
pub mod error;
pub mod export;
pub mod model;
pub mod reference;

pub use aggregate::{aggregate_element_types, aggregate_materials};
pub use carbon::{calculate_embodied_carbon, CarbonOptions, QualityThresholds};
pub use classify::{classify, classify_material_type, extract_material_name};
pub use error::{Error, Result};
pub use model::{
    CarbonFactor, Classification, DataQuality, Element, ElementType, ElementTypeAggregation,
    ElementTypeMaterial, EmbodiedCarbonResult, FactorUnit, MatchTier, MaterialCarbonResult,
    MaterialQuantity, MaterialType, QuantityBasis,
};
pub use reference::default_factor_table;
