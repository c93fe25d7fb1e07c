// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Concrete element-source tiers: the structured query service, the
//! simplified listing service, and the opt-in placeholder generator.

use std::sync::Arc;

use async_trait::async_trait;
use takeoff_core::Element;

use crate::api::{DesignApiClient, RawPage};
use crate::error::RetrieveError;
use crate::retrieve::{DataProvenance, ElementFilter, ElementPage, ElementSource};

/// Normalize a raw page, skipping malformed elements with a tally.
fn normalize_page(raw: RawPage) -> ElementPage {
    let mut elements = Vec::with_capacity(raw.items.len());
    let mut skipped = 0usize;

    for item in &raw.items {
        match Element::from_value(item) {
            Ok(element) => elements.push(element),
            Err(err) => {
                tracing::debug!(%err, "Skipping malformed element");
                skipped += 1;
            }
        }
    }

    ElementPage {
        elements,
        total: raw.total,
        has_more: raw.has_more,
        skipped,
    }
}

/// Primary tier: rich structured query endpoint.
pub struct StructuredQuerySource {
    api: Arc<DesignApiClient>,
}

impl StructuredQuerySource {
    pub fn new(api: Arc<DesignApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ElementSource for StructuredQuerySource {
    fn name(&self) -> &str {
        "structured-query"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Primary
    }

    async fn fetch_page(
        &self,
        design_id: &str,
        filter: &ElementFilter,
        offset: usize,
        limit: usize,
    ) -> Result<ElementPage, RetrieveError> {
        let raw = self.api.query_elements(design_id, filter, offset, limit).await?;
        Ok(normalize_page(raw))
    }
}

/// Second tier: plain listing endpoint with GET pagination.
pub struct SimpleListSource {
    api: Arc<DesignApiClient>,
}

impl SimpleListSource {
    pub fn new(api: Arc<DesignApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ElementSource for SimpleListSource {
    fn name(&self) -> &str {
        "simple-list"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Simplified
    }

    async fn fetch_page(
        &self,
        design_id: &str,
        filter: &ElementFilter,
        offset: usize,
        limit: usize,
    ) -> Result<ElementPage, RetrieveError> {
        let raw = self.api.list_elements(design_id, filter, offset, limit).await?;
        Ok(normalize_page(raw))
    }
}

/// Last tier, opt-in only: a bounded set of representative placeholder
/// elements so downstream stages stay exercisable when every real tier
/// is down. Results carry [`DataProvenance::Synthetic`] so callers can
/// never mistake them for design data.
pub struct PlaceholderSource;

/// (category, family, type mark, material, volume m³, area m²) rows for
/// the synthetic set. Fixed, so placeholder runs are deterministic.
const PLACEHOLDER_ROWS: &[(&str, &str, &str, &str, f64, f64)] = &[
    ("Structural Foundations", "Footing", "F-01", "Reinforced Concrete", 24.0, 40.0),
    ("Structural Foundations", "Footing", "F-02", "Reinforced Concrete", 12.0, 20.0),
    ("Structural Columns", "Concrete Column", "C-01", "Reinforced Concrete", 8.0, 30.0),
    ("Structural Framing", "W Shape", "B-01", "Structural Steel", 2.4, 18.0),
    ("Structural Framing", "W Shape", "B-02", "Structural Steel", 1.6, 12.0),
    ("Floors", "Concrete Slab", "S-01", "Precast Concrete", 55.0, 220.0),
    ("Walls", "Basic Wall", "W-01", "Brick, Common", 18.0, 90.0),
    ("Walls", "Interior Partition", "W-02", "Gypsum Wall Board", 6.0, 120.0),
    ("Roofs", "Warm Roof", "R-01", "Glulam Timber", 14.0, 160.0),
    ("Windows", "Fixed Window", "WIN-01", "Glass and Aluminum", 0.6, 24.0),
    ("Doors", "Single Door", "D-01", "Wood - Oak", 0.9, 12.0),
    ("Ceilings", "Suspended Ceiling", "CL-01", "Mineral Wool", 2.0, 140.0),
];

impl PlaceholderSource {
    fn generate(filter: &ElementFilter) -> Vec<Element> {
        PLACEHOLDER_ROWS
            .iter()
            .enumerate()
            .filter(|(_, row)| match &filter.category {
                Some(category) => row.0.eq_ignore_ascii_case(category),
                None => true,
            })
            .map(|(i, (category, family, mark, material, volume, area))| {
                let mut properties = serde_json::Map::new();
                properties.insert("Material".into(), serde_json::Value::String((*material).into()));
                Element {
                    id: format!("placeholder-{i}"),
                    name: format!("{family} {mark}"),
                    category: (*category).to_string(),
                    family: Some((*family).to_string()),
                    type_mark: Some((*mark).to_string()),
                    level: Some("Level 1".to_string()),
                    properties,
                    volume_m3: *volume,
                    area_m2: *area,
                    length_m: 0.0,
                }
            })
            .collect()
    }
}

#[async_trait]
impl ElementSource for PlaceholderSource {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Synthetic
    }

    async fn fetch_page(
        &self,
        design_id: &str,
        filter: &ElementFilter,
        offset: usize,
        limit: usize,
    ) -> Result<ElementPage, RetrieveError> {
        if offset == 0 {
            tracing::warn!(design_id, "Serving synthetic placeholder elements");
        }
        let all = Self::generate(filter);
        let end = (offset + limit).min(all.len());
        let elements = if offset < end {
            all[offset..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(ElementPage {
            total: Some(all.len() as u64),
            has_more: Some(end < all.len()),
            elements,
            skipped: 0,
        })
    }
}
