// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full takeoff pipeline: retrieve → classify/aggregate → carbon.
//!
//! Stages run sequentially because each consumes the previous stage's
//! full output. The pipeline is a constructed service object with
//! injected dependencies; no global state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use takeoff_core::carbon::{calculate_embodied_carbon, CarbonOptions};
use takeoff_core::{
    aggregate_element_types, aggregate_materials, CarbonFactor, ElementType, ElementTypeMaterial,
    EmbodiedCarbonResult, MaterialQuantity,
};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::retrieve::{CancelToken, DataProvenance, ElementFilter, ElementRetriever};
use crate::sources::{PlaceholderSource, SimpleListSource, StructuredQuerySource};
use crate::DesignApiClient;

/// Complete output of one takeoff run for a (design, version) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeoffRun {
    pub design_id: String,
    pub provenance: DataProvenance,
    pub element_count: usize,
    pub total_count: usize,
    pub skipped: usize,
    pub truncated: bool,
    pub cancelled: bool,
    pub warnings: Vec<String>,
    pub materials: Vec<MaterialQuantity>,
    pub element_types: Vec<ElementType>,
    pub materials_summary: Vec<ElementTypeMaterial>,
    pub carbon: EmbodiedCarbonResult,
}

/// Orchestrates the pipeline stages for one design at a time.
pub struct TakeoffPipeline {
    retriever: ElementRetriever,
    /// Shared read-only factor table; safe across concurrent runs.
    factors: Arc<[CarbonFactor]>,
    options: CarbonOptions,
}

impl TakeoffPipeline {
    /// Build the standard pipeline from configuration: structured
    /// query tier, simple listing tier, and the placeholder tier only
    /// when explicitly enabled.
    pub fn from_config(
        config: &ClientConfig,
        factors: Arc<[CarbonFactor]>,
        options: CarbonOptions,
    ) -> Result<Self> {
        let api = Arc::new(DesignApiClient::new(config)?);
        let mut sources: Vec<Box<dyn crate::retrieve::ElementSource>> = vec![
            Box::new(StructuredQuerySource::new(api.clone())),
            Box::new(SimpleListSource::new(api)),
        ];
        if config.allow_placeholder_data {
            sources.push(Box::new(PlaceholderSource));
        }

        Ok(Self {
            retriever: ElementRetriever::new(sources, config.batch_size, config.max_batches),
            factors,
            options,
        })
    }

    /// Build a pipeline around an existing retriever (tests, custom
    /// ladders).
    pub fn new(
        retriever: ElementRetriever,
        factors: Arc<[CarbonFactor]>,
        options: CarbonOptions,
    ) -> Self {
        Self {
            retriever,
            factors,
            options,
        }
    }

    /// Run the full pipeline for one design.
    ///
    /// Deterministic for an unchanged element set: repeated runs yield
    /// identical classification codes and totals.
    pub async fn run(
        &self,
        design_id: &str,
        filter: &ElementFilter,
        cancel: &CancelToken,
    ) -> Result<TakeoffRun> {
        let fetch = self.retriever.fetch_all(design_id, filter, cancel).await?;

        let mut warnings = fetch.warnings;
        if fetch.provenance == DataProvenance::Synthetic {
            warnings.push("results computed from synthetic placeholder data".into());
        }

        let materials = aggregate_materials(&fetch.elements);
        let type_aggregation = aggregate_element_types(&fetch.elements);
        let carbon = calculate_embodied_carbon(&materials, &self.factors, &self.options);

        tracing::info!(
            design_id,
            provenance = %fetch.provenance,
            elements = fetch.elements.len(),
            materials = materials.len(),
            element_types = type_aggregation.element_types.len(),
            total_kg_co2e = carbon.total_kg_co2e,
            "Takeoff run complete"
        );

        Ok(TakeoffRun {
            design_id: design_id.to_string(),
            provenance: fetch.provenance,
            element_count: fetch.elements.len(),
            total_count: fetch.total_count,
            skipped: fetch.skipped,
            truncated: fetch.truncated,
            cancelled: fetch.cancelled,
            warnings,
            materials,
            element_types: type_aggregation.element_types,
            materials_summary: type_aggregation.materials_summary,
            carbon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrieveError;
    use crate::retrieve::{ElementPage, ElementSource};
    use async_trait::async_trait;
    use takeoff_core::{default_factor_table, Element};

    struct StaticSource {
        provenance: DataProvenance,
        elements: Vec<Element>,
    }

    #[async_trait]
    impl ElementSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        fn provenance(&self) -> DataProvenance {
            self.provenance
        }

        async fn fetch_page(
            &self,
            _design_id: &str,
            _filter: &ElementFilter,
            offset: usize,
            limit: usize,
        ) -> std::result::Result<ElementPage, RetrieveError> {
            let end = (offset + limit).min(self.elements.len());
            let elements = if offset < end {
                self.elements[offset..end].to_vec()
            } else {
                Vec::new()
            };
            Ok(ElementPage {
                elements,
                total: Some(self.elements.len() as u64),
                has_more: Some(end < self.elements.len()),
                skipped: 0,
            })
        }
    }

    fn sample_elements() -> Vec<Element> {
        let mut foundation = Element {
            id: "f1".into(),
            category: "Structural Foundations".into(),
            family: Some("Footing".into()),
            type_mark: Some("F-01".into()),
            volume_m3: 10.0,
            ..Default::default()
        };
        foundation
            .properties
            .insert("Material".into(), serde_json::Value::String("By Category".into()));

        let mut column = Element {
            id: "c1".into(),
            category: "Structural Columns".into(),
            family: Some("Concrete Column".into()),
            type_mark: Some("C-01".into()),
            volume_m3: 5.0,
            ..Default::default()
        };
        column.properties.insert(
            "Material".into(),
            serde_json::Value::String("Reinforced Concrete".into()),
        );

        vec![foundation, column]
    }

    fn pipeline(provenance: DataProvenance) -> TakeoffPipeline {
        let retriever = ElementRetriever::new(
            vec![Box::new(StaticSource {
                provenance,
                elements: sample_elements(),
            })],
            10,
            5,
        );
        TakeoffPipeline::new(
            retriever,
            default_factor_table().into(),
            CarbonOptions::default(),
        )
    }

    #[tokio::test]
    async fn full_run_produces_all_result_groups() {
        let run = pipeline(DataProvenance::Primary)
            .run("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(run.element_count, 2);
        assert_eq!(run.materials.len(), 2);
        assert_eq!(run.element_types.len(), 2);
        assert!(run.carbon.total_kg_co2e > 0.0);
        assert!(!run.cancelled && !run.truncated);
        assert!(run.warnings.is_empty());
    }

    #[tokio::test]
    async fn run_result_serializes_to_json() {
        let run = pipeline(DataProvenance::Primary)
            .run("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["design_id"], "d1");
        assert_eq!(json["provenance"], "Primary");
        assert!(json["carbon"]["total_kg_co2e"].is_number());
    }

    #[tokio::test]
    async fn repeated_runs_are_deterministic() {
        let p = pipeline(DataProvenance::Primary);
        let first = p
            .run("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        let second = p
            .run("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(first.carbon.total_kg_co2e, second.carbon.total_kg_co2e);
        let codes = |run: &TakeoffRun| {
            run.element_types
                .iter()
                .map(|t| t.classification.code.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(codes(&first), codes(&second));
    }

    #[tokio::test]
    async fn synthetic_provenance_is_flagged_in_warnings() {
        let run = pipeline(DataProvenance::Synthetic)
            .run("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(run.provenance, DataProvenance::Synthetic);
        assert!(run
            .warnings
            .iter()
            .any(|w| w.contains("synthetic placeholder")));
    }
}
