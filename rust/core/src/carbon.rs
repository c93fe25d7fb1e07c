// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Carbon-factor matching and embodied-carbon calculation.
//!
//! Matching is three-tiered per material (exact name → material type →
//! generic fallback); the quantity basis for the multiplication is
//! driven by the matched factor's unit. Every non-exact match records a
//! human-readable assumption on the run result.

use rustc_hash::FxHashMap;

use crate::model::{
    CarbonFactor, DataQuality, EmbodiedCarbonResult, FactorUnit, MatchTier, MaterialCarbonResult,
    MaterialQuantity, MaterialType, QuantityBasis,
};

/// Hard default applied when the factor table lacks a generic entry,
/// in kgCO2e per kg.
pub const DEFAULT_GENERIC_FACTOR: f64 = 100.0;

/// Density assumed for material types without a table entry, in kg/m³.
pub const DEFAULT_DENSITY_KG_M3: f64 = 1000.0;

/// Typical density per material type in kg/m³, used to estimate mass
/// for mass-denominated factors.
pub fn density_kg_m3(material_type: MaterialType) -> f64 {
    match material_type {
        MaterialType::Concrete => 2400.0,
        MaterialType::Steel => 7850.0,
        MaterialType::Timber => 500.0,
        MaterialType::Masonry => 2000.0,
        MaterialType::Glass => 2500.0,
        MaterialType::Aluminum => 2700.0,
        MaterialType::Insulation => 50.0,
        MaterialType::Gypsum => 800.0,
        MaterialType::Ceramic => 2300.0,
        MaterialType::Plastic => 950.0,
        MaterialType::Other => DEFAULT_DENSITY_KG_M3,
    }
}

/// Data-quality thresholds, exposed so tests and callers can tune them.
/// All values are percentages.
#[derive(Debug, Clone, Copy)]
pub struct QualityThresholds {
    pub high_coverage: f64,
    pub high_exact: f64,
    pub medium_coverage: f64,
    pub medium_exact: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            high_coverage: 90.0,
            high_exact: 70.0,
            medium_coverage: 70.0,
            medium_exact: 50.0,
        }
    }
}

impl QualityThresholds {
    /// Classify a run by coverage and exact-match percentages.
    pub fn classify(&self, coverage: f64, exact: f64) -> DataQuality {
        if coverage >= self.high_coverage && exact >= self.high_exact {
            DataQuality::High
        } else if coverage >= self.medium_coverage && exact >= self.medium_exact {
            DataQuality::Medium
        } else {
            DataQuality::Low
        }
    }
}

/// Options for a carbon calculation run.
#[derive(Debug, Clone, Default)]
pub struct CarbonOptions {
    /// Gross building area for the carbon-intensity figure.
    pub building_area_m2: Option<f64>,
    pub thresholds: QualityThresholds,
}

/// Match every material against the factor table and compute the
/// run-level embodied carbon result.
///
/// The factor table is read-only; an empty table still produces a
/// deterministic result via the hard default factor. Empty input yields
/// zero totals and Low quality without dividing by zero.
pub fn calculate_embodied_carbon(
    materials: &[MaterialQuantity],
    factors: &[CarbonFactor],
    options: &CarbonOptions,
) -> EmbodiedCarbonResult {
    let mut results: Vec<MaterialCarbonResult> = Vec::with_capacity(materials.len());
    let mut assumptions: Vec<String> = Vec::new();

    for material in materials {
        let (factor, tier) = match_factor(material, factors);
        let (basis, total, basis_note) = apply_factor(material, &factor);

        let assumption = assumption_for(material, tier, basis_note);
        if let Some(note) = &assumption {
            if !assumptions.contains(note) {
                assumptions.push(note.clone());
            }
        }

        results.push(MaterialCarbonResult {
            material_name: material.material_name.clone(),
            material_type: material.material_type,
            element_category: material.element_category.clone(),
            factor,
            basis,
            total_kg_co2e: total,
            tier,
            assumption,
        });
    }

    let total_kg_co2e: f64 = results.iter().map(|r| r.total_kg_co2e).sum();
    let total_count = results.len();
    let matched_count = results.iter().filter(|r| r.factor.value > 0.0).count();
    let exact_count = results.iter().filter(|r| r.tier == MatchTier::Exact).count();

    let coverage_percent = percent(matched_count, total_count);
    let exact_match_percent = percent(exact_count, total_count);
    let data_quality = if total_count == 0 {
        DataQuality::Low
    } else {
        options
            .thresholds
            .classify(coverage_percent, exact_match_percent)
    };

    let carbon_intensity = options
        .building_area_m2
        .filter(|area| *area > 0.0)
        .map(|area| total_kg_co2e / area);

    tracing::info!(
        materials = total_count,
        matched = matched_count,
        exact = exact_count,
        total_kg_co2e,
        coverage_percent,
        ?data_quality,
        "Embodied carbon calculation complete"
    );

    EmbodiedCarbonResult {
        total_kg_co2e,
        by_material_type: totals_by(&results, |r| r.material_type),
        by_category: totals_by(&results, |r| r.element_category.clone()),
        coverage_percent,
        exact_match_percent,
        data_quality,
        carbon_intensity,
        materials: results,
        assumptions,
    }
}

/// Three-tier factor lookup; first hit wins.
fn match_factor(material: &MaterialQuantity, factors: &[CarbonFactor]) -> (CarbonFactor, MatchTier) {
    // Tier 1: exact material name.
    if let Some(factor) = factors.iter().find(|f| {
        f.material_name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(&material.material_name))
    }) {
        return (factor.clone(), MatchTier::Exact);
    }

    // Tier 2: factor keyed only by material type.
    if material.material_type != MaterialType::Other {
        if let Some(factor) = factors.iter().find(|f| {
            f.material_name.is_none() && f.material_type == material.material_type
        }) {
            return (factor.clone(), MatchTier::TypeMatch);
        }
    }

    // Tier 3: the table's generic Other entry, or the hard default.
    let generic = factors
        .iter()
        .find(|f| f.material_name.is_none() && f.material_type == MaterialType::Other)
        .cloned()
        .unwrap_or(CarbonFactor {
            material_type: MaterialType::Other,
            material_name: None,
            value: DEFAULT_GENERIC_FACTOR,
            unit: FactorUnit::KgCo2ePerKg,
            source: "built-in default".to_string(),
            region: "global".to_string(),
            year: 0,
        });
    (generic, MatchTier::GenericFallback)
}

/// Select the quantity basis for the matched factor's unit and compute
/// the material total. Returns an extra note when the basis itself is
/// an estimate.
fn apply_factor(
    material: &MaterialQuantity,
    factor: &CarbonFactor,
) -> (QuantityBasis, f64, Option<String>) {
    match factor.unit {
        FactorUnit::KgCo2ePerM3 if material.volume_m3 > 0.0 => (
            QuantityBasis::VolumeM3(material.volume_m3),
            factor.value * material.volume_m3,
            None,
        ),
        FactorUnit::KgCo2ePerM2 if material.area_m2 > 0.0 => (
            QuantityBasis::AreaM2(material.area_m2),
            factor.value * material.area_m2,
            None,
        ),
        FactorUnit::KgCo2ePerKg if material.volume_m3 > 0.0 => {
            let density = density_kg_m3(material.material_type);
            let mass = material.volume_m3 * density;
            (
                QuantityBasis::MassKg(mass),
                factor.value * mass,
                Some(format!(
                    "mass estimated from volume at {density} kg/m3 for {}",
                    material.material_type
                )),
            )
        }
        // Last resort: no usable geometry quantity for this unit.
        _ => (
            QuantityBasis::Count(material.element_count),
            factor.value * material.element_count as f64,
            Some(format!(
                "no usable quantity for '{}'; approximated by element count",
                material.material_name
            )),
        ),
    }
}

/// Compose the assumption string for non-exact matches and estimated
/// bases.
fn assumption_for(
    material: &MaterialQuantity,
    tier: MatchTier,
    basis_note: Option<String>,
) -> Option<String> {
    let tier_note = match tier {
        MatchTier::Exact => None,
        MatchTier::TypeMatch => Some(format!(
            "no exact factor for '{}'; used {} type average",
            material.material_name, material.material_type
        )),
        MatchTier::GenericFallback => Some(format!(
            "no factor for '{}'; used generic fallback",
            material.material_name
        )),
    };

    match (tier_note, basis_note) {
        (Some(t), Some(b)) => Some(format!("{t} ({b})")),
        (Some(t), None) => Some(t),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Accumulate per-key totals and sort descending.
fn totals_by<K, F>(results: &[MaterialCarbonResult], key: F) -> Vec<(K, f64)>
where
    K: std::hash::Hash + Eq + Clone,
    F: Fn(&MaterialCarbonResult) -> K,
{
    let mut index: FxHashMap<K, usize> = FxHashMap::default();
    let mut totals: Vec<(K, f64)> = Vec::new();
    for result in results {
        let k = key(result);
        match index.get(&k) {
            Some(&slot) => totals[slot].1 += result.total_kg_co2e,
            None => {
                index.insert(k.clone(), totals.len());
                totals.push((k, result.total_kg_co2e));
            }
        }
    }
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantity(name: &str, material_type: MaterialType, volume: f64) -> MaterialQuantity {
        MaterialQuantity {
            material_name: name.into(),
            material_type,
            element_category: "Walls".into(),
            volume_m3: volume,
            area_m2: 0.0,
            length_m: 0.0,
            element_count: 1,
            element_ids: vec!["e1".into()],
        }
    }

    fn factor(
        material_type: MaterialType,
        name: Option<&str>,
        value: f64,
        unit: FactorUnit,
    ) -> CarbonFactor {
        CarbonFactor {
            material_type,
            material_name: name.map(Into::into),
            value,
            unit,
            source: "test".into(),
            region: "test".into(),
            year: 2024,
        }
    }

    #[test]
    fn exact_match_is_case_insensitive_and_assumption_free() {
        let factors = vec![factor(
            MaterialType::Concrete,
            Some("Reinforced Concrete"),
            300.0,
            FactorUnit::KgCo2ePerM3,
        )];
        let materials = vec![quantity("reinforced concrete", MaterialType::Concrete, 2.0)];

        let result = calculate_embodied_carbon(&materials, &factors, &CarbonOptions::default());
        assert_eq!(result.materials[0].tier, MatchTier::Exact);
        assert_eq!(result.materials[0].total_kg_co2e, 600.0);
        assert!(result.materials[0].assumption.is_none());
        assert_eq!(result.coverage_percent, 100.0);
        assert_eq!(result.exact_match_percent, 100.0);
        assert_eq!(result.data_quality, DataQuality::High);
    }

    #[test]
    fn type_match_records_an_assumption() {
        let factors = vec![factor(MaterialType::Steel, None, 500.0, FactorUnit::KgCo2ePerM3)];
        let materials = vec![quantity("Mystery Steel Alloy", MaterialType::Steel, 1.0)];

        let result = calculate_embodied_carbon(&materials, &factors, &CarbonOptions::default());
        assert_eq!(result.materials[0].tier, MatchTier::TypeMatch);
        assert!(result.materials[0].assumption.is_some());
        assert_eq!(result.assumptions.len(), 1);
    }

    #[test]
    fn generic_only_table_with_default_density_is_deterministic() {
        // Factor table with only a generic Other entry at 100 kgCO2e/kg
        // applied to 2 m³ of an unknown material: mass falls back to
        // the declared default density.
        let factors = vec![factor(MaterialType::Other, None, 100.0, FactorUnit::KgCo2ePerKg)];
        let materials = vec![quantity("Mystery Substance", MaterialType::Other, 2.0)];

        let result = calculate_embodied_carbon(&materials, &factors, &CarbonOptions::default());
        let expected = 100.0 * 2.0 * DEFAULT_DENSITY_KG_M3;
        assert_eq!(result.materials[0].tier, MatchTier::GenericFallback);
        assert_eq!(result.total_kg_co2e, expected);
        assert!(result.total_kg_co2e > 0.0);
        assert!(!result.assumptions.is_empty());

        let repeat = calculate_embodied_carbon(&materials, &factors, &CarbonOptions::default());
        assert_eq!(repeat.total_kg_co2e, expected);
    }

    #[test]
    fn empty_table_uses_hard_default() {
        let materials = vec![quantity("Anything", MaterialType::Other, 1.0)];
        let result = calculate_embodied_carbon(&materials, &[], &CarbonOptions::default());
        assert_eq!(result.materials[0].factor.value, DEFAULT_GENERIC_FACTOR);
        assert!(result.total_kg_co2e > 0.0);
    }

    #[test]
    fn empty_input_yields_zero_without_panicking() {
        let result = calculate_embodied_carbon(&[], &[], &CarbonOptions::default());
        assert_eq!(result.total_kg_co2e, 0.0);
        assert!(result.materials.is_empty());
        assert_eq!(result.coverage_percent, 0.0);
        assert_eq!(result.data_quality, DataQuality::Low);
    }

    #[test]
    fn coverage_formula_is_exact() {
        let factors = vec![
            factor(MaterialType::Concrete, Some("Concrete"), 300.0, FactorUnit::KgCo2ePerM3),
            // Zero-valued generic: matched materials falling here do
            // not count toward coverage.
            factor(MaterialType::Other, None, 0.0, FactorUnit::KgCo2ePerKg),
        ];
        let materials = vec![
            quantity("Concrete", MaterialType::Concrete, 1.0),
            quantity("Mystery A", MaterialType::Other, 1.0),
            quantity("Mystery B", MaterialType::Other, 1.0),
            quantity("Mystery C", MaterialType::Other, 1.0),
        ];

        let result = calculate_embodied_carbon(&materials, &factors, &CarbonOptions::default());
        assert_eq!(result.coverage_percent, 25.0);
        assert!(result.coverage_percent >= 0.0 && result.coverage_percent <= 100.0);
        assert_eq!(result.data_quality, DataQuality::Low);
    }

    #[test]
    fn quality_threshold_boundaries() {
        let t = QualityThresholds::default();
        assert_eq!(t.classify(90.0, 70.0), DataQuality::High);
        assert_eq!(t.classify(89.9, 70.0), DataQuality::Medium);
        assert_eq!(t.classify(70.0, 50.0), DataQuality::Medium);
        assert_eq!(t.classify(69.9, 50.0), DataQuality::Low);

        let tuned = QualityThresholds {
            high_coverage: 50.0,
            high_exact: 10.0,
            ..QualityThresholds::default()
        };
        assert_eq!(tuned.classify(60.0, 20.0), DataQuality::High);
    }

    #[test]
    fn carbon_intensity_requires_positive_area() {
        let factors = vec![factor(
            MaterialType::Concrete,
            Some("Concrete"),
            100.0,
            FactorUnit::KgCo2ePerM3,
        )];
        let materials = vec![quantity("Concrete", MaterialType::Concrete, 10.0)];

        let options = CarbonOptions {
            building_area_m2: Some(500.0),
            ..CarbonOptions::default()
        };
        let result = calculate_embodied_carbon(&materials, &factors, &options);
        assert_eq!(result.carbon_intensity, Some(2.0));

        let zero_area = CarbonOptions {
            building_area_m2: Some(0.0),
            ..CarbonOptions::default()
        };
        let result = calculate_embodied_carbon(&materials, &factors, &zero_area);
        assert!(result.carbon_intensity.is_none());
    }

    #[test]
    fn assumptions_are_deduplicated() {
        let factors = vec![factor(MaterialType::Concrete, None, 300.0, FactorUnit::KgCo2ePerM3)];
        let materials = vec![
            quantity("Odd Concrete", MaterialType::Concrete, 1.0),
            quantity("Odd Concrete", MaterialType::Concrete, 2.0),
        ];
        let result = calculate_embodied_carbon(&materials, &factors, &CarbonOptions::default());
        assert_eq!(result.assumptions.len(), 1);
    }
}
