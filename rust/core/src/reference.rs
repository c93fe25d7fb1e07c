// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bundled reference carbon factors.
//!
//! Cradle-to-gate averages in the spirit of the ICE database; callers
//! with project-specific EPD data should supply their own table. The
//! table always carries a generic Other entry so the matcher's third
//! tier is resolvable without the hard-coded default.

use crate::model::{CarbonFactor, FactorUnit, MaterialType};

const SOURCE: &str = "ICE v3.0";
const REGION: &str = "UK";
const YEAR: u16 = 2019;

fn by_name(material_type: MaterialType, name: &str, value: f64, unit: FactorUnit) -> CarbonFactor {
    CarbonFactor {
        material_type,
        material_name: Some(name.to_string()),
        value,
        unit,
        source: SOURCE.to_string(),
        region: REGION.to_string(),
        year: YEAR,
    }
}

fn by_type(material_type: MaterialType, value: f64, unit: FactorUnit) -> CarbonFactor {
    CarbonFactor {
        material_type,
        material_name: None,
        value,
        unit,
        source: SOURCE.to_string(),
        region: REGION.to_string(),
        year: YEAR,
    }
}

/// Default factor table. Read-only reference data; safe to share
/// across concurrent runs.
pub fn default_factor_table() -> Vec<CarbonFactor> {
    vec![
        // Named entries matched by the exact tier.
        by_name(MaterialType::Concrete, "Reinforced Concrete", 0.113, FactorUnit::KgCo2ePerKg),
        by_name(MaterialType::Concrete, "Precast Concrete", 0.153, FactorUnit::KgCo2ePerKg),
        by_name(MaterialType::Steel, "Structural Steel", 1.55, FactorUnit::KgCo2ePerKg),
        by_name(MaterialType::Steel, "Rebar", 1.99, FactorUnit::KgCo2ePerKg),
        by_name(MaterialType::Timber, "Glulam Timber", 0.512, FactorUnit::KgCo2ePerKg),
        by_name(MaterialType::Timber, "CLT", 0.437, FactorUnit::KgCo2ePerKg),
        by_name(MaterialType::Masonry, "Brick, Common", 0.213, FactorUnit::KgCo2ePerKg),
        by_name(MaterialType::Glass, "Glass and Aluminum", 55.0, FactorUnit::KgCo2ePerM2),
        // Type-level averages matched by the second tier.
        by_type(MaterialType::Concrete, 0.103, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Steel, 1.46, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Timber, 0.31, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Masonry, 0.23, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Glass, 1.44, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Aluminum, 8.24, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Insulation, 1.86, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Gypsum, 0.39, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Ceramic, 0.78, FactorUnit::KgCo2ePerKg),
        by_type(MaterialType::Plastic, 3.1, FactorUnit::KgCo2ePerKg),
        // Generic fallback for the third tier.
        by_type(MaterialType::Other, 0.5, FactorUnit::KgCo2ePerKg),
    ]
}
