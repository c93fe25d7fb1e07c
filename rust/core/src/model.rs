// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data model for the takeoff pipeline: elements, aggregated quantities,
//! carbon factors and run results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A single building element extracted from a design.
///
/// Immutable once normalized; quantities are in model units
/// (m³ / m² / m).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    /// Stable element identifier within the design.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category (e.g., "Walls", "Structural Foundations").
    pub category: String,
    /// Family name (if the source model carries one).
    pub family: Option<String>,
    /// Type mark (if the source model carries one).
    pub type_mark: Option<String>,
    /// Containing level name.
    pub level: Option<String>,
    /// Raw property bag as returned by the listing endpoint. May nest.
    pub properties: serde_json::Map<String, Value>,
    /// Net volume in m³.
    pub volume_m3: f64,
    /// Surface area in m².
    pub area_m2: f64,
    /// Length in m.
    pub length_m: f64,
}

/// Candidate keys for each normalized field, checked in order.
/// Listing endpoints disagree on casing and naming across versions.
const ID_KEYS: &[&str] = &["id", "elementId", "objectId", "objectid"];
const NAME_KEYS: &[&str] = &["name", "displayName", "elementName"];
const CATEGORY_KEYS: &[&str] = &["category", "categoryName", "Category"];
const FAMILY_KEYS: &[&str] = &["family", "familyName", "Family"];
const TYPE_MARK_KEYS: &[&str] = &["typeMark", "type_mark", "Type Mark", "typeName"];
const LEVEL_KEYS: &[&str] = &["level", "levelName", "Level"];
const VOLUME_KEYS: &[&str] = &["volume", "Volume", "netVolume", "HostVolumeComputed"];
const AREA_KEYS: &[&str] = &["area", "Area", "netArea", "HostAreaComputed"];
const LENGTH_KEYS: &[&str] = &["length", "Length", "Cut Length"];

impl Element {
    /// Normalize one raw listing-endpoint object into an [`Element`].
    ///
    /// Returns [`Error::MalformedElement`] when the object is not a JSON
    /// object or carries no recognizable identifier; callers skip and
    /// tally such elements rather than failing the run.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| Error::MalformedElement("not a JSON object".into()))?;

        let id = first_string(obj, ID_KEYS)
            .ok_or_else(|| Error::MalformedElement("missing element id".into()))?;

        // The property bag may sit under "properties", or the object
        // itself may be flat. Keep whichever carries the data.
        let properties = match obj.get("properties").and_then(Value::as_object) {
            Some(props) => props.clone(),
            None => obj.clone(),
        };

        Ok(Element {
            id,
            name: first_string(obj, NAME_KEYS).unwrap_or_default(),
            category: first_string(obj, CATEGORY_KEYS).unwrap_or_default(),
            family: first_string(obj, FAMILY_KEYS),
            type_mark: first_string(obj, TYPE_MARK_KEYS),
            level: first_string(obj, LEVEL_KEYS),
            volume_m3: first_number(obj, &properties, VOLUME_KEYS),
            area_m2: first_number(obj, &properties, AREA_KEYS),
            length_m: first_number(obj, &properties, LENGTH_KEYS),
            properties,
        })
    }
}

/// First non-empty string value among candidate keys.
fn first_string(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = obj.get(*key).and_then(Value::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        // Some endpoints serialize numeric ids as numbers.
        if let Some(n) = obj.get(*key).and_then(Value::as_i64) {
            return Some(n.to_string());
        }
    }
    None
}

/// First parseable numeric value among candidate keys, checking the
/// top-level object first and the property bag second. Values may be
/// numbers or numeric strings; negatives and NaN clamp to 0.
fn first_number(
    obj: &serde_json::Map<String, Value>,
    properties: &serde_json::Map<String, Value>,
    keys: &[&str],
) -> f64 {
    for source in [obj, properties] {
        for key in keys {
            if let Some(v) = source.get(*key) {
                let parsed = match v {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                if let Some(x) = parsed {
                    if x.is_finite() && x > 0.0 {
                        return x;
                    }
                }
            }
        }
    }
    0.0
}

/// Closed material-type taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialType {
    Concrete,
    Steel,
    Timber,
    Masonry,
    Glass,
    Aluminum,
    Insulation,
    Gypsum,
    Ceramic,
    Plastic,
    Other,
}

impl MaterialType {
    /// Stable display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Concrete => "Concrete",
            MaterialType::Steel => "Steel",
            MaterialType::Timber => "Timber",
            MaterialType::Masonry => "Masonry",
            MaterialType::Glass => "Glass",
            MaterialType::Aluminum => "Aluminum",
            MaterialType::Insulation => "Insulation",
            MaterialType::Gypsum => "Gypsum",
            MaterialType::Ceramic => "Ceramic",
            MaterialType::Plastic => "Plastic",
            MaterialType::Other => "Other",
        }
    }
}

impl std::fmt::Display for MaterialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (material, category) aggregation bucket.
///
/// Invariant: each element's quantities are attributed to exactly one
/// bucket, so bucket sums conserve the per-element totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialQuantity {
    pub material_name: String,
    pub material_type: MaterialType,
    pub element_category: String,
    pub volume_m3: f64,
    pub area_m2: f64,
    pub length_m: f64,
    pub element_count: usize,
    /// Back-references to contributing elements.
    pub element_ids: Vec<String>,
}

/// Classification code pair attached to an element type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Hierarchical taxonomy code (e.g., "B2010").
    pub code: String,
    /// Human-readable title.
    pub title: String,
    /// Short cross-reference label (e.g., a keynote section).
    pub cross_reference: String,
    /// True when the code was derived from category keywords rather
    /// than read from the element's own properties.
    pub derived: bool,
}

/// Grouping of elements by (family, type mark).
///
/// Invariant: every element belongs to exactly one element-type group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementType {
    /// Stable slug derived from family + type mark.
    pub id: String,
    pub family_name: String,
    pub type_mark: String,
    pub classification: Classification,
    pub volume_m3: f64,
    pub area_m2: f64,
    pub length_m: f64,
    pub element_count: usize,
    pub element_ids: Vec<String>,
    /// De-duplicated materials used within this type.
    pub materials: Vec<ElementTypeMaterial>,
}

/// A material as used by one or more element types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementTypeMaterial {
    /// Stable slug derived from the material name.
    pub material_id: String,
    pub material_name: String,
    pub material_type: MaterialType,
    pub volume_m3: f64,
    pub area_m2: f64,
    pub length_m: f64,
    pub element_count: usize,
    /// Every element-type id that contributed to this entry.
    pub element_type_ids: Vec<String>,
}

/// Output of the element-type aggregation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementTypeAggregation {
    pub element_types: Vec<ElementType>,
    /// Run-level materials summary, merged across element types by
    /// material id.
    pub materials_summary: Vec<ElementTypeMaterial>,
}

/// Denomination of a carbon factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorUnit {
    KgCo2ePerKg,
    KgCo2ePerM3,
    KgCo2ePerM2,
}

impl std::fmt::Display for FactorUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FactorUnit::KgCo2ePerKg => "kgCO2e/kg",
            FactorUnit::KgCo2ePerM3 => "kgCO2e/m3",
            FactorUnit::KgCo2ePerM2 => "kgCO2e/m2",
        };
        f.write_str(s)
    }
}

/// One reference carbon factor. Read-only during a calculation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonFactor {
    pub material_type: MaterialType,
    /// Exact material name this factor applies to, when specific.
    pub material_name: Option<String>,
    pub value: f64,
    pub unit: FactorUnit,
    pub source: String,
    pub region: String,
    pub year: u16,
}

/// Which tier of the matching strategy produced a factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    Exact,
    TypeMatch,
    GenericFallback,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchTier::Exact => "exact",
            MatchTier::TypeMatch => "type",
            MatchTier::GenericFallback => "generic",
        };
        f.write_str(s)
    }
}

/// The quantity the factor was multiplied against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QuantityBasis {
    VolumeM3(f64),
    AreaM2(f64),
    /// Estimated mass from volume × density.
    MassKg(f64),
    /// Last-resort basis when no geometry quantity is available.
    Count(usize),
}

/// Carbon result for one aggregated material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialCarbonResult {
    pub material_name: String,
    pub material_type: MaterialType,
    pub element_category: String,
    /// Snapshot of the matched factor.
    pub factor: CarbonFactor,
    pub basis: QuantityBasis,
    pub total_kg_co2e: f64,
    pub tier: MatchTier,
    /// Present for every non-exact match or estimated basis.
    pub assumption: Option<String>,
}

/// Confidence tier for a run's carbon result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

/// Run-level embodied carbon result. Never mutated after construction;
/// a repeat calculation produces a new result object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbodiedCarbonResult {
    pub total_kg_co2e: f64,
    /// Totals per material type, descending.
    pub by_material_type: Vec<(MaterialType, f64)>,
    /// Totals per element category, descending.
    pub by_category: Vec<(String, f64)>,
    /// Materials with a non-zero matched factor ÷ total, in [0, 100].
    pub coverage_percent: f64,
    /// Exact-tier matches ÷ total, in [0, 100].
    pub exact_match_percent: f64,
    pub data_quality: DataQuality,
    /// kgCO2e per m² when a building area was supplied.
    pub carbon_intensity: Option<f64>,
    pub materials: Vec<MaterialCarbonResult>,
    /// De-duplicated, in first-seen order.
    pub assumptions: Vec<String>,
}
