// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Quantity aggregation: material buckets by (material, category) and
//! element-type groups by (family, type mark) with classification-code
//! derivation.
//!
//! Both passes are single-scan. Group discovery order is preserved via
//! an index map over a Vec, so ordering is deterministic for a fixed
//! element set.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::classify;
use crate::model::{
    Classification, Element, ElementType, ElementTypeAggregation, ElementTypeMaterial,
    MaterialQuantity,
};

/// Type-mark placeholder for elements without one.
pub const NO_MARK: &str = "No Mark";

/// Code assigned when no category keyword matches.
pub const UNCLASSIFIED_CODE: &str = "Z1000";

/// Property-name variants that carry an explicit classification code.
const CODE_KEYS: &[&str] = &[
    "Assembly Code",
    "assemblyCode",
    "Uniformat",
    "Classification.Uniformat.Code",
    "OmniClass Number",
];

/// Property-name variants that carry an explicit classification title.
const TITLE_KEYS: &[&str] = &[
    "Assembly Description",
    "assemblyDescription",
    "Classification.Uniformat.Description",
    "OmniClass Title",
];

/// Property-name variants that carry a cross-reference label.
const XREF_KEYS: &[&str] = &["Keynote", "keynote", "Classification.Uniformat.Keynote"];

/// Category-keyword table for derived classification codes:
/// (keyword, hierarchical code, cross-reference). First hit wins, so
/// repeated runs on an unchanged model derive identical codes.
const CATEGORY_CODES: &[(&str, &str, &str)] = &[
    ("foundation", "A1010", "03 30 00"),
    ("wall", "B2010", "04 20 00"),
    ("floor", "B1010", "03 35 00"),
    ("slab", "B1010", "03 35 00"),
    ("roof", "B1020", "07 50 00"),
    ("column", "B1010", "05 12 00"),
    ("framing", "B1010", "05 12 00"),
    ("door", "B2030", "08 11 00"),
    ("window", "B2020", "08 50 00"),
    ("curtain", "B2020", "08 44 00"),
    ("stair", "C2010", "05 51 00"),
    ("ceiling", "C3030", "09 51 00"),
    ("plumbing", "D2010", "22 00 00"),
    ("pipe", "D2010", "22 00 00"),
    ("duct", "D3040", "23 00 00"),
    ("mechanical", "D3040", "23 00 00"),
    ("electrical", "D5020", "26 00 00"),
    ("lighting", "D5020", "26 00 00"),
];

/// Group elements into (material, category) buckets.
///
/// Output is sorted by descending volume; ties keep group discovery
/// order (stable sort). Each element contributes to exactly one bucket.
pub fn aggregate_materials(elements: &[Element]) -> Vec<MaterialQuantity> {
    let mut index: FxHashMap<(String, String), usize> = FxHashMap::default();
    let mut buckets: Vec<MaterialQuantity> = Vec::new();

    for element in elements {
        let (material_name, material_type) = classify::classify(element);
        let key = (material_name.clone(), element.category.clone());

        let slot = *index.entry(key).or_insert_with(|| {
            buckets.push(MaterialQuantity {
                material_name,
                material_type,
                element_category: element.category.clone(),
                volume_m3: 0.0,
                area_m2: 0.0,
                length_m: 0.0,
                element_count: 0,
                element_ids: Vec::new(),
            });
            buckets.len() - 1
        });

        let bucket = &mut buckets[slot];
        bucket.volume_m3 += element.volume_m3;
        bucket.area_m2 += element.area_m2;
        bucket.length_m += element.length_m;
        bucket.element_count += 1;
        bucket.element_ids.push(element.id.clone());
    }

    // Largest material contributions first; stable, so ties keep
    // discovery order.
    buckets.sort_by(|a, b| b.volume_m3.total_cmp(&a.volume_m3));

    tracing::debug!(
        elements = elements.len(),
        buckets = buckets.len(),
        "Material aggregation complete"
    );

    buckets
}

/// Group elements into element types keyed by (family-or-category,
/// type-mark-or-"No Mark"), derive classification codes, and build the
/// run-level merged materials summary.
pub fn aggregate_element_types(elements: &[Element]) -> ElementTypeAggregation {
    let mut index: FxHashMap<(String, String), usize> = FxHashMap::default();
    let mut element_types: Vec<ElementType> = Vec::new();

    for element in elements {
        let family = element
            .family
            .clone()
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| element.category.clone());
        let mark = element
            .type_mark
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| NO_MARK.to_string());

        let key = (family.clone(), mark.clone());
        let slot = *index.entry(key).or_insert_with(|| {
            let id = slug(&format!("{family}-{mark}"));
            let classification = resolve_classification(element, &family, &mark);
            element_types.push(ElementType {
                id,
                family_name: family.clone(),
                type_mark: mark.clone(),
                classification,
                volume_m3: 0.0,
                area_m2: 0.0,
                length_m: 0.0,
                element_count: 0,
                element_ids: Vec::new(),
                materials: Vec::new(),
            });
            element_types.len() - 1
        });

        let group = &mut element_types[slot];
        group.volume_m3 += element.volume_m3;
        group.area_m2 += element.area_m2;
        group.length_m += element.length_m;
        group.element_count += 1;
        group.element_ids.push(element.id.clone());

        let (material_name, material_type) = classify::classify(element);
        let material_id = slug(&material_name);
        let group_id = group.id.clone();
        match group
            .materials
            .iter_mut()
            .find(|m| m.material_id == material_id)
        {
            Some(existing) => {
                existing.volume_m3 += element.volume_m3;
                existing.area_m2 += element.area_m2;
                existing.length_m += element.length_m;
                existing.element_count += 1;
            }
            None => group.materials.push(ElementTypeMaterial {
                material_id,
                material_name,
                material_type,
                volume_m3: element.volume_m3,
                area_m2: element.area_m2,
                length_m: element.length_m,
                element_count: 1,
                element_type_ids: vec![group_id],
            }),
        }
    }

    let materials_summary = merge_materials(&element_types);

    tracing::debug!(
        elements = elements.len(),
        element_types = element_types.len(),
        materials = materials_summary.len(),
        "Element-type aggregation complete"
    );

    ElementTypeAggregation {
        element_types,
        materials_summary,
    }
}

/// Merge identical materials (same material id) across element types,
/// accumulating quantities and recording every contributing type id.
fn merge_materials(element_types: &[ElementType]) -> Vec<ElementTypeMaterial> {
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut merged: Vec<ElementTypeMaterial> = Vec::new();

    for element_type in element_types {
        for material in &element_type.materials {
            match index.get(&material.material_id) {
                Some(&slot) => {
                    let existing = &mut merged[slot];
                    existing.volume_m3 += material.volume_m3;
                    existing.area_m2 += material.area_m2;
                    existing.length_m += material.length_m;
                    existing.element_count += material.element_count;
                    if !existing.element_type_ids.contains(&element_type.id) {
                        existing.element_type_ids.push(element_type.id.clone());
                    }
                }
                None => {
                    index.insert(material.material_id.clone(), merged.len());
                    let mut entry = material.clone();
                    entry.element_type_ids = vec![element_type.id.clone()];
                    merged.push(entry);
                }
            }
        }
    }

    merged.sort_by(|a, b| b.volume_m3.total_cmp(&a.volume_m3));
    merged
}

/// Resolve the classification pair for an element-type group.
///
/// An explicit code in the property bag is used verbatim; otherwise the
/// code is derived deterministically from category keywords with a
/// title composed from family + type mark.
fn resolve_classification(element: &Element, family: &str, mark: &str) -> Classification {
    if let Some(code) = first_property(&element.properties, CODE_KEYS) {
        let title = first_property(&element.properties, TITLE_KEYS)
            .unwrap_or_else(|| compose_title(family, mark));
        let cross_reference =
            first_property(&element.properties, XREF_KEYS).unwrap_or_default();
        return Classification {
            code,
            title,
            cross_reference,
            derived: false,
        };
    }

    let lowered = element.category.to_lowercase();
    for (keyword, code, xref) in CATEGORY_CODES {
        if lowered.contains(keyword) {
            return Classification {
                code: (*code).to_string(),
                title: compose_title(family, mark),
                cross_reference: (*xref).to_string(),
                derived: true,
            };
        }
    }

    Classification {
        code: UNCLASSIFIED_CODE.to_string(),
        title: compose_title(family, mark),
        cross_reference: String::new(),
        derived: true,
    }
}

fn compose_title(family: &str, mark: &str) -> String {
    if mark == NO_MARK {
        family.to_string()
    } else {
        format!("{family} - {mark}")
    }
}

/// First non-empty string among candidate property keys.
fn first_property(bag: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = bag.get(*key).and_then(Value::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Stable slug for ids: lowercase alphanumerics with single dashes.
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut dash_pending = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if dash_pending && !out.is_empty() {
                out.push('-');
            }
            dash_pending = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            dash_pending = true;
        }
    }
    out
}
