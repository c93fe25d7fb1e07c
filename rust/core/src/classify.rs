// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material classification: name extraction from the property bag,
//! then material-type classification of the resolved name.
//!
//! The two stages are deliberately separate so each can be tested and
//! overridden on its own.

use serde_json::Value;

use crate::model::{Element, MaterialType};

/// Placeholder values that never count as a real material name.
const PLACEHOLDER_VALUES: &[&str] = &["", "by category", "<by category>", "default", "n/a"];

/// Category-keyword table for inferring a material name when the
/// property bag carries none. First matching row wins.
const CATEGORY_MATERIALS: &[(&str, &str)] = &[
    ("foundation", "Concrete"),
    ("framing", "Steel"),
    ("steel", "Steel"),
    ("window", "Glass and Aluminum"),
    ("curtain", "Glass and Aluminum"),
    ("floor", "Concrete"),
    ("slab", "Concrete"),
    ("column", "Concrete"),
    ("roof", "Timber"),
    ("door", "Timber"),
    ("ceiling", "Gypsum"),
    ("insulation", "Insulation"),
    ("duct", "Galvanized Steel"),
    ("pipe", "PVC"),
];

/// Fallback name when neither the property bag nor the category yields
/// a material.
pub const UNKNOWN_MATERIAL: &str = "Unknown Material";

/// Name-keyword table for classifying a resolved material name into the
/// closed [`MaterialType`] taxonomy. Ordered; first hit wins, so
/// "Glass and Aluminum" classifies as Glass.
const TYPE_KEYWORDS: &[(&str, MaterialType)] = &[
    ("concrete", MaterialType::Concrete),
    ("cement", MaterialType::Concrete),
    ("rebar", MaterialType::Steel),
    ("steel", MaterialType::Steel),
    ("metal", MaterialType::Steel),
    ("iron", MaterialType::Steel),
    ("timber", MaterialType::Timber),
    ("wood", MaterialType::Timber),
    ("lumber", MaterialType::Timber),
    ("plywood", MaterialType::Timber),
    ("masonry", MaterialType::Masonry),
    ("brick", MaterialType::Masonry),
    ("block", MaterialType::Masonry),
    ("cmu", MaterialType::Masonry),
    ("glass", MaterialType::Glass),
    ("glazing", MaterialType::Glass),
    ("aluminum", MaterialType::Aluminum),
    ("aluminium", MaterialType::Aluminum),
    ("insulation", MaterialType::Insulation),
    ("foam", MaterialType::Insulation),
    ("wool", MaterialType::Insulation),
    ("gypsum", MaterialType::Gypsum),
    ("plaster", MaterialType::Gypsum),
    ("drywall", MaterialType::Gypsum),
    ("ceramic", MaterialType::Ceramic),
    ("tile", MaterialType::Ceramic),
    ("porcelain", MaterialType::Ceramic),
    ("plastic", MaterialType::Plastic),
    ("pvc", MaterialType::Plastic),
    ("polymer", MaterialType::Plastic),
    ("vinyl", MaterialType::Plastic),
];

/// Resolve a material name for an element.
///
/// Scans the property bag (iteratively, including nested objects and
/// arrays) for any property whose key contains "material" and whose
/// value is a non-placeholder string; falls back to category-keyword
/// inference. Deterministic for a fixed element.
pub fn extract_material_name(element: &Element) -> String {
    if let Some(name) = scan_property_bag(&element.properties) {
        return name;
    }
    infer_from_category(&element.category)
}

/// Stage 1a: property-bag scan with an explicit work stack. Nested
/// bags are visited breadth-of-insertion order; the first acceptable
/// value wins.
fn scan_property_bag(properties: &serde_json::Map<String, Value>) -> Option<String> {
    let mut stack: Vec<&serde_json::Map<String, Value>> = vec![properties];

    while let Some(bag) = stack.pop() {
        for (key, value) in bag {
            match value {
                Value::String(s) => {
                    if key.to_lowercase().contains("material") && !is_placeholder(s) {
                        return Some(s.trim().to_string());
                    }
                }
                Value::Object(nested) => stack.push(nested),
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(nested) = item {
                            stack.push(nested);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn is_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    PLACEHOLDER_VALUES.iter().any(|p| *p == lowered)
}

/// Stage 1b: infer a material name purely from the category string.
pub fn infer_from_category(category: &str) -> String {
    let lowered = category.to_lowercase();
    for (keyword, material) in CATEGORY_MATERIALS {
        if lowered.contains(keyword) {
            return (*material).to_string();
        }
    }
    UNKNOWN_MATERIAL.to_string()
}

/// Stage 2: classify a resolved material name into the closed taxonomy.
/// Case-insensitive substring match; no hit maps to
/// [`MaterialType::Other`].
pub fn classify_material_type(material_name: &str) -> MaterialType {
    let lowered = material_name.to_lowercase();
    for (keyword, material_type) in TYPE_KEYWORDS {
        if lowered.contains(keyword) {
            return *material_type;
        }
    }
    MaterialType::Other
}

/// Full classification for one element: resolved name plus taxonomy
/// type. Idempotent.
pub fn classify(element: &Element) -> (String, MaterialType) {
    let name = extract_material_name(element);
    let material_type = classify_material_type(&name);
    (name, material_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element_with(category: &str, properties: serde_json::Value) -> Element {
        Element {
            id: "e1".into(),
            category: category.into(),
            properties: properties.as_object().cloned().unwrap_or_default(),
            ..Default::default()
        }
    }

    #[test]
    fn property_bag_material_wins_over_category() {
        let element = element_with(
            "Structural Foundations",
            json!({ "Structural Material": "Reinforced Concrete" }),
        );
        assert_eq!(extract_material_name(&element), "Reinforced Concrete");
    }

    #[test]
    fn placeholder_values_are_skipped() {
        let element = element_with(
            "Structural Foundations",
            json!({ "Material": "By Category", "Material Name": "<By Category>" }),
        );
        assert_eq!(extract_material_name(&element), "Concrete");
    }

    #[test]
    fn nested_property_bags_are_scanned_without_recursion() {
        let element = element_with(
            "Generic Models",
            json!({
                "Identity Data": {
                    "Dimensions": { "Structural Material": "Glulam Timber" }
                }
            }),
        );
        assert_eq!(extract_material_name(&element), "Glulam Timber");
    }

    #[test]
    fn category_inference_table() {
        assert_eq!(infer_from_category("Structural Foundations"), "Concrete");
        assert_eq!(infer_from_category("Structural Framing"), "Steel");
        assert_eq!(infer_from_category("Windows"), "Glass and Aluminum");
        assert_eq!(infer_from_category("Specialty Equipment"), UNKNOWN_MATERIAL);
    }

    #[test]
    fn type_classification_table() {
        assert_eq!(classify_material_type("Reinforced Concrete"), MaterialType::Concrete);
        assert_eq!(classify_material_type("Structural STEEL"), MaterialType::Steel);
        assert_eq!(classify_material_type("Glass and Aluminum"), MaterialType::Glass);
        assert_eq!(classify_material_type("Mineral Wool"), MaterialType::Insulation);
        assert_eq!(classify_material_type("Mystery Substance"), MaterialType::Other);
    }

    #[test]
    fn classify_is_idempotent() {
        let element = element_with("Walls", json!({ "Material": "Brick, Common" }));
        let first = classify(&element);
        let second = classify(&element);
        assert_eq!(first, second);
        assert_eq!(first.1, MaterialType::Masonry);
    }
}
