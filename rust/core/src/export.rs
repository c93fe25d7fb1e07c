// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSV export of aggregated quantities for the presentation layer.
//!
//! All values are quoted; embedded quotes are doubled (RFC 4180).

use crate::model::{ElementType, MaterialQuantity};

/// One row per material bucket, header row first.
pub fn materials_to_csv(materials: &[MaterialQuantity]) -> String {
    let mut out = String::new();
    write_row(
        &mut out,
        &["Material", "Type", "Category", "Volume (m3)", "Area (m2)", "Length (m)", "Elements"],
    );
    for m in materials {
        write_row(
            &mut out,
            &[
                &m.material_name,
                m.material_type.as_str(),
                &m.element_category,
                &format_quantity(m.volume_m3),
                &format_quantity(m.area_m2),
                &format_quantity(m.length_m),
                &m.element_count.to_string(),
            ],
        );
    }
    out
}

/// One row per element type, header row first.
pub fn element_types_to_csv(element_types: &[ElementType]) -> String {
    let mut out = String::new();
    write_row(
        &mut out,
        &["Family", "Type Mark", "Code", "Title", "Volume (m3)", "Area (m2)", "Count"],
    );
    for t in element_types {
        write_row(
            &mut out,
            &[
                &t.family_name,
                &t.type_mark,
                &t.classification.code,
                &t.classification.title,
                &format_quantity(t.volume_m3),
                &format_quantity(t.area_m2),
                &t.element_count.to_string(),
            ],
        );
    }
    out
}

fn write_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    }
    out.push('\n');
}

fn format_quantity(value: f64) -> String {
    format!("{value:.3}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Classification, MaterialType};

    #[test]
    fn materials_csv_has_header_and_quoted_values() {
        let materials = vec![MaterialQuantity {
            material_name: "Brick, \"Common\"".into(),
            material_type: MaterialType::Masonry,
            element_category: "Walls".into(),
            volume_m3: 3.5,
            area_m2: 12.0,
            length_m: 0.0,
            element_count: 4,
            element_ids: vec![],
        }];

        let csv = materials_to_csv(&materials);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Material\",\"Type\",\"Category\",\"Volume (m3)\",\"Area (m2)\",\"Length (m)\",\"Elements\""
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"Brick, \"\"Common\"\"\",\"Masonry\",\"Walls\""));
        assert!(row.contains("\"3.500\""));
        assert!(lines.next().is_none());
    }

    #[test]
    fn element_types_csv_row_per_type() {
        let element_types = vec![ElementType {
            id: "basic-wall-w-01".into(),
            family_name: "Basic Wall".into(),
            type_mark: "W-01".into(),
            classification: Classification {
                code: "B2010".into(),
                title: "Basic Wall - W-01".into(),
                cross_reference: "04 20 00".into(),
                derived: true,
            },
            volume_m3: 7.25,
            area_m2: 20.0,
            length_m: 10.0,
            element_count: 3,
            element_ids: vec![],
            materials: vec![],
        }];

        let csv = element_types_to_csv(&element_types);
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("\"B2010\""));
        assert!(csv.contains("\"7.250\""));
    }
}
