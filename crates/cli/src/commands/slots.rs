use retrospect_core::{slot_registry, SlotCategory};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SlotRow {
    key: String,
    label: String,
    category: SlotCategory,
    required: bool,
}

pub fn run(json_output: bool) -> String {
    let rows: Vec<SlotRow> = slot_registry()
        .into_iter()
        .map(|slot| SlotRow {
            key: slot.key,
            label: slot.label,
            category: slot.category,
            required: slot.required,
        })
        .collect();

    if json_output {
        return serde_json::to_string_pretty(&rows)
            .unwrap_or_else(|error| format!("slot listing serialization failed: {error}"));
    }

    let required = rows.iter().filter(|row| row.required).count();
    let mut lines = vec![format!("interview slots ({} total, {} required):", rows.len(), required)];

    for category in SlotCategory::ALL {
        let in_category: Vec<&SlotRow> =
            rows.iter().filter(|row| row.category == category).collect();
        if in_category.is_empty() {
            continue;
        }
        lines.push(format!("{}:", category.display_label()));
        for row in in_category {
            let marker = if row.required { "*" } else { " " };
            lines.push(format!("  {marker} {} - {}", row.key, row.label));
        }
    }
    lines.push("(* = required for completion)".to_string());

    lines.join("\n")
}
