//! Catalogue listing for the `stages` command

use onboard_schema::{catalog, FieldSpec, StageSchema, StageShape};
use serde_json::{json, Value};
use std::fmt::Write as _;

/// Text listing of every stage, its fields and aliases
#[must_use]
pub fn render_catalog() -> String {
    let mut out = String::new();
    for schema in catalog() {
        let shape = if schema.stage.is_collection() { "collection" } else { "scalar" };
        let _ = writeln!(out, "{:>2}. {} ({shape})", schema.stage.ordinal(), schema.stage);
        match &schema.shape {
            StageShape::Scalar(fields) => render_fields(&mut out, fields, "    "),
            StageShape::Collection(collection) => {
                render_fields(&mut out, std::slice::from_ref(&collection.field), "    ");
                let _ = writeln!(out, "    key: {}", collection.natural_key.fields().join(" + "));
                render_fields(&mut out, &collection.entity, "      ");
            }
        }
    }
    out
}

fn render_fields(out: &mut String, fields: &[FieldSpec], indent: &str) {
    for field in fields {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.sensitive {
            flags.push("sensitive");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        let aliases = if field.aliases.is_empty() {
            String::new()
        } else {
            format!(" <- {}", field.aliases.join(", "))
        };
        let _ = writeln!(out, "{indent}{}: {}{flags}{aliases}", field.name, field.kind());
    }
}

/// The catalogue as JSON
#[must_use]
pub fn catalog_json() -> Value {
    Value::Array(catalog().iter().map(stage_json).collect())
}

fn stage_json(schema: &StageSchema) -> Value {
    let mut stage = json!({
        "ordinal": schema.stage.ordinal(),
        "stage": schema.stage,
        "required": schema.required_fields(),
        "fields": schema.fields().iter().map(field_json).collect::<Vec<_>>(),
    });
    if let Some(collection) = schema.collection() {
        stage["natural_key"] = json!(collection.natural_key.fields());
        stage["entity"] = Value::Array(collection.entity.iter().map(field_json).collect());
    }
    stage
}

fn field_json(field: &FieldSpec) -> Value {
    json!({
        "name": field.name,
        "kind": field.kind(),
        "aliases": field.aliases,
        "required": field.required,
        "sensitive": field.sensitive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_names_every_stage_and_alias() {
        let text = render_catalog();
        assert!(text.starts_with(" 1. property (scalar)"));
        assert!(text.contains("10. review (scalar)"));
        assert!(text.contains("first_name: text [required] <- firstName, given_name"));
        assert!(text.contains("key: email + name"));
    }

    #[test]
    fn json_lists_required_subsets() {
        let json = catalog_json();
        assert_eq!(json.as_array().map(Vec::len), Some(10));
        assert_eq!(json[6]["stage"], "staff");
        assert_eq!(json[6]["required"], serde_json::json!(["staff"]));
        assert_eq!(json[3]["fields"][2]["sensitive"], true);
    }
}
