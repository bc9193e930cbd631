use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};

use crate::entry::Entry;
use crate::error::ContextError;
use crate::fields::{section_entry, FieldResolver};
use crate::merge::DocumentMap;
use crate::schema::Field;

/// Resolver for likert-style rating grids (survey and likert fields).
///
/// A field declaring a non-empty input list is a multi-row grid: one entry key
/// per row, a column counting as selected exactly when the stored value equals
/// `<row-name>:<column-code>`. A field without inputs is a single-row grid: the
/// field's own entry value is compared against each column code directly.
/// Both shapes converge to nested `{row: {column label: "selected" | ""}}`
/// mappings so downstream templates need no shape detection.
pub struct LikertResolver<'a> {
    field: &'a Field,
    entry: &'a Entry,
    cache: OnceCell<Value>,
}

impl<'a> LikertResolver<'a> {
    pub fn new(field: &'a Field, entry: &'a Entry) -> Result<LikertResolver<'a>, ContextError> {
        if field.choices.is_empty() {
            return Err(ContextError::with_context(format!(
                "The likert field {} declares no columns",
                field.id
            )));
        }

        Ok(LikertResolver {
            field,
            entry,
            cache: OnceCell::new(),
        })
    }

    fn columns_for(&self, selection_key: impl Fn(&str) -> bool) -> Value {
        let mut columns = Map::new();
        for choice in &self.field.choices {
            let state = if selection_key(&choice.value) {
                "selected"
            } else {
                ""
            };
            columns.insert(choice.text.clone(), Value::String(state.to_string()));
        }
        Value::Object(columns)
    }
}

/// The registry constructor of the likert resolver.
pub fn boxed<'a>(
    field: &'a Field,
    entry: &'a Entry,
) -> Result<Box<dyn FieldResolver + 'a>, ContextError> {
    Ok(Box::new(LikertResolver::new(field, entry)?))
}

impl FieldResolver for LikertResolver<'_> {
    fn form_data(&self) -> DocumentMap {
        section_entry("field", self.field.id, self.value().clone())
    }

    fn value(&self) -> &Value {
        self.cache.get_or_init(|| {
            if !self.field.inputs.is_empty() {
                // Multi-row grid: one nested column map per declared row.
                let mut rows = Map::new();
                for row in &self.field.inputs {
                    let submitted = self.entry.value_string(&row.id);
                    let columns = self.columns_for(|column_code| {
                        submitted == format!("{}:{}", row.name, column_code)
                    });
                    rows.insert(row.label.clone(), columns);
                }
                Value::Object(rows)
            } else {
                // Single-row grid, nested under the literal `row` key.
                let submitted = self.entry.value_string(&self.field.id.to_string());
                let columns = self.columns_for(|column_code| submitted == column_code);
                let mut single_row = Map::new();
                single_row.insert("row".to_string(), columns);
                Value::Object(single_row)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::LikertResolver;
    use crate::entry::Entry;
    use crate::fields::FieldResolver as _;
    use crate::schema::Field;
    use serde_json::json;

    #[test]
    fn single_row_grids_nest_under_the_row_key() {
        let field: Field = serde_json::from_value(json!({
            "id": 2,
            "type": "likert",
            "label": "Satisfaction",
            "choices": [
                { "value": "a", "text": "Agree" },
                { "value": "d", "text": "Disagree" }
            ]
        }))
        .unwrap();
        let entry: Entry =
            serde_json::from_value(json!({ "id": 1, "formId": 1, "2": "a" })).unwrap();

        let resolver = LikertResolver::new(&field, &entry).unwrap();
        similar_asserts::assert_eq!(
            resolver.value().clone(),
            json!({ "row": { "Agree": "selected", "Disagree": "" } })
        );
    }

    #[test]
    fn multi_row_grids_match_on_the_composite_selection_key() {
        let field: Field = serde_json::from_value(json!({
            "id": 3,
            "type": "likert",
            "label": "Feedback",
            "choices": [
                { "value": "1", "text": "Poor" },
                { "value": "2", "text": "Great" }
            ],
            "inputs": [
                { "id": "3.1", "label": "Service", "name": "service" },
                { "id": "3.2", "label": "Quality", "name": "quality" }
            ]
        }))
        .unwrap();
        let entry: Entry = serde_json::from_value(json!({
            "id": 1,
            "formId": 1,
            "3.1": "service:2",
            "3.2": "quality:1"
        }))
        .unwrap();

        let resolver = LikertResolver::new(&field, &entry).unwrap();
        similar_asserts::assert_eq!(
            resolver.value().clone(),
            json!({
                "Service": { "Poor": "", "Great": "selected" },
                "Quality": { "Poor": "selected", "Great": "" }
            })
        );
    }

    #[test]
    fn a_grid_without_columns_fails_construction() {
        let field: Field =
            serde_json::from_value(json!({ "id": 4, "type": "likert", "label": "Empty" })).unwrap();
        let entry: Entry = serde_json::from_value(json!({ "id": 1, "formId": 1 })).unwrap();
        assert!(LikertResolver::new(&field, &entry).is_err());
    }
}
