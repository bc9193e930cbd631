use once_cell::unsync::OnceCell;
use serde_json::Value;

use crate::entry::Entry;
use crate::error::ContextError;
use crate::fields::{section_entry, FieldResolver};
use crate::merge::DocumentMap;
use crate::schema::Field;

/// Resolver for list fields, contributing to the `list` section. The stored
/// value is a serialized row list; anything that does not parse as JSON is
/// carried through as a single-row string.
pub struct ListResolver<'a> {
    field: &'a Field,
    entry: &'a Entry,
    cache: OnceCell<Value>,
}

impl<'a> ListResolver<'a> {
    pub fn new(field: &'a Field, entry: &'a Entry) -> ListResolver<'a> {
        ListResolver {
            field,
            entry,
            cache: OnceCell::new(),
        }
    }
}

/// The registry constructor of the list resolver.
pub fn boxed<'a>(
    field: &'a Field,
    entry: &'a Entry,
) -> Result<Box<dyn FieldResolver + 'a>, ContextError> {
    Ok(Box::new(ListResolver::new(field, entry)))
}

impl FieldResolver for ListResolver<'_> {
    fn form_data(&self) -> DocumentMap {
        section_entry("list", self.field.id, self.value().clone())
    }

    fn value(&self) -> &Value {
        self.cache.get_or_init(|| {
            match self.entry.field_value(self.field.id) {
                None | Some(Value::Null) => Value::Array(Vec::new()),
                // Already structured rows.
                Some(rows @ Value::Array(_)) => rows.clone(),
                Some(Value::String(raw)) => serde_json::from_str(raw)
                    .unwrap_or_else(|_| Value::Array(vec![Value::String(raw.clone())])),
                Some(other) => Value::Array(vec![other.clone()]),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ListResolver;
    use crate::entry::Entry;
    use crate::fields::FieldResolver as _;
    use crate::schema::Field;
    use serde_json::json;

    fn list_field() -> Field {
        serde_json::from_value(json!({ "id": 5, "type": "list", "label": "Items" })).unwrap()
    }

    #[test]
    fn serialized_rows_are_parsed() {
        let field = list_field();
        let entry: Entry = serde_json::from_value(
            json!({ "id": 1, "formId": 1, "5": "[\"alpha\",\"beta\"]" }),
        )
        .unwrap();

        let resolver = ListResolver::new(&field, &entry);
        similar_asserts::assert_eq!(
            serde_json::Value::Object(resolver.form_data()),
            json!({ "list": { "5": ["alpha", "beta"] } })
        );
    }

    #[test]
    fn an_unparsable_value_becomes_a_single_row() {
        let field = list_field();
        let entry: Entry =
            serde_json::from_value(json!({ "id": 1, "formId": 1, "5": "just text" })).unwrap();

        let resolver = ListResolver::new(&field, &entry);
        assert_eq!(resolver.value(), &json!(["just text"]));
    }
}
