use once_cell::unsync::OnceCell;
use serde_json::Value;

use crate::entry::Entry;
use crate::error::ContextError;
use crate::fields::{section_entry, FieldResolver};
use crate::merge::{merge_into, DocumentMap};
use crate::schema::Field;

/// Resolver for static html fields. The markup lives in the field schema, not
/// in the entry: it is recorded under `html_id` keyed by the field identifier
/// and under the `html` sequence.
pub struct HtmlResolver<'a> {
    field: &'a Field,
    cache: OnceCell<Value>,
}

impl<'a> HtmlResolver<'a> {
    pub fn new(field: &'a Field) -> HtmlResolver<'a> {
        HtmlResolver {
            field,
            cache: OnceCell::new(),
        }
    }
}

/// The registry constructor of the html resolver.
pub fn boxed<'a>(
    field: &'a Field,
    _entry: &'a Entry,
) -> Result<Box<dyn FieldResolver + 'a>, ContextError> {
    Ok(Box::new(HtmlResolver::new(field)))
}

impl FieldResolver for HtmlResolver<'_> {
    fn form_data(&self) -> DocumentMap {
        let mut fragment = section_entry("html_id", self.field.id, self.value().clone());
        merge_into(&mut fragment, {
            let mut sequence = DocumentMap::new();
            sequence.insert(
                "html".to_string(),
                Value::Array(vec![self.value().clone()]),
            );
            sequence
        });
        fragment
    }

    fn value(&self) -> &Value {
        self.cache
            .get_or_init(|| Value::String(self.field.content.clone()))
    }

    fn html(&self) -> String {
        self.field.content.clone()
    }
}
