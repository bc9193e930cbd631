use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};

use crate::entry::Entry;
use crate::error::ContextError;
use crate::fields::{section, section_entry, FieldResolver};
use crate::merge::{merge_into, DocumentMap};
use crate::schema::Field;

/// Resolver for signature fields. The entry stores a reference to the captured
/// signature image; it is recorded three ways for template convenience: in the
/// `signature` sequence, under `signature_details` keyed by the field label and
/// under `signature_details_id` keyed by the field identifier.
pub struct SignatureResolver<'a> {
    field: &'a Field,
    entry: &'a Entry,
    cache: OnceCell<Value>,
}

impl<'a> SignatureResolver<'a> {
    pub fn new(field: &'a Field, entry: &'a Entry) -> SignatureResolver<'a> {
        SignatureResolver {
            field,
            entry,
            cache: OnceCell::new(),
        }
    }
}

/// The registry constructor of the signature resolver.
pub fn boxed<'a>(
    field: &'a Field,
    entry: &'a Entry,
) -> Result<Box<dyn FieldResolver + 'a>, ContextError> {
    Ok(Box::new(SignatureResolver::new(field, entry)))
}

impl FieldResolver for SignatureResolver<'_> {
    fn form_data(&self) -> DocumentMap {
        let mut fragment = section_entry("signature_details_id", self.field.id, self.value().clone());

        let mut by_label = Map::new();
        by_label.insert(self.field.label.clone(), self.value().clone());
        merge_into(&mut fragment, section("signature_details", by_label));

        let mut sequence = DocumentMap::new();
        sequence.insert(
            "signature".to_string(),
            Value::Array(vec![self.value().clone()]),
        );
        merge_into(&mut fragment, sequence);

        fragment
    }

    fn value(&self) -> &Value {
        self.cache.get_or_init(|| {
            Value::String(self.entry.value_string(&self.field.id.to_string()))
        })
    }
}
