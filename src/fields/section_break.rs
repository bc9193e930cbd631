use once_cell::unsync::OnceCell;
use serde_json::Value;

use crate::entry::Entry;
use crate::error::ContextError;
use crate::fields::{section_entry, FieldResolver};
use crate::merge::DocumentMap;
use crate::schema::Field;

/// Resolver for section break fields: structural markers whose description text
/// is recorded under the `section_break` section.
pub struct SectionBreakResolver<'a> {
    field: &'a Field,
    cache: OnceCell<Value>,
}

impl<'a> SectionBreakResolver<'a> {
    pub fn new(field: &'a Field) -> SectionBreakResolver<'a> {
        SectionBreakResolver {
            field,
            cache: OnceCell::new(),
        }
    }
}

/// The registry constructor of the section break resolver.
pub fn boxed<'a>(
    field: &'a Field,
    _entry: &'a Entry,
) -> Result<Box<dyn FieldResolver + 'a>, ContextError> {
    Ok(Box::new(SectionBreakResolver::new(field)))
}

impl FieldResolver for SectionBreakResolver<'_> {
    fn form_data(&self) -> DocumentMap {
        section_entry("section_break", self.field.id, self.value().clone())
    }

    fn value(&self) -> &Value {
        self.cache
            .get_or_init(|| Value::String(self.field.description.clone()))
    }
}
