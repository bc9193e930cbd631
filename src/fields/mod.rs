use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};

use crate::entry::Entry;
use crate::error::ContextError;
use crate::merge::DocumentMap;
use crate::schema::Field;

pub mod html;
pub mod likert;
pub mod list;
pub mod product;
pub mod section_break;
pub mod signature;

/// A per-field handler: given one field schema and the entry it computes that
/// field's contribution to the assembled document.
///
/// The computed value is memoized per resolver instance: the first `value()`
/// call computes and caches, every later call returns the identical cached
/// value even if the underlying entry has changed in the meantime. Callers
/// wanting a recomputation must construct a new resolver.
pub trait FieldResolver {
    /// The partial document fragment this field contributes, scoped under a
    /// type-appropriate top-level key (`field`, `list`, `signature`, ...).
    /// Fragments from different fields merge without clobbering siblings.
    fn form_data(&self) -> DocumentMap;

    /// The memoized rendered value of this field.
    fn value(&self) -> &Value;

    /// A plain markup rendering of the memoized value.
    fn html(&self) -> String {
        display_value(self.value())
    }
}

/// The constructor signature stored in the resolver registry. Construction may
/// fail (for example a likert field without declared columns), in which case
/// the dispatcher degrades to the fallback resolver.
pub type ResolverCtor =
    for<'a> fn(&'a Field, &'a Entry) -> Result<Box<dyn FieldResolver + 'a>, ContextError>;

/// Flatten a rendered value into displayable text.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(string) => string.clone(),
        Value::Bool(boolean) => boolean.to_string(),
        Value::Number(number) => number.to_string(),
        composite => composite.to_string(),
    }
}

/// Wrap a per-field value map under a single top-level section key.
pub(crate) fn section(section_key: &str, entries: Map<String, Value>) -> DocumentMap {
    let mut fragment = Map::new();
    fragment.insert(section_key.to_string(), Value::Object(entries));
    fragment
}

/// Wrap one `field id -> value` pair under a top-level section key.
pub(crate) fn section_entry(section_key: &str, field_id: u64, value: Value) -> DocumentMap {
    let mut entries = Map::new();
    entries.insert(field_id.to_string(), value);
    section(section_key, entries)
}

/// The generic resolver: renders any field from its generic metadata only, the
/// guaranteed fallback of the dispatcher. Composite fields come out as a
/// `sub-label -> submitted value` mapping, everything else as the raw value.
pub struct DefaultResolver<'a> {
    field: &'a Field,
    entry: &'a Entry,
    cache: OnceCell<Value>,
}

impl<'a> DefaultResolver<'a> {
    pub fn new(field: &'a Field, entry: &'a Entry) -> DefaultResolver<'a> {
        DefaultResolver {
            field,
            entry,
            cache: OnceCell::new(),
        }
    }
}

/// The registry constructor of the generic fallback resolver. A free function
/// so the lifetime stays late-bound and the item coerces to `ResolverCtor`.
pub fn default_boxed<'a>(
    field: &'a Field,
    entry: &'a Entry,
) -> Result<Box<dyn FieldResolver + 'a>, ContextError> {
    Ok(Box::new(DefaultResolver::new(field, entry)))
}

impl FieldResolver for DefaultResolver<'_> {
    fn form_data(&self) -> DocumentMap {
        section_entry("field", self.field.id, self.value().clone())
    }

    fn value(&self) -> &Value {
        self.cache.get_or_init(|| {
            if self.field.inputs.is_empty() {
                return self
                    .entry
                    .field_value(self.field.id)
                    .cloned()
                    .unwrap_or(Value::String(String::new()));
            }

            let mut composite = Map::new();
            for input in &self.field.inputs {
                composite.insert(
                    input.label.clone(),
                    Value::String(self.entry.value_string(&input.id)),
                );
            }
            Value::Object(composite)
        })
    }
}
