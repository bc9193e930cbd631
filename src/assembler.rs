use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::aggregates::{poll_results, quiz_results, survey_results};
use crate::entry::Entry;
use crate::error::ContextError;
use crate::fields::product::ProductContext;
use crate::merge::{merge_into, DocumentMap};
use crate::registry::ResolverRegistry;
use crate::results::ResultsProvider;
use crate::schema::{is_product_field_type, Form};

/// Field type tags which never contribute to the document.
pub const DEFAULT_SKIPPED_FIELD_TYPES: [&str; 3] = ["captcha", "password", "page"];

/// The fixed priority sequence of top-level document keys. Listed keys present
/// in the accumulator are re-appended in this order after assembly; unlisted
/// keys keep their relative position ahead of them. Template authors key their
/// placeholders off these names, so they must not be renamed lightly.
pub const DOCUMENT_KEY_ORDER: [&str; 16] = [
    "misc",
    "field",
    "list",
    "signature_details_id",
    "products",
    "products_totals",
    "poll",
    "survey",
    "quiz",
    "pages",
    "html_id",
    "section_break",
    "field_descriptions",
    "signature",
    "signature_details",
    "html",
];

/// The entry attributes copied verbatim into the `misc` section, defaulting to
/// an empty string when the entry does not carry them.
const MISC_ENTRY_ATTRIBUTES: [&str; 15] = [
    "is_starred",
    "is_read",
    "ip",
    "source_url",
    "post_id",
    "currency",
    "payment_status",
    "payment_date",
    "transaction_id",
    "payment_amount",
    "is_fulfilled",
    "created_by",
    "transaction_type",
    "user_agent",
    "status",
];

/// Orchestrates one document build: resolves every field through the registry,
/// merges the per-field fragments, the metadata and the aggregate sections into
/// a single accumulator and enforces the final key ordering.
///
/// The assembler owns no state across builds; each `build` call works on a
/// fresh accumulator and a fresh product context, so independent builds can run
/// concurrently from their own assembler instances without any locking.
pub struct DocumentAssembler<'a> {
    registry: &'a ResolverRegistry,
    results: &'a dyn ResultsProvider,
    skipped_field_types: Vec<String>,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(
        registry: &'a ResolverRegistry,
        results: &'a dyn ResultsProvider,
    ) -> DocumentAssembler<'a> {
        DocumentAssembler {
            registry,
            results,
            skipped_field_types: DEFAULT_SKIPPED_FIELD_TYPES
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
        }
    }

    /// Extend the skip-set with further field type tags.
    pub fn skip_field_type<S: Into<String>>(mut self, tag: S) -> DocumentAssembler<'a> {
        self.skipped_field_types.push(tag.into());
        self
    }

    /// Build the document for one form and entry. Fails only on input errors
    /// (here: an unparsable entry creation date); resolution and aggregate
    /// failures degrade per-component instead of aborting the build.
    pub fn build(&self, form: &Form, entry: &Entry) -> Result<DocumentMap, ContextError> {
        let mut document = DocumentMap::new();
        document.insert("misc".to_string(), Value::Object(Map::new()));
        document.insert("field".to_string(), Value::Object(Map::new()));
        document.insert("field_descriptions".to_string(), Value::Object(Map::new()));

        merge_into(&mut document, self.form_meta(form, entry)?);
        merge_into(&mut document, survey_results(form, entry, self.results));
        merge_into(&mut document, quiz_results(form, entry, self.results));
        merge_into(&mut document, poll_results(form, entry, self.results));

        let products = ProductContext::shared();
        let mut has_product_fields = false;

        for field in &form.fields {
            if is_product_field_type(&field.field_type) {
                has_product_fields = true;
            }
            if self.skipped_field_types.contains(&field.field_type) {
                continue;
            }

            if let Some(Value::Object(descriptions)) = document.get_mut("field_descriptions") {
                descriptions.insert(
                    field.id.to_string(),
                    Value::String(field.description.clone()),
                );
            }

            let resolver = self.registry.resolve_field_handler(field, entry, &products);
            merge_into(&mut document, resolver.form_data());
        }

        if has_product_fields {
            merge_into(&mut document, products.borrow().form_data());
        }

        reorder_document_keys(&mut document);

        Ok(document)
    }

    /// The form and entry metadata fragment: identifiers, titles, the creation
    /// date in two locale orders, the page names and the fixed `misc`
    /// attribute allow-list.
    fn form_meta(&self, form: &Form, entry: &Entry) -> Result<DocumentMap, ContextError> {
        let mut meta = DocumentMap::new();
        meta.insert("form_id".to_string(), Value::from(entry.form_id));
        meta.insert("entry_id".to_string(), Value::from(entry.id));
        meta.insert("form_title".to_string(), Value::String(form.title.clone()));
        meta.insert(
            "form_description".to_string(),
            Value::String(form.description.clone()),
        );
        meta.insert(
            "date_created".to_string(),
            Value::String(entry.date_created_day_first()?),
        );
        meta.insert(
            "date_created_usa".to_string(),
            Value::String(entry.date_created_month_first()?),
        );

        let pages = form
            .pagination
            .as_ref()
            .map(|pagination| pagination.pages.clone())
            .unwrap_or_default();
        meta.insert(
            "pages".to_string(),
            Value::Array(pages.into_iter().map(Value::String).collect()),
        );

        let mut misc = DocumentMap::new();
        misc.insert("date_time".to_string(), Value::String(entry.date_time()?));
        misc.insert("time_24hr".to_string(), Value::String(entry.time_24hr()?));
        misc.insert("time_12hr".to_string(), Value::String(entry.time_12hr()?));
        for attribute in MISC_ENTRY_ATTRIBUTES {
            misc.insert(
                attribute.to_string(),
                entry
                    .value(attribute)
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new())),
            );
        }
        meta.insert("misc".to_string(), Value::Object(misc));

        Ok(meta)
    }
}

/// Re-append every listed key present in the document in the fixed priority
/// order. On the insertion-ordered document map this leaves unlisted keys in
/// their original relative order ahead of all listed keys, making the final
/// top-level sequence independent of which fields happened to merge first.
pub fn reorder_document_keys(document: &mut DocumentMap) {
    for key in DOCUMENT_KEY_ORDER {
        if let Some(section) = document.shift_remove(key) {
            document.insert(key.to_string(), section);
        }
    }
}

/// Supplies forms by identifier; the form's fields come back in stable,
/// schema-declared order.
pub trait FormProvider {
    fn form(&self, form_id: u64) -> Result<Form, ContextError>;
}

/// Supplies entries by identifier, failing with a not-found error for an
/// invalid identifier.
pub trait EntryProvider {
    fn entry(&self, entry_id: u64) -> Result<Entry, ContextError>;
}

/// An in-memory form store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryForms {
    forms: HashMap<u64, Form>,
}

impl InMemoryForms {
    pub fn new() -> InMemoryForms {
        InMemoryForms::default()
    }

    pub fn insert(&mut self, form: Form) {
        self.forms.insert(form.id, form);
    }
}

impl FormProvider for InMemoryForms {
    fn form(&self, form_id: u64) -> Result<Form, ContextError> {
        self.forms
            .get(&form_id)
            .cloned()
            .ok_or_else(|| ContextError::with_context(format!("Unable to find the form {}", form_id)))
    }
}

/// An in-memory entry store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntries {
    entries: HashMap<u64, Entry>,
}

impl InMemoryEntries {
    pub fn new() -> InMemoryEntries {
        InMemoryEntries::default()
    }

    pub fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry.id, entry);
    }
}

impl EntryProvider for InMemoryEntries {
    fn entry(&self, entry_id: u64) -> Result<Entry, ContextError> {
        self.entries
            .get(&entry_id)
            .cloned()
            .ok_or_else(|| {
                ContextError::with_context(format!("Unable to find the entry {}", entry_id))
            })
    }
}

/// The front door for callers holding only an entry identifier: fetches the
/// entry, fetches its form and runs the assembler. Provider failures propagate
/// as-is; a partial document is never produced.
pub struct Generator<'a> {
    forms: &'a dyn FormProvider,
    entries: &'a dyn EntryProvider,
    assembler: DocumentAssembler<'a>,
}

impl<'a> Generator<'a> {
    pub fn new(
        forms: &'a dyn FormProvider,
        entries: &'a dyn EntryProvider,
        assembler: DocumentAssembler<'a>,
    ) -> Generator<'a> {
        Generator {
            forms,
            entries,
            assembler,
        }
    }

    pub fn generate(&self, entry_id: u64) -> Result<DocumentMap, ContextError> {
        let entry = self.entries.entry(entry_id)?;
        let form = self.forms.form(entry.form_id)?;
        self.assembler.build(&form, &entry)
    }
}
