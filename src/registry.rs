use std::collections::HashMap;

use crate::entry::Entry;
use crate::error::ContextError;
use crate::fields::product::SharedProductContext;
use crate::fields::{
    default_boxed, html, likert, list, product, section_break, signature, DefaultResolver,
    FieldResolver, ResolverCtor,
};
use crate::schema::{is_product_field_type, Field};

/// The constructor signature of the product route, which additionally receives
/// the shared product context of the current build.
pub type ProductResolverCtor = for<'a> fn(
    &'a Field,
    &'a Entry,
    SharedProductContext,
) -> Result<Box<dyn FieldResolver + 'a>, ContextError>;

/// The enumerated ways resolver dispatch can fail. These never escape the
/// registry: the public resolution degrades to the fallback resolver instead.
#[derive(Debug, Clone)]
pub enum DispatchError {
    /// No constructor is registered for the field's type tag.
    UnregisteredTag { tag: String },
    /// A registered constructor refused the field.
    ConstructionFailed { tag: String, error: ContextError },
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::UnregisteredTag { tag } => {
                write!(formatter, "No resolver is registered for the type tag {:?}", tag)
            }
            DispatchError::ConstructionFailed { tag, error } => write!(
                formatter,
                "The resolver registered for the type tag {:?} failed to construct: {}",
                tag, error
            ),
        }
    }
}

impl std::error::Error for DispatchError {}

/// The type tag to resolver constructor registry.
///
/// Product-family tags always route to the product resolver so line items can
/// be aggregated into totals; every other tag goes through the registered
/// constructor for its exact tag, with caller overrides taking precedence.
/// Resolution never fails the document build: any dispatch error falls back to
/// the generic default resolver.
pub struct ResolverRegistry {
    constructors: HashMap<String, ResolverCtor>,
    overrides: HashMap<String, ResolverCtor>,
    product: ProductResolverCtor,
    fallback: ResolverCtor,
}

impl Default for ResolverRegistry {
    fn default() -> ResolverRegistry {
        let mut registry = ResolverRegistry {
            constructors: HashMap::new(),
            overrides: HashMap::new(),
            product: product::boxed,
            fallback: default_boxed,
        };
        registry.register("text", default_boxed);
        registry.register("likert", likert::boxed);
        registry.register("survey", likert::boxed);
        registry.register("list", list::boxed);
        registry.register("html", html::boxed);
        registry.register("section", section_break::boxed);
        registry.register("signature", signature::boxed);
        registry
    }
}

impl ResolverRegistry {
    pub fn new() -> ResolverRegistry {
        ResolverRegistry::default()
    }

    /// Register the constructor for a type tag, replacing any previous one.
    pub fn register<S: Into<String>>(&mut self, tag: S, constructor: ResolverCtor) {
        self.constructors.insert(tag.into(), constructor);
    }

    /// Register a caller override for a type tag. Overrides win over the base
    /// registration without removing it.
    pub fn register_override<S: Into<String>>(&mut self, tag: S, constructor: ResolverCtor) {
        self.overrides.insert(tag.into(), constructor);
    }

    /// Replace the resolver the whole product family routes to.
    pub fn register_product_override(&mut self, constructor: ProductResolverCtor) {
        self.product = constructor;
    }

    /// Replace the fallback resolver used when dispatch fails.
    pub fn register_fallback(&mut self, constructor: ResolverCtor) {
        self.fallback = constructor;
    }

    fn try_resolve<'a>(
        &self,
        field: &'a Field,
        entry: &'a Entry,
        products: &SharedProductContext,
    ) -> Result<Box<dyn FieldResolver + 'a>, DispatchError> {
        if is_product_field_type(&field.field_type) {
            return (self.product)(field, entry, products.clone()).map_err(|error| {
                DispatchError::ConstructionFailed {
                    tag: field.field_type.clone(),
                    error,
                }
            });
        }

        let constructor = self
            .overrides
            .get(&field.field_type)
            .or_else(|| self.constructors.get(&field.field_type))
            .ok_or_else(|| DispatchError::UnregisteredTag {
                tag: field.field_type.clone(),
            })?;

        constructor(field, entry).map_err(|error| DispatchError::ConstructionFailed {
            tag: field.field_type.clone(),
            error,
        })
    }

    /// Resolve the handler for a field. This is total: any dispatch failure is
    /// logged and degrades to the fallback resolver, which renders the field
    /// from its generic metadata.
    pub fn resolve_field_handler<'a>(
        &self,
        field: &'a Field,
        entry: &'a Entry,
        products: &SharedProductContext,
    ) -> Box<dyn FieldResolver + 'a> {
        match self.try_resolve(field, entry, products) {
            Ok(resolver) => resolver,
            Err(dispatch_error) => {
                log::warn!(
                    "Falling back to the default resolver for field {}: {}",
                    field.id,
                    dispatch_error
                );
                (self.fallback)(field, entry).unwrap_or_else(|fallback_error| {
                    // The default resolver construction is infallible, but a
                    // caller-registered fallback might not be. Degrade to the
                    // built-in default rather than failing the build.
                    log::error!(
                        "The fallback resolver failed for field {}: {}",
                        field.id,
                        fallback_error
                    );
                    Box::new(DefaultResolver::new(field, entry))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResolverRegistry;
    use crate::entry::Entry;
    use crate::fields::product::ProductContext;
    use crate::fields::FieldResolver as _;
    use crate::schema::Field;
    use serde_json::json;

    fn entry() -> Entry {
        serde_json::from_value(json!({ "id": 1, "formId": 1, "12": "anything" })).unwrap()
    }

    #[test]
    fn an_unregistered_tag_falls_back_to_the_default_resolver() {
        let registry = ResolverRegistry::new();
        let field: Field = serde_json::from_value(
            json!({ "id": 12, "type": "made_up_widget", "label": "Widget" }),
        )
        .unwrap();
        let entry = entry();
        let products = ProductContext::shared();

        let resolver = registry.resolve_field_handler(&field, &entry, &products);
        similar_asserts::assert_eq!(
            serde_json::Value::Object(resolver.form_data()),
            json!({ "field": { "12": "anything" } })
        );
    }

    #[test]
    fn a_failing_constructor_falls_back_to_the_default_resolver() {
        let registry = ResolverRegistry::new();
        // A likert field without columns refuses construction.
        let field: Field = serde_json::from_value(
            json!({ "id": 12, "type": "likert", "label": "Broken grid" }),
        )
        .unwrap();
        let entry = entry();
        let products = ProductContext::shared();

        let resolver = registry.resolve_field_handler(&field, &entry, &products);
        similar_asserts::assert_eq!(
            serde_json::Value::Object(resolver.form_data()),
            json!({ "field": { "12": "anything" } })
        );
    }

    fn refusing_constructor<'a>(
        field: &'a Field,
        _entry: &'a Entry,
    ) -> Result<Box<dyn crate::fields::FieldResolver + 'a>, crate::error::ContextError> {
        Err(crate::error::ContextError::with_context(format!(
            "refusing field {}",
            field.id
        )))
    }

    #[test]
    fn overrides_win_over_the_base_registration() {
        let mut registry = ResolverRegistry::new();
        registry.register_override("text", refusing_constructor);

        let field: Field =
            serde_json::from_value(json!({ "id": 12, "type": "text", "label": "Name" })).unwrap();
        let entry = entry();
        let products = ProductContext::shared();

        // The override fails, so even a registered base tag degrades gracefully.
        let resolver = registry.resolve_field_handler(&field, &entry, &products);
        similar_asserts::assert_eq!(
            serde_json::Value::Object(resolver.form_data()),
            json!({ "field": { "12": "anything" } })
        );
    }
}
