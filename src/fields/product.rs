use once_cell::unsync::OnceCell;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

use crate::entry::Entry;
use crate::error::ContextError;
use crate::fields::FieldResolver;
use crate::merge::DocumentMap;
use crate::schema::Field;

/// One product line item extracted from the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub field_id: u64,
    pub name: String,
    pub price: f64,
    pub quantity: f64,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        self.price * self.quantity
    }
}

/// The shared accumulator for product line items. One context is created per
/// document build and handed to every product-family resolver, so the totals
/// can be merged in a single pass after the field loop. Builds are
/// single-threaded, hence the `Rc<RefCell<_>>` sharing.
#[derive(Debug, Default)]
pub struct ProductContext {
    items: Vec<LineItem>,
}

/// The shared handle the dispatcher threads through product resolvers.
pub type SharedProductContext = Rc<RefCell<ProductContext>>;

impl ProductContext {
    pub fn new() -> ProductContext {
        ProductContext::default()
    }

    pub fn shared() -> SharedProductContext {
        Rc::new(RefCell::new(ProductContext::new()))
    }

    /// Record a line item, replacing any previous item for the same field so
    /// repeated resolution stays idempotent.
    pub fn record(&mut self, item: LineItem) {
        match self
            .items
            .iter_mut()
            .find(|existing| existing.field_id == item.field_id)
        {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The aggregated `products` / `products_totals` fragment: one entry per
    /// product field plus the summed totals.
    pub fn form_data(&self) -> DocumentMap {
        let mut products = Map::new();
        let mut subtotal = 0.0;
        for item in &self.items {
            subtotal += item.subtotal();
            products.insert(
                item.field_id.to_string(),
                json!({
                    "name": item.name,
                    "price": item.price,
                    "quantity": item.quantity,
                    "subtotal": item.subtotal(),
                }),
            );
        }

        let mut fragment = DocumentMap::new();
        fragment.insert("products".to_string(), Value::Object(products));
        fragment.insert(
            "products_totals".to_string(),
            json!({ "subtotal": subtotal, "total": subtotal }),
        );
        fragment
    }
}

/// Resolver for the whole product field family. Every product-type tag routes
/// here regardless of its sub-type; the resolver records its line item into
/// the shared context at construction time and contributes nothing to the
/// per-field sections, since products are grouped at the end of the build.
pub struct ProductResolver<'a> {
    field: &'a Field,
    context: SharedProductContext,
    cache: OnceCell<Value>,
}

impl<'a> ProductResolver<'a> {
    pub fn new(
        field: &'a Field,
        entry: &'a Entry,
        context: SharedProductContext,
    ) -> ProductResolver<'a> {
        let item = extract_line_item(field, entry);
        context.borrow_mut().record(item);

        ProductResolver {
            field,
            context,
            cache: OnceCell::new(),
        }
    }
}

/// The registry constructor of the product route.
pub fn boxed<'a>(
    field: &'a Field,
    entry: &'a Entry,
    context: SharedProductContext,
) -> Result<Box<dyn FieldResolver + 'a>, ContextError> {
    Ok(Box::new(ProductResolver::new(field, entry, context)))
}

impl FieldResolver for ProductResolver<'_> {
    fn form_data(&self) -> DocumentMap {
        // Grouped into `products` / `products_totals` after the field loop.
        DocumentMap::new()
    }

    fn value(&self) -> &Value {
        self.cache.get_or_init(|| {
            let context = self.context.borrow();
            let item = context
                .items
                .iter()
                .find(|item| item.field_id == self.field.id);
            match item {
                Some(item) => json!({
                    "name": item.name,
                    "price": item.price,
                    "quantity": item.quantity,
                    "subtotal": item.subtotal(),
                }),
                None => Value::Null,
            }
        })
    }
}

/// Pull the name, price and quantity of a product field out of the entry. The
/// composite keys `<id>.1` / `<id>.2` / `<id>.3` hold name, price and quantity;
/// single-input product sub-types (shipping, total) store the price directly
/// under the field identifier.
fn extract_line_item(field: &Field, entry: &Entry) -> LineItem {
    let name_key = format!("{}.1", field.id);
    let price_key = format!("{}.2", field.id);
    let quantity_key = format!("{}.3", field.id);

    let name = match entry.value_string(&name_key) {
        name if name.is_empty() => field.label.clone(),
        name => name,
    };
    let price = match entry.value(&price_key) {
        Some(price) => parse_amount(price),
        None => entry
            .field_value(field.id)
            .map(parse_amount)
            .unwrap_or(0.0),
    };
    let quantity = match entry.value(&quantity_key) {
        Some(quantity) => parse_amount(quantity),
        None => 1.0,
    };

    LineItem {
        field_id: field.id,
        name,
        price,
        quantity,
    }
}

/// Parse a money-ish value, tolerating currency symbols and thousand separators
/// in submitted strings. Unparsable values count as zero.
fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(string) => {
            let cleaned: String = string
                .chars()
                .filter(|character| character.is_ascii_digit() || *character == '.' || *character == '-')
                .collect();
            cleaned.parse().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_amount, ProductContext, ProductResolver};
    use crate::entry::Entry;
    use crate::schema::Field;
    use serde_json::json;

    #[test]
    fn amounts_tolerate_currency_formatting() {
        assert_eq!(parse_amount(&json!("$1,230.50")), 1230.50);
        assert_eq!(parse_amount(&json!(42)), 42.0);
        assert_eq!(parse_amount(&json!("not a price")), 0.0);
    }

    #[test]
    fn line_items_are_recorded_once_per_field_and_totalled() {
        let first: Field = serde_json::from_value(
            json!({ "id": 6, "type": "product", "label": "Widget" }),
        )
        .unwrap();
        let second: Field = serde_json::from_value(
            json!({ "id": 7, "type": "shipping", "label": "Shipping" }),
        )
        .unwrap();
        let entry: Entry = serde_json::from_value(json!({
            "id": 1,
            "formId": 1,
            "6.1": "Widget",
            "6.2": "$10.00",
            "6.3": "3",
            "7": "$5.00"
        }))
        .unwrap();

        let context = ProductContext::shared();
        let _ = ProductResolver::new(&first, &entry, context.clone());
        // Resolving the same field twice must not duplicate the line item.
        let _ = ProductResolver::new(&first, &entry, context.clone());
        let _ = ProductResolver::new(&second, &entry, context.clone());

        let fragment = context.borrow().form_data();
        similar_asserts::assert_eq!(
            serde_json::Value::Object(fragment),
            json!({
                "products": {
                    "6": { "name": "Widget", "price": 10.0, "quantity": 3.0, "subtotal": 30.0 },
                    "7": { "name": "Shipping", "price": 5.0, "quantity": 1.0, "subtotal": 5.0 }
                },
                "products_totals": { "subtotal": 35.0, "total": 35.0 }
            })
        );
    }
}
