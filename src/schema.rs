use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::ContextError;

/// The field type tags which are always routed to the product resolver, no matter
/// which concrete product sub-type they carry.
pub const PRODUCT_FIELD_TYPES: [&str; 6] = [
    "product",
    "option",
    "quantity",
    "shipping",
    "total",
    "calculation",
];

/// Whether the given field type tag belongs to the recognized product family.
pub fn is_product_field_type(field_type: &str) -> bool {
    PRODUCT_FIELD_TYPES.contains(&field_type)
}

/// An immutable form schema: the ordered field definitions plus the form-level
/// metadata which ends up in the assembled document.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Form {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub pagination: Option<Pagination>,
    /// The grading configuration contributed by the quiz addon, absent when the
    /// form carries no quiz settings.
    pub quiz_settings: Option<QuizSettings>,
}

impl Form {
    pub fn from_path(form_path: &PathBuf) -> Result<Form, ContextError> {
        let form_content = std::fs::read_to_string(form_path).map_err(|error| {
            ContextError::with_error(format!("Unable to read the form {:?}", form_path), &error)
        })?;
        let form: Form = serde_json::from_str(&form_content).map_err(|error| {
            ContextError::with_error(format!("Unable to parse the form {:?}", form_path), &error)
        })?;

        Ok(form)
    }

    /// Whether at least one field of the form declares the given type tag.
    pub fn has_field_of_type(&self, field_type: &str) -> bool {
        self.fields
            .iter()
            .any(|field| field.field_type == field_type)
    }

    /// All the fields declaring the given type tag, in schema order.
    pub fn fields_by_type(&self, field_type: &str) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|field| field.field_type == field_type)
            .collect()
    }
}

/// A single schema node of a form. The type tag comes from an open set, so any
/// unknown tag is still representable and falls back to the generic resolver.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Field {
    pub id: u64,
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    pub description: String,
    /// The static markup carried by html fields.
    pub content: String,
    /// The value code to display text associations of choice-based fields.
    pub choices: Vec<Choice>,
    /// The composite sub-fields of multi-row fields, empty for scalar fields.
    pub inputs: Vec<Input>,
    /// Whether a survey field lays its choices out as a multi-row likert grid.
    pub enable_multiple_rows: bool,
    /// The row definitions of a multi-row survey likert grid.
    pub likert_rows: Vec<LikertRow>,
}

/// One selectable choice of a field: the opaque stored code and its display text.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Choice {
    pub value: String,
    pub text: String,
    /// Whether the quiz addon flags this choice as the correct answer.
    pub is_correct: bool,
}

/// One composite sub-field of a multi-row field.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Input {
    /// The composite entry key, for example `"2.1"` for the first input of field 2.
    pub id: String,
    pub label: String,
    /// The row name used to build the `<row-name>:<column-code>` selection key.
    pub name: String,
}

/// One row of a multi-row survey likert grid.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LikertRow {
    pub value: String,
    pub text: String,
}

/// The page names of a paginated form.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub pages: Vec<String>,
}

/// The quiz addon grading configuration. All values are carried verbatim since
/// the grading scale is defined by the addon, not by this pipeline.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizSettings {
    pub grading: String,
    pub pass_percent: Value,
    pub grades: Value,
}
