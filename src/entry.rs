use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use time::{macros::format_description, PrimitiveDateTime};

use crate::error::ContextError;

/// One submitted instance of a form. Everything beyond the identifiers and the
/// creation date lives in the flat `values` map, keyed either by a field
/// identifier (`"2"`), a composite sub-identifier (`"2.1"`) or one of the
/// entry-level metadata keys (`"ip"`, `"payment_status"`, `"gquiz_score"`, ...).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Entry {
    pub id: u64,
    pub form_id: u64,
    /// The creation timestamp, stored as `YYYY-MM-DD HH:MM:SS`.
    pub date_created: String,
    #[serde(flatten)]
    pub values: serde_json::Map<String, Value>,
}

impl Entry {
    pub fn from_path(entry_path: &PathBuf) -> Result<Entry, ContextError> {
        let entry_content = std::fs::read_to_string(entry_path).map_err(|error| {
            ContextError::with_error(format!("Unable to read the entry {:?}", entry_path), &error)
        })?;
        let entry: Entry = serde_json::from_str(&entry_content).map_err(|error| {
            ContextError::with_error(format!("Unable to parse the entry {:?}", entry_path), &error)
        })?;

        Ok(entry)
    }

    /// The raw submitted value stored under the given key, if any.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The raw submitted value stored under the given key, rendered as a string
    /// with an empty-string default for absent or null values.
    pub fn value_string(&self, key: &str) -> String {
        match self.values.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(string)) => string.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// The raw submitted value of a whole field, keyed by its identifier.
    pub fn field_value(&self, field_id: u64) -> Option<&Value> {
        self.values.get(&field_id.to_string())
    }

    fn creation_date(&self) -> Result<PrimitiveDateTime, ContextError> {
        let stored_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        PrimitiveDateTime::parse(&self.date_created, stored_format).map_err(|error| {
            ContextError::with_error(
                format!(
                    "Unable to parse the entry creation date {:?}",
                    self.date_created
                ),
                &error,
            )
        })
    }

    /// The creation date in day-first order without leading zeros, for example `15/1/2024`.
    pub fn date_created_day_first(&self) -> Result<String, ContextError> {
        self.format_creation_date(format_description!(
            "[day padding:none]/[month padding:none]/[year]"
        ))
    }

    /// The creation date in month-first order without leading zeros, for example `1/15/2024`.
    pub fn date_created_month_first(&self) -> Result<String, ContextError> {
        self.format_creation_date(format_description!(
            "[month padding:none]/[day padding:none]/[year]"
        ))
    }

    /// The full creation timestamp, `YYYY-MM-DD HH:MM:SS`.
    pub fn date_time(&self) -> Result<String, ContextError> {
        self.format_creation_date(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
    }

    /// The creation time on a 24 hour clock, for example `14:05`.
    pub fn time_24hr(&self) -> Result<String, ContextError> {
        self.format_creation_date(format_description!("[hour]:[minute]"))
    }

    /// The creation time on a 12 hour clock with a lowercase period, for example `2:05pm`.
    pub fn time_12hr(&self) -> Result<String, ContextError> {
        self.format_creation_date(format_description!(
            "[hour repr:12 padding:none]:[minute][period case:lower]"
        ))
    }

    fn format_creation_date(
        &self,
        format: &[time::format_description::BorrowedFormatItem<'_>],
    ) -> Result<String, ContextError> {
        self.creation_date()?.format(format).map_err(|error| {
            ContextError::with_error(
                format!(
                    "Unable to format the entry creation date {:?}",
                    self.date_created
                ),
                &error,
            )
        })
    }
}
