use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::merge::DocumentMap;
use crate::schema::{Field, Form};

/// A batch statistics query. The `scope` key distinguishes callers, so
/// simultaneous survey and poll extraction on the same form cannot
/// cross-contaminate cached query results; `calculation` optionally names an
/// addon-specific calculation the backend should run on top of the grouping.
#[derive(Debug, Clone)]
pub struct ResultsQuery<'a> {
    pub scope: &'a str,
    pub calculation: Option<&'a str>,
}

/// Grouped global results across a set of fields, keyed by field identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultsData {
    pub entry_count: u64,
    pub field_data: DocumentMap,
}

impl ResultsData {
    /// Embed the results under a `global` sub-section the way the aggregate
    /// sections expect them.
    pub fn into_value(self) -> Value {
        let mut global = DocumentMap::new();
        global.insert("entry_count".to_string(), Value::from(self.entry_count));
        global.insert("field_data".to_string(), Value::Object(self.field_data));
        Value::Object(global)
    }
}

/// The ways a statistics query can fail. `Unavailable` models a missing addon
/// backend; the aggregate extractors degrade to an empty fragment on any error
/// rather than aborting the document build.
#[derive(Debug, Clone)]
pub enum ResultsError {
    Unavailable { scope: String },
    Backend { scope: String, reason: String },
}

impl std::fmt::Display for ResultsError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultsError::Unavailable { scope } => {
                write!(formatter, "The {:?} statistics backend is unavailable", scope)
            }
            ResultsError::Backend { scope, reason } => write!(
                formatter,
                "The {:?} statistics backend failed: {}",
                scope, reason
            ),
        }
    }
}

impl std::error::Error for ResultsError {}

/// The batch statistics subsystem seam. Implementations run one synchronous
/// query per extractor call; they are treated as slow, fail-soft collaborators
/// with a single attempt and no retries.
pub trait ResultsProvider {
    fn global_results(
        &self,
        form: &Form,
        fields: &[&Field],
        query: &ResultsQuery<'_>,
    ) -> Result<ResultsData, ResultsError>;
}

/// An in-memory provider serving pre-computed results per query scope, used in
/// tests and by the command line interface.
#[derive(Debug, Clone, Default)]
pub struct StaticResultsProvider {
    by_scope: HashMap<String, ResultsData>,
}

impl StaticResultsProvider {
    pub fn new() -> StaticResultsProvider {
        StaticResultsProvider::default()
    }

    pub fn insert<S: Into<String>>(&mut self, scope: S, results: ResultsData) {
        self.by_scope.insert(scope.into(), results);
    }
}

impl ResultsProvider for StaticResultsProvider {
    fn global_results(
        &self,
        _form: &Form,
        _fields: &[&Field],
        query: &ResultsQuery<'_>,
    ) -> Result<ResultsData, ResultsError> {
        self.by_scope
            .get(query.scope)
            .cloned()
            .ok_or_else(|| ResultsError::Unavailable {
                scope: query.scope.to_string(),
            })
    }
}

/// A provider whose backend is missing: every query reports `Unavailable`,
/// which the extractors turn into empty fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableResultsProvider;

impl ResultsProvider for UnavailableResultsProvider {
    fn global_results(
        &self,
        _form: &Form,
        _fields: &[&Field],
        query: &ResultsQuery<'_>,
    ) -> Result<ResultsData, ResultsError> {
        Err(ResultsError::Unavailable {
            scope: query.scope.to_string(),
        })
    }
}
