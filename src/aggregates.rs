use serde_json::{Map, Value};

use crate::entry::Entry;
use crate::merge::{replace_key, replace_key_within, DocumentMap};
use crate::results::{ResultsData, ResultsProvider, ResultsQuery};
use crate::schema::{Field, Form};

/// Pull the survey section: the grouped global statistics across all survey
/// fields, with every coded choice value re-keyed to its display text, plus the
/// entry's survey score when one was recorded.
///
/// Contributes nothing when the form has no survey fields or when the
/// statistics backend is unavailable.
pub fn survey_results(
    form: &Form,
    entry: &Entry,
    provider: &dyn ResultsProvider,
) -> DocumentMap {
    if !form.has_field_of_type("survey") {
        return DocumentMap::new();
    }

    let fields = form.fields_by_type("survey");
    let query = ResultsQuery {
        scope: "survey",
        calculation: None,
    };
    let mut results = match provider.global_results(form, &fields, &query) {
        Ok(results) => results,
        Err(error) => {
            log::warn!("Skipping the survey section: {}", error);
            return DocumentMap::new();
        }
    };

    for field in &fields {
        let field_key = field.id.to_string();

        // Multi-row likert grids first re-key each row code to the row text,
        // then each choice code within the renamed row.
        if field.enable_multiple_rows {
            for row in &field.likert_rows {
                replace_key_within(&mut results.field_data, &field_key, &row.value, &row.text);
                if let Some(row_map) = nested_map(&mut results.field_data, &field_key, &row.text) {
                    for choice in &field.choices {
                        replace_key(row_map, &choice.value, &choice.text);
                    }
                }
            }
        }

        // The standard row data re-keys choice codes directly.
        for choice in &field.choices {
            replace_key_within(&mut results.field_data, &field_key, &choice.value, &choice.text);
        }
    }

    let mut survey = DocumentMap::new();
    if let Some(score) = entry.value("gsurvey_score") {
        survey.insert("score".to_string(), score.clone());
    }
    survey.insert("global".to_string(), results.into_value());

    wrap_section("survey", survey)
}

/// Pull the poll section: the grouped global statistics across all poll fields
/// with a `misc.label` per field and choice codes re-keyed to display text.
pub fn poll_results(form: &Form, _entry: &Entry, provider: &dyn ResultsProvider) -> DocumentMap {
    if !form.has_field_of_type("poll") {
        return DocumentMap::new();
    }

    let fields = form.fields_by_type("poll");
    let query = ResultsQuery {
        scope: "poll",
        calculation: None,
    };
    let mut results = match provider.global_results(form, &fields, &query) {
        Ok(results) => results,
        Err(error) => {
            log::warn!("Skipping the poll section: {}", error);
            return DocumentMap::new();
        }
    };

    for field in &fields {
        let field_key = field.id.to_string();
        insert_misc_label(&mut results.field_data, &field_key, &field.label);
        for choice in &field.choices {
            replace_key_within(&mut results.field_data, &field_key, &choice.value, &choice.text);
        }
    }

    let mut poll = DocumentMap::new();
    poll.insert("global".to_string(), results.into_value());

    wrap_section("poll", poll)
}

/// Pull the quiz section: the grading configuration off the form, the entry's
/// own score values and the grouped global statistics, with the reserved
/// `totals` key renamed to `misc`, a label and the list of correct option
/// display texts appended per field.
///
/// The grading configuration tolerates a missing quiz settings block: every
/// absent value defaults to an empty string.
pub fn quiz_results(form: &Form, entry: &Entry, provider: &dyn ResultsProvider) -> DocumentMap {
    if !form.has_field_of_type("quiz") {
        return DocumentMap::new();
    }

    let fields = form.fields_by_type("quiz");
    let query = ResultsQuery {
        scope: "quiz",
        calculation: Some("quiz_results"),
    };
    let mut results = match provider.global_results(form, &fields, &query) {
        Ok(results) => results,
        Err(error) => {
            log::warn!("Skipping the quiz section: {}", error);
            return DocumentMap::new();
        }
    };

    rekey_quiz_global(&mut results, &fields);

    let mut quiz = DocumentMap::new();
    quiz.insert("config".to_string(), Value::Object(quiz_config(form)));
    quiz.insert("results".to_string(), Value::Object(quiz_entry_results(entry)));
    quiz.insert("global".to_string(), results.into_value());

    wrap_section("quiz", quiz)
}

fn rekey_quiz_global(results: &mut ResultsData, fields: &[&Field]) {
    for field in fields {
        let field_key = field.id.to_string();

        // The reserved `totals` key becomes `misc`, which then also carries
        // the field label and the correct option names.
        replace_key_within(&mut results.field_data, &field_key, "totals", "misc");
        insert_misc_label(&mut results.field_data, &field_key, &field.label);

        let mut correct_options = Vec::new();
        for choice in &field.choices {
            replace_key_within(&mut results.field_data, &field_key, &choice.value, &choice.text);
            if choice.is_correct {
                correct_options.push(Value::String(choice.text.clone()));
            }
        }

        if let Some(misc) = nested_map(&mut results.field_data, &field_key, "misc") {
            misc.insert(
                "correct_option_name".to_string(),
                Value::Array(correct_options),
            );
        }
    }
}

fn quiz_config(form: &Form) -> DocumentMap {
    let empty = Value::String(String::new());
    let mut config = DocumentMap::new();
    match &form.quiz_settings {
        Some(settings) => {
            config.insert("grading".to_string(), Value::String(settings.grading.clone()));
            config.insert(
                "pass_percent".to_string(),
                value_or_empty(&settings.pass_percent),
            );
            config.insert("grades".to_string(), value_or_empty(&settings.grades));
        }
        None => {
            config.insert("grading".to_string(), empty.clone());
            config.insert("pass_percent".to_string(), empty.clone());
            config.insert("grades".to_string(), empty);
        }
    }
    config
}

fn quiz_entry_results(entry: &Entry) -> DocumentMap {
    let mut entry_results = DocumentMap::new();
    entry_results.insert(
        "score".to_string(),
        Value::String(entry.value_string("gquiz_score")),
    );
    entry_results.insert(
        "percent".to_string(),
        Value::String(entry.value_string("gquiz_percent")),
    );
    entry_results.insert(
        "is_pass".to_string(),
        Value::String(entry.value_string("gquiz_is_pass")),
    );
    entry_results.insert(
        "grade".to_string(),
        Value::String(entry.value_string("gquiz_grade")),
    );
    entry_results
}

fn value_or_empty(value: &Value) -> Value {
    if value.is_null() {
        Value::String(String::new())
    } else {
        value.clone()
    }
}

/// Ensure the per-field result map exists and stamp the field label under its
/// `misc` sub-map.
fn insert_misc_label(field_data: &mut DocumentMap, field_key: &str, label: &str) {
    let field_map = field_data
        .entry(field_key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(field_map) = field_map {
        let misc = field_map
            .entry("misc".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(misc) = misc {
            misc.insert("label".to_string(), Value::String(label.to_string()));
        }
    }
}

/// The mapping stored two levels down, if both levels are mappings.
fn nested_map<'data>(
    field_data: &'data mut DocumentMap,
    field_key: &str,
    inner_key: &str,
) -> Option<&'data mut DocumentMap> {
    match field_data.get_mut(field_key) {
        Some(Value::Object(field_map)) => match field_map.get_mut(inner_key) {
            Some(Value::Object(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn wrap_section(section_key: &str, section: DocumentMap) -> DocumentMap {
    let mut fragment = DocumentMap::new();
    fragment.insert(section_key.to_string(), Value::Object(section));
    fragment
}

#[cfg(test)]
mod tests {
    use super::{poll_results, quiz_results, survey_results};
    use crate::entry::Entry;
    use crate::results::{ResultsData, StaticResultsProvider, UnavailableResultsProvider};
    use crate::schema::Form;
    use serde_json::json;

    fn provider_with(scope: &str, results: serde_json::Value) -> StaticResultsProvider {
        let mut provider = StaticResultsProvider::new();
        provider.insert(scope, serde_json::from_value::<ResultsData>(results).unwrap());
        provider
    }

    #[test]
    fn a_form_without_matching_fields_contributes_nothing() {
        let form: Form = serde_json::from_value(json!({
            "id": 1,
            "title": "Plain",
            "fields": [{ "id": 1, "type": "text", "label": "Name" }]
        }))
        .unwrap();
        let entry: Entry = serde_json::from_value(json!({ "id": 1, "formId": 1 })).unwrap();
        let provider = StaticResultsProvider::new();

        assert!(survey_results(&form, &entry, &provider).is_empty());
        assert!(poll_results(&form, &entry, &provider).is_empty());
        assert!(quiz_results(&form, &entry, &provider).is_empty());
    }

    #[test]
    fn an_unavailable_backend_degrades_to_an_empty_fragment() {
        let form: Form = serde_json::from_value(json!({
            "id": 1,
            "title": "Poll",
            "fields": [{
                "id": 1,
                "type": "poll",
                "label": "Favourite",
                "choices": [{ "value": "p1", "text": "Blue" }]
            }]
        }))
        .unwrap();
        let entry: Entry = serde_json::from_value(json!({ "id": 1, "formId": 1 })).unwrap();

        assert!(poll_results(&form, &entry, &UnavailableResultsProvider).is_empty());
    }

    #[test]
    fn poll_choice_codes_are_rekeyed_and_labelled() {
        let form: Form = serde_json::from_value(json!({
            "id": 1,
            "title": "Poll",
            "fields": [{
                "id": 4,
                "type": "poll",
                "label": "Favourite colour",
                "choices": [
                    { "value": "p1", "text": "Blue" },
                    { "value": "p2", "text": "Green" }
                ]
            }]
        }))
        .unwrap();
        let entry: Entry = serde_json::from_value(json!({ "id": 1, "formId": 1 })).unwrap();
        let provider = provider_with(
            "poll",
            json!({
                "entryCount": 3,
                "fieldData": { "4": { "p1": 2, "p2": 1 } }
            }),
        );

        let fragment = poll_results(&form, &entry, &provider);
        similar_asserts::assert_eq!(
            serde_json::Value::Object(fragment),
            json!({
                "poll": {
                    "global": {
                        "entry_count": 3,
                        "field_data": {
                            "4": {
                                "misc": { "label": "Favourite colour" },
                                "Blue": 2,
                                "Green": 1
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn survey_multi_row_grids_rekey_rows_and_nested_choices() {
        let form: Form = serde_json::from_value(json!({
            "id": 1,
            "title": "Survey",
            "fields": [{
                "id": 5,
                "type": "survey",
                "label": "Feedback",
                "enableMultipleRows": true,
                "likertRows": [
                    { "value": "r1", "text": "Service" }
                ],
                "choices": [
                    { "value": "c1", "text": "Poor" },
                    { "value": "c2", "text": "Great" }
                ]
            }]
        }))
        .unwrap();
        let entry: Entry = serde_json::from_value(
            json!({ "id": 1, "formId": 1, "gsurvey_score": "8" }),
        )
        .unwrap();
        let provider = provider_with(
            "survey",
            json!({
                "entryCount": 2,
                "fieldData": { "5": { "r1": { "c1": 0, "c2": 2 } } }
            }),
        );

        let fragment = survey_results(&form, &entry, &provider);
        similar_asserts::assert_eq!(
            serde_json::Value::Object(fragment),
            json!({
                "survey": {
                    "score": "8",
                    "global": {
                        "entry_count": 2,
                        "field_data": {
                            "5": { "Service": { "Poor": 0, "Great": 2 } }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn quiz_results_rename_totals_and_collect_correct_options() {
        let form: Form = serde_json::from_value(json!({
            "id": 1,
            "title": "Quiz",
            "quizSettings": { "grading": "letter", "passPercent": 50, "grades": [{ "text": "A", "value": 90 }] },
            "fields": [{
                "id": 6,
                "type": "quiz",
                "label": "Capital of France",
                "choices": [
                    { "value": "q1", "text": "Paris", "isCorrect": true },
                    { "value": "q2", "text": "Lyon" }
                ]
            }]
        }))
        .unwrap();
        let entry: Entry = serde_json::from_value(json!({
            "id": 1,
            "formId": 1,
            "gquiz_score": "1",
            "gquiz_percent": "100",
            "gquiz_is_pass": "1",
            "gquiz_grade": "A"
        }))
        .unwrap();
        let provider = provider_with(
            "quiz",
            json!({
                "entryCount": 4,
                "fieldData": { "6": { "q1": 3, "q2": 1, "totals": { "correct": 3 } } }
            }),
        );

        let fragment = quiz_results(&form, &entry, &provider);
        similar_asserts::assert_eq!(
            serde_json::Value::Object(fragment),
            json!({
                "quiz": {
                    "config": {
                        "grading": "letter",
                        "pass_percent": 50,
                        "grades": [{ "text": "A", "value": 90 }]
                    },
                    "results": { "score": "1", "percent": "100", "is_pass": "1", "grade": "A" },
                    "global": {
                        "entry_count": 4,
                        "field_data": {
                            "6": {
                                "Lyon": 1,
                                "misc": {
                                    "correct": 3,
                                    "label": "Capital of France",
                                    "correct_option_name": ["Paris"]
                                },
                                "Paris": 3
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn a_quiz_without_a_settings_block_defaults_the_config_to_empty_strings() {
        let form: Form = serde_json::from_value(json!({
            "id": 1,
            "title": "Quiz",
            "fields": [{
                "id": 6,
                "type": "quiz",
                "label": "Question",
                "choices": [{ "value": "q1", "text": "Yes" }]
            }]
        }))
        .unwrap();
        let entry: Entry = serde_json::from_value(json!({ "id": 1, "formId": 1 })).unwrap();
        let provider = provider_with("quiz", json!({ "entryCount": 0, "fieldData": {} }));

        let fragment = quiz_results(&form, &entry, &provider);
        let quiz = fragment.get("quiz").unwrap();
        similar_asserts::assert_eq!(
            quiz["config"].clone(),
            json!({ "grading": "", "pass_percent": "", "grades": "" })
        );
        similar_asserts::assert_eq!(
            quiz["results"].clone(),
            json!({ "score": "", "percent": "", "is_pass": "", "grade": "" })
        );
    }
}
