//! Response projection for statements.
//!
//! Projection operates on the serialized JSON form, since `ids` and
//! `canonical` change the shape of fields (language maps collapse to a
//! single value) beyond what the typed statement can represent.

use serde_json::{Map, Value};

use lrx_types::Statement;

/// Requested statement projection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// The statement as stored, unmodified.
    #[default]
    Exact,
    /// Actors and objects reduced to their identifying fields.
    Ids,
    /// Language maps collapsed to one value by the `langs` preference list.
    Canonical,
}

/// Identifying agent fields, in resolution precedence order.
const IDENTITY_FIELDS: [&str; 4] = ["mbox", "account", "openid", "mbox_sha1sum"];

/// Project one statement into its response form.
pub fn project(statement: &Statement, format: Format, langs: &[String]) -> Value {
    let mut value = serde_json::to_value(statement).unwrap_or(Value::Null);
    match format {
        Format::Exact => {}
        Format::Ids => reduce_ids(&mut value),
        Format::Canonical => canonicalize(&mut value, langs),
    }
    value
}

fn reduce_ids(statement: &mut Value) {
    let Some(map) = statement.as_object_mut() else {
        return;
    };
    if let Some(actor) = map.get_mut("actor") {
        reduce_actor(actor);
    }
    if let Some(object) = map.get_mut("object") {
        reduce_object(object);
    }
}

fn reduce_object(object: &mut Value) {
    let object_type = object
        .get("objectType")
        .and_then(Value::as_str)
        .unwrap_or("Activity");

    match object_type {
        "Agent" | "Group" => reduce_actor(object),
        "Activity" => {
            let mut reduced = Map::new();
            reduced.insert("objectType".into(), Value::from("Activity"));
            if let Some(id) = object.get("id") {
                reduced.insert("id".into(), id.clone());
            }
            *object = Value::Object(reduced);
        }
        "SubStatement" => {
            if let Some(map) = object.as_object_mut() {
                if let Some(actor) = map.get_mut("actor") {
                    reduce_actor(actor);
                }
                if let Some(inner) = map.get_mut("object") {
                    reduce_object(inner);
                }
            }
        }
        // StatementRefs are already minimal.
        _ => {}
    }
}

/// Reduce an agent to `{identityKey, objectType}`, defaulting the type to
/// `Agent`. Anonymous groups keep their member list, each member reduced in
/// turn.
fn reduce_actor(actor: &mut Value) {
    let Some(map) = actor.as_object() else {
        return;
    };
    let mut reduced = Map::new();
    reduced.insert(
        "objectType".into(),
        map.get("objectType")
            .cloned()
            .unwrap_or_else(|| Value::from("Agent")),
    );
    if let Some(field) = IDENTITY_FIELDS.iter().find(|f| map.contains_key(**f)) {
        reduced.insert((*field).to_string(), map[*field].clone());
    } else if let Some(Value::Array(members)) = map.get("member") {
        let members = members
            .iter()
            .cloned()
            .map(|mut member| {
                reduce_actor(&mut member);
                member
            })
            .collect();
        reduced.insert("member".into(), Value::Array(members));
    }
    *actor = Value::Object(reduced);
}

fn canonicalize(statement: &mut Value, langs: &[String]) {
    if let Some(display) = statement.pointer_mut("/verb/display") {
        *display = pick_language(display, langs);
    }
    for field in ["name", "description"] {
        if let Some(value) = statement.pointer_mut(&format!("/object/definition/{field}")) {
            *value = pick_language(value, langs);
        }
    }
}

/// First value whose key is in `langs`, else the first available value,
/// else null.
fn pick_language(map: &Value, langs: &[String]) -> Value {
    let Some(map) = map.as_object() else {
        return Value::Null;
    };
    for lang in langs {
        if let Some(value) = map.get(lang) {
            return value.clone();
        }
    }
    map.values().next().cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn statement(json: &str) -> Statement {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn exact_returns_the_statement_unmodified() {
        let statement = statement(
            r#"{
                "actor": {"name": "Alice", "mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://example.com/verbs/did"},
                "object": {"id": "http://example.com/activities/quiz"}
            }"#,
        );
        let value = project(&statement, Format::Exact, &[]);
        assert_eq!(value.pointer("/actor/name"), Some(&json!("Alice")));
    }

    #[test]
    fn ids_reduces_actor_to_its_identifier() {
        let statement = statement(
            r#"{
                "actor": {"name": "Alice", "mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://example.com/verbs/did"},
                "object": {"id": "http://example.com/activities/quiz"}
            }"#,
        );
        let value = project(&statement, Format::Ids, &[]);
        assert_eq!(
            value.get("actor"),
            Some(&json!({
                "objectType": "Agent",
                "mbox": "mailto:alice@example.com"
            }))
        );
    }

    #[test]
    fn ids_reduces_activity_objects_to_their_id() {
        let statement = statement(
            r#"{
                "actor": {"mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://example.com/verbs/did"},
                "object": {
                    "id": "http://example.com/activities/quiz",
                    "definition": {"name": {"en": "Quiz"}}
                }
            }"#,
        );
        let value = project(&statement, Format::Ids, &[]);
        assert_eq!(
            value.get("object"),
            Some(&json!({
                "objectType": "Activity",
                "id": "http://example.com/activities/quiz"
            }))
        );
    }

    #[test]
    fn ids_keeps_anonymous_group_members_reduced() {
        let statement = statement(
            r#"{
                "actor": {
                    "objectType": "Group",
                    "name": "Team",
                    "member": [
                        {"name": "Alice", "mbox": "mailto:alice@example.com"},
                        {"name": "Bob", "mbox": "mailto:bob@example.com"}
                    ]
                },
                "verb": {"id": "http://example.com/verbs/did"},
                "object": {"id": "http://example.com/activities/quiz"}
            }"#,
        );
        let value = project(&statement, Format::Ids, &[]);
        assert_eq!(
            value.get("actor"),
            Some(&json!({
                "objectType": "Group",
                "member": [
                    {"objectType": "Agent", "mbox": "mailto:alice@example.com"},
                    {"objectType": "Agent", "mbox": "mailto:bob@example.com"}
                ]
            }))
        );
    }

    #[test]
    fn canonical_prefers_requested_languages() {
        let statement = statement(
            r#"{
                "actor": {"mbox": "mailto:alice@example.com"},
                "verb": {
                    "id": "http://example.com/verbs/did",
                    "display": {"en": "did", "fr": "a fait"}
                },
                "object": {
                    "id": "http://example.com/activities/quiz",
                    "definition": {"name": {"en": "Quiz", "fr": "Questionnaire"}}
                }
            }"#,
        );
        let value = project(&statement, Format::Canonical, &["fr".into(), "en".into()]);
        assert_eq!(value.pointer("/verb/display"), Some(&json!("a fait")));
        assert_eq!(
            value.pointer("/object/definition/name"),
            Some(&json!("Questionnaire"))
        );
    }

    #[test]
    fn canonical_falls_back_to_the_first_available_language() {
        let statement = statement(
            r#"{
                "actor": {"mbox": "mailto:alice@example.com"},
                "verb": {
                    "id": "http://example.com/verbs/did",
                    "display": {"de": "tat"}
                },
                "object": {"id": "http://example.com/activities/quiz"}
            }"#,
        );
        let value = project(&statement, Format::Canonical, &["fr".into()]);
        assert_eq!(value.pointer("/verb/display"), Some(&json!("tat")));
    }
}
