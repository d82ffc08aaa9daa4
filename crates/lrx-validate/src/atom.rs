//! Grammar checks for the individual xAPI atom types.

use chrono::DateTime;
use serde_json::Value;
use uuid::Uuid;

use lrx_types::{Agent, FieldError};

use crate::statement::validate_agent;

/// The named grammars a candidate value can be validated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Atom {
    Iri,
    Uuid,
    Timestamp,
    Agent,
    Boolean,
    String,
}

/// Validate `value` against the grammar named by `atom`.
///
/// Never fails; returns an empty list on success. `path` names the field the
/// errors are reported against.
pub fn validate_atom(atom: Atom, path: &str, value: &Value) -> Vec<FieldError> {
    match atom {
        Atom::Iri => validate_iri(path, value),
        Atom::Uuid => validate_uuid(path, value),
        Atom::Timestamp => validate_timestamp(path, value),
        Atom::Agent => validate_agent_value(path, value),
        Atom::Boolean => validate_boolean(path, value),
        Atom::String => validate_string(path, value),
    }
}

fn validate_iri(path: &str, value: &Value) -> Vec<FieldError> {
    let Some(text) = value.as_str() else {
        return vec![FieldError::new(path, "must be an IRI string")];
    };
    // An IRI requires a scheme; anything before the first colon counts.
    match text.split_once(':') {
        Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => Vec::new(),
        _ => vec![FieldError::new(
            path,
            format!("`{text}` is not a valid IRI"),
        )],
    }
}

fn validate_uuid(path: &str, value: &Value) -> Vec<FieldError> {
    let Some(text) = value.as_str() else {
        return vec![FieldError::new(path, "must be a UUID string")];
    };
    match Uuid::parse_str(text) {
        Ok(_) => Vec::new(),
        Err(_) => vec![FieldError::new(
            path,
            format!("`{text}` is not a valid UUID"),
        )],
    }
}

fn validate_timestamp(path: &str, value: &Value) -> Vec<FieldError> {
    let Some(text) = value.as_str() else {
        return vec![FieldError::new(path, "must be a timestamp string")];
    };
    match DateTime::parse_from_rfc3339(text) {
        Ok(_) => Vec::new(),
        Err(_) => vec![FieldError::new(
            path,
            format!("`{text}` is not a valid ISO 8601 timestamp"),
        )],
    }
}

fn validate_agent_value(path: &str, value: &Value) -> Vec<FieldError> {
    if !value.is_object() {
        return vec![FieldError::new(path, "must be an agent object")];
    }
    match serde_json::from_value::<Agent>(value.clone()) {
        Ok(agent) => validate_agent(path, &agent),
        Err(err) => vec![FieldError::new(path, format!("is not a valid agent: {err}"))],
    }
}

fn validate_boolean(path: &str, value: &Value) -> Vec<FieldError> {
    // Query parameters arrive as strings; accept the textual forms too.
    match value {
        Value::Bool(_) => Vec::new(),
        Value::String(s) if s == "true" || s == "false" => Vec::new(),
        _ => vec![FieldError::new(path, "must be a boolean")],
    }
}

fn validate_string(path: &str, value: &Value) -> Vec<FieldError> {
    if value.is_string() {
        Vec::new()
    } else {
        vec![FieldError::new(path, "must be a string")]
    }
}
