//! Full-structure statement validation.
//!
//! Walks a statement and collects every field error; nothing here fails
//! fast. The Two-Phase Storer aggregates the errors of a whole batch before
//! surfacing a single validation error.

use lrx_types::{Agent, FieldError, Statement, StatementObject, SubStatement, Verb};

/// Validate an agent or group at `path`.
///
/// An agent must carry exactly one identifying key; a group may instead be
/// anonymous, in which case it must carry members, each validated in turn.
pub fn validate_agent(path: &str, agent: &Agent) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let keys_present = [
        agent.mbox.is_some(),
        agent.account.is_some(),
        agent.openid.is_some(),
        agent.mbox_sha1sum.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    if keys_present > 1 {
        errors.push(FieldError::new(
            path,
            format!("carries {keys_present} identifiers; at most one is allowed"),
        ));
    }

    if let Some(mbox) = &agent.mbox {
        if !mbox.starts_with("mailto:") {
            errors.push(FieldError::new(
                format!("{path}.mbox"),
                "must be a mailto IRI",
            ));
        }
    }

    if agent.is_group() {
        if let Some(members) = &agent.member {
            for (i, member) in members.iter().enumerate() {
                errors.extend(validate_agent(&format!("{path}.member[{i}]"), member));
            }
            if keys_present == 0 && members.is_empty() {
                errors.push(FieldError::new(
                    format!("{path}.member"),
                    "an anonymous group must have members",
                ));
            }
        } else if keys_present == 0 {
            errors.push(FieldError::new(
                format!("{path}.member"),
                "an anonymous group must have members",
            ));
        }
    } else {
        if agent.member.is_some() {
            errors.push(FieldError::new(
                format!("{path}.member"),
                "only groups may have members",
            ));
        }
        if keys_present == 0 {
            errors.push(FieldError::new(
                path,
                "missing an identifier (mbox, account, openid, or mbox_sha1sum)",
            ));
        }
    }

    errors
}

fn validate_verb(path: &str, verb: &Verb) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if verb.id.split_once(':').is_none() {
        errors.push(FieldError::new(
            format!("{path}.id"),
            format!("`{}` is not a valid IRI", verb.id),
        ));
    }
    errors
}

fn validate_object(path: &str, object: &StatementObject, in_substatement: bool) -> Vec<FieldError> {
    match object {
        StatementObject::Activity(activity) => {
            if activity.id.split_once(':').is_none() {
                vec![FieldError::new(
                    format!("{path}.id"),
                    format!("`{}` is not a valid IRI", activity.id),
                )]
            } else {
                Vec::new()
            }
        }
        StatementObject::Agent(agent) | StatementObject::Group(agent) => {
            validate_agent(path, agent)
        }
        StatementObject::StatementRef(_) => Vec::new(),
        StatementObject::SubStatement(sub) => {
            if in_substatement {
                vec![FieldError::new(
                    path,
                    "sub-statements cannot nest further sub-statements",
                )]
            } else {
                validate_substatement(path, sub)
            }
        }
    }
}

fn validate_substatement(path: &str, sub: &SubStatement) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if sub.extra.contains_key("id") {
        errors.push(FieldError::new(
            format!("{path}.id"),
            "sub-statements cannot carry an id",
        ));
    }
    errors.extend(validate_agent(&format!("{path}.actor"), &sub.actor));
    errors.extend(validate_verb(&format!("{path}.verb"), &sub.verb));
    errors.extend(validate_object(&format!("{path}.object"), &sub.object, true));
    errors
}

/// Validate a statement's full structure, collecting every field error.
pub fn validate_statement(statement: &Statement) -> Vec<FieldError> {
    let mut errors = Vec::new();

    errors.extend(validate_agent("statement.actor", &statement.actor));
    errors.extend(validate_verb("statement.verb", &statement.verb));
    errors.extend(validate_object("statement.object", &statement.object, false));

    if let Some(context) = &statement.context {
        if let Some(instructor) = &context.instructor {
            errors.extend(validate_agent("statement.context.instructor", instructor));
        }
        if let Some(team) = &context.team {
            errors.extend(validate_agent("statement.context.team", team));
        }
    }

    if let Some(authority) = &statement.authority {
        errors.extend(validate_agent("statement.authority", authority));
    }

    if let Some(version) = &statement.version {
        if !version.starts_with("1.0") {
            errors.push(FieldError::new(
                "statement.version",
                format!("`{version}` is not a supported xAPI version"),
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(json: &str) -> Statement {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn valid_statement_produces_no_errors() {
        let s = statement(
            r#"{
                "actor": {"mbox": "mailto:a@example.com"},
                "verb": {"id": "http://example.com/verbs/did"},
                "object": {"id": "http://example.com/activities/quiz"}
            }"#,
        );
        assert!(validate_statement(&s).is_empty());
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let s = statement(
            r#"{
                "actor": {"name": "Nobody"},
                "verb": {"id": "not-an-iri"},
                "object": {"id": "also-not-an-iri"},
                "version": "2.0.0"
            }"#,
        );
        let errors = validate_statement(&s);
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"statement.actor"));
        assert!(paths.contains(&"statement.verb.id"));
        assert!(paths.contains(&"statement.object.id"));
        assert!(paths.contains(&"statement.version"));
    }

    #[test]
    fn substatement_cannot_nest_or_carry_id() {
        let s = statement(
            r#"{
                "actor": {"mbox": "mailto:a@example.com"},
                "verb": {"id": "http://example.com/verbs/did"},
                "object": {
                    "objectType": "SubStatement",
                    "id": "f47ac10b-58cc-4372-a567-0e02b2c3d479",
                    "actor": {"mbox": "mailto:b@example.com"},
                    "verb": {"id": "http://example.com/verbs/saw"},
                    "object": {"id": "http://example.com/activities/video"}
                }
            }"#,
        );
        let errors = validate_statement(&s);
        assert!(errors
            .iter()
            .any(|e| e.path == "statement.object.id" && e.message.contains("cannot carry an id")));
    }

    #[test]
    fn anonymous_group_actor_is_allowed() {
        let s = statement(
            r#"{
                "actor": {
                    "objectType": "Group",
                    "member": [{"mbox": "mailto:a@example.com"}]
                },
                "verb": {"id": "http://example.com/verbs/did"},
                "object": {"id": "http://example.com/activities/quiz"}
            }"#,
        );
        assert!(validate_statement(&s).is_empty());
    }
}
