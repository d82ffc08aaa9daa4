//! Filtered statement queries.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use lrx_store::{
    ActivityMatch, AgentMatch, AggregateResult, SortOrder, StatementFilter, StatementStore,
};
use lrx_types::{Agent, FieldError, Statement, TenantId};
use lrx_validate::{validate_atom, Atom};

use crate::aggregate::AggregateOptions;
use crate::error::QueryError;
use crate::format::{project, Format};

/// Caller-supplied filter set for a statement index query.
///
/// String-typed fields arrive raw and are atom-validated before the filter
/// is built; every invalid field is reported, not just the first.
#[derive(Clone, Debug)]
pub struct IndexOptions {
    /// Agent to match, as the submitted JSON value.
    pub agent: Option<Value>,
    /// Widen the agent match to authority, instructor, and team.
    pub related_agents: bool,
    pub activity: Option<String>,
    /// Widen the activity match to the context-activity lists.
    pub related_activities: bool,
    pub verb: Option<String>,
    pub registration: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub active: bool,
    pub voided: bool,
    pub ascending: bool,
    pub offset: i64,
    pub limit: i64,
    pub format: Format,
    /// Ordered language preference for the canonical projection.
    pub langs: Vec<String>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            agent: None,
            related_agents: false,
            activity: None,
            related_activities: false,
            verb: None,
            registration: None,
            since: None,
            until: None,
            active: true,
            voided: false,
            ascending: false,
            offset: 0,
            limit: 100,
            format: Format::Exact,
            langs: Vec::new(),
        }
    }
}

impl IndexOptions {
    fn build_filter(&self) -> Result<StatementFilter, QueryError> {
        let mut errors = Vec::new();
        let mut filter = StatementFilter {
            active: Some(self.active),
            voided: Some(self.voided),
            ..StatementFilter::default()
        };

        if self.offset < 0 {
            errors.push(FieldError::new("offset", "must not be negative"));
        }
        if self.limit < 1 {
            errors.push(FieldError::new("limit", "must be at least 1"));
        }

        if let Some(verb) = &self.verb {
            errors.extend(validate_atom(Atom::Iri, "verb", &Value::String(verb.clone())));
            filter.verb = Some(verb.clone());
        }
        if let Some(registration) = &self.registration {
            errors.extend(validate_atom(
                Atom::Uuid,
                "registration",
                &Value::String(registration.clone()),
            ));
            filter.registration = Uuid::parse_str(registration).ok();
        }
        if let Some(since) = &self.since {
            filter.since = parse_timestamp("since", since, &mut errors);
        }
        if let Some(until) = &self.until {
            filter.until = parse_timestamp("until", until, &mut errors);
        }
        if let Some(agent) = &self.agent {
            let agent_errors = validate_atom(Atom::Agent, "agent", agent);
            if agent_errors.is_empty() {
                let identity = serde_json::from_value::<Agent>(agent.clone())
                    .ok()
                    .and_then(|a| a.identity());
                match identity {
                    Some(identity) => {
                        filter.agent = Some(AgentMatch {
                            identity,
                            related: self.related_agents,
                        });
                    }
                    None => errors.push(FieldError::new(
                        "agent",
                        "must carry an inverse functional identifier",
                    )),
                }
            } else {
                errors.extend(agent_errors);
            }
        }
        if let Some(activity) = &self.activity {
            errors.extend(validate_atom(
                Atom::Iri,
                "activity",
                &Value::String(activity.clone()),
            ));
            filter.activity = Some(ActivityMatch {
                id: activity.clone(),
                related: self.related_activities,
            });
        }

        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(QueryError::Validation(errors))
        }
    }
}

/// Validate and parse a timestamp filter; pushes onto `errors` on failure.
pub(crate) fn parse_timestamp(
    path: &str,
    raw: &str,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    let atom_errors = validate_atom(Atom::Timestamp, path, &Value::String(raw.to_string()));
    if !atom_errors.is_empty() {
        errors.extend(atom_errors);
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Read-side engine over a statement store.
pub struct QueryEngine<'a> {
    store: &'a dyn StatementStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a dyn StatementStore) -> Self {
        Self { store }
    }

    /// Filtered, paginated statement query.
    ///
    /// Returns the projected page and the total match count; the count runs
    /// as its own store query and is unaffected by `offset`/`limit`.
    pub fn index(
        &self,
        tenant: &TenantId,
        options: &IndexOptions,
    ) -> Result<(Vec<Value>, u64), QueryError> {
        let filter = options.build_filter()?;
        let order = if options.ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        };

        let records = self.store.find(
            tenant,
            &filter,
            order,
            options.offset as usize,
            options.limit as usize,
        )?;
        let total = self.store.count(tenant, &filter)?;
        debug!(%tenant, page = records.len(), total, "statement index");

        let page = records
            .into_iter()
            .map(|record| project(&record.statement, options.format, &options.langs))
            .collect();
        Ok((page, total))
    }

    /// Look up one statement by id under the given visibility flags.
    pub fn show(
        &self,
        tenant: &TenantId,
        id: Uuid,
        voided: bool,
        active: bool,
    ) -> Result<Statement, QueryError> {
        let filter = StatementFilter {
            active: Some(active),
            voided: Some(voided),
            ..StatementFilter::by_id(id)
        };
        let mut records = self
            .store
            .find(tenant, &filter, SortOrder::Descending, 0, 1)?;
        records
            .pop()
            .map(|record| record.statement)
            .ok_or(QueryError::NotFound { id })
    }

    /// Execute a grouped-count aggregation built from `options`.
    pub fn aggregate(
        &self,
        tenant: &TenantId,
        options: &AggregateOptions,
    ) -> Result<AggregateResult, QueryError> {
        let pipeline = options.build_pipeline()?;
        Ok(self.store.aggregate(tenant, &pipeline)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use lrx_store::InMemoryStore;
    use lrx_types::StatementRecord;
    use proptest::prelude::*;
    use serde_json::json;

    fn tenant() -> TenantId {
        TenantId::new("t1")
    }

    fn statement(mbox: &str, verb: &str) -> Statement {
        serde_json::from_value(json!({
            "actor": {"mbox": mbox},
            "verb": {"id": verb},
            "object": {"id": "http://example.com/activities/quiz"}
        }))
        .unwrap()
    }

    fn insert(
        store: &InMemoryStore,
        mut statement: Statement,
        stored: DateTime<Utc>,
        active: bool,
        voided: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        statement.id = Some(id);
        statement.stored = Some(stored);
        let mut record = StatementRecord::new(tenant(), id, statement, stored);
        record.active = active;
        record.voided = voided;
        store.insert(record).unwrap();
        id
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    #[test]
    fn index_defaults_exclude_inactive_and_voided() {
        let store = InMemoryStore::new();
        insert(
            &store,
            statement("mailto:a@example.com", "http://example.com/verbs/did"),
            at(0),
            true,
            false,
        );
        insert(
            &store,
            statement("mailto:b@example.com", "http://example.com/verbs/did"),
            at(1),
            false,
            false,
        );
        insert(
            &store,
            statement("mailto:c@example.com", "http://example.com/verbs/did"),
            at(2),
            true,
            true,
        );

        let engine = QueryEngine::new(&store);
        let (page, total) = engine.index(&tenant(), &IndexOptions::default()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(
            page[0].pointer("/actor/mbox"),
            Some(&json!("mailto:a@example.com"))
        );
    }

    #[test]
    fn voided_statements_stay_queryable_under_the_flag() {
        let store = InMemoryStore::new();
        let id = insert(
            &store,
            statement("mailto:a@example.com", "http://example.com/verbs/did"),
            at(0),
            true,
            true,
        );

        let engine = QueryEngine::new(&store);
        assert!(matches!(
            engine.show(&tenant(), id, false, true),
            Err(QueryError::NotFound { .. })
        ));
        assert!(engine.show(&tenant(), id, true, true).is_ok());
    }

    #[test]
    fn invalid_filters_collect_every_error() {
        let store = InMemoryStore::new();
        let engine = QueryEngine::new(&store);
        let options = IndexOptions {
            verb: Some("not-an-iri".into()),
            registration: Some("xyz".into()),
            since: Some("yesterday".into()),
            offset: -1,
            ..IndexOptions::default()
        };

        let Err(QueryError::Validation(errors)) = engine.index(&tenant(), &options) else {
            panic!("expected a validation error");
        };
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["offset", "verb", "registration", "since"]);
    }

    #[test]
    fn agent_filter_matches_by_identity() {
        let store = InMemoryStore::new();
        insert(
            &store,
            statement("mailto:alice@example.com", "http://example.com/verbs/did"),
            at(0),
            true,
            false,
        );
        insert(
            &store,
            statement("mailto:bob@example.com", "http://example.com/verbs/did"),
            at(1),
            true,
            false,
        );

        let engine = QueryEngine::new(&store);
        let options = IndexOptions {
            agent: Some(json!({"name": "Alice", "mbox": "mailto:alice@example.com"})),
            ..IndexOptions::default()
        };
        let (page, total) = engine.index(&tenant(), &options).unwrap();
        assert_eq!(total, 1);
        assert_eq!(
            page[0].pointer("/actor/mbox"),
            Some(&json!("mailto:alice@example.com"))
        );
    }

    #[test]
    fn ascending_flag_reverses_the_sort() {
        let store = InMemoryStore::new();
        for i in 0..3 {
            insert(
                &store,
                statement("mailto:a@example.com", "http://example.com/verbs/did"),
                at(i),
                true,
                false,
            );
        }

        let engine = QueryEngine::new(&store);
        let descending = engine.index(&tenant(), &IndexOptions::default()).unwrap().0;
        let ascending = engine
            .index(
                &tenant(),
                &IndexOptions {
                    ascending: true,
                    ..IndexOptions::default()
                },
            )
            .unwrap()
            .0;
        assert_eq!(descending[0].get("stored"), ascending[2].get("stored"));
    }

    #[test]
    fn show_finds_by_id() {
        let store = InMemoryStore::new();
        let id = insert(
            &store,
            statement("mailto:a@example.com", "http://example.com/verbs/did"),
            at(0),
            true,
            false,
        );

        let engine = QueryEngine::new(&store);
        let found = engine.show(&tenant(), id, false, true).unwrap();
        assert_eq!(found.id, Some(id));

        let missing = Uuid::new_v4();
        assert_eq!(
            engine.show(&tenant(), missing, false, true),
            Err(QueryError::NotFound { id: missing })
        );
    }

    proptest! {
        // The page never overruns and the total ignores pagination.
        #[test]
        fn pagination_never_overruns(
            total in 0usize..30,
            offset in 0usize..40,
            limit in 1usize..10,
        ) {
            let store = InMemoryStore::new();
            for i in 0..total {
                insert(
                    &store,
                    statement("mailto:a@example.com", "http://example.com/verbs/did"),
                    at(i as i64),
                    true,
                    false,
                );
            }

            let engine = QueryEngine::new(&store);
            let options = IndexOptions {
                offset: offset as i64,
                limit: limit as i64,
                ..IndexOptions::default()
            };
            let (page, count) = engine.index(&tenant(), &options).unwrap();
            prop_assert_eq!(count as usize, total);
            prop_assert_eq!(page.len(), limit.min(total.saturating_sub(offset)));
        }
    }
}
