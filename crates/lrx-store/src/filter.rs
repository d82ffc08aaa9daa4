//! Concrete predicate values over the statement ledger.
//!
//! The query engine constructs a [`StatementFilter`] from caller options;
//! the store executes it. Keeping the predicate a plain value (rather than
//! closures) lets backends translate it into their native query language.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lrx_types::{Agent, Identity, StatementRecord};

/// Sort direction over the `stored` timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Agent predicate: matched by resolved identity.
///
/// Without `related`, only the statement's actor and object are searched;
/// with it, authority, context instructor, and context team as well.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentMatch {
    pub identity: Identity,
    pub related: bool,
}

/// Activity predicate on the object id, optionally widened to the four
/// context-activity lists.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivityMatch {
    pub id: String,
    pub related: bool,
}

/// Predicate over persisted statement records.
///
/// `since` is an exclusive lower bound and `until` an inclusive upper bound,
/// both over the server's `stored` time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatementFilter {
    pub ids: Option<Vec<Uuid>>,
    pub verb: Option<String>,
    pub registration: Option<Uuid>,
    pub agent: Option<AgentMatch>,
    pub activity: Option<ActivityMatch>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub active: Option<bool>,
    pub voided: Option<bool>,
}

impl StatementFilter {
    /// Filter selecting a single statement id.
    pub fn by_id(id: Uuid) -> Self {
        Self {
            ids: Some(vec![id]),
            ..Self::default()
        }
    }

    /// Evaluate this predicate against one record.
    pub fn matches(&self, record: &StatementRecord) -> bool {
        if let Some(active) = self.active {
            if record.active != active {
                return false;
            }
        }
        if let Some(voided) = self.voided {
            if record.voided != voided {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.contains(&record.id) {
                return false;
            }
        }
        if let Some(verb) = &self.verb {
            if &record.statement.verb.id != verb {
                return false;
            }
        }
        if let Some(registration) = &self.registration {
            let found = record
                .statement
                .context
                .as_ref()
                .and_then(|c| c.registration.as_ref());
            if found != Some(registration) {
                return false;
            }
        }
        if let Some(since) = &self.since {
            if record.stored <= *since {
                return false;
            }
        }
        if let Some(until) = &self.until {
            if record.stored > *until {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            if !Self::matches_agent(agent, record) {
                return false;
            }
        }
        if let Some(activity) = &self.activity {
            if !Self::matches_activity(activity, record) {
                return false;
            }
        }
        true
    }

    fn identity_matches(wanted: &Identity, candidate: Option<&Agent>) -> bool {
        candidate
            .and_then(Agent::identity)
            .map(|found| found == *wanted)
            .unwrap_or(false)
    }

    fn matches_agent(wanted: &AgentMatch, record: &StatementRecord) -> bool {
        let statement = &record.statement;
        let mut candidates: Vec<Option<&Agent>> =
            vec![Some(&statement.actor), statement.object.agent()];

        if wanted.related {
            candidates.push(statement.authority.as_ref());
            if let Some(context) = &statement.context {
                candidates.push(context.instructor.as_ref());
                candidates.push(context.team.as_ref());
            }
        }

        candidates
            .into_iter()
            .any(|candidate| Self::identity_matches(&wanted.identity, candidate))
    }

    fn matches_activity(wanted: &ActivityMatch, record: &StatementRecord) -> bool {
        let statement = &record.statement;
        if statement.object.activity_id() == Some(wanted.id.as_str()) {
            return true;
        }
        if !wanted.related {
            return false;
        }
        statement
            .context
            .as_ref()
            .and_then(|c| c.context_activities.as_ref())
            .map(|lists| lists.all().any(|activity| activity.id == wanted.id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lrx_types::{Statement, TenantId};

    fn record(json: &str) -> StatementRecord {
        let statement: Statement = serde_json::from_str(json).unwrap();
        let id = statement.id.unwrap_or_else(Uuid::new_v4);
        let stored = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        StatementRecord::new(TenantId::new("t1"), id, statement, stored)
    }

    fn sample() -> StatementRecord {
        record(
            r#"{
                "actor": {"mbox": "mailto:alice@example.com"},
                "verb": {"id": "http://example.com/verbs/did"},
                "object": {"id": "http://example.com/activities/quiz"},
                "context": {
                    "instructor": {"mbox": "mailto:teacher@example.com"},
                    "contextActivities": {
                        "parent": {"id": "http://example.com/activities/course"}
                    }
                }
            }"#,
        )
    }

    fn identity_of(mbox: &str) -> Identity {
        Agent {
            mbox: Some(mbox.into()),
            ..Agent::default()
        }
        .identity()
        .unwrap()
    }

    #[test]
    fn agent_filter_searches_actor_only_by_default() {
        let record = sample();
        let actor = StatementFilter {
            agent: Some(AgentMatch {
                identity: identity_of("mailto:alice@example.com"),
                related: false,
            }),
            ..StatementFilter::default()
        };
        assert!(actor.matches(&record));

        let instructor = StatementFilter {
            agent: Some(AgentMatch {
                identity: identity_of("mailto:teacher@example.com"),
                related: false,
            }),
            ..StatementFilter::default()
        };
        assert!(!instructor.matches(&record));
    }

    #[test]
    fn related_agents_widen_to_instructor() {
        let record = sample();
        let filter = StatementFilter {
            agent: Some(AgentMatch {
                identity: identity_of("mailto:teacher@example.com"),
                related: true,
            }),
            ..StatementFilter::default()
        };
        assert!(filter.matches(&record));
    }

    #[test]
    fn related_activities_widen_to_context() {
        let record = sample();
        let narrow = StatementFilter {
            activity: Some(ActivityMatch {
                id: "http://example.com/activities/course".into(),
                related: false,
            }),
            ..StatementFilter::default()
        };
        assert!(!narrow.matches(&record));

        let wide = StatementFilter {
            activity: Some(ActivityMatch {
                id: "http://example.com/activities/course".into(),
                related: true,
            }),
            ..StatementFilter::default()
        };
        assert!(wide.matches(&record));
    }

    #[test]
    fn since_is_exclusive_until_is_inclusive() {
        let record = sample();
        let at = record.stored;

        let since_at = StatementFilter {
            since: Some(at),
            ..StatementFilter::default()
        };
        assert!(!since_at.matches(&record));

        let until_at = StatementFilter {
            until: Some(at),
            ..StatementFilter::default()
        };
        assert!(until_at.matches(&record));
    }
}
