//! Grouped-count pipeline builder.
//!
//! Callers describe the grouping they want; the builder emits a
//! [`Pipeline`] whose only stages are a match and one grouping stage.
//! Tenant scoping is applied by the executing store and cannot be widened
//! here, and the store's guard rejects any export stage before reading.

use lrx_store::{Dimension, Interval, Pipeline, Stage, StatementFilter};

use crate::engine::parse_timestamp;
use crate::error::QueryError;

/// What the aggregation groups by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateDimension {
    /// Bucket by `stored` time.
    Time,
    /// Group by the actor.
    User,
    /// Group by the verb.
    Verb,
    /// Group by the object.
    Activity,
}

/// Caller options for one aggregation.
#[derive(Clone, Debug)]
pub struct AggregateOptions {
    pub dimension: AggregateDimension,
    pub filter: StatementFilter,
    /// Raw timestamp bounds, validated before use; they override any bounds
    /// already on `filter`.
    pub since: Option<String>,
    pub until: Option<String>,
    /// Time-bucket granularity, only meaningful for the time dimension.
    pub interval: Interval,
    pub interval_length: u32,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            dimension: AggregateDimension::Time,
            filter: StatementFilter::default(),
            since: None,
            until: None,
            interval: Interval::Day,
            interval_length: 1,
        }
    }
}

impl AggregateOptions {
    /// Build the two-stage pipeline these options describe.
    pub fn build_pipeline(&self) -> Result<Pipeline, QueryError> {
        let mut errors = Vec::new();
        let mut filter = self.filter.clone();

        // Same visibility defaults as the index query: callers that want
        // inactive or voided rows must say so on the filter.
        filter.active.get_or_insert(true);
        filter.voided.get_or_insert(false);

        if let Some(since) = &self.since {
            filter.since = parse_timestamp("since", since, &mut errors);
        }
        if let Some(until) = &self.until {
            filter.until = parse_timestamp("until", until, &mut errors);
        }
        if !errors.is_empty() {
            return Err(QueryError::Validation(errors));
        }

        let group = match self.dimension {
            AggregateDimension::Time => Stage::GroupTime {
                interval: self.interval,
                length: self.interval_length,
            },
            AggregateDimension::User => Stage::GroupBy(Dimension::User),
            AggregateDimension::Verb => Stage::GroupBy(Dimension::Verb),
            AggregateDimension::Activity => Stage::GroupBy(Dimension::Activity),
        };
        Ok(Pipeline::new(vec![Stage::Match(filter), group]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lrx_store::{AggregateResult, InMemoryStore, StatementStore};
    use lrx_types::{Statement, StatementRecord, TenantId};
    use serde_json::json;
    use uuid::Uuid;

    use crate::engine::QueryEngine;

    fn tenant() -> TenantId {
        TenantId::new("t1")
    }

    fn active_record(verb: &str, day: u32, hour: u32) -> StatementRecord {
        let statement: Statement = serde_json::from_value(json!({
            "actor": {"mbox": "mailto:a@example.com"},
            "verb": {"id": verb},
            "object": {"id": "http://example.com/activities/quiz"}
        }))
        .unwrap();
        let stored = Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        let mut record = StatementRecord::new(tenant(), Uuid::new_v4(), statement, stored);
        record.active = true;
        record
    }

    #[test]
    fn builds_a_match_then_group_pipeline() {
        let options = AggregateOptions {
            dimension: AggregateDimension::Verb,
            ..AggregateOptions::default()
        };
        let pipeline = options.build_pipeline().unwrap();
        assert_eq!(pipeline.stages().len(), 2);
        assert!(matches!(pipeline.stages()[0], Stage::Match(_)));
        assert_eq!(pipeline.stages()[1], Stage::GroupBy(Dimension::Verb));
    }

    #[test]
    fn malformed_bounds_are_rejected() {
        let options = AggregateOptions {
            since: Some("yesterday".into()),
            ..AggregateOptions::default()
        };
        assert!(matches!(
            options.build_pipeline(),
            Err(QueryError::Validation(_))
        ));
    }

    #[test]
    fn defaults_count_only_active_unvoided_statements() {
        let store = InMemoryStore::new();
        store
            .insert(active_record("http://example.com/verbs/did", 1, 9))
            .unwrap();
        let mut inactive = active_record("http://example.com/verbs/did", 1, 10);
        inactive.active = false;
        store.insert(inactive).unwrap();
        let mut voided = active_record("http://example.com/verbs/did", 1, 11);
        voided.voided = true;
        store.insert(voided).unwrap();

        let engine = QueryEngine::new(&store);
        let AggregateResult::Time(buckets) = engine
            .aggregate(&tenant(), &AggregateOptions::default())
            .unwrap()
        else {
            panic!("expected time buckets");
        };
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 1);
    }

    #[test]
    fn time_buckets_come_back_ascending() {
        let store = InMemoryStore::new();
        store
            .insert(active_record("http://example.com/verbs/did", 2, 9))
            .unwrap();
        store
            .insert(active_record("http://example.com/verbs/did", 1, 9))
            .unwrap();
        store
            .insert(active_record("http://example.com/verbs/did", 1, 17))
            .unwrap();

        let engine = QueryEngine::new(&store);
        let result = engine
            .aggregate(&tenant(), &AggregateOptions::default())
            .unwrap();

        let AggregateResult::Time(buckets) = result else {
            panic!("expected time buckets");
        };
        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets[0].date,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].count, 1);
    }

    #[test]
    fn bounds_narrow_the_working_set() {
        let store = InMemoryStore::new();
        store
            .insert(active_record("http://example.com/verbs/did", 1, 9))
            .unwrap();
        store
            .insert(active_record("http://example.com/verbs/did", 5, 9))
            .unwrap();

        let engine = QueryEngine::new(&store);
        let options = AggregateOptions {
            since: Some("2024-03-02T00:00:00Z".into()),
            ..AggregateOptions::default()
        };
        let AggregateResult::Time(buckets) = engine.aggregate(&tenant(), &options).unwrap()
        else {
            panic!("expected time buckets");
        };
        assert_eq!(buckets.len(), 1);
        assert_eq!(
            buckets[0].date,
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
    }
}
