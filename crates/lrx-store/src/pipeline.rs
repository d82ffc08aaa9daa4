//! Grouping/aggregation query representation.
//!
//! A [`Pipeline`] is an ordered list of stages the aggregation builder
//! constructs and a store executes. Execution is always tenant-scoped by the
//! store; callers cannot widen it. [`Pipeline::guard`] rejects any stage
//! that would export data out of the datastore before execution starts.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::filter::StatementFilter;

/// Time-bucketing granularity for grouped counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

/// Which statement sub-object an object-dimension grouping keys on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    User,
    Verb,
    Activity,
}

/// One stage of an aggregation pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    /// Restrict the working set.
    Match(StatementFilter),
    /// Bucket by `stored` truncated to `interval`, with the unit value
    /// rounded down to a multiple of `length`.
    GroupTime { interval: Interval, length: u32 },
    /// Group by a statement sub-object.
    GroupBy(Dimension),
    /// Write results outside the datastore. Always rejected by [`Pipeline::guard`].
    Export { target: String },
}

/// An ordered list of aggregation stages.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Reject stages that would move data out of the datastore.
    ///
    /// Runs before execution; a rejected pipeline performs no reads at all.
    pub fn guard(&self) -> StoreResult<()> {
        for stage in &self.stages {
            if let Stage::Export { target } = stage {
                return Err(StoreError::ExportRejected {
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A time-dimension bucket: the bucket's start instant and its count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub date: DateTime<Utc>,
    pub count: u64,
}

/// An object-dimension bucket: the distinct sub-object, its occurrence
/// count, and the distinct stored instants it was seen at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectBucket {
    pub data: Value,
    pub count: u64,
    pub dates: Vec<DateTime<Utc>>,
}

/// Result of executing a pipeline's grouping stage.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregateResult {
    /// Time buckets, ascending by date.
    Time(Vec<TimeBucket>),
    /// Object buckets, descending by count.
    Objects(Vec<ObjectBucket>),
}

/// Compute the bucket start for `stored` under the given interval and
/// length.
///
/// The unit value is rounded down to a multiple of `length`; 1-based
/// calendar units (day, month) clamp to 1. A zero length counts as 1.
pub fn time_bucket(stored: DateTime<Utc>, interval: Interval, length: u32) -> DateTime<Utc> {
    let length = length.max(1);
    let rounded = |v: u32| v - v % length;

    let candidate = match interval {
        Interval::Millisecond => {
            let millis = stored.timestamp_subsec_millis();
            stored
                .with_nanosecond(rounded(millis) * 1_000_000)
        }
        Interval::Second => stored
            .with_nanosecond(0)
            .and_then(|t| t.with_second(rounded(t.second()))),
        Interval::Minute => stored
            .with_nanosecond(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_minute(rounded(t.minute()))),
        Interval::Hour => stored
            .with_nanosecond(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_hour(rounded(t.hour()))),
        Interval::Day => {
            let day = rounded(stored.day()).max(1);
            Utc.with_ymd_and_hms(stored.year(), stored.month(), day, 0, 0, 0)
                .single()
        }
        Interval::Month => {
            let month = rounded(stored.month()).max(1);
            Utc.with_ymd_and_hms(stored.year(), month, 1, 0, 0, 0).single()
        }
        Interval::Year => {
            let year = stored.year() - stored.year().rem_euclid(length as i32);
            Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()
        }
    };

    candidate.unwrap_or(stored)
}
