//! Read side of the Learning Record Exchange.
//!
//! [`QueryEngine`] answers filtered, paginated statement queries with
//! format projection (exact, ids, canonical) and single-statement lookup;
//! [`AggregateOptions`] builds guarded, tenant-scoped grouping pipelines
//! that a store executes.
//!
//! # Key Types
//!
//! - [`QueryEngine`] — index/show over a statement store
//! - [`IndexOptions`] — caller filter set with xAPI defaults
//! - [`Format`] / [`project`] — statement projection for responses
//! - [`AggregateOptions`] — grouped-count pipeline builder

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod format;

pub use aggregate::{AggregateDimension, AggregateOptions};
pub use engine::{IndexOptions, QueryEngine};
pub use error::QueryError;
pub use format::{project, Format};
