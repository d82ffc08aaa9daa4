//! ETag-guarded document store engine.
//!
//! One generic engine serves all three document kinds (state, agent
//! profile, activity profile). The differences between them live in a
//! [`DocumentConfig`] value rather than per-kind implementations: the
//! identifier field name, required scoping fields, destroy policy, and the
//! state-only bare-PUT exemption.

pub mod config;
pub mod engine;
pub mod error;

pub use config::{DestroyPolicy, DocumentConfig};
pub use engine::{BlobRemover, DocumentEngine, Method, StoreRequest};
pub use error::DocumentError;
