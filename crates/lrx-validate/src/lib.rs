//! Validation for the Learning Record Exchange.
//!
//! Two layers:
//! - [`validate_atom`] checks a single candidate value against a named
//!   grammar (IRI, UUID, timestamp, agent, boolean, string). It never fails;
//!   it returns a list of field errors, empty on success.
//! - [`validate_statement`] walks a full statement structure and collects
//!   every field error before the caller surfaces a single validation error.

pub mod atom;
pub mod statement;

pub use atom::{validate_atom, Atom};
pub use statement::{validate_agent, validate_statement};
