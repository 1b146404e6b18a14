//! Domain layer - Pure vocabulary abstractions
//!
//! This layer contains NO parsing or I/O. Only the normalized subject record
//! and the crate error type.

pub mod errors;
pub mod subject;

pub use errors::{Result, SubjectError};
pub use subject::{Identifier, Scheme, SubjectRecord};
