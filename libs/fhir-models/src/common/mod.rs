//! Version-agnostic FHIR models
//!
//! Conformance structures read by the definition catalog.

pub mod element_definition;
pub mod error;
pub mod structure_definition;

// Re-export commonly used types
pub use element_definition::*;
pub use error::{Error, Result};
pub use structure_definition::*;
