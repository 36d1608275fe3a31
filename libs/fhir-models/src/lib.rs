//! FHIR data models
//!
//! This crate provides the generic element tree every FHIR resource is held in,
//! plus the conformance models used to describe its shape.
//!
//! # Module Organization
//!
//! - `element`: nodes of the tree (primitives, complex values, extensions)
//! - `resource`: resource roots, meta accessors and id parsing
//! - `reference`: in-memory reference targets
//! - `common`: StructureDefinition and ElementDefinition
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::{Complex, Extension, Primitive, Resource};
//!
//! let mut patient = Resource::new("Patient").with_id("example");
//! patient.add(
//!     "name",
//!     Complex::new("HumanName").with(
//!         "family",
//!         Primitive::string("Chalmers")
//!             .with_extension(Extension::new("http://example.org/ext").with_value(Primitive::string("x"))),
//!     ),
//! );
//!
//! assert_eq!(patient.resource_type(), "Patient");
//! assert_eq!(patient.id(), Some("example"));
//! ```

pub mod common;
pub mod element;
pub mod reference;
pub mod resource;

// Re-export commonly used types
pub use common::*;
pub use element::{Complex, Element, ElementBase, Extension, FormatComments, Primitive};
pub use reference::ReferenceTarget;
pub use resource::{Coding, Resource, ResourceId};
