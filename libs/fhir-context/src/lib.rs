//! FHIR definition catalog
//!
//! Supplies the schema knowledge the codec needs for every type: ordered field
//! names, cardinality, primitive/complex/resource kind, choice-type suffixes
//! and summary flags.
//!
//! Core catalogs are built lazily, once per [`FhirVersion`], and are shared
//! read-only afterwards:
//!
//! ```rust
//! use ferrum_context::{core_catalog, DefinitionCatalog, FhirVersion};
//!
//! let catalog = core_catalog(FhirVersion::R4);
//! let field = catalog.resolve_field("Observation", "valueQuantity").unwrap();
//! assert_eq!(field.field.name, "value");
//! assert_eq!(field.type_code, "Quantity");
//! ```

mod builtin;
pub mod catalog;
pub mod definition;
pub mod error;
mod structure;
pub mod version;

pub use catalog::{core_catalog, CatalogBuilder, DefinitionCatalog, ResolvedField, StaticCatalog, TypeBuilder};
pub use definition::{capitalize, FieldDefinition, FieldKind, JsonRepr, Max, TypeDefinition, TypeKind};
pub use error::{Error, Result};
pub use version::FhirVersion;
