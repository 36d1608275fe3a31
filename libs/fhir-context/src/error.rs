//! Error types for the definition catalog

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("StructureDefinition has no snapshot: {0}")]
    MissingSnapshot(String),

    #[error("Invalid StructureDefinition: {0}")]
    InvalidStructureDefinition(String),

    #[error("Invalid FHIR version: {0}")]
    InvalidFhirVersion(String),
}

pub type Result<T> = std::result::Result<T, Error>;
