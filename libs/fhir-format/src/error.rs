//! Error types for encoding and decoding

use thiserror::Error;

/// Input that cannot be decoded. Always fatal for the whole document.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Expected a JSON object for the resource, found '{0}'")]
    ExpectedObject(&'static str),

    #[error("Missing required element 'resourceType' from JSON resource object, unable to parse")]
    MissingResourceType,

    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error("Expected resource of type '{expected}', found '{found}'")]
    UnexpectedResourceType { expected: String, found: String },

    #[error("Unknown element '{name}' found at '{path}'")]
    UnknownElement { path: String, name: String },

    #[error("Unknown type suffix '{suffix}' for choice element '{path}'")]
    UnknownChoiceType { path: String, suffix: String },

    #[error("Expected {expected} at element '{element}', found '{found}'")]
    WrongShape {
        element: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid content at element '{path}': {reason}")]
    InvalidContent { path: String, reason: String },

    #[error("Element '{path}' is not repeatable but occurs more than once")]
    RepeatedElement { path: String },

    #[error("Root element is not in the FHIR namespace (found '{0}')")]
    InvalidNamespace(String),
}

/// A tree that does not satisfy the definition catalog.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Type '{type_code}' is not allowed for choice element '{path}'")]
    InvalidChoiceType { path: String, type_code: String },

    #[error("Choice element '{path}' holds more than one value")]
    MultipleChoiceValues { path: String },

    #[error("Element '{path}' is not repeatable but holds {count} values")]
    MultipleValues { path: String, count: usize },

    #[error("Narrative at element '{path}' is not well-formed XHTML: {reason}")]
    InvalidXhtml { path: String, reason: String },

    #[error("Extension '{url}' carries both a value and child extensions")]
    ExtensionValueAndChildren { url: String },

    #[error("Value '{value}' at element '{path}' is not a valid JSON {repr}")]
    InvalidPrimitive {
        path: String,
        value: String,
        repr: &'static str,
    },

    #[error("Type '{0}' is not defined in the catalog")]
    UnknownType(String),

    #[error("Element '{name}' is not defined for type '{type_name}'")]
    UnknownElement { type_name: String, name: String },

    #[error("Element '{path}' expects a {expected} value")]
    UnexpectedNode { path: String, expected: &'static str },

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

pub type Result<T> = std::result::Result<T, Error>;
