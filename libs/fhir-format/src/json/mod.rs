//! JSON grammar
//!
//! Objects are written in catalog field order with `resourceType` first.
//! Primitive metadata (element id, extensions, comments) travels in a `_name`
//! companion next to the value; repeating primitives keep both arrays aligned
//! with `null` placeholders.

mod decode;
mod encode;

use crate::error::{EncodingError, FormatError};
use crate::options::{DecodeOptions, EncodeOptions};
use decode::JsonDecoder;
use encode::JsonEncoder;
use ferrum_context::DefinitionCatalog;
use ferrum_models::Resource;
use serde_json::Value;

/// Encode an already prepared tree as a JSON value.
pub fn to_value(
    resource: &Resource,
    catalog: &dyn DefinitionCatalog,
    options: &EncodeOptions,
) -> Result<Value, EncodingError> {
    JsonEncoder::new(catalog, options.preserve_comments).resource(resource)
}

/// Encode an already prepared tree as JSON text.
pub fn to_string(
    resource: &Resource,
    catalog: &dyn DefinitionCatalog,
    options: &EncodeOptions,
) -> Result<String, EncodingError> {
    let value = to_value(resource, catalog, options)?;
    let text = if options.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(text)
}

/// Decode a JSON value holding one resource.
pub fn from_value(
    value: &Value,
    catalog: &dyn DefinitionCatalog,
    options: &DecodeOptions,
) -> Result<Resource, FormatError> {
    JsonDecoder::new(catalog, options).document(value)
}

/// Decode JSON text holding one resource.
pub fn from_str(
    text: &str,
    catalog: &dyn DefinitionCatalog,
    options: &DecodeOptions,
) -> Result<Resource, FormatError> {
    let value: Value = serde_json::from_str(text)?;
    from_value(&value, catalog, options)
}
