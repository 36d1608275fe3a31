//! XML grammar
//!
//! Elements are written in catalog field order. Primitive values sit in a
//! `value` attribute with the element id in `id`; extensions are child
//! elements; inline resources are wrapped in their field element. Encoding
//! uses `quick-xml`, decoding parses with `roxmltree` so the narrative `div`
//! can be copied from the source text unchanged.

mod decode;
mod encode;

use crate::error::{EncodingError, FormatError};
use crate::options::{DecodeOptions, EncodeOptions};
use decode::XmlDecoder;
use encode::XmlEncoder;
use ferrum_context::DefinitionCatalog;
use ferrum_models::Resource;

/// Encode an already prepared tree as XML text.
pub fn to_string(
    resource: &Resource,
    catalog: &dyn DefinitionCatalog,
    options: &EncodeOptions,
) -> Result<String, EncodingError> {
    XmlEncoder::new(catalog, options.preserve_comments).document(resource, options.pretty)
}

/// Decode XML text holding one resource.
pub fn from_str(
    text: &str,
    catalog: &dyn DefinitionCatalog,
    options: &DecodeOptions,
) -> Result<Resource, FormatError> {
    XmlDecoder::new(catalog, options, text).document()
}
