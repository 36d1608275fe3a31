//! FHIR JSON and XML codec.
//!
//! Encodes [`Resource`] trees to either grammar and decodes them back,
//! driven entirely by a [`DefinitionCatalog`]:
//! - Field order, cardinality and choice suffixes come from the catalog.
//! - Primitive metadata (`id`, `extension`) travels in `_field` companions in
//!   JSON and as attributes/children in XML.
//! - Inline reference targets become contained resources with local ids.
//! - Summary mode, narrative suppression and path filters cut the output
//!   down and mark it with the subsetted tag.
//!
//! ```rust
//! use ferrum_format::{EncodeOptions, FhirCodec, Format};
//! use ferrum_context::FhirVersion;
//! use ferrum_models::{Primitive, Resource};
//!
//! let codec = FhirCodec::core(FhirVersion::R4);
//! let mut patient = Resource::new("Patient").with_id("123");
//! patient.set("active", Primitive::boolean(true));
//!
//! let json = codec.encode(&patient, Format::Json, &EncodeOptions::default()).unwrap();
//! assert_eq!(json, r#"{"resourceType":"Patient","id":"123","active":true}"#);
//! ```

pub mod contained;
pub mod error;
pub mod filter;
pub mod json;
pub mod options;
pub mod projection;
mod schema;
pub mod xml;

pub use error::{EncodingError, Error, FormatError, Result};
pub use filter::{PathFilter, PathPattern};
pub use options::{DecodeOptions, EncodeOptions, NarrativeGenerator};

use ferrum_context::{core_catalog, DefinitionCatalog, FhirVersion};
use ferrum_models::Resource;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Wire grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    /// Infer the grammar from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            other => Err(format!("unknown format '{other}' (expected json or xml)")),
        }
    }
}

/// Encoder and decoder bound to one definition catalog.
///
/// The codec holds no mutable state; one instance can serve any number of
/// concurrent calls.
#[derive(Clone, Copy)]
pub struct FhirCodec<'c> {
    catalog: &'c dyn DefinitionCatalog,
}

impl FhirCodec<'static> {
    /// Codec over the built-in core catalog for `version`.
    pub fn core(version: FhirVersion) -> Self {
        Self::new(core_catalog(version))
    }
}

impl<'c> FhirCodec<'c> {
    pub fn new(catalog: &'c dyn DefinitionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c dyn DefinitionCatalog {
        self.catalog
    }

    /// Encode `resource`. The caller's tree is left untouched; contained ids
    /// are assigned on a private copy and come out the same on every call.
    pub fn encode(
        &self,
        resource: &Resource,
        format: Format,
        options: &EncodeOptions,
    ) -> Result<String> {
        debug!(
            resource_type = resource.resource_type(),
            %format,
            summary = options.summary,
            "Encoding resource"
        );
        let prepared = projection::prepare(resource, self.catalog, options);
        let text = match format {
            Format::Json => json::to_string(&prepared, self.catalog, options)?,
            Format::Xml => xml::to_string(&prepared, self.catalog, options)?,
        };
        debug!(%format, bytes = text.len(), "Encoded resource");
        Ok(text)
    }

    /// Decode one resource, optionally requiring a specific resource type.
    pub fn decode(
        &self,
        text: &str,
        format: Format,
        options: &DecodeOptions,
        expected: Option<&str>,
    ) -> Result<Resource> {
        debug!(%format, bytes = text.len(), strict = options.strict, "Decoding resource");
        let resource = match format {
            Format::Json => json::from_str(text, self.catalog, options)?,
            Format::Xml => xml::from_str(text, self.catalog, options)?,
        };
        if let Some(expected) = expected {
            if resource.resource_type() != expected {
                return Err(FormatError::UnexpectedResourceType {
                    expected: expected.to_string(),
                    found: resource.resource_type().to_string(),
                }
                .into());
            }
        }
        debug!(
            resource_type = resource.resource_type(),
            contained = resource.contained().count(),
            "Decoded resource"
        );
        Ok(resource)
    }

    pub fn encode_json(&self, resource: &Resource, options: &EncodeOptions) -> Result<String> {
        self.encode(resource, Format::Json, options)
    }

    pub fn encode_xml(&self, resource: &Resource, options: &EncodeOptions) -> Result<String> {
        self.encode(resource, Format::Xml, options)
    }

    pub fn decode_json(&self, text: &str, options: &DecodeOptions) -> Result<Resource> {
        self.decode(text, Format::Json, options, None)
    }

    pub fn decode_xml(&self, text: &str, options: &DecodeOptions) -> Result<Resource> {
        self.decode(text, Format::Xml, options, None)
    }

    /// Decode in one grammar and encode in the other (or the same).
    pub fn convert(
        &self,
        text: &str,
        from: Format,
        to: Format,
        decode: &DecodeOptions,
        encode: &EncodeOptions,
    ) -> Result<String> {
        let resource = self.decode(text, from, decode, None)?;
        self.encode(&resource, to, encode)
    }
}

impl fmt::Debug for FhirCodec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FhirCodec")
            .field("version", &self.catalog.version())
            .finish()
    }
}

fn conversion_options() -> (DecodeOptions, EncodeOptions) {
    (
        DecodeOptions::new().with_preserve_comments(true),
        EncodeOptions::new()
            .with_pretty(true)
            .with_preserve_comments(true),
    )
}

/// Convert a FHIR JSON payload into its XML representation (R4).
pub fn json_to_xml(input: &str) -> Result<String> {
    let (decode, encode) = conversion_options();
    FhirCodec::core(FhirVersion::R4).convert(input, Format::Json, Format::Xml, &decode, &encode)
}

/// Convert a FHIR XML payload into its JSON representation (R4).
pub fn xml_to_json(input: &str) -> Result<String> {
    let (decode, encode) = conversion_options();
    FhirCodec::core(FhirVersion::R4).convert(input, Format::Xml, Format::Json, &decode, &encode)
}
