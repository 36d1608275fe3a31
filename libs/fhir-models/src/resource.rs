//! Resources and resource identity
//!
//! A [`Resource`] is a complex node whose type name is the resource type. It
//! derefs to [`Complex`] for generic field access and adds typed accessors for
//! the handful of fields the codec itself has to reason about (`id`, `meta`,
//! `text`, `contained`).

use crate::element::{Complex, Element, Extension, Primitive};
use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    root: Complex,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            root: Complex::new(resource_type),
        }
    }

    /// Wrap a complex node whose type name is a resource type.
    pub fn from_complex(root: Complex) -> Self {
        Self { root }
    }

    pub fn into_complex(self) -> Complex {
        self.root
    }

    pub fn as_complex(&self) -> &Complex {
        &self.root
    }

    pub fn as_complex_mut(&mut self) -> &mut Complex {
        &mut self.root
    }

    pub fn resource_type(&self) -> &str {
        &self.root.type_name
    }

    /// Logical id as stored, which may be a full URL or `urn:uuid:...`.
    pub fn id(&self) -> Option<&str> {
        self.root.primitive_value("id").filter(|id| !id.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.root.set("id", Primitive::id(id));
    }

    pub fn clear_id(&mut self) {
        self.root.remove("id");
    }

    pub fn resource_id(&self) -> Option<ResourceId> {
        self.id().map(ResourceId::parse)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.set_id(id);
        self
    }

    pub fn meta(&self) -> Option<&Complex> {
        self.root.get("meta").and_then(Element::as_complex)
    }

    /// Apply `update` to the `meta` node, creating it when missing.
    pub fn update_meta<R>(&mut self, update: impl FnOnce(&mut Complex) -> R) -> R {
        let values = self.root.values_mut("meta");
        let mut meta = match values.drain(..).next() {
            Some(Element::Complex(meta)) => meta,
            _ => Complex::new("Meta"),
        };
        let result = update(&mut meta);
        values.push(Element::Complex(meta));
        result
    }

    pub fn version_id(&self) -> Option<&str> {
        self.meta().and_then(|meta| meta.primitive_value("versionId"))
    }

    pub fn set_version_id(&mut self, version: impl Into<String>) {
        self.update_meta(|meta| meta.set("versionId", Primitive::id(version)));
    }

    /// `meta.lastUpdated` parsed as an RFC 3339 instant.
    pub fn last_updated(&self) -> Option<DateTime<FixedOffset>> {
        self.meta()
            .and_then(|meta| meta.primitive_value("lastUpdated"))
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
    }

    pub fn set_last_updated(&mut self, instant: DateTime<FixedOffset>) {
        self.update_meta(|meta| {
            meta.set("lastUpdated", Primitive::new("instant", instant.to_rfc3339()))
        });
    }

    pub fn profiles(&self) -> Vec<&str> {
        self.meta()
            .map(|meta| {
                meta.get_all("profile")
                    .iter()
                    .filter_map(Element::as_primitive)
                    .filter_map(Primitive::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn add_profile(&mut self, url: impl Into<String>) {
        self.update_meta(|meta| meta.add("profile", Primitive::new("canonical", url)));
    }

    pub fn tags(&self) -> Vec<Coding> {
        self.meta_codings("tag")
    }

    pub fn add_tag(&mut self, coding: Coding) {
        self.update_meta(|meta| meta.add("tag", coding.to_complex()));
    }

    pub fn security(&self) -> Vec<Coding> {
        self.meta_codings("security")
    }

    pub fn add_security(&mut self, coding: Coding) {
        self.update_meta(|meta| meta.add("security", coding.to_complex()));
    }

    pub fn has_tag(&self, system: &str, code: &str) -> bool {
        self.tags().iter().any(|tag| tag.matches(system, code))
    }

    fn meta_codings(&self, field: &str) -> Vec<Coding> {
        self.meta()
            .map(|meta| {
                meta.get_all(field)
                    .iter()
                    .filter_map(Element::as_complex)
                    .map(Coding::from_complex)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Raw XHTML of `text.div`.
    pub fn narrative_div(&self) -> Option<&str> {
        self.root
            .get("text")
            .and_then(Element::as_complex)
            .and_then(|text| text.primitive_value("div"))
    }

    pub fn set_narrative(&mut self, status: &str, div: impl Into<String>) {
        let text = Complex::new("Narrative")
            .with("status", Primitive::code(status))
            .with("div", Primitive::new("xhtml", div));
        self.root.set("text", text);
    }

    pub fn contained(&self) -> impl Iterator<Item = &Resource> {
        self.root
            .get_all("contained")
            .iter()
            .filter_map(Element::as_resource)
    }

    pub fn add_contained(&mut self, resource: Resource) {
        self.root.add("contained", resource);
    }

    /// Contained resource by local id; a leading `#` is ignored.
    pub fn contained_by_id(&self, id: &str) -> Option<&Resource> {
        let id = id.trim_start_matches('#');
        self.contained().find(|resource| resource.id() == Some(id))
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.root.base.extension
    }

    pub fn modifier_extensions(&self) -> &[Extension] {
        &self.root.base.modifier_extension
    }

    pub fn add_extension(&mut self, extension: Extension) {
        self.root.base.add_extension(extension);
    }
}

impl Deref for Resource {
    type Target = Complex;

    fn deref(&self) -> &Complex {
        &self.root
    }
}

impl DerefMut for Resource {
    fn deref_mut(&mut self) -> &mut Complex {
        &mut self.root
    }
}

/// Lightweight view of a `Coding` node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coding {
    pub system: Option<String>,
    pub version: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn from_complex(node: &Complex) -> Self {
        let text = |name: &str| node.primitive_value(name).map(str::to_string);
        Self {
            system: text("system"),
            version: text("version"),
            code: text("code"),
            display: text("display"),
        }
    }

    pub fn to_complex(&self) -> Complex {
        let mut node = Complex::new("Coding");
        if let Some(system) = &self.system {
            node.set("system", Primitive::uri(system));
        }
        if let Some(version) = &self.version {
            node.set("version", Primitive::string(version));
        }
        if let Some(code) = &self.code {
            node.set("code", Primitive::code(code));
        }
        if let Some(display) = &self.display {
            node.set("display", Primitive::string(display));
        }
        node
    }

    /// No system and no code. A display alone does not count.
    pub fn is_empty(&self) -> bool {
        self.system.as_deref().is_none_or(str::is_empty)
            && self.code.as_deref().is_none_or(str::is_empty)
    }

    pub fn matches(&self, system: &str, code: &str) -> bool {
        self.system.as_deref() == Some(system) && self.code.as_deref() == Some(code)
    }
}

/// Parsed form of a resource id that may be a full URL.
///
/// `http://base/Binary/11/_history/22` parses into base `http://base`, type
/// `Binary`, id `11` and version `22`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub base_url: Option<String>,
    pub resource_type: Option<String>,
    pub id: String,
    pub version: Option<String>,
}

impl ResourceId {
    pub fn parse(text: &str) -> Self {
        if text.starts_with("urn:uuid:") || text.starts_with("urn:oid:") {
            return Self::bare(text);
        }

        let (path, version) = match text.split_once("/_history/") {
            Some((path, version)) => (path, Some(version.trim_end_matches('/').to_string())),
            None => (text, None),
        };

        let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
        match segments.as_slice() {
            [id] => Self {
                version,
                ..Self::bare(id)
            },
            [base @ .., resource_type, id] => {
                let base = base.join("/");
                Self {
                    base_url: (!base.is_empty()).then_some(base),
                    resource_type: Some(resource_type.to_string()),
                    id: id.to_string(),
                    version,
                }
            }
            [] => Self::bare(text),
        }
    }

    fn bare(id: &str) -> Self {
        Self {
            base_url: None,
            resource_type: None,
            id: id.to_string(),
            version: None,
        }
    }

    pub fn is_urn(&self) -> bool {
        self.id.starts_with("urn:")
    }

    /// The id segment alone; what encoders emit as the resource's `id`.
    pub fn id_part(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(base) = &self.base_url {
            write!(f, "{base}/")?;
        }
        if let Some(resource_type) = &self.resource_type {
            write!(f, "{resource_type}/")?;
        }
        write!(f, "{}", self.id)?;
        if let Some(version) = &self.version {
            write!(f, "/_history/{version}")?;
        }
        Ok(())
    }
}
