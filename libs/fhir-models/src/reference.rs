//! Reference targets
//!
//! A `Reference` node may point at a resource held in memory instead of (or in
//! addition to) a textual `reference` URL. Encoders resolve such targets into
//! `#id` local references or the target's own id.

use crate::element::{Complex, Primitive};
use crate::resource::Resource;

/// In-memory target of a `Reference` element.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceTarget {
    /// A resource object held by the reference itself
    Inline(Box<Resource>),
    /// Local id of a resource already in the container's `contained` list
    Contained(String),
}

impl Complex {
    /// A `Reference` datatype with a textual URL.
    pub fn reference(url: impl Into<String>) -> Self {
        Complex::new("Reference").with("reference", Primitive::string(url))
    }

    /// A `Reference` datatype pointing at an in-memory resource.
    pub fn reference_to(resource: Resource) -> Self {
        let mut reference = Complex::new("Reference");
        reference.reference_target = Some(ReferenceTarget::Inline(Box::new(resource)));
        reference
    }

    pub fn reference_url(&self) -> Option<&str> {
        self.primitive_value("reference")
    }

    /// The contained-resource id this reference targets, without the `#`.
    pub fn local_reference_id(&self) -> Option<&str> {
        match &self.reference_target {
            Some(ReferenceTarget::Contained(id)) => Some(id.trim_start_matches('#')),
            _ => self
                .reference_url()
                .and_then(|url| url.strip_prefix('#'))
                .filter(|id| !id.is_empty()),
        }
    }

    pub fn inline_target(&self) -> Option<&Resource> {
        match &self.reference_target {
            Some(ReferenceTarget::Inline(resource)) => Some(resource),
            _ => None,
        }
    }
}
