//! In-memory element tree
//!
//! Every node carries an optional element id and two ordered extension lists
//! (plain and modifier). Primitive values keep their lexical form so that
//! decimals such as `0.000000000000000100` survive a round trip unchanged.
//!
//! Field order is never stored: encoders walk fields in the order the
//! definition catalog declares, so [`Complex`] keeps its children in a map.

use crate::reference::ReferenceTarget;
use crate::resource::Resource;
use std::collections::BTreeMap;

/// Comments attached to a node in the document it was decoded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatComments {
    /// Comments that precede the node
    pub pre: Vec<String>,
    /// Comments that follow the node
    pub post: Vec<String>,
}

impl FormatComments {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }
}

/// Data shared by every node of the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementBase {
    /// Element id (not the logical id of a resource)
    pub id: Option<String>,
    pub extension: Vec<Extension>,
    pub modifier_extension: Vec<Extension>,
    pub comments: FormatComments,
}

impl ElementBase {
    /// Append an extension to the list selected by its modifier flag.
    pub fn add_extension(&mut self, extension: Extension) {
        if extension.is_modifier {
            self.modifier_extension.push(extension);
        } else {
            self.extension.push(extension);
        }
    }

    /// All extensions (plain first, then modifier) with the given URL.
    pub fn extensions_by_url<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Extension> {
        self.extension
            .iter()
            .chain(self.modifier_extension.iter())
            .filter(move |ext| ext.url == url)
    }

    /// True when an id or at least one non-empty extension is present.
    pub fn has_content(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
            || self.extension.iter().any(|ext| !ext.is_empty())
            || self.modifier_extension.iter().any(|ext| !ext.is_empty())
    }
}

/// URL-keyed extension data attachable to any element.
///
/// An extension carries either a value or nested extensions, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub id: Option<String>,
    pub url: String,
    /// Routes the extension to the `modifierExtension` slot
    pub is_modifier: bool,
    pub value: Option<Box<Element>>,
    pub extension: Vec<Extension>,
    pub comments: FormatComments,
}

impl Extension {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            is_modifier: false,
            value: None,
            extension: Vec::new(),
            comments: FormatComments::default(),
        }
    }

    pub fn modifier(url: impl Into<String>) -> Self {
        Self {
            is_modifier: true,
            ..Self::new(url)
        }
    }

    pub fn with_value(mut self, value: impl Into<Element>) -> Self {
        self.value = Some(Box::new(value.into()));
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_extension(mut self, child: Extension) -> Self {
        self.extension.push(child);
        self
    }

    pub fn add_extension(&mut self, child: Extension) {
        self.extension.push(child);
    }

    pub fn value(&self) -> Option<&Element> {
        self.value.as_deref()
    }

    /// An extension with no usable value and no non-empty children.
    pub fn is_empty(&self) -> bool {
        self.value.as_deref().is_none_or(Element::is_empty)
            && self.extension.iter().all(Extension::is_empty)
    }
}

/// A scalar value stored as its lexical text.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub base: ElementBase,
    /// FHIR primitive type code, e.g. `string`, `decimal`, `dateTime`
    pub type_code: String,
    pub value: Option<String>,
}

impl Primitive {
    pub fn new(type_code: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            base: ElementBase::default(),
            type_code: type_code.into(),
            value: Some(value.into()),
        }
    }

    /// A primitive without a value, used to carry an id or extensions alone.
    pub fn shell(type_code: impl Into<String>) -> Self {
        Self {
            base: ElementBase::default(),
            type_code: type_code.into(),
            value: None,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new("string", value)
    }

    pub fn code(value: impl Into<String>) -> Self {
        Self::new("code", value)
    }

    pub fn uri(value: impl Into<String>) -> Self {
        Self::new("uri", value)
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new("id", value)
    }

    pub fn date(value: impl Into<String>) -> Self {
        Self::new("date", value)
    }

    pub fn date_time(value: impl Into<String>) -> Self {
        Self::new("dateTime", value)
    }

    /// Decimal from its lexical form; the text is kept verbatim.
    pub fn decimal(lexical: impl Into<String>) -> Self {
        Self::new("decimal", lexical)
    }

    pub fn integer(value: i64) -> Self {
        Self::new("integer", value.to_string())
    }

    pub fn boolean(value: bool) -> Self {
        Self::new("boolean", if value { "true" } else { "false" })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.base.id = Some(id.into());
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.base.add_extension(extension);
        self
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn has_value(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.has_value() && !self.base.has_content()
    }
}

/// A node with named children.
///
/// Each field maps to one or more child elements. Choice fields are stored
/// under their prefix (`value`, `effective`) and discriminated by the child's
/// own type.
#[derive(Debug, Clone, PartialEq)]
pub struct Complex {
    pub base: ElementBase,
    /// Datatype name (`HumanName`), resource type, or backbone path (`Bundle.entry`)
    pub type_name: String,
    fields: BTreeMap<String, Vec<Element>>,
    /// Only meaningful on `Reference` nodes
    pub reference_target: Option<ReferenceTarget>,
}

impl Complex {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            base: ElementBase::default(),
            type_name: type_name.into(),
            fields: BTreeMap::new(),
            reference_target: None,
        }
    }

    /// Builder form of [`Complex::set`].
    pub fn with(mut self, name: &str, value: impl Into<Element>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder form of [`Complex::add`].
    pub fn with_item(mut self, name: &str, value: impl Into<Element>) -> Self {
        self.add(name, value);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.base.id = Some(id.into());
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.base.add_extension(extension);
        self
    }

    /// Replace the content of a field with a single value.
    pub fn set(&mut self, name: &str, value: impl Into<Element>) {
        self.fields.insert(name.to_string(), vec![value.into()]);
    }

    /// Append a value to a repeating field.
    pub fn add(&mut self, name: &str, value: impl Into<Element>) {
        self.values_mut(name).push(value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.fields.get(name).and_then(|values| values.first())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.fields.get_mut(name).and_then(|values| values.first_mut())
    }

    pub fn get_all(&self, name: &str) -> &[Element] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Vec<Element>> {
        self.fields.get_mut(name)
    }

    /// Mutable access to a field's values, creating the field when missing.
    pub fn values_mut(&mut self, name: &str) -> &mut Vec<Element> {
        self.fields.entry(name.to_string()).or_default()
    }

    pub fn remove(&mut self, name: &str) -> Vec<Element> {
        self.fields.remove(name).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|values| !values.is_empty())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[Element])> {
        self.fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn fields_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<Element>)> {
        self.fields
            .iter_mut()
            .map(|(name, values)| (name.as_str(), values))
    }

    /// Drop fields whose value lists are empty.
    pub fn retain_fields<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &mut Vec<Element>) -> bool,
    {
        self.fields.retain(|name, values| keep(name, values));
    }

    /// Lexical value of a single primitive child.
    pub fn primitive_value(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(Element::as_primitive)
            .and_then(Primitive::as_str)
    }

    pub fn is_empty(&self) -> bool {
        !self.base.has_content()
            && self.reference_target.is_none()
            && self
                .fields
                .values()
                .all(|values| values.iter().all(Element::is_empty))
    }
}

/// One node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Primitive(Primitive),
    Complex(Complex),
    Resource(Box<Resource>),
}

impl Element {
    pub fn base(&self) -> &ElementBase {
        match self {
            Element::Primitive(p) => &p.base,
            Element::Complex(c) => &c.base,
            Element::Resource(r) => &r.as_complex().base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        match self {
            Element::Primitive(p) => &mut p.base,
            Element::Complex(c) => &mut c.base,
            Element::Resource(r) => &mut r.as_complex_mut().base,
        }
    }

    /// Type code of a primitive, type name of a complex, or resource type.
    pub fn type_name(&self) -> &str {
        match self {
            Element::Primitive(p) => &p.type_code,
            Element::Complex(c) => &c.type_name,
            Element::Resource(r) => r.resource_type(),
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Element::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_primitive_mut(&mut self) -> Option<&mut Primitive> {
        match self {
            Element::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&Complex> {
        match self {
            Element::Complex(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_complex_mut(&mut self) -> Option<&mut Complex> {
        match self {
            Element::Complex(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Element::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_resource_mut(&mut self) -> Option<&mut Resource> {
        match self {
            Element::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// Resources are never empty; they are always emitted.
    pub fn is_empty(&self) -> bool {
        match self {
            Element::Primitive(p) => p.is_empty(),
            Element::Complex(c) => c.is_empty(),
            Element::Resource(_) => false,
        }
    }
}

impl From<Primitive> for Element {
    fn from(value: Primitive) -> Self {
        Element::Primitive(value)
    }
}

impl From<Complex> for Element {
    fn from(value: Complex) -> Self {
        Element::Complex(value)
    }
}

impl From<Resource> for Element {
    fn from(value: Resource) -> Self {
        Element::Resource(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_primitive_with_extension_is_not_empty() {
        let shell = Primitive::shell("string")
            .with_extension(Extension::new("http://foo").with_value(Primitive::string("x")));
        assert!(!shell.has_value());
        assert!(!shell.is_empty());
        assert!(Primitive::shell("string").is_empty());
        assert!(Primitive::string("").is_empty());
    }

    #[test]
    fn extensions_route_by_modifier_flag() {
        let mut base = ElementBase::default();
        base.add_extension(Extension::new("http://a").with_value(Primitive::string("1")));
        base.add_extension(Extension::modifier("http://b").with_value(Primitive::string("2")));
        assert_eq!(base.extension.len(), 1);
        assert_eq!(base.modifier_extension.len(), 1);
        assert_eq!(base.extensions_by_url("http://b").count(), 1);
    }

    #[test]
    fn extension_without_value_or_children_is_empty() {
        assert!(Extension::new("http://foo#bar").is_empty());
        assert!(Extension::new("http://foo#bar")
            .with_value(Primitive::shell("string"))
            .is_empty());
        assert!(Extension::new("http://foo#bar")
            .with_value(Primitive::string(""))
            .is_empty());
        let parent = Extension::new("http://parent")
            .with_extension(Extension::new("http://child").with_value(Primitive::string("v")));
        assert!(!parent.is_empty());
    }

    #[test]
    fn complex_field_access() {
        let mut name = Complex::new("HumanName").with("family", Primitive::string("Smith"));
        name.add("given", Primitive::string("John"));
        name.add("given", Primitive::string("Q"));

        assert_eq!(name.primitive_value("family"), Some("Smith"));
        assert_eq!(name.get_all("given").len(), 2);
        assert!(name.get_all("prefix").is_empty());
        assert!(!name.is_empty());

        name.remove("family");
        name.remove("given");
        assert!(name.is_empty());
    }
}
