use crate::error::EncodingError;
use crate::schema::{
    checked_definition, checked_xhtml, choice_value, extension_value_field, field_values,
    holds_resource, FHIR_NS,
};
use ferrum_context::{DefinitionCatalog, FieldKind};
use ferrum_models::{Complex, Element, Extension, FormatComments, Primitive, Resource};
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::Cursor;
use std::slice;

type Result<T> = std::result::Result<T, EncodingError>;
type XmlWriter = Writer<Cursor<Vec<u8>>>;

pub(crate) struct XmlEncoder<'c> {
    catalog: &'c dyn DefinitionCatalog,
    preserve_comments: bool,
}

impl<'c> XmlEncoder<'c> {
    pub(crate) fn new(catalog: &'c dyn DefinitionCatalog, preserve_comments: bool) -> Self {
        Self {
            catalog,
            preserve_comments,
        }
    }

    pub(crate) fn document(&self, resource: &Resource, pretty: bool) -> Result<String> {
        let mut writer = if pretty {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };
        self.resource(&mut writer, resource)?;
        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }

    /// Every resource, nested or not, declares the FHIR namespace.
    fn resource(&self, writer: &mut XmlWriter, resource: &Resource) -> Result<()> {
        let resource_type = resource.resource_type();
        let root = resource.as_complex();
        self.comments(writer, &root.base.comments.pre)?;

        let mut start = BytesStart::new(resource_type);
        start.push_attribute(("xmlns", FHIR_NS));
        writer.write_event(Event::Start(start))?;
        self.fields(writer, root, resource_type, resource_type)?;
        writer.write_event(Event::End(BytesEnd::new(resource_type)))?;

        self.comments(writer, &root.base.comments.post)?;
        Ok(())
    }

    fn fields(
        &self,
        writer: &mut XmlWriter,
        node: &Complex,
        type_name: &str,
        path: &str,
    ) -> Result<()> {
        let definition = checked_definition(self.catalog, type_name, node)?;
        for field in &definition.fields {
            let values = node.get_all(&field.name);
            match field.kind {
                // Written as an attribute of the element itself.
                FieldKind::ElementId => {}
                FieldKind::Extension => {
                    let extensions = if field.name == "modifierExtension" {
                        &node.base.modifier_extension
                    } else {
                        &node.base.extension
                    };
                    for extension in extensions {
                        self.extension(writer, &field.name, extension, path)?;
                    }
                }
                FieldKind::Choice => {
                    if let Some((value, type_code)) = choice_value(field, values, path)? {
                        let name = field.document_name(type_code);
                        self.value(writer, &name, type_code, value, path)?;
                    }
                }
                _ => {
                    for value in field_values(field, values, path)? {
                        self.value(writer, &field.name, field.type_code(), value, path)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn value(
        &self,
        writer: &mut XmlWriter,
        name: &str,
        type_code: &str,
        element: &Element,
        path: &str,
    ) -> Result<()> {
        let child_path = format!("{path}.{name}");
        let primitive_field = self.catalog.is_primitive(type_code);
        match element {
            Element::Primitive(primitive) if primitive_field => {
                self.primitive(writer, name, type_code, primitive, &child_path)
            }
            Element::Complex(complex) if !primitive_field => {
                self.complex(writer, name, type_code, complex, &child_path)
            }
            Element::Resource(resource) if holds_resource(self.catalog, type_code) => {
                writer.write_event(Event::Start(BytesStart::new(name)))?;
                self.resource(writer, resource)?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
                Ok(())
            }
            _ => Err(EncodingError::UnexpectedNode {
                path: child_path,
                expected: if primitive_field {
                    "primitive"
                } else if holds_resource(self.catalog, type_code) {
                    "resource"
                } else {
                    "complex"
                },
            }),
        }
    }

    fn complex(
        &self,
        writer: &mut XmlWriter,
        name: &str,
        type_code: &str,
        node: &Complex,
        path: &str,
    ) -> Result<()> {
        self.comments(writer, &node.base.comments.pre)?;
        let mut start = BytesStart::new(name);
        if let Some(id) = &node.base.id {
            start.push_attribute(("id", id.as_str()));
        }
        writer.write_event(Event::Start(start))?;
        self.fields(writer, node, type_code, path)?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        self.comments(writer, &node.base.comments.post)?;
        Ok(())
    }

    /// `id` and `value` attributes, extensions as children.
    fn primitive(
        &self,
        writer: &mut XmlWriter,
        name: &str,
        type_code: &str,
        primitive: &Primitive,
        path: &str,
    ) -> Result<()> {
        self.comments(writer, &primitive.base.comments.pre)?;
        if type_code == "xhtml" {
            if let Some(div) = primitive.as_str() {
                let div = checked_xhtml(div).map_err(|reason| EncodingError::InvalidXhtml {
                    path: path.to_string(),
                    reason,
                })?;
                writer.write_event(Event::Text(BytesText::from_escaped(div.as_str())))?;
            }
        } else {
            let mut start = BytesStart::new(name);
            if let Some(id) = &primitive.base.id {
                start.push_attribute(("id", id.as_str()));
            }
            if let Some(value) = primitive.as_str().filter(|v| !v.is_empty()) {
                start.push_attribute(attribute("value", value));
            }
            let base = &primitive.base;
            if base.extension.is_empty() && base.modifier_extension.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for extension in &base.extension {
                    self.extension(writer, "extension", extension, name)?;
                }
                for extension in &base.modifier_extension {
                    self.extension(writer, "modifierExtension", extension, name)?;
                }
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
        }
        self.comments(writer, &primitive.base.comments.post)?;
        Ok(())
    }

    fn extension(
        &self,
        writer: &mut XmlWriter,
        tag: &str,
        extension: &Extension,
        path: &str,
    ) -> Result<()> {
        if extension.value.is_some() && !extension.extension.is_empty() {
            return Err(EncodingError::ExtensionValueAndChildren {
                url: extension.url.clone(),
            });
        }
        self.comments(writer, &extension.comments.pre)?;
        let mut start = BytesStart::new(tag);
        if let Some(id) = &extension.id {
            start.push_attribute(("id", id.as_str()));
        }
        start.push_attribute(attribute("url", &extension.url));
        writer.write_event(Event::Start(start))?;

        for child in &extension.extension {
            self.extension(writer, "extension", child, path)?;
        }
        if let Some(value) = extension.value() {
            let field = extension_value_field(self.catalog)?;
            if let Some((value, type_code)) =
                choice_value(field, slice::from_ref(value), "Extension")?
            {
                let name = field.document_name(type_code);
                self.value(writer, &name, type_code, value, "Extension")?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new(tag)))?;
        self.comments(writer, &extension.comments.post)?;
        Ok(())
    }

    fn comments(&self, writer: &mut XmlWriter, comments: &[String]) -> Result<()> {
        if !self.preserve_comments {
            return Ok(());
        }
        for comment in comments {
            let text = format!(" {} ", comment.replace("--", "- -"));
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
        }
        Ok(())
    }
}

/// An attribute whose value keeps its line breaks and tabs.
///
/// Parsers normalise literal whitespace in attribute values to spaces, so
/// it is written as character references.
fn attribute<'a>(key: &'a str, value: &str) -> Attribute<'a> {
    let mut escaped = String::with_capacity(value.len());
    for c in escape(value).chars() {
        match c {
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            c => escaped.push(c),
        }
    }
    Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    }
}
