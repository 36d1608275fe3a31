use crate::contained::{adopt_full_urls, link_references};
use crate::error::FormatError;
use crate::options::DecodeOptions;
use crate::schema::{holds_resource, resolve_field, skip_unknown, FHIR_NS, XHTML_NS};
use ferrum_context::{DefinitionCatalog, FieldKind};
use ferrum_models::{Complex, Element, ElementBase, Extension, Primitive, Resource};
use roxmltree::{Document, Node};
use std::mem;

type Result<T> = std::result::Result<T, FormatError>;

/// Where the most recently decoded child went, so trailing comments can be
/// attached to it.
enum Last {
    Nothing,
    Field(String),
    Extension,
    ModifierExtension,
}

pub(crate) struct XmlDecoder<'c, 'o, 's> {
    catalog: &'c dyn DefinitionCatalog,
    options: &'o DecodeOptions,
    /// Source text; the narrative `div` is taken from it verbatim.
    source: &'s str,
}

impl<'c, 'o, 's> XmlDecoder<'c, 'o, 's> {
    pub(crate) fn new(
        catalog: &'c dyn DefinitionCatalog,
        options: &'o DecodeOptions,
        source: &'s str,
    ) -> Self {
        Self {
            catalog,
            options,
            source,
        }
    }

    pub(crate) fn document(&self) -> Result<Resource> {
        let document = Document::parse(self.source)?;
        let root = document.root_element();
        let mut resource = self.resource(root, false)?;

        if self.options.preserve_comments {
            let mut before_root = true;
            let comments = &mut resource.as_complex_mut().base.comments;
            for node in document.root().children() {
                if node.is_element() {
                    before_root = false;
                } else if let Some(text) = comment_text(&node) {
                    if before_root {
                        comments.pre.push(text);
                    } else {
                        comments.post.push(text);
                    }
                }
            }
        }
        Ok(resource)
    }

    fn resource(&self, node: Node<'_, '_>, contained: bool) -> Result<Resource> {
        let namespace = node.tag_name().namespace().unwrap_or_default();
        if namespace != FHIR_NS {
            return Err(FormatError::InvalidNamespace(namespace.to_string()));
        }
        let resource_type = node.tag_name().name();
        if !self.catalog.is_resource(resource_type) {
            return Err(FormatError::UnknownResourceType(resource_type.to_string()));
        }

        let mut root = Complex::new(resource_type);
        self.fill(node, &mut root, resource_type)?;
        let mut resource = Resource::from_complex(root);
        if resource_type == "Bundle" {
            adopt_full_urls(&mut resource);
        }
        if !contained {
            link_references(&mut resource);
        }
        Ok(resource)
    }

    fn fill(&self, node: Node<'_, '_>, complex: &mut Complex, path: &str) -> Result<()> {
        let type_name = complex.type_name.clone();
        if !self.catalog.is_resource(&type_name) {
            complex.base.id = node.attribute("id").map(str::to_string);
        }

        let mut pending = Vec::new();
        let mut last = Last::Nothing;
        for child in node.children() {
            if let Some(text) = comment_text(&child) {
                if self.options.preserve_comments {
                    pending.push(text);
                }
                continue;
            }
            if !child.is_element() {
                continue;
            }
            let name = child.tag_name().name();
            if !in_known_namespace(&child) {
                skip_unknown(self.options, path, name)?;
                continue;
            }
            let Some(resolved) = resolve_field(self.catalog, self.options, &type_name, name, path)?
            else {
                continue;
            };
            let field = resolved.field;
            let child_path = format!("{path}.{name}");

            match field.kind {
                FieldKind::ElementId => {
                    complex.base.id = child.attribute("value").map(str::to_string);
                }
                FieldKind::Extension => {
                    let modifier = field.name == "modifierExtension";
                    let mut extension = self.extension(child, modifier, &child_path)?;
                    extension.comments.pre = mem::take(&mut pending);
                    complex.base.add_extension(extension);
                    last = if modifier {
                        Last::ModifierExtension
                    } else {
                        Last::Extension
                    };
                }
                _ => {
                    if !field.is_array() && complex.contains(&field.name) {
                        return Err(FormatError::RepeatedElement { path: child_path });
                    }
                    let mut element = self.element(
                        child,
                        resolved.type_code,
                        field.name == "contained",
                        &child_path,
                    )?;
                    element.base_mut().comments.pre = mem::take(&mut pending);
                    complex.add(&field.name, element);
                    last = Last::Field(field.name.clone());
                }
            }
        }

        if !pending.is_empty() {
            let target = match &last {
                Last::Nothing => None,
                Last::Field(name) => complex
                    .field_mut(name)
                    .and_then(|values| values.last_mut())
                    .map(|element| &mut element.base_mut().comments),
                Last::Extension => complex.base.extension.last_mut().map(|e| &mut e.comments),
                Last::ModifierExtension => complex
                    .base
                    .modifier_extension
                    .last_mut()
                    .map(|e| &mut e.comments),
            };
            match target {
                Some(comments) => comments.post.extend(pending),
                None => complex.base.comments.post.extend(pending),
            }
        }
        Ok(())
    }

    fn element(
        &self,
        node: Node<'_, '_>,
        type_code: &str,
        contained: bool,
        path: &str,
    ) -> Result<Element> {
        if self.catalog.is_primitive(type_code) {
            return Ok(Element::Primitive(self.primitive(node, type_code, path)?));
        }
        if holds_resource(self.catalog, type_code) {
            let inner = node
                .children()
                .find(Node::is_element)
                .ok_or_else(|| FormatError::InvalidContent {
                    path: path.to_string(),
                    reason: "expected a resource element".to_string(),
                })?;
            let mut resource = self.resource(inner, contained)?;
            if self.options.preserve_comments {
                let comments = &mut resource.as_complex_mut().base.comments;
                for child in node.children().filter(|c| c.is_comment()) {
                    let text = comment_text(&child).unwrap_or_default();
                    if child.range().start < inner.range().start {
                        comments.pre.push(text);
                    } else {
                        comments.post.push(text);
                    }
                }
            }
            return Ok(Element::Resource(Box::new(resource)));
        }
        let mut complex = Complex::new(type_code);
        self.fill(node, &mut complex, path)?;
        Ok(Element::Complex(complex))
    }

    fn primitive(&self, node: Node<'_, '_>, type_code: &str, path: &str) -> Result<Primitive> {
        let mut primitive = Primitive::shell(type_code);
        if type_code == "xhtml" {
            if node.tag_name().namespace() != Some(XHTML_NS) {
                return Err(FormatError::InvalidContent {
                    path: path.to_string(),
                    reason: "narrative div must be in the XHTML namespace".to_string(),
                });
            }
            primitive.value = Some(self.source[node.range()].to_string());
            return Ok(primitive);
        }

        primitive.value = node.attribute("value").map(str::to_string);
        primitive.base.id = node.attribute("id").map(str::to_string);
        self.extensions_only(node, &mut primitive.base, path)?;
        Ok(primitive)
    }

    /// Children of a primitive: extensions and comments only.
    fn extensions_only(&self, node: Node<'_, '_>, base: &mut ElementBase, path: &str) -> Result<()> {
        let mut pending = Vec::new();
        for child in node.children() {
            if let Some(text) = comment_text(&child) {
                if self.options.preserve_comments {
                    pending.push(text);
                }
                continue;
            }
            if !child.is_element() {
                continue;
            }
            let name = child.tag_name().name();
            let modifier = match name {
                "extension" => false,
                "modifierExtension" => true,
                other => {
                    skip_unknown(self.options, path, other)?;
                    continue;
                }
            };
            let mut extension = self.extension(child, modifier, path)?;
            extension.comments.pre = mem::take(&mut pending);
            base.add_extension(extension);
        }
        base.comments.post.extend(pending);
        Ok(())
    }

    fn extension(&self, node: Node<'_, '_>, modifier: bool, path: &str) -> Result<Extension> {
        let url = node
            .attribute("url")
            .ok_or_else(|| FormatError::InvalidContent {
                path: path.to_string(),
                reason: "extension without a url".to_string(),
            })?;
        let mut extension = if modifier {
            Extension::modifier(url)
        } else {
            Extension::new(url)
        };
        extension.id = node.attribute("id").map(str::to_string);
        let ext_path = format!("{path}.extension('{url}')");

        let mut pending = Vec::new();
        for child in node.children() {
            if let Some(text) = comment_text(&child) {
                if self.options.preserve_comments {
                    pending.push(text);
                }
                continue;
            }
            if !child.is_element() {
                continue;
            }
            let name = child.tag_name().name();
            if name == "extension" {
                let mut nested = self.extension(child, false, &ext_path)?;
                nested.comments.pre = mem::take(&mut pending);
                extension.add_extension(nested);
                continue;
            }
            let Some(resolved) =
                resolve_field(self.catalog, self.options, "Extension", name, &ext_path)?
            else {
                continue;
            };
            if !resolved.field.is_choice() {
                skip_unknown(self.options, &ext_path, name)?;
                continue;
            }
            if extension.value.is_some() {
                return Err(FormatError::RepeatedElement {
                    path: format!("{ext_path}.value[x]"),
                });
            }
            let mut value = self.element(child, resolved.type_code, false, &ext_path)?;
            value.base_mut().comments.pre = mem::take(&mut pending);
            extension.value = Some(Box::new(value));
        }
        extension.comments.post.extend(pending);
        Ok(extension)
    }
}

fn comment_text(node: &Node<'_, '_>) -> Option<String> {
    if node.is_comment() {
        node.text().map(|text| text.trim().to_string())
    } else {
        None
    }
}

fn in_known_namespace(node: &Node<'_, '_>) -> bool {
    matches!(node.tag_name().namespace(), Some(FHIR_NS) | Some(XHTML_NS))
}
