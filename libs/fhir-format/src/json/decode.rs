use crate::contained::{adopt_full_urls, link_references};
use crate::error::FormatError;
use crate::options::DecodeOptions;
use crate::schema::{checked_xhtml, holds_resource, resolve_field, skip_unknown};
use ferrum_context::{DefinitionCatalog, FieldKind};
use ferrum_models::{Complex, Element, ElementBase, Extension, Primitive, Resource};
use serde_json::{Map, Value};

type Result<T> = std::result::Result<T, FormatError>;

/// One document field with its `_name` companion, in document order.
struct Entry<'v> {
    name: &'v str,
    value: Option<&'v Value>,
    companion: Option<&'v Value>,
}

fn entries(object: &Map<String, Value>) -> Vec<Entry<'_>> {
    let mut out = Vec::with_capacity(object.len());
    for (key, value) in object {
        if let Some(name) = key.strip_prefix('_') {
            if !object.contains_key(name) {
                out.push(Entry {
                    name,
                    value: None,
                    companion: Some(value),
                });
            }
        } else {
            out.push(Entry {
                name: key,
                value: Some(value).filter(|v| !v.is_null()),
                companion: object.get(&format!("_{key}")).filter(|v| !v.is_null()),
            });
        }
    }
    out
}

/// Shape names used in error messages.
fn shape(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "OBJECT",
        Value::Array(_) => "ARRAY",
        Value::Null => "NULL",
        _ => "SCALAR",
    }
}

fn wrong_shape(element: &str, expected: &'static str, found: &Value) -> FormatError {
    FormatError::WrongShape {
        element: element.to_string(),
        expected,
        found: shape(found),
    }
}

fn as_object<'v>(value: &'v Value, element: &str) -> Result<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| wrong_shape(element, "OBJECT", value))
}

fn as_array<'v>(value: &'v Value, element: &str) -> Result<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| wrong_shape(element, "ARRAY", value))
}

fn as_string(value: &Value, element: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_shape(element, "SCALAR", value))
}

pub(crate) struct JsonDecoder<'c, 'o> {
    catalog: &'c dyn DefinitionCatalog,
    options: &'o DecodeOptions,
}

impl<'c, 'o> JsonDecoder<'c, 'o> {
    pub(crate) fn new(catalog: &'c dyn DefinitionCatalog, options: &'o DecodeOptions) -> Self {
        Self { catalog, options }
    }

    pub(crate) fn document(&self, value: &Value) -> Result<Resource> {
        let object = value
            .as_object()
            .ok_or_else(|| FormatError::ExpectedObject(shape(value)))?;
        self.resource(object, false)
    }

    fn resource(&self, object: &Map<String, Value>, contained: bool) -> Result<Resource> {
        let resource_type = object
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or(FormatError::MissingResourceType)?;
        if !self.catalog.is_resource(resource_type) {
            return Err(FormatError::UnknownResourceType(resource_type.to_string()));
        }

        let mut root = Complex::new(resource_type);
        self.fill(&mut root, object, resource_type)?;
        let mut resource = Resource::from_complex(root);
        if resource_type == "Bundle" {
            adopt_full_urls(&mut resource);
        }
        // Contained resources are linked by their container.
        if !contained {
            link_references(&mut resource);
        }
        Ok(resource)
    }

    fn fill(&self, node: &mut Complex, object: &Map<String, Value>, path: &str) -> Result<()> {
        let type_name = node.type_name.clone();
        for entry in entries(object) {
            match entry.name {
                "resourceType" if self.catalog.is_resource(&type_name) => continue,
                "fhir_comments" => {
                    if let Some(value) = entry.value {
                        self.comments(&mut node.base, value)?;
                    }
                    continue;
                }
                _ => {}
            }
            let Some(resolved) =
                resolve_field(self.catalog, self.options, &type_name, entry.name, path)?
            else {
                continue;
            };
            let field = resolved.field;
            let child_path = format!("{path}.{}", entry.name);

            match field.kind {
                FieldKind::ElementId => {
                    if let Some(value) = entry.value {
                        node.base.id = Some(as_string(value, entry.name)?);
                    }
                }
                FieldKind::Extension => {
                    if let Some(value) = entry.value {
                        let modifier = field.name == "modifierExtension";
                        for item in as_array(value, entry.name)? {
                            let extension = self.extension(item, modifier, &child_path)?;
                            node.base.add_extension(extension);
                        }
                    }
                }
                _ => {
                    if field.is_choice() && node.contains(&field.name) {
                        return Err(FormatError::InvalidContent {
                            path: child_path,
                            reason: format!("more than one value for choice element '{}[x]'", field.name),
                        });
                    }
                    let values = self.values(
                        resolved.type_code,
                        &entry,
                        field.is_array(),
                        field.name == "contained",
                        &child_path,
                    )?;
                    if !values.is_empty() {
                        node.values_mut(&field.name).extend(values);
                    }
                }
            }
        }
        Ok(())
    }

    fn values(
        &self,
        type_code: &str,
        entry: &Entry<'_>,
        many: bool,
        contained: bool,
        path: &str,
    ) -> Result<Vec<Element>> {
        if self.catalog.is_primitive(type_code) {
            return self.primitives(type_code, entry, many, path);
        }
        // Only primitives have `_name` companions.
        if entry.companion.is_some() {
            skip_unknown(self.options, path, &format!("_{}", entry.name))?;
        }
        let Some(value) = entry.value else {
            return Ok(Vec::new());
        };
        let items: Vec<&Value> = if many {
            as_array(value, entry.name)?.iter().collect()
        } else {
            vec![value]
        };
        items
            .into_iter()
            .map(|item| {
                let object = as_object(item, entry.name)?;
                if holds_resource(self.catalog, type_code) {
                    Ok(Element::Resource(Box::new(self.resource(object, contained)?)))
                } else {
                    let mut complex = Complex::new(type_code);
                    self.fill(&mut complex, object, path)?;
                    Ok(Element::Complex(complex))
                }
            })
            .collect()
    }

    /// Zip `name` and `_name`; an index is skipped only when both sides are null.
    fn primitives(
        &self,
        type_code: &str,
        entry: &Entry<'_>,
        many: bool,
        path: &str,
    ) -> Result<Vec<Element>> {
        if !many {
            if let Some(value @ Value::Array(_)) = entry.value {
                return Err(wrong_shape(entry.name, "SCALAR", value));
            }
            if entry.value.is_none() && entry.companion.is_none() {
                return Ok(Vec::new());
            }
            let primitive = self.primitive(type_code, entry.value, entry.companion, entry.name, path)?;
            return Ok(vec![Element::Primitive(primitive)]);
        }

        let values: &[Value] = match entry.value {
            Some(value) => as_array(value, entry.name)?,
            None => &[],
        };
        let companion_name = format!("_{}", entry.name);
        let companions: &[Value] = match entry.companion {
            Some(value) => as_array(value, &companion_name)?,
            None => &[],
        };

        let mut out = Vec::with_capacity(values.len().max(companions.len()));
        for index in 0..values.len().max(companions.len()) {
            let value = values.get(index).filter(|v| !v.is_null());
            let companion = companions.get(index).filter(|v| !v.is_null());
            if value.is_none() && companion.is_none() {
                continue;
            }
            let primitive = self.primitive(type_code, value, companion, entry.name, path)?;
            out.push(Element::Primitive(primitive));
        }
        Ok(out)
    }

    fn primitive(
        &self,
        type_code: &str,
        value: Option<&Value>,
        companion: Option<&Value>,
        element: &str,
        path: &str,
    ) -> Result<Primitive> {
        let mut primitive = Primitive::shell(type_code);
        primitive.value = match value {
            None => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Number(number)) => Some(number.to_string()),
            Some(Value::Bool(flag)) => Some(flag.to_string()),
            Some(other) => return Err(wrong_shape(element, "SCALAR", other)),
        };
        if type_code == "xhtml" {
            if let Some(div) = &primitive.value {
                checked_xhtml(div)
                    .map_err(|reason| FormatError::InvalidContent { path: path.to_string(), reason })?;
            }
        }
        if let Some(companion) = companion {
            let object = as_object(companion, &format!("_{element}"))?;
            self.companion(&mut primitive.base, object, path)?;
        }
        Ok(primitive)
    }

    fn companion(&self, base: &mut ElementBase, object: &Map<String, Value>, path: &str) -> Result<()> {
        for (key, value) in object {
            match key.as_str() {
                "id" => base.id = Some(as_string(value, key)?),
                "fhir_comments" => self.comments(base, value)?,
                "extension" | "modifierExtension" => {
                    let modifier = key == "modifierExtension";
                    for item in as_array(value, key)? {
                        base.add_extension(self.extension(item, modifier, path)?);
                    }
                }
                other => skip_unknown(self.options, path, other)?,
            }
        }
        Ok(())
    }

    fn extension(&self, value: &Value, modifier: bool, path: &str) -> Result<Extension> {
        let object = as_object(value, "extension")?;
        let url = object
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| FormatError::InvalidContent {
                path: path.to_string(),
                reason: "extension without a url".to_string(),
            })?;
        let mut extension = if modifier {
            Extension::modifier(url)
        } else {
            Extension::new(url)
        };
        let ext_path = format!("{path}.extension('{url}')");

        for entry in entries(object) {
            match entry.name {
                "url" => {}
                "id" => {
                    if let Some(value) = entry.value {
                        extension.id = Some(as_string(value, "id")?);
                    }
                }
                "fhir_comments" => {
                    if self.options.preserve_comments {
                        if let Some(value) = entry.value {
                            extension.comments.pre.extend(self.comment_texts(value)?);
                        }
                    }
                }
                "extension" => {
                    if let Some(value) = entry.value {
                        for item in as_array(value, "extension")? {
                            extension.add_extension(self.extension(item, false, &ext_path)?);
                        }
                    }
                }
                name => {
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
                        return Err(FormatError::InvalidContent {
                            path: ext_path,
                            reason: "more than one value[x]".to_string(),
                        });
                    }
                    let values =
                        self.values(resolved.type_code, &entry, false, false, &ext_path)?;
                    extension.value = values.into_iter().next().map(Box::new);
                }
            }
        }
        Ok(extension)
    }

    fn comments(&self, base: &mut ElementBase, value: &Value) -> Result<()> {
        if self.options.preserve_comments {
            base.comments.pre.extend(self.comment_texts(value)?);
        }
        Ok(())
    }

    fn comment_texts(&self, value: &Value) -> Result<Vec<String>> {
        as_array(value, "fhir_comments")?
            .iter()
            .map(|item| as_string(item, "fhir_comments"))
            .collect()
    }
}
