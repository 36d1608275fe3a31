use crate::error::EncodingError;
use crate::schema::{
    checked_definition, choice_value, extension_value_field, field_values, holds_resource,
};
use ferrum_context::{DefinitionCatalog, FieldKind, JsonRepr, TypeDefinition};
use ferrum_models::{Complex, Element, ElementBase, Extension, FormatComments, Primitive, Resource};
use serde_json::{Map, Number, Value};
use std::slice;

type Result<T> = std::result::Result<T, EncodingError>;

pub(crate) struct JsonEncoder<'c> {
    catalog: &'c dyn DefinitionCatalog,
    preserve_comments: bool,
}

impl<'c> JsonEncoder<'c> {
    pub(crate) fn new(catalog: &'c dyn DefinitionCatalog, preserve_comments: bool) -> Self {
        Self {
            catalog,
            preserve_comments,
        }
    }

    pub(crate) fn resource(&self, resource: &Resource) -> Result<Value> {
        let resource_type = resource.resource_type();
        let root = resource.as_complex();
        let mut object = Map::new();
        self.comments(&mut object, &root.base.comments);
        object.insert(
            "resourceType".to_string(),
            Value::String(resource_type.to_string()),
        );
        self.fields(&mut object, root, resource_type, resource_type)?;
        Ok(Value::Object(object))
    }

    fn complex(&self, node: &Complex, type_name: &str, path: &str) -> Result<Value> {
        let mut object = Map::new();
        self.comments(&mut object, &node.base.comments);
        self.fields(&mut object, node, type_name, path)?;
        Ok(Value::Object(object))
    }

    fn fields(
        &self,
        object: &mut Map<String, Value>,
        node: &Complex,
        type_name: &str,
        path: &str,
    ) -> Result<()> {
        let definition: &TypeDefinition = checked_definition(self.catalog, type_name, node)?;
        for field in &definition.fields {
            let values = node.get_all(&field.name);
            match field.kind {
                FieldKind::ElementId => {
                    if let Some(id) = &node.base.id {
                        object.insert(field.name.clone(), Value::String(id.clone()));
                    }
                }
                FieldKind::Extension => {
                    let extensions = if field.name == "modifierExtension" {
                        &node.base.modifier_extension
                    } else {
                        &node.base.extension
                    };
                    self.extension_list(object, &field.name, extensions, path)?;
                }
                FieldKind::Choice => {
                    if let Some((value, type_code)) = choice_value(field, values, path)? {
                        let name = field.document_name(type_code);
                        self.values(object, &name, type_code, slice::from_ref(value), false, path)?;
                    }
                }
                _ => {
                    let values = field_values(field, values, path)?;
                    if !values.is_empty() {
                        self.values(
                            object,
                            &field.name,
                            field.type_code(),
                            values,
                            field.is_array(),
                            path,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn values(
        &self,
        object: &mut Map<String, Value>,
        name: &str,
        type_code: &str,
        values: &[Element],
        many: bool,
        path: &str,
    ) -> Result<()> {
        let child_path = format!("{path}.{name}");
        if self.catalog.is_primitive(type_code) {
            return self.primitives(object, name, type_code, values, many, &child_path);
        }

        let mut encoded = Vec::with_capacity(values.len());
        for value in values {
            encoded.push(match value {
                Element::Complex(complex) => self.complex(complex, type_code, &child_path)?,
                Element::Resource(resource) if holds_resource(self.catalog, type_code) => {
                    self.resource(resource)?
                }
                _ => {
                    return Err(EncodingError::UnexpectedNode {
                        path: child_path,
                        expected: if holds_resource(self.catalog, type_code) {
                            "resource"
                        } else {
                            "complex"
                        },
                    })
                }
            });
        }
        let value = if many {
            Value::Array(encoded)
        } else {
            encoded.into_iter().next().unwrap_or(Value::Null)
        };
        object.insert(name.to_string(), value);
        Ok(())
    }

    /// Values go under `name`, metadata under `_name`. Arrays stay aligned
    /// through `null` entries; an array holding only `null` is left out.
    fn primitives(
        &self,
        object: &mut Map<String, Value>,
        name: &str,
        type_code: &str,
        values: &[Element],
        many: bool,
        path: &str,
    ) -> Result<()> {
        let repr = self
            .catalog
            .type_definition(type_code)
            .map(TypeDefinition::json_repr)
            .unwrap_or(JsonRepr::String);

        let mut lexical = Vec::with_capacity(values.len());
        let mut companions = Vec::with_capacity(values.len());
        for value in values {
            let primitive = value
                .as_primitive()
                .ok_or_else(|| EncodingError::UnexpectedNode {
                    path: path.to_string(),
                    expected: "primitive",
                })?;
            lexical.push(primitive_value(primitive, repr, path)?);
            companions.push(self.companion(&primitive.base)?);
        }

        let companion_name = format!("_{name}");
        if many {
            if lexical.iter().any(|v| !v.is_null()) {
                object.insert(name.to_string(), Value::Array(lexical));
            }
            if companions.iter().any(|v| !v.is_null()) {
                object.insert(companion_name, Value::Array(companions));
            }
        } else {
            if let Some(value) = lexical.into_iter().next().filter(|v| !v.is_null()) {
                object.insert(name.to_string(), value);
            }
            if let Some(companion) = companions.into_iter().next().filter(|v| !v.is_null()) {
                object.insert(companion_name, companion);
            }
        }
        Ok(())
    }

    /// The `_name` object of a primitive, or `null` when it carries nothing.
    fn companion(&self, base: &ElementBase) -> Result<Value> {
        let mut object = Map::new();
        self.comments(&mut object, &base.comments);
        if let Some(id) = &base.id {
            object.insert("id".to_string(), Value::String(id.clone()));
        }
        self.extension_list(&mut object, "extension", &base.extension, "")?;
        self.extension_list(&mut object, "modifierExtension", &base.modifier_extension, "")?;
        Ok(if object.is_empty() {
            Value::Null
        } else {
            Value::Object(object)
        })
    }

    fn extension_list(
        &self,
        object: &mut Map<String, Value>,
        name: &str,
        extensions: &[Extension],
        path: &str,
    ) -> Result<()> {
        if extensions.is_empty() {
            return Ok(());
        }
        let encoded = extensions
            .iter()
            .map(|extension| self.extension(extension, path))
            .collect::<Result<Vec<_>>>()?;
        object.insert(name.to_string(), Value::Array(encoded));
        Ok(())
    }

    fn extension(&self, extension: &Extension, path: &str) -> Result<Value> {
        if extension.value.is_some() && !extension.extension.is_empty() {
            return Err(EncodingError::ExtensionValueAndChildren {
                url: extension.url.clone(),
            });
        }
        let mut object = Map::new();
        self.comments(&mut object, &extension.comments);
        if let Some(id) = &extension.id {
            object.insert("id".to_string(), Value::String(id.clone()));
        }
        object.insert("url".to_string(), Value::String(extension.url.clone()));
        self.extension_list(&mut object, "extension", &extension.extension, path)?;

        if let Some(value) = extension.value() {
            let field = extension_value_field(self.catalog)?;
            if let Some((value, type_code)) =
                choice_value(field, slice::from_ref(value), "Extension")?
            {
                let name = field.document_name(type_code);
                self.values(&mut object, &name, type_code, slice::from_ref(value), false, "Extension")?;
            }
        }
        Ok(Value::Object(object))
    }

    /// Pre and post comments both land in `fhir_comments`.
    fn comments(&self, object: &mut Map<String, Value>, comments: &FormatComments) {
        if !self.preserve_comments || comments.is_empty() {
            return;
        }
        let all = comments
            .pre
            .iter()
            .chain(comments.post.iter())
            .map(|text| Value::String(text.clone()))
            .collect();
        object.insert("fhir_comments".to_string(), Value::Array(all));
    }
}

fn primitive_value(primitive: &Primitive, repr: JsonRepr, path: &str) -> Result<Value> {
    let Some(text) = primitive.as_str().filter(|text| !text.is_empty()) else {
        return Ok(Value::Null);
    };
    let invalid = |repr: &'static str| EncodingError::InvalidPrimitive {
        path: path.to_string(),
        value: text.to_string(),
        repr,
    };
    match repr {
        JsonRepr::Boolean => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("boolean")),
        },
        // Parsing into a Number keeps the lexical form (`1.10` stays `1.10`).
        JsonRepr::Number => serde_json::from_str::<Number>(text.trim())
            .map(Value::Number)
            .map_err(|_| invalid("number")),
        JsonRepr::String => Ok(Value::String(text.to_string())),
    }
}
