//! Type and field definitions
//!
//! A [`TypeDefinition`] lists the fields of a type in declared order. That
//! order is the only field order encoders ever use.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Primitive,
    Complex,
    Resource,
    /// Anonymous nested structure, keyed by its element path (`Bundle.entry`)
    Backbone,
}

/// How a primitive's lexical value is written in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonRepr {
    String,
    Number,
    Boolean,
}

impl JsonRepr {
    /// Representation of a core primitive type code.
    pub fn for_primitive(type_code: &str) -> Self {
        match type_code {
            "boolean" => JsonRepr::Boolean,
            "integer" | "unsignedInt" | "positiveInt" | "decimal" | "integer64" => JsonRepr::Number,
            _ => JsonRepr::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Max {
    One,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// The `id` of a non-resource element, held in the element base
    ElementId,
    /// `extension` or `modifierExtension`
    Extension,
    Primitive,
    Complex,
    Resource,
    /// Polymorphic `name[x]` field
    Choice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Field name; for choice fields the prefix without `[x]`
    pub name: String,
    pub min: u32,
    pub max: Max,
    pub kind: FieldKind,
    /// Type codes; for choice fields the allowed concrete suffixes
    pub types: Vec<String>,
    pub is_summary: bool,
    pub is_modifier: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, type_code: impl Into<String>, max: Max) -> Self {
        Self {
            name: name.into(),
            min: 0,
            max,
            kind: FieldKind::Complex,
            types: vec![type_code.into()],
            is_summary: false,
            is_modifier: false,
        }
    }

    pub fn choice(name: impl Into<String>, types: &[&str]) -> Self {
        Self {
            name: name.into(),
            min: 0,
            max: Max::One,
            kind: FieldKind::Choice,
            types: types.iter().map(|t| t.to_string()).collect(),
            is_summary: false,
            is_modifier: false,
        }
    }

    pub fn summary(&mut self) -> &mut Self {
        self.is_summary = true;
        self
    }

    /// Modifier elements are always summary elements.
    pub fn modifier(&mut self) -> &mut Self {
        self.is_modifier = true;
        self.is_summary = true;
        self
    }

    pub fn required(&mut self) -> &mut Self {
        self.min = 1;
        self
    }

    pub fn is_array(&self) -> bool {
        self.max == Max::Many
    }

    pub fn is_choice(&self) -> bool {
        self.kind == FieldKind::Choice
    }

    /// The single declared type of a non-choice field.
    pub fn type_code(&self) -> &str {
        self.types.first().map(String::as_str).unwrap_or_default()
    }

    pub fn allows_type(&self, type_code: &str) -> bool {
        self.types.iter().any(|t| t == type_code)
    }

    /// Document name of a field holding a value of `type_code`.
    ///
    /// `value` + `Quantity` gives `valueQuantity`; non-choice fields keep their name.
    pub fn document_name(&self, type_code: &str) -> String {
        if self.is_choice() {
            format!("{}{}", self.name, capitalize(type_code))
        } else {
            self.name.clone()
        }
    }

    /// Concrete type named by a choice suffix (`Quantity` in `valueQuantity`).
    pub fn type_for_suffix(&self, suffix: &str) -> Option<&str> {
        self.types
            .iter()
            .find(|t| capitalize(t) == suffix)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    /// Only set for primitives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<JsonRepr>,
    pub fields: Vec<FieldDefinition>,
}

impl TypeDefinition {
    pub fn primitive(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            json: Some(JsonRepr::for_primitive(&name)),
            name,
            kind: TypeKind::Primitive,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_resource(&self) -> bool {
        self.kind == TypeKind::Resource
    }

    pub fn json_repr(&self) -> JsonRepr {
        self.json.unwrap_or(JsonRepr::String)
    }
}

/// Upper-case the first character (`dateTime` -> `DateTime`).
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
