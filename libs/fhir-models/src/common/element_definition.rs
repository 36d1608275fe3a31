//! FHIR ElementDefinition model
//!
//! The subset of ElementDefinition a definition catalog needs to derive field
//! layouts: path, cardinality, types, summary/modifier flags and
//! representation. Other content is skipped when deserializing.

use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// FHIR ElementDefinition - defines an element in a resource or data type structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    /// Unique id for inter-element referencing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Path of the element in the hierarchy (e.g., "Patient.name")
    pub path: String,

    /// Codes that define how this element is represented
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representation: Option<Vec<PropertyRepresentation>>,

    /// Name for this particular element (in a slice)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,

    /// Maximum cardinality (can be "*")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    /// Reference to definition of content if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_reference: Option<String>,

    /// Data type and profile for this element
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<ElementDefinitionType>>,

    /// If this modifies the meaning of other elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_modifier: Option<bool>,

    /// Include when in summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_summary: Option<bool>,

}

/// How a property is represented when serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyRepresentation {
    XmlAttr,
    XmlText,
    TypeAttr,
    CdaText,
    Xhtml,
}

/// Data type for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionType {
    /// Data type code
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<Vec<String>>,
}

impl ElementDefinitionType {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            profile: None,
            target_profile: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub element: Vec<ElementDefinition>,
}

/// Differential - a set of elements that define changes from the base
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Differential {
    pub element: Vec<ElementDefinition>,
}

impl Snapshot {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Get an element by path
    pub fn get_element(&self, path: &str) -> Option<&ElementDefinition> {
        self.element.iter().find(|e| e.path == path)
    }

    /// Get all direct children of a path, sliced elements excluded
    pub fn get_children(&self, parent_path: &str) -> Vec<&ElementDefinition> {
        let expected_depth = parent_path.matches('.').count() + 1;
        self.element
            .iter()
            .filter(|e| {
                !e.is_slice()
                    && e.is_descendant_of(parent_path)
                    && e.path.matches('.').count() == expected_depth
            })
            .collect()
    }
}

impl ElementDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Check if this element has a slice name
    pub fn is_slice(&self) -> bool {
        self.slice_name.is_some()
    }

    /// Last path segment with any `[x]` suffix removed
    pub fn field_name(&self) -> &str {
        let last = self.path.rsplit('.').next().unwrap_or(&self.path);
        last.strip_suffix("[x]").unwrap_or(last)
    }

    /// Get the parent path (everything before the last '.')
    pub fn parent_path(&self) -> Option<String> {
        self.path.rfind('.').map(|pos| self.path[..pos].to_string())
    }

    /// Check if this element is a descendant of the given path
    pub fn is_descendant_of(&self, parent_path: &str) -> bool {
        self.path.starts_with(parent_path)
            && self.path.len() > parent_path.len()
            && self.path.as_bytes().get(parent_path.len()) == Some(&b'.')
    }

    /// Check if this is a choice type element (ends with [x])
    pub fn is_choice_type(&self) -> bool {
        self.path.ends_with("[x]")
    }

    /// Get type codes for this element
    pub fn type_codes(&self) -> Vec<String> {
        self.types
            .as_ref()
            .map(|types| types.iter().map(|t| t.code.clone()).collect())
            .unwrap_or_default()
    }

    /// Check if element is array/list (max = "*" or max > 1)
    pub fn is_array(&self) -> bool {
        self.max
            .as_ref()
            .map(|m| m == "*" || m.parse::<u32>().map(|n| n > 1).unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn has_representation(&self, representation: &PropertyRepresentation) -> bool {
        self.representation
            .as_ref()
            .is_some_and(|reps| reps.contains(representation))
    }
}
