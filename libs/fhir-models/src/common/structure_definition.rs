//! FHIR StructureDefinition model
//!
//! Only what is needed to turn a core or profile definition into a field
//! layout. Other content is skipped when deserializing.

use super::element_definition::{Differential, Snapshot};
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub url: String,

    pub name: String,

    pub kind: StructureDefinitionKind,

    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,

    /// Type defined or constrained by this structure
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<TypeDerivationRule>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub differential: Option<Differential>,

}

fn default_resource_type() -> String {
    "StructureDefinition".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureDefinitionKind {
    PrimitiveType,
    ComplexType,
    Resource,
    Logical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDerivationRule {
    Specialization,
    Constraint,
}

impl StructureDefinition {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    pub fn is_constraint(&self) -> bool {
        self.derivation == Some(TypeDerivationRule::Constraint)
    }
}
