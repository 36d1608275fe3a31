//! Catalog construction from StructureDefinition snapshots

use crate::catalog::{CatalogBuilder, StaticCatalog};
use crate::definition::{FieldDefinition, Max, TypeDefinition, TypeKind};
use crate::error::{Error, Result};
use crate::version::FhirVersion;
use ferrum_models::{ElementDefinition, Snapshot, StructureDefinition, StructureDefinitionKind};
use tracing::debug;

/// FHIRPath system types used for the `value` of primitives and element ids.
const SYSTEM_TYPE_PREFIX: &str = "http://hl7.org/fhirpath/System.";

impl StaticCatalog {
    /// Build a catalog from base definitions (derivation `specialization`).
    ///
    /// Constraining profiles are skipped; logical models are ignored.
    pub fn from_structure_definitions(
        version: FhirVersion,
        definitions: &[StructureDefinition],
    ) -> Result<Self> {
        let mut builder = CatalogBuilder::new(version);
        for sd in definitions {
            add_structure_definition(&mut builder, sd)?;
        }
        Ok(builder.build())
    }
}

impl CatalogBuilder {
    /// Add the types described by one StructureDefinition.
    pub fn structure_definition(&mut self, sd: &StructureDefinition) -> Result<&mut Self> {
        add_structure_definition(self, sd)?;
        Ok(self)
    }
}

fn add_structure_definition(builder: &mut CatalogBuilder, sd: &StructureDefinition) -> Result<()> {
    if sd.is_constraint() {
        debug!(url = %sd.url, "Skipping constraining StructureDefinition");
        return Ok(());
    }
    let kind = match sd.kind {
        StructureDefinitionKind::PrimitiveType => {
            builder.primitive(&sd.type_);
            return Ok(());
        }
        StructureDefinitionKind::ComplexType => TypeKind::Complex,
        StructureDefinitionKind::Resource => TypeKind::Resource,
        StructureDefinitionKind::Logical => {
            debug!(url = %sd.url, "Skipping logical model");
            return Ok(());
        }
    };
    let snapshot = sd
        .snapshot
        .as_ref()
        .ok_or_else(|| Error::MissingSnapshot(sd.url.clone()))?;
    if snapshot.get_element(&sd.type_).is_none() {
        return Err(Error::InvalidStructureDefinition(format!(
            "{}: snapshot has no root element '{}'",
            sd.url, sd.type_
        )));
    }
    add_type(builder, snapshot, &sd.type_, kind);
    Ok(())
}

fn add_type(builder: &mut CatalogBuilder, snapshot: &Snapshot, path: &str, kind: TypeKind) {
    let mut fields = Vec::new();
    for element in snapshot.get_children(path) {
        if element.max.as_deref() == Some("0") {
            continue;
        }
        let field = field_from_element(element, path);
        if has_children(snapshot, &element.path) {
            add_type(builder, snapshot, &element.path, TypeKind::Backbone);
        }
        fields.push(field);
    }
    builder.insert(TypeDefinition {
        name: path.to_string(),
        kind,
        json: None,
        fields,
    });
}

fn has_children(snapshot: &Snapshot, path: &str) -> bool {
    !snapshot.get_children(path).is_empty()
}

fn field_from_element(element: &ElementDefinition, parent_path: &str) -> FieldDefinition {
    let name = element.field_name().to_string();
    let max = if element.is_array() { Max::Many } else { Max::One };

    let types: Vec<String> = if let Some(reference) = &element.content_reference {
        vec![reference.trim_start_matches('#').to_string()]
    } else {
        element
            .type_codes()
            .into_iter()
            .map(|code| match code.as_str() {
                "BackboneElement" | "Element" => element.path.clone(),
                _ => normalize_type_code(&code),
            })
            .collect()
    };

    let mut field = if element.is_choice_type() {
        let refs: Vec<&str> = types.iter().map(String::as_str).collect();
        FieldDefinition::choice(name, &refs)
    } else {
        let type_code = types
            .into_iter()
            .next()
            .unwrap_or_else(|| format!("{parent_path}.{name}"));
        FieldDefinition::new(name, type_code, max)
    };
    field.min = element.min.unwrap_or(0);
    field.is_summary = element.is_summary.unwrap_or(false);
    field.is_modifier = element.is_modifier.unwrap_or(false);
    field
}

fn normalize_type_code(code: &str) -> String {
    match code.strip_prefix(SYSTEM_TYPE_PREFIX) {
        Some(system) => system.to_ascii_lowercase(),
        None => code.to_string(),
    }
}
