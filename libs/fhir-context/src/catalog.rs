//! Definition catalog
//!
//! The catalog is the codec's only source of schema knowledge: which fields a
//! type has, in which order, with what cardinality and which concrete types a
//! choice field admits. Catalogs are immutable once built and safe to share
//! across threads.

use crate::builtin;
use crate::definition::{FieldDefinition, FieldKind, Max, TypeDefinition, TypeKind};
use crate::version::FhirVersion;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// A field matched from its document name.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedField<'a> {
    pub field: &'a FieldDefinition,
    /// Concrete type of the value (the suffix type for choice fields)
    pub type_code: &'a str,
}

/// Read-only access to type layouts.
pub trait DefinitionCatalog: Send + Sync {
    fn version(&self) -> FhirVersion;

    fn type_definition(&self, name: &str) -> Option<&TypeDefinition>;

    /// Fields of a type in declared order; empty for unknown types.
    fn fields_of(&self, name: &str) -> &[FieldDefinition] {
        self.type_definition(name)
            .map(|t| t.fields.as_slice())
            .unwrap_or(&[])
    }

    fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.type_definition(type_name)
            .and_then(|t| t.field(field_name))
    }

    /// Match a document field name (`gender`, `valueQuantity`) against a type's fields.
    fn resolve_field<'a>(
        &'a self,
        type_name: &str,
        document_name: &str,
    ) -> Option<ResolvedField<'a>> {
        let fields = self.fields_of(type_name);
        if let Some(field) = fields
            .iter()
            .find(|f| !f.is_choice() && f.name == document_name)
        {
            return Some(ResolvedField {
                field,
                type_code: field.type_code(),
            });
        }
        fields.iter().filter(|f| f.is_choice()).find_map(|field| {
            document_name
                .strip_prefix(field.name.as_str())
                .filter(|suffix| !suffix.is_empty())
                .and_then(|suffix| field.type_for_suffix(suffix))
                .map(|type_code| ResolvedField { field, type_code })
        })
    }

    fn is_resource(&self, name: &str) -> bool {
        self.type_definition(name)
            .is_some_and(TypeDefinition::is_resource)
    }

    fn is_primitive(&self, name: &str) -> bool {
        self.type_definition(name)
            .is_some_and(|t| t.kind == TypeKind::Primitive)
    }

    /// System and code of the marker tag for incomplete output.
    fn subsetted_tag(&self) -> (&'static str, &'static str) {
        (self.version().subsetted_system(), "SUBSETTED")
    }
}

/// Catalog backed by an in-memory map of type definitions.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    version: FhirVersion,
    types: HashMap<String, TypeDefinition>,
}

impl StaticCatalog {
    pub fn builder(version: FhirVersion) -> CatalogBuilder {
        CatalogBuilder::new(version)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl DefinitionCatalog for StaticCatalog {
    fn version(&self) -> FhirVersion {
        self.version
    }

    fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }
}

/// Process-wide core catalog for `version`, built on first access.
pub fn core_catalog(version: FhirVersion) -> &'static StaticCatalog {
    static STU3: OnceLock<StaticCatalog> = OnceLock::new();
    static R4: OnceLock<StaticCatalog> = OnceLock::new();

    let cell = match version {
        FhirVersion::Stu3 => &STU3,
        FhirVersion::R4 => &R4,
    };
    cell.get_or_init(|| {
        let catalog = builtin::core(version);
        debug!(%version, types = catalog.len(), "Built core definition catalog");
        catalog
    })
}

/// Accumulates type definitions, then classifies every field against the
/// final set of types.
#[derive(Debug)]
pub struct CatalogBuilder {
    version: FhirVersion,
    types: HashMap<String, TypeDefinition>,
}

impl CatalogBuilder {
    pub fn new(version: FhirVersion) -> Self {
        Self {
            version,
            types: HashMap::new(),
        }
    }

    pub fn version(&self) -> FhirVersion {
        self.version
    }

    /// Add or replace a type.
    pub fn insert(&mut self, definition: TypeDefinition) -> &mut Self {
        self.types.insert(definition.name.clone(), definition);
        self
    }

    pub fn primitive(&mut self, name: &str) -> &mut Self {
        self.insert(TypeDefinition::primitive(name))
    }

    /// A datatype; `id` and `extension` come first.
    pub fn complex(&mut self, name: &str, body: impl FnOnce(&mut TypeBuilder<'_>)) -> &mut Self {
        let mut builder = TypeBuilder::new(self, name);
        builder.element_header(false);
        body(&mut builder);
        builder.finish(TypeKind::Complex);
        self
    }

    /// A resource with the base `Resource` fields.
    pub fn resource(&mut self, name: &str, body: impl FnOnce(&mut TypeBuilder<'_>)) -> &mut Self {
        self.resource_type(name, false, body)
    }

    /// A resource with the `DomainResource` fields (narrative, contained, extensions).
    pub fn domain_resource(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut TypeBuilder<'_>),
    ) -> &mut Self {
        self.resource_type(name, true, body)
    }

    fn resource_type(
        &mut self,
        name: &str,
        domain: bool,
        body: impl FnOnce(&mut TypeBuilder<'_>),
    ) -> &mut Self {
        let mut builder = TypeBuilder::new(self, name);
        builder.one("id", "id").summary();
        builder.one("meta", "Meta").summary();
        builder.one("implicitRules", "uri").modifier();
        builder.one("language", "code");
        if domain {
            builder.one("text", "Narrative");
            builder.many("contained", "Resource");
            builder.many("extension", "Extension");
            builder.many("modifierExtension", "Extension").modifier();
        }
        body(&mut builder);
        builder.finish(TypeKind::Resource);
        self
    }

    /// Resolve field kinds and produce the catalog.
    pub fn build(self) -> StaticCatalog {
        let kinds: HashMap<String, TypeKind> = self
            .types
            .iter()
            .map(|(name, def)| (name.clone(), def.kind))
            .collect();

        let mut types = self.types;
        for def in types.values_mut() {
            let owner_kind = def.kind;
            for field in &mut def.fields {
                field.kind = classify(field, owner_kind, &kinds);
            }
        }
        StaticCatalog {
            version: self.version,
            types,
        }
    }
}

fn classify(
    field: &FieldDefinition,
    owner_kind: TypeKind,
    kinds: &HashMap<String, TypeKind>,
) -> FieldKind {
    if field.kind == FieldKind::Choice {
        return FieldKind::Choice;
    }
    let type_code = field.type_code();
    if field.name == "id" && owner_kind != TypeKind::Resource {
        return FieldKind::ElementId;
    }
    if type_code == "Extension" && (field.name == "extension" || field.name == "modifierExtension")
    {
        return FieldKind::Extension;
    }
    if type_code == "Resource" {
        return FieldKind::Resource;
    }
    match kinds.get(type_code) {
        Some(TypeKind::Primitive) => FieldKind::Primitive,
        Some(TypeKind::Resource) => FieldKind::Resource,
        Some(TypeKind::Complex | TypeKind::Backbone) => FieldKind::Complex,
        None => {
            debug!(field = %field.name, %type_code, "Field type is not in the catalog");
            FieldKind::Complex
        }
    }
}

/// Collects the fields of one type. Nested backbone types are registered
/// under `Parent.field`.
pub struct TypeBuilder<'c> {
    catalog: &'c mut CatalogBuilder,
    path: String,
    fields: Vec<FieldDefinition>,
}

impl<'c> TypeBuilder<'c> {
    fn new(catalog: &'c mut CatalogBuilder, path: &str) -> Self {
        Self {
            catalog,
            path: path.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn version(&self) -> FhirVersion {
        self.catalog.version
    }

    fn element_header(&mut self, backbone: bool) {
        self.one("id", "string");
        self.many("extension", "Extension");
        if backbone {
            self.many("modifierExtension", "Extension").modifier();
        }
    }

    fn push(&mut self, field: FieldDefinition) -> &mut FieldDefinition {
        self.fields.push(field);
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    pub fn one(&mut self, name: &str, type_code: &str) -> &mut FieldDefinition {
        self.push(FieldDefinition::new(name, type_code, Max::One))
    }

    pub fn many(&mut self, name: &str, type_code: &str) -> &mut FieldDefinition {
        self.push(FieldDefinition::new(name, type_code, Max::Many))
    }

    pub fn choice(&mut self, name: &str, types: &[&str]) -> &mut FieldDefinition {
        self.push(FieldDefinition::choice(name, types))
    }

    /// A nested backbone element; its type is named by its path.
    pub fn backbone(
        &mut self,
        name: &str,
        max: Max,
        body: impl FnOnce(&mut TypeBuilder<'_>),
    ) -> &mut FieldDefinition {
        let path = format!("{}.{}", self.path, name);
        {
            let mut nested = TypeBuilder::new(self.catalog, &path);
            nested.element_header(true);
            body(&mut nested);
            nested.finish(TypeKind::Backbone);
        }
        self.push(FieldDefinition::new(name, path, max))
    }

    fn finish(self, kind: TypeKind) {
        self.catalog.insert(TypeDefinition {
            name: self.path,
            kind,
            json: None,
            fields: self.fields,
        });
    }
}
