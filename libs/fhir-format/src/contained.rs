//! Contained-resource id assignment and reference linking
//!
//! References in the tree point at other resources either by URL or by an
//! in-memory [`ReferenceTarget`]. Before encoding, inline targets without an
//! external id are moved into the owner's `contained` list under a local id
//! (`1`, `2`, ... in depth-first encounter order) and the reference becomes
//! `#id`. After decoding, `#id` references are linked back to the contained
//! resource by id.

use ferrum_context::{DefinitionCatalog, FieldKind};
use ferrum_models::{
    Complex, Element, Extension, Primitive, ReferenceTarget, Resource, ResourceId,
};
use std::collections::{HashSet, VecDeque};
use tracing::{trace, warn};

/// Move inline reference targets into `contained` and give every contained
/// resource a local id.
///
/// Fields are walked in catalog order, so ids follow document order.
/// Applying it twice changes nothing. Nested resources outside `contained`
/// (bundle entries, parameters) are handled as containers of their own.
pub fn assign_contained_ids(resource: &mut Resource, catalog: &dyn DefinitionCatalog) {
    let existing = resource.remove("contained");
    let mut assigner = IdAssigner::new(&existing, catalog);
    assigner.pending.extend(existing);

    assigner.visit_complex(resource.as_complex_mut());

    let mut contained = Vec::new();
    while let Some(mut item) = assigner.pending.pop_front() {
        if let Element::Resource(inner) = &mut item {
            if inner.id().is_none() {
                let id = assigner.next_id();
                trace!(resource_type = inner.resource_type(), %id, "Assigned contained id");
                inner.set_id(id);
            } else if let Some(local) = inner.id().and_then(|id| id.strip_prefix('#')) {
                let local = local.to_string();
                inner.set_id(local);
            }
            assigner.visit_complex(inner.as_complex_mut());
        }
        contained.push(item);
    }
    if !contained.is_empty() {
        *resource.values_mut("contained") = contained;
    }
}

struct IdAssigner<'c> {
    catalog: &'c dyn DefinitionCatalog,
    used: HashSet<String>,
    next: usize,
    pending: VecDeque<Element>,
}

impl<'c> IdAssigner<'c> {
    fn new(existing: &[Element], catalog: &'c dyn DefinitionCatalog) -> Self {
        let used = existing
            .iter()
            .filter_map(Element::as_resource)
            .filter_map(Resource::id)
            .map(|id| id.trim_start_matches('#').to_string())
            .collect();
        Self {
            catalog,
            used,
            next: 1,
            pending: VecDeque::new(),
        }
    }

    fn next_id(&mut self) -> String {
        loop {
            let candidate = self.next.to_string();
            self.next += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    fn visit(&mut self, element: &mut Element) {
        match element {
            Element::Primitive(primitive) => {
                self.visit_extensions(&mut primitive.base.extension);
                self.visit_extensions(&mut primitive.base.modifier_extension);
            }
            Element::Complex(complex) => self.visit_complex(complex),
            Element::Resource(resource) => assign_contained_ids(resource, self.catalog),
        }
    }

    fn visit_complex(&mut self, complex: &mut Complex) {
        if let Some(target) = complex.reference_target.take() {
            complex.reference_target = self.resolve(target, complex);
        }
        let catalog = self.catalog;
        let type_name = complex.type_name.clone();
        let mut seen = HashSet::new();
        for field in catalog.fields_of(&type_name) {
            seen.insert(field.name.as_str());
            match (field.kind, field.name.as_str()) {
                (FieldKind::Extension, "modifierExtension") => {
                    self.visit_extensions(&mut complex.base.modifier_extension)
                }
                (FieldKind::Extension, _) => self.visit_extensions(&mut complex.base.extension),
                _ => {
                    if let Some(values) = complex.field_mut(&field.name) {
                        for value in values.iter_mut() {
                            self.visit(value);
                        }
                    }
                }
            }
        }
        // Fields the catalog does not know are rejected by the encoder later.
        for (name, values) in complex.fields_mut() {
            if !seen.contains(name) {
                for value in values.iter_mut() {
                    self.visit(value);
                }
            }
        }
    }

    fn visit_extensions(&mut self, extensions: &mut [Extension]) {
        for extension in extensions {
            if let Some(value) = extension.value.as_deref_mut() {
                self.visit(value);
            }
            self.visit_extensions(&mut extension.extension);
        }
    }

    fn resolve(&mut self, target: ReferenceTarget, reference: &mut Complex) -> Option<ReferenceTarget> {
        match target {
            ReferenceTarget::Contained(id) => {
                let id = id.trim_start_matches('#').to_string();
                if reference.reference_url().is_none() {
                    reference.set("reference", Primitive::string(format!("#{id}")));
                }
                Some(ReferenceTarget::Contained(id))
            }
            ReferenceTarget::Inline(mut inline) => {
                let local = match inline.id() {
                    Some(id) if !id.starts_with('#') => {
                        // Externally identified targets are referenced, never contained.
                        if reference.reference_url().is_none() {
                            reference.set("reference", Primitive::string(id));
                        }
                        return None;
                    }
                    Some(id) => Some(id.trim_start_matches('#').to_string()),
                    None => None,
                };
                let id = match local {
                    Some(id) if self.used.contains(&id) => id,
                    Some(id) => {
                        self.used.insert(id.clone());
                        inline.set_id(id.clone());
                        self.pending.push_back(Element::Resource(inline));
                        id
                    }
                    None => {
                        let id = self.next_id();
                        inline.set_id(id.clone());
                        self.pending.push_back(Element::Resource(inline));
                        id
                    }
                };
                trace!(%id, "Contained inline reference target");
                reference.set("reference", Primitive::string(format!("#{id}")));
                Some(ReferenceTarget::Contained(id))
            }
        }
    }
}

/// Link `#id` references to the resource's contained resources.
///
/// Unresolvable local references are left as plain URLs.
pub fn link_references(resource: &mut Resource) {
    let ids: HashSet<String> = resource
        .contained()
        .filter_map(Resource::id)
        .map(|id| id.trim_start_matches('#').to_string())
        .collect();

    for (name, values) in resource.fields_mut() {
        for value in values.iter_mut() {
            match value {
                Element::Resource(contained) if name == "contained" => {
                    link_in_complex(contained.as_complex_mut(), &ids)
                }
                other => link_in_element(other, &ids),
            }
        }
    }
    let root = resource.as_complex_mut();
    link_in_extensions(&mut root.base.extension, &ids);
    link_in_extensions(&mut root.base.modifier_extension, &ids);
}

/// Give bundle entry resources their `urn:` full URL as id.
///
/// Applies when the entry's `fullUrl` is a `urn:uuid:`/`urn:oid:` URL and the
/// resource has no id or an id equal to the URL's tail, so that references to
/// the full URL resolve against the resource.
pub fn adopt_full_urls(bundle: &mut Resource) {
    let Some(entries) = bundle.field_mut("entry") else {
        return;
    };
    for entry in entries.iter_mut().filter_map(Element::as_complex_mut) {
        let Some(full_url) = entry.primitive_value("fullUrl").map(str::to_string) else {
            continue;
        };
        if !ResourceId::parse(&full_url).is_urn() {
            continue;
        }
        let Some(Element::Resource(resource)) = entry.get_mut("resource") else {
            continue;
        };
        let tail = full_url.rsplit(':').next().unwrap_or_default();
        let matches = resource.id().is_none_or(|id| id == tail);
        if !matches {
            continue;
        }
        match resource.get_mut("id") {
            Some(Element::Primitive(id)) => id.value = Some(full_url),
            _ => resource.set_id(full_url),
        }
    }
}

fn link_in_complex(complex: &mut Complex, ids: &HashSet<String>) {
    if complex.reference_target.is_none() {
        if let Some(local) = complex.local_reference_id().map(str::to_string) {
            if ids.contains(&local) {
                trace!(id = %local, "Linked reference to contained resource");
                complex.reference_target = Some(ReferenceTarget::Contained(local));
            } else {
                warn!(reference = %local, "Local reference does not match a contained resource");
            }
        }
    }
    for (_, values) in complex.fields_mut() {
        for value in values.iter_mut() {
            link_in_element(value, ids);
        }
    }
    link_in_extensions(&mut complex.base.extension, ids);
    link_in_extensions(&mut complex.base.modifier_extension, ids);
}

/// Nested resources link against their own contained lists.
fn link_in_element(element: &mut Element, ids: &HashSet<String>) {
    match element {
        Element::Complex(complex) => link_in_complex(complex, ids),
        Element::Primitive(primitive) => {
            link_in_extensions(&mut primitive.base.extension, ids);
            link_in_extensions(&mut primitive.base.modifier_extension, ids);
        }
        Element::Resource(_) => {}
    }
}

fn link_in_extensions(extensions: &mut [Extension], ids: &HashSet<String>) {
    for extension in extensions {
        if let Some(value) = extension.value.as_deref_mut() {
            link_in_element(value, ids);
        }
        link_in_extensions(&mut extension.extension, ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrum_context::{core_catalog, FhirVersion};

    fn organization(name: &str) -> Resource {
        let mut org = Resource::new("Organization");
        org.set("name", Primitive::string(name));
        org
    }

    fn assign(resource: &mut Resource) {
        assign_contained_ids(resource, core_catalog(FhirVersion::R4));
    }

    fn reference_url<'a>(resource: &'a Resource, field: &str) -> Option<&'a str> {
        resource
            .get(field)
            .and_then(Element::as_complex)
            .and_then(Complex::reference_url)
    }

    #[test]
    fn inline_targets_get_ids_in_document_order() {
        let mut patient = Resource::new("Patient");
        patient.set("managingOrganization", Complex::reference_to(organization("A")));
        patient.add("generalPractitioner", Complex::reference_to(organization("B")));

        assign(&mut patient);

        let names: Vec<&str> = patient
            .contained()
            .filter_map(|r| r.primitive_value("name"))
            .collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(reference_url(&patient, "generalPractitioner"), Some("#1"));
        assert_eq!(reference_url(&patient, "managingOrganization"), Some("#2"));
        let reference = patient
            .get("managingOrganization")
            .and_then(Element::as_complex)
            .unwrap();
        assert_eq!(
            reference.reference_target,
            Some(ReferenceTarget::Contained("2".into()))
        );
    }

    #[test]
    fn assignment_is_idempotent() {
        let mut patient = Resource::new("Patient");
        patient.set("managingOrganization", Complex::reference_to(organization("A")));
        assign(&mut patient);
        let once = patient.clone();
        assign(&mut patient);
        assert_eq!(once, patient);
    }

    #[test]
    fn externally_identified_targets_are_not_contained() {
        let mut patient = Resource::new("Patient");
        let org = organization("A").with_id("urn:uuid:0d0a1a7c-6b0e-4b2e-9a54-3c2f4f5d9b1e");
        patient.set("managingOrganization", Complex::reference_to(org));

        assign(&mut patient);

        assert_eq!(patient.contained().count(), 0);
        assert_eq!(
            reference_url(&patient, "managingOrganization"),
            Some("urn:uuid:0d0a1a7c-6b0e-4b2e-9a54-3c2f4f5d9b1e")
        );
    }

    #[test]
    fn existing_ids_are_skipped() {
        let mut patient = Resource::new("Patient");
        patient.add_contained(organization("existing").with_id("1"));
        patient.set("managingOrganization", Complex::reference_to(organization("new")));
        patient.add_contained(organization("no id"));

        assign(&mut patient);

        let ids: Vec<&str> = patient.contained().filter_map(Resource::id).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
    }

    #[test]
    fn references_inside_extensions_are_resolved() {
        let mut patient = Resource::new("Patient");
        patient.add_extension(
            Extension::new("http://example.org/provider")
                .with_value(Complex::reference_to(organization("A"))),
        );

        assign(&mut patient);

        assert_eq!(patient.contained().count(), 1);
        let value = patient.extensions()[0].value().and_then(Element::as_complex).unwrap();
        assert_eq!(value.reference_url(), Some("#1"));
    }

    #[test]
    fn references_inside_primitive_modifier_extensions_are_resolved() {
        let mut patient = Resource::new("Patient");
        patient.set(
            "gender",
            Primitive::code("male").with_extension(
                Extension::modifier("http://example.org/assigner")
                    .with_value(Complex::reference_to(organization("A"))),
            ),
        );

        assign(&mut patient);

        assert_eq!(patient.contained().count(), 1);
        let gender = patient.get("gender").and_then(Element::as_primitive).unwrap();
        let value = gender.base.modifier_extension[0]
            .value()
            .and_then(Element::as_complex)
            .unwrap();
        assert_eq!(value.reference_url(), Some("#1"));

        let mut decoded = patient.clone();
        let gender = decoded.get_mut("gender").and_then(Element::as_primitive_mut).unwrap();
        let value = gender.base.modifier_extension[0].value.as_deref_mut();
        if let Some(Element::Complex(reference)) = value {
            reference.reference_target = None;
        }
        link_references(&mut decoded);
        let gender = decoded.get("gender").and_then(Element::as_primitive).unwrap();
        let relinked = gender.base.modifier_extension[0]
            .value()
            .and_then(Element::as_complex)
            .unwrap();
        assert_eq!(
            relinked.reference_target,
            Some(ReferenceTarget::Contained("1".into()))
        );
    }

    #[test]
    fn links_local_references() {
        let mut patient = Resource::new("Patient");
        patient.add_contained(organization("A").with_id("org"));
        patient.set("managingOrganization", Complex::reference("#org"));
        patient.add("generalPractitioner", Complex::reference("#missing"));

        link_references(&mut patient);

        let linked = patient
            .get("managingOrganization")
            .and_then(Element::as_complex)
            .unwrap();
        assert_eq!(
            linked.reference_target,
            Some(ReferenceTarget::Contained("org".into()))
        );
        let missing = patient.get_all("generalPractitioner")[0].as_complex().unwrap();
        assert!(missing.reference_target.is_none());
        assert_eq!(missing.reference_url(), Some("#missing"));
    }

    #[test]
    fn bundle_entries_adopt_urn_full_urls() {
        let mut bundle = Resource::new("Bundle");
        bundle.set("type", Primitive::code("transaction"));
        let entry = Complex::new("Bundle.entry")
            .with("fullUrl", Primitive::uri("urn:uuid:3bc44de3-069d-442d-829b-f3ef68cae371"))
            .with(
                "resource",
                Resource::new("Patient").with_id("3bc44de3-069d-442d-829b-f3ef68cae371"),
            );
        bundle.add("entry", entry);
        let other = Complex::new("Bundle.entry")
            .with("fullUrl", Primitive::uri("http://example.org/Patient/1"))
            .with("resource", Resource::new("Patient").with_id("1"));
        bundle.add("entry", other);

        adopt_full_urls(&mut bundle);

        let ids: Vec<Option<&str>> = bundle
            .get_all("entry")
            .iter()
            .filter_map(Element::as_complex)
            .map(|entry| {
                entry
                    .get("resource")
                    .and_then(Element::as_resource)
                    .and_then(Resource::id)
            })
            .collect();
        assert_eq!(
            ids,
            vec![Some("urn:uuid:3bc44de3-069d-442d-829b-f3ef68cae371"), Some("1")]
        );
    }
}
