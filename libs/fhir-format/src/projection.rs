//! Pre-encode projection
//!
//! Every encode works on a private copy of the caller's tree. The copy gets
//! its contained ids assigned, its narrative suppressed or generated, its
//! resource ids normalised, and is then cut down by summary mode and the
//! path filter. Anything left empty afterwards is pruned so that both
//! grammars see the same tree.

use crate::contained::assign_contained_ids;
use crate::filter::PathFilter;
use crate::options::EncodeOptions;
use ferrum_context::{DefinitionCatalog, FieldKind, TypeKind};
use ferrum_models::{Coding, Complex, Element, Extension, Resource, ResourceId};
use std::mem;
use tracing::trace;

/// Produce the tree that is actually written for `resource`.
pub fn prepare(
    resource: &Resource,
    catalog: &dyn DefinitionCatalog,
    options: &EncodeOptions,
) -> Resource {
    let mut prepared = resource.clone();
    assign_contained_ids(&mut prepared, catalog);

    let drop_narrative = options.suppress_narrative || options.summary;
    if !drop_narrative && prepared.narrative_div().is_none() {
        if let Some(generator) = &options.narrative_generator {
            if let Some(div) = generator.generate(&prepared) {
                prepared.set_narrative("generated", div);
            }
        }
    }

    let filter = PathFilter::new(&options.include, &options.exclude);
    let mut projection = Projection {
        catalog,
        filter: &filter,
        summary: options.summary,
        drop_narrative,
        dropped: false,
    };
    projection.resource(&mut prepared);

    if options.omit_resource_id {
        prepared.clear_id();
    }

    let subsetted = options.summary || options.suppress_narrative || projection.dropped;
    if subsetted && !filter.is_excluded(&[prepared.resource_type(), "meta"]) {
        add_subsetted_tag(&mut prepared, catalog);
    }

    prune_complex(prepared.as_complex_mut());
    prepared
}

/// Append the subsetted marker to `meta.tag` unless it is already there.
pub fn add_subsetted_tag(resource: &mut Resource, catalog: &dyn DefinitionCatalog) {
    let (system, code) = catalog.subsetted_tag();
    if !resource.has_tag(system, code) {
        resource.add_tag(Coding::new(system, code));
    }
}

struct Projection<'a> {
    catalog: &'a dyn DefinitionCatalog,
    filter: &'a PathFilter,
    summary: bool,
    drop_narrative: bool,
    /// Set once the path filter removes anything
    dropped: bool,
}

impl Projection<'_> {
    fn resource(&mut self, resource: &mut Resource) {
        normalize_id(resource);
        if self.drop_narrative {
            resource.remove("text");
        }
        drop_empty_codings(resource);

        let mut path = vec![resource.resource_type().to_string()];
        self.complex(resource.as_complex_mut(), &mut path);
    }

    fn complex(&mut self, node: &mut Complex, path: &mut Vec<String>) {
        let catalog = self.catalog;
        let type_name = node.type_name.clone();
        let summarize = self.summary
            && catalog
                .type_definition(&type_name)
                .is_some_and(|t| matches!(t.kind, TypeKind::Resource | TypeKind::Backbone));

        for field in catalog.fields_of(&type_name) {
            path.push(field.name.clone());
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            let in_summary = !summarize || field.is_summary;
            let included = self.filter.is_included(&segments);

            if !(in_summary && included) {
                let removed = match field.kind {
                    FieldKind::ElementId => node.base.id.take().is_some(),
                    FieldKind::Extension if field.name == "modifierExtension" => {
                        !mem::take(&mut node.base.modifier_extension).is_empty()
                    }
                    FieldKind::Extension => !mem::take(&mut node.base.extension).is_empty(),
                    _ => !node.remove(&field.name).is_empty(),
                };
                if removed && !included {
                    trace!(path = %segments.join("."), "Path filter dropped element");
                    self.dropped = true;
                }
            } else if let Some(values) = node.field_mut(&field.name) {
                for value in values.iter_mut() {
                    match value {
                        Element::Complex(child) => self.complex(child, path),
                        Element::Resource(inner) => self.resource(inner),
                        Element::Primitive(_) => {}
                    }
                }
            }
            path.pop();
        }
    }
}

/// Keep only the id part; `urn:` ids never reach the output.
fn normalize_id(resource: &mut Resource) {
    let Some(id) = resource.id() else {
        return;
    };
    let parsed = ResourceId::parse(id.trim_start_matches('#'));
    if parsed.is_urn() {
        resource.clear_id();
        return;
    }
    let part = parsed.id_part().to_string();
    if part != id {
        if let Some(Element::Primitive(primitive)) = resource.get_mut("id") {
            primitive.value = Some(part);
        }
    }
}

/// Tags and security labels with neither system nor code carry nothing.
fn drop_empty_codings(resource: &mut Resource) {
    let Some(Element::Complex(meta)) = resource.get_mut("meta") else {
        return;
    };
    for name in ["tag", "security"] {
        if let Some(codings) = meta.field_mut(name) {
            codings.retain(|coding| {
                coding
                    .as_complex()
                    .is_none_or(|c| !Coding::from_complex(c).is_empty())
            });
        }
    }
}

fn prune_complex(node: &mut Complex) {
    prune_extensions(&mut node.base.extension);
    prune_extensions(&mut node.base.modifier_extension);
    node.retain_fields(|_, values| {
        values.iter_mut().for_each(prune_element);
        values.retain(|value| !value.is_empty());
        !values.is_empty()
    });
}

fn prune_element(element: &mut Element) {
    match element {
        Element::Primitive(primitive) => {
            prune_extensions(&mut primitive.base.extension);
            prune_extensions(&mut primitive.base.modifier_extension);
        }
        Element::Complex(complex) => prune_complex(complex),
        Element::Resource(resource) => prune_complex(resource.as_complex_mut()),
    }
}

fn prune_extensions(extensions: &mut Vec<Extension>) {
    for extension in extensions.iter_mut() {
        if let Some(value) = extension.value.as_deref_mut() {
            prune_element(value);
            if value.is_empty() {
                extension.value = None;
            }
        }
        prune_extensions(&mut extension.extension);
    }
    extensions.retain(|extension| !extension.is_empty());
}
