//! Catalog lookups shared by both grammars

use crate::error::{EncodingError, FormatError};
use crate::options::DecodeOptions;
use ferrum_context::{DefinitionCatalog, FieldDefinition, ResolvedField, TypeDefinition};
use ferrum_models::{Complex, Element};
use quick_xml::escape::escape;
use tracing::warn;

pub(crate) const FHIR_NS: &str = "http://hl7.org/fhir";
pub(crate) const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Resolve a document field name while decoding.
///
/// A known choice prefix with an unknown type suffix is always an error.
/// Other unknown names are skipped unless decoding is strict.
pub(crate) fn resolve_field<'a>(
    catalog: &'a dyn DefinitionCatalog,
    options: &DecodeOptions,
    type_name: &str,
    document_name: &str,
    path: &str,
) -> Result<Option<ResolvedField<'a>>, FormatError> {
    if let Some(resolved) = catalog.resolve_field(type_name, document_name) {
        return Ok(Some(resolved));
    }
    let bad_suffix = catalog
        .fields_of(type_name)
        .iter()
        .filter(|field| field.is_choice())
        .find_map(|field| document_name.strip_prefix(field.name.as_str()))
        .filter(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()));
    if let Some(suffix) = bad_suffix {
        return Err(FormatError::UnknownChoiceType {
            path: format!("{path}.{document_name}"),
            suffix: suffix.to_string(),
        });
    }
    skip_unknown(options, path, document_name)?;
    Ok(None)
}

/// Lenient decoding logs and drops what it does not understand.
pub(crate) fn skip_unknown(
    options: &DecodeOptions,
    path: &str,
    name: &str,
) -> Result<(), FormatError> {
    if options.strict {
        return Err(FormatError::UnknownElement {
            path: path.to_string(),
            name: name.to_string(),
        });
    }
    warn!(%path, element = %name, "Skipping unknown element");
    Ok(())
}

/// The type definition a node is written against, after checking that the
/// node holds no field the type does not declare.
pub(crate) fn checked_definition<'a>(
    catalog: &'a dyn DefinitionCatalog,
    type_name: &str,
    node: &Complex,
) -> Result<&'a TypeDefinition, EncodingError> {
    let definition = catalog
        .type_definition(type_name)
        .ok_or_else(|| EncodingError::UnknownType(type_name.to_string()))?;
    if let Some((name, _)) = node
        .fields()
        .find(|(name, values)| !values.is_empty() && definition.field(name).is_none())
    {
        return Err(EncodingError::UnknownElement {
            type_name: type_name.to_string(),
            name: name.to_string(),
        });
    }
    Ok(definition)
}

/// The single value of a choice field, with the concrete type it is written as.
pub(crate) fn choice_value<'e>(
    field: &FieldDefinition,
    values: &'e [Element],
    path: &str,
) -> Result<Option<(&'e Element, &'e str)>, EncodingError> {
    match values {
        [] => Ok(None),
        [value] => {
            let type_code = value.type_name();
            if !field.allows_type(type_code) {
                return Err(EncodingError::InvalidChoiceType {
                    path: format!("{path}.{}", field.name),
                    type_code: type_code.to_string(),
                });
            }
            Ok(Some((value, type_code)))
        }
        _ => Err(EncodingError::MultipleChoiceValues {
            path: format!("{path}.{}", field.name),
        }),
    }
}

/// The values of a plain field, checked against its cardinality.
pub(crate) fn field_values<'e>(
    field: &FieldDefinition,
    values: &'e [Element],
    path: &str,
) -> Result<&'e [Element], EncodingError> {
    if !field.is_array() && values.len() > 1 {
        return Err(EncodingError::MultipleValues {
            path: format!("{path}.{}", field.name),
            count: values.len(),
        });
    }
    Ok(values)
}

/// Extension values are an open choice declared on `Extension.value`.
pub(crate) fn extension_value_field(
    catalog: &dyn DefinitionCatalog,
) -> Result<&FieldDefinition, EncodingError> {
    catalog
        .field("Extension", "value")
        .ok_or_else(|| EncodingError::UnknownElement {
            type_name: "Extension".to_string(),
            name: "value".to_string(),
        })
}

/// Prefix and attribute text of the opening tag when `markup` starts with a
/// `div` element, plain or namespace-prefixed.
fn div_start(markup: &str) -> Option<(Option<&str>, &str)> {
    let rest = markup.strip_prefix('<')?;
    let name_end = rest.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
    let prefix = match rest[..name_end].split_once(':') {
        None if &rest[..name_end] == "div" => None,
        Some((prefix, "div")) if !prefix.is_empty() => Some(prefix),
        _ => return None,
    };
    let tag_end = rest.find('>').unwrap_or(rest.len());
    Some((prefix, &rest[name_end..tag_end]))
}

/// The stored div with the XHTML namespace declared on it.
///
/// Plain text is wrapped in a `div` of its own.
pub(crate) fn xhtml_div(div: &str) -> String {
    let trimmed = div.trim();
    let Some((prefix, attributes)) = div_start(trimmed) else {
        return format!("<div xmlns=\"{XHTML_NS}\">{}</div>", escape(trimmed));
    };
    let declaration = match prefix {
        Some(prefix) => format!("xmlns:{prefix}"),
        None => "xmlns".to_string(),
    };
    let declared = attributes
        .split_whitespace()
        .any(|attribute| attribute.split('=').next() == Some(declaration.as_str()));
    if declared {
        return trimmed.to_string();
    }
    // `<`, the optional `prefix:` and `div`
    let name_len = 1 + prefix.map_or(0, |prefix| prefix.len() + 1) + 3;
    let (open, rest) = trimmed.split_at(name_len);
    format!("{open} {declaration}=\"{XHTML_NS}\"{rest}")
}

/// The div as it is written to XML, provided it is a well-formed XHTML `div`.
pub(crate) fn checked_xhtml(div: &str) -> Result<String, String> {
    let markup = xhtml_div(div);
    let in_xhtml = {
        let document = roxmltree::Document::parse(&markup).map_err(|e| e.to_string())?;
        let root = document.root_element().tag_name();
        root.name() == "div" && root.namespace() == Some(XHTML_NS)
    };
    if !in_xhtml {
        return Err("narrative div must be in the XHTML namespace".to_string());
    }
    Ok(markup)
}

/// Whether values of `type_code` are written as resources.
pub(crate) fn holds_resource(catalog: &dyn DefinitionCatalog, type_code: &str) -> bool {
    type_code == "Resource" || catalog.is_resource(type_code)
}
