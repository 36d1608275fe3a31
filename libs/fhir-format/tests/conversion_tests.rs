mod test_support;

use ferrum_format::{json_to_xml, xml_to_json};
use test_support::{fixture_pairs, load_pair, normalize_json};

// ============================================================================
// Fixture discovery
// ============================================================================

#[test]
fn test_data_files_exist() {
    let cases = fixture_pairs();
    assert!(cases.len() >= 3, "expected fixture pairs, found {cases:?}");
    for stem in &cases {
        let (json, xml) = load_pair(stem);
        assert!(!json.trim().is_empty(), "{stem}.json is empty");
        assert!(!xml.trim().is_empty(), "{stem}.xml is empty");
    }
}

// ============================================================================
// Cross-grammar equivalence
// ============================================================================

#[test]
fn test_all_xml_decodes_to_fixture_json() {
    for stem in fixture_pairs() {
        let (json, xml) = load_pair(&stem);
        let converted = xml_to_json(&xml)
            .unwrap_or_else(|e| panic!("{stem}: XML to JSON conversion failed: {e}"));
        assert_eq!(
            normalize_json(&converted),
            normalize_json(&json),
            "{stem}: XML fixture does not decode to the JSON fixture"
        );
    }
}

#[test]
fn test_all_json_encodes_to_fixture_xml() {
    for stem in fixture_pairs() {
        let (json, xml) = load_pair(&stem);
        let converted = json_to_xml(&json)
            .unwrap_or_else(|e| panic!("{stem}: JSON to XML conversion failed: {e}"));

        let doc = roxmltree::Document::parse(&converted)
            .unwrap_or_else(|e| panic!("{stem}: generated XML is not valid: {e}"));
        assert_eq!(doc.root_element().tag_name().namespace(), Some("http://hl7.org/fhir"));

        // Compare through the other grammar so whitespace does not matter.
        let ours = xml_to_json(&converted).unwrap();
        let theirs = xml_to_json(&xml).unwrap();
        assert_eq!(normalize_json(&ours), normalize_json(&theirs), "{stem}");
    }
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_all_round_trip_json_xml_json() {
    for stem in fixture_pairs() {
        let (json, _xml) = load_pair(&stem);
        let xml = json_to_xml(&json).unwrap();
        let back = xml_to_json(&xml).unwrap();
        assert_eq!(normalize_json(&back), normalize_json(&json), "{stem}");
    }
}

#[test]
fn test_all_round_trip_xml_json_xml() {
    for stem in fixture_pairs() {
        let (_json, xml) = load_pair(&stem);
        let json = xml_to_json(&xml).unwrap();
        let again = xml_to_json(&json_to_xml(&json).unwrap()).unwrap();
        assert_eq!(normalize_json(&again), normalize_json(&json), "{stem}");
    }
}

// ============================================================================
// Specific features
// ============================================================================

#[test]
fn test_primitive_extensions_become_child_elements() {
    let (json, _xml) = load_pair("patient-example");
    let xml = json_to_xml(&json).unwrap();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    let birth_date = doc
        .descendants()
        .find(|n| n.has_tag_name("birthDate"))
        .expect("birthDate element");
    assert_eq!(birth_date.attribute("value"), Some("1974-12-25"));
    let extension = birth_date
        .children()
        .find(|n| n.has_tag_name("extension"))
        .expect("birthDate extension");
    assert_eq!(
        extension.attribute("url"),
        Some("http://hl7.org/fhir/StructureDefinition/patient-birthTime")
    );

    let given: Vec<_> = doc.descendants().filter(|n| n.has_tag_name("given")).collect();
    assert_eq!(given.len(), 2);
    assert_eq!(given[0].attribute("id"), None);
    assert_eq!(given[1].attribute("id"), Some("g2"));
}

#[test]
fn test_narrative_div_is_copied_verbatim() {
    let (json, xml) = load_pair("patient-example");
    let converted = normalize_json(&xml_to_json(&xml).unwrap());
    let original = normalize_json(&json);
    assert_eq!(converted["text"]["div"], original["text"]["div"]);

    let back = json_to_xml(&json).unwrap();
    assert!(back.contains(
        r#"<div xmlns="http://www.w3.org/1999/xhtml"><p>Peter James <b>Chalmers</b></p></div>"#
    ));
}

#[test]
fn test_contained_resources_are_wrapped() {
    let (json, _xml) = load_pair("patient-example");
    let xml = json_to_xml(&json).unwrap();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let contained = doc
        .descendants()
        .find(|n| n.has_tag_name("contained"))
        .expect("contained element");
    let organization = contained.first_element_child().unwrap();
    assert_eq!(organization.tag_name().name(), "Organization");
    assert_eq!(organization.tag_name().namespace(), Some("http://hl7.org/fhir"));
}

#[test]
fn test_decimals_keep_their_lexical_form() {
    let (_json, xml) = load_pair("observation-bp");
    let json = xml_to_json(&xml).unwrap();
    assert!(json.contains("107.50"), "{json}");

    let (json, _xml) = load_pair("bundle-collection");
    let xml = json_to_xml(&json).unwrap();
    assert!(xml.contains(r#"<value value="72.0"/>"#), "{xml}");
}
