//! Property-based tests using QuickCheck

use ferrum_format::{PathFilter, PathPattern};
use ferrum_models::{Complex, Element, Primitive, Resource};
use quickcheck::{QuickCheck, TestResult};

mod test_support;

/// Field names drawn from a small alphabet so generated paths overlap.
fn segment(n: u8) -> &'static str {
    const NAMES: &[&str] = &["name", "given", "meta", "id", "extension", "period"];
    NAMES[n as usize % NAMES.len()]
}

fn decimal_lexical(whole: i32, fraction: u16, trailing_zeros: u8) -> String {
    format!(
        "{whole}.{fraction}{}",
        "0".repeat(trailing_zeros as usize % 6)
    )
}

fn observation_with_value(lexical: &str) -> Resource {
    let mut observation = Resource::new("Observation");
    observation.set("status", Primitive::code("final"));
    observation.set("code", Complex::new("CodeableConcept").with("text", Primitive::string("x")));
    observation.set(
        "value",
        Complex::new("Quantity").with("value", Primitive::decimal(lexical)),
    );
    observation
}

fn quantity_value(resource: &Resource) -> Option<String> {
    resource
        .get("value")
        .and_then(Element::as_complex)
        .and_then(|quantity| quantity.primitive_value("value"))
        .map(str::to_string)
}

/// Property: a decimal's lexical form survives both grammars
#[test]
fn prop_decimal_lexical_form_survives() {
    fn prop(whole: i32, fraction: u16, trailing_zeros: u8) -> TestResult {
        let codec = test_support::r4();
        let lexical = decimal_lexical(whole, fraction, trailing_zeros);
        let observation = observation_with_value(&lexical);

        let json = test_support::to_json(&codec, &observation);
        let from_json = test_support::decode_json(&codec, &json);

        let xml = test_support::encode_xml(&codec, &observation, &Default::default());
        let from_xml = test_support::decode_xml(&codec, &xml);

        TestResult::from_bool(
            quantity_value(&from_json).as_deref() == Some(lexical.as_str())
                && quantity_value(&from_xml).as_deref() == Some(lexical.as_str()),
        )
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(i32, u16, u8) -> TestResult);
}

/// Property: string values survive both grammars unchanged
#[test]
fn prop_string_values_survive() {
    fn prop(family: String) -> TestResult {
        // XML 1.0 has no representation for control characters other than
        // line breaks and tabs, and empty strings are not values at all.
        let unrepresentable = |c: char| {
            (c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
                || matches!(c, '\u{FFFE}' | '\u{FFFF}')
        };
        if family.is_empty() || family.chars().any(unrepresentable) {
            return TestResult::discard();
        }

        let codec = test_support::r4();
        let mut patient = Resource::new("Patient");
        patient.add("name", Complex::new("HumanName").with("family", Primitive::string(family.as_str())));
        let family_of = |resource: &Resource| {
            resource
                .get("name")
                .and_then(Element::as_complex)
                .and_then(|name| name.primitive_value("family"))
                .map(str::to_string)
        };

        let json = test_support::to_json(&codec, &patient);
        let xml = test_support::encode_xml(&codec, &patient, &Default::default());
        let from_json = test_support::decode_json(&codec, &json);
        let from_xml = test_support::decode_xml(&codec, &xml);

        TestResult::from_bool(
            family_of(&from_json).as_deref() == Some(family.as_str())
                && family_of(&from_xml).as_deref() == Some(family.as_str()),
        )
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: an exclusion drops the path and everything below it, and nothing above it
#[test]
fn prop_exclusion_is_prefix_based() {
    fn prop(pattern: Vec<u8>, below: Vec<u8>) -> TestResult {
        if pattern.is_empty() || pattern.len() > 4 || below.len() > 4 {
            return TestResult::discard();
        }
        let mut excluded = vec!["Patient"];
        excluded.extend(pattern.iter().copied().map(segment));
        let filter = PathFilter::new::<String>(&[], &[excluded.join(".")]);

        let mut descendant = excluded.clone();
        descendant.extend(below.iter().copied().map(segment));
        let ancestor = &excluded[..excluded.len() - 1];

        TestResult::from_bool(
            !filter.is_included(&excluded)
                && !filter.is_included(&descendant)
                && filter.is_included(ancestor),
        )
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(Vec<u8>, Vec<u8>) -> TestResult);
}

/// Property: a wildcard first segment behaves like every concrete resource type
#[test]
fn prop_wildcard_matches_every_resource_type() {
    fn prop(fields: Vec<u8>) -> TestResult {
        if fields.is_empty() || fields.len() > 4 {
            return TestResult::discard();
        }
        let tail: Vec<&str> = fields.iter().copied().map(segment).collect();
        let pattern = PathPattern::parse(&format!("*.{}", tail.join(".")));

        let agrees = ["Patient", "Observation", "Bundle"].iter().all(|resource_type| {
            let mut path = vec![*resource_type];
            path.extend(tail.iter().copied());
            pattern.covers(&path)
        });
        TestResult::from_bool(agrees)
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<u8>) -> TestResult);
}
