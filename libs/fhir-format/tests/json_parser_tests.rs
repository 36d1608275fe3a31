mod test_support;

use ferrum_format::{DecodeOptions, EncodeOptions, EncodingError, Error, FormatError};
use ferrum_models::{Complex, Coding, Element, Extension, Primitive, Resource};
use test_support::{decode_json, encode_json, r4, stu3, to_json};

fn patient_with_tag_and_name() -> Resource {
    let mut patient = Resource::new("Patient").with_id("1");
    patient.add_tag(Coding::new("foo", "bar"));
    patient.set_narrative("generated", "<div>THE DIV</div>");
    patient.add("name", Complex::new("HumanName").with("family", Primitive::string("FAMILY")));
    patient.set(
        "maritalStatus",
        Complex::new("CodeableConcept").with("text", Primitive::string("Married")),
    );
    patient
}

// ============================================================================
// Summary mode and narrative suppression
// ============================================================================

#[test]
fn summary_mode_keeps_summary_fields_and_tags_once() {
    let codec = stu3();
    let options = EncodeOptions::new().with_summary(true);
    let json = encode_json(&codec, &patient_with_tag_and_name(), &options);
    assert_eq!(
        json,
        concat!(
            r#"{"resourceType":"Patient","id":"1","meta":{"tag":["#,
            r#"{"system":"foo","code":"bar"},"#,
            r#"{"system":"http://hl7.org/fhir/v3/ObservationValue","code":"SUBSETTED"}]},"#,
            r#""name":[{"family":"FAMILY"}]}"#
        )
    );

    // Encoding the already subsetted resource does not add a second tag.
    let mut again = patient_with_tag_and_name();
    again.add_tag(Coding::new("http://hl7.org/fhir/v3/ObservationValue", "SUBSETTED"));
    assert_eq!(encode_json(&codec, &again, &options), json);
}

#[test]
fn suppressed_narrative_keeps_everything_else() {
    let codec = r4();
    let options = EncodeOptions::new().with_suppress_narrative(true);
    let json = encode_json(&codec, &patient_with_tag_and_name(), &options);
    assert!(!json.contains("THE DIV"));
    assert!(json.contains(r#""maritalStatus":{"text":"Married"}"#));
    assert!(json.contains(
        r#"{"system":"http://terminology.hl7.org/CodeSystem/v3-ObservationValue","code":"SUBSETTED"}"#
    ));
}

#[test]
fn narrative_is_encoded_by_default() {
    let json = to_json(&r4(), &patient_with_tag_and_name());
    assert!(json.contains(r#""text":{"status":"generated","div":"<div>THE DIV</div>"}"#));
    assert!(!json.contains("SUBSETTED"));
}

// ============================================================================
// Path filters
// ============================================================================

#[test]
fn dont_encode_meta_and_ids_anywhere() {
    let options = EncodeOptions::new().with_exclude(["*.meta", "*.id"]);
    let json = encode_json(&r4(), &patient_with_tag_and_name(), &options);
    assert_eq!(
        json,
        concat!(
            r#"{"resourceType":"Patient","text":{"status":"generated","div":"<div>THE DIV</div>"},"#,
            r#""name":[{"family":"FAMILY"}],"maritalStatus":{"text":"Married"}}"#
        )
    );
}

#[test]
fn dont_encode_nested_field() {
    let mut patient = Resource::new("Patient");
    patient.add(
        "name",
        Complex::new("HumanName")
            .with("family", Primitive::string("FAMILY"))
            .with_item("given", Primitive::string("GIVEN")),
    );
    let options = EncodeOptions::new().with_exclude(["Patient.name.family"]);
    assert_eq!(
        encode_json(&r4(), &patient, &options),
        concat!(
            r#"{"resourceType":"Patient","meta":{"tag":[{"system":"#,
            r#""http://terminology.hl7.org/CodeSystem/v3-ObservationValue","code":"SUBSETTED"}]},"#,
            r#""name":[{"given":["GIVEN"]}]}"#
        )
    );
}

#[test]
fn include_list_with_excluded_meta() {
    let mut patient = patient_with_tag_and_name();
    patient.add(
        "address",
        Complex::new("Address").with("city", Primitive::string("Berlin")),
    );
    let options = EncodeOptions::new()
        .with_include(["Patient.name"])
        .with_exclude(["Patient.meta"]);
    assert_eq!(
        encode_json(&r4(), &patient, &options),
        r#"{"resourceType":"Patient","id":"1","name":[{"family":"FAMILY"}]}"#
    );
}

#[test]
fn filters_apply_inside_bundle_entries() {
    let mut inner = Resource::new("Patient").with_id("p1");
    inner.add_tag(Coding::new("foo", "bar"));
    inner.set("active", Primitive::boolean(true));
    let mut bundle = Resource::new("Bundle").with_id("b1");
    bundle.set("type", Primitive::code("collection"));
    bundle.add(
        "entry",
        Complex::new("Bundle.entry").with("resource", Element::Resource(Box::new(inner))),
    );

    let options = EncodeOptions::new().with_exclude(["*.meta"]);
    assert_eq!(
        encode_json(&r4(), &bundle, &options),
        concat!(
            r#"{"resourceType":"Bundle","id":"b1","type":"collection","entry":[{"resource":"#,
            r#"{"resourceType":"Patient","id":"p1","active":true}}]}"#
        )
    );
}

// ============================================================================
// Resource ids and empty content
// ============================================================================

#[test]
fn empty_binary_is_still_a_resource() {
    assert_eq!(to_json(&r4(), &Resource::new("Binary")), r#"{"resourceType":"Binary"}"#);
}

#[test]
fn versioned_url_id_encodes_id_part() {
    let binary = Resource::new("Binary").with_id("http://foo/Binary/11/_history/22");
    assert_eq!(to_json(&r4(), &binary), r#"{"resourceType":"Binary","id":"11"}"#);
}

#[test]
fn urn_ids_are_not_encoded() {
    let mut patient = Resource::new("Patient").with_id("urn:uuid:4e2a7a24-8f4c-4c38-9a31-4c57a6b5b8d2");
    patient.set("active", Primitive::boolean(true));
    assert_eq!(to_json(&r4(), &patient), r#"{"resourceType":"Patient","active":true}"#);
}

#[test]
fn omit_resource_id_option() {
    let patient = Resource::new("Patient").with_id("123");
    let options = EncodeOptions::new().with_omit_resource_id(true);
    assert_eq!(encode_json(&r4(), &patient, &options), r#"{"resourceType":"Patient"}"#);
}

#[test]
fn tags_without_system_or_code_are_dropped() {
    let mut patient = Resource::new("Patient");
    patient.add_tag(Coding::new("scheme", "term").with_display("display"));
    patient.add_tag(Coding {
        display: Some("label only".to_string()),
        ..Coding::default()
    });
    patient.add(
        "identifier",
        Complex::new("Identifier")
            .with("system", Primitive::uri("sys"))
            .with("value", Primitive::string("val")),
    );
    assert_eq!(
        to_json(&r4(), &patient),
        concat!(
            r#"{"resourceType":"Patient","meta":{"tag":[{"system":"scheme","code":"term","display":"display"}]},"#,
            r#""identifier":[{"system":"sys","value":"val"}]}"#
        )
    );
}

#[test]
fn empty_extensions_are_not_encoded() {
    let mut patient = Resource::new("Patient");
    patient.add_extension(Extension::new("http://example.org/empty"));
    patient.add_extension(
        Extension::new("http://example.org/blank").with_value(Primitive::shell("string")),
    );
    patient.set("active", Primitive::boolean(false));
    assert_eq!(to_json(&r4(), &patient), r#"{"resourceType":"Patient","active":false}"#);
}

// ============================================================================
// Primitive companions
// ============================================================================

#[test]
fn primitive_arrays_round_trip_with_companions() {
    let codec = r4();
    let text = concat!(
        r#"{"resourceType":"Patient","name":[{"given":["A",null,"C"],"#,
        r#""_given":[null,{"id":"b","extension":[{"url":"http://example.org/q","valueCode":"MID"}]},null]}]}"#
    );
    let patient = decode_json(&codec, text);
    let name = patient.get("name").and_then(Element::as_complex).unwrap();
    assert_eq!(name.get_all("given").len(), 3);
    assert_eq!(to_json(&codec, &patient), text);
}

#[test]
fn companion_without_value() {
    let codec = r4();
    let text = concat!(
        r#"{"resourceType":"Patient","_birthDate":{"extension":"#,
        r#"[{"url":"http://hl7.org/fhir/StructureDefinition/data-absent-reason","valueCode":"unknown"}]}}"#
    );
    let patient = decode_json(&codec, text);
    let birth_date = patient.get("birthDate").and_then(Element::as_primitive).unwrap();
    assert!(birth_date.value.is_none());
    assert_eq!(birth_date.base.extension.len(), 1);
    assert_eq!(to_json(&codec, &patient), text);
}

#[test]
fn decimals_keep_trailing_zeros() {
    let codec = r4();
    let text = concat!(
        r#"{"resourceType":"Observation","status":"final","code":{"text":"x"},"#,
        r#""valueQuantity":{"value":1.500,"unit":"mg"}}"#
    );
    let observation = decode_json(&codec, text);
    let quantity = observation.get("value").and_then(Element::as_complex).unwrap();
    assert_eq!(quantity.primitive_value("value"), Some("1.500"));
    assert_eq!(to_json(&codec, &observation), text);
}

#[test]
fn invalid_number_is_an_encoding_error() {
    let mut observation = Resource::new("Observation");
    observation.set("status", Primitive::code("final"));
    observation.set(
        "value",
        Complex::new("Quantity").with("value", Primitive::decimal("one point five")),
    );
    let err = r4()
        .encode_json(&observation, &EncodeOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Encoding(_)), "{err}");
}

// ============================================================================
// Comments
// ============================================================================

#[test]
fn fhir_comments_are_preserved_on_request() {
    let codec = r4();
    let text = concat!(
        r#"{"fhir_comments":["top"],"resourceType":"Patient","#,
        r#""active":true,"_active":{"fhir_comments":["flag"]}}"#
    );
    let options = DecodeOptions::new().with_preserve_comments(true);
    let patient = codec.decode_json(text, &options).unwrap();
    assert_eq!(patient.as_complex().base.comments.pre, vec!["top"]);

    let encoded = codec
        .encode_json(&patient, &EncodeOptions::new().with_preserve_comments(true))
        .unwrap();
    assert_eq!(encoded, text);

    // Dropped unless asked for.
    let plain = decode_json(&codec, text);
    assert_eq!(to_json(&codec, &plain), r#"{"resourceType":"Patient","active":true}"#);
}

// ============================================================================
// Decode errors
// ============================================================================

#[test]
fn missing_resource_type_is_fatal() {
    let err = r4()
        .decode_json(r#"{"id":"1"}"#, &DecodeOptions::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required element 'resourceType' from JSON resource object, unable to parse"
    );
}

#[test]
fn scalar_where_array_expected() {
    let err = r4()
        .decode_json(
            r#"{"resourceType":"Patient","name":[{"given":"Joe"}]}"#,
            &DecodeOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected ARRAY at element 'given', found 'SCALAR'");
}

#[test]
fn array_where_object_expected() {
    let err = r4()
        .decode_json(
            r#"{"resourceType":"Patient","maritalStatus":[{"text":"M"}]}"#,
            &DecodeOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::WrongShape { expected: "OBJECT", found: "ARRAY", .. })
    ));
}

#[test]
fn unknown_elements_depend_on_strictness() {
    let text = r#"{"resourceType":"Patient","favouriteColour":"green","active":true}"#;
    let codec = r4();

    let lenient = decode_json(&codec, text);
    assert_eq!(to_json(&codec, &lenient), r#"{"resourceType":"Patient","active":true}"#);

    let err = codec
        .decode_json(text, &DecodeOptions::new().with_strict(true))
        .unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::UnknownElement { .. })));
}

#[test]
fn unknown_choice_suffix_is_fatal() {
    let err = r4()
        .decode_json(
            r#"{"resourceType":"Patient","deceasedString":"yes"}"#,
            &DecodeOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::UnknownChoiceType { ref suffix, .. }) if suffix == "String"
    ));
}

#[test]
fn unknown_resource_type_is_fatal() {
    let err = r4()
        .decode_json(r#"{"resourceType":"Starship"}"#, &DecodeOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::UnknownResourceType(ref t)) if t == "Starship"));
}

#[test]
fn repeated_single_valued_field_is_an_encoding_error() {
    let mut patient = Resource::new("Patient");
    patient.add("gender", Primitive::code("male"));
    patient.add("gender", Primitive::code("female"));

    let err = r4().encode_json(&patient, &EncodeOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::Encoding(EncodingError::MultipleValues { ref path, count: 2 }) if path == "Patient.gender"
    ));

    let mut patient = Resource::new("Patient");
    patient.add("maritalStatus", Complex::new("CodeableConcept").with("text", Primitive::string("A")));
    patient.add("maritalStatus", Complex::new("CodeableConcept").with("text", Primitive::string("B")));
    let err = r4().encode_json(&patient, &EncodeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Encoding(EncodingError::MultipleValues { .. })));
}

#[test]
fn malformed_narrative_is_rejected() {
    let err = r4()
        .decode_json(
            r#"{"resourceType":"Patient","text":{"status":"generated","div":"<div>a & b <br></div>"}}"#,
            &DecodeOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::InvalidContent { ref path, .. }) if path == "Patient.text.div"
    ));
}

#[test]
fn line_breaks_survive_json() {
    let codec = r4();
    let json = r#"{"resourceType":"Patient","name":[{"family":"line1\nline2\r\n\tend"}]}"#;
    let patient = decode_json(&codec, json);
    let name = patient.get("name").and_then(Element::as_complex).unwrap();
    assert_eq!(name.primitive_value("family"), Some("line1\nline2\r\n\tend"));
    assert_eq!(to_json(&codec, &patient), json);
}
