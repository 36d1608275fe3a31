//! Shared helpers for the codec integration tests

#![allow(dead_code)]

use ferrum_context::FhirVersion;
use ferrum_format::{DecodeOptions, EncodeOptions, FhirCodec, Format};
use ferrum_models::Resource;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
}

/// Base names that have both a `.json` and an `.xml` fixture.
pub fn fixture_pairs() -> Vec<String> {
    let dir = data_dir();
    let mut stems = BTreeSet::new();
    for entry in fs::read_dir(&dir).expect("read tests/data").flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = name.strip_suffix(".json") {
            if dir.join(format!("{stem}.xml")).exists() {
                stems.insert(stem.to_string());
            }
        }
    }
    stems.into_iter().collect()
}

pub fn load_fixture(name: &str) -> String {
    let path = data_dir().join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

pub fn load_pair(stem: &str) -> (String, String) {
    (
        load_fixture(&format!("{stem}.json")),
        load_fixture(&format!("{stem}.xml")),
    )
}

pub fn normalize_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|e| panic!("invalid JSON ({e}):\n{text}"))
}

pub fn r4() -> FhirCodec<'static> {
    FhirCodec::core(FhirVersion::R4)
}

pub fn stu3() -> FhirCodec<'static> {
    FhirCodec::core(FhirVersion::Stu3)
}

pub fn decode_json(codec: &FhirCodec<'_>, text: &str) -> Resource {
    codec
        .decode(text, Format::Json, &DecodeOptions::default(), None)
        .unwrap_or_else(|e| panic!("JSON decode failed: {e}"))
}

pub fn decode_xml(codec: &FhirCodec<'_>, text: &str) -> Resource {
    codec
        .decode(text, Format::Xml, &DecodeOptions::default(), None)
        .unwrap_or_else(|e| panic!("XML decode failed: {e}"))
}

pub fn encode_json(codec: &FhirCodec<'_>, resource: &Resource, options: &EncodeOptions) -> String {
    codec
        .encode(resource, Format::Json, options)
        .unwrap_or_else(|e| panic!("JSON encode failed: {e}"))
}

pub fn encode_xml(codec: &FhirCodec<'_>, resource: &Resource, options: &EncodeOptions) -> String {
    codec
        .encode(resource, Format::Xml, options)
        .unwrap_or_else(|e| panic!("XML encode failed: {e}"))
}

/// Compact JSON encoding with default options.
pub fn to_json(codec: &FhirCodec<'_>, resource: &Resource) -> String {
    encode_json(codec, resource, &EncodeOptions::default())
}
