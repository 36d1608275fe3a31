use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource-model version a catalog describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FhirVersion {
    Stu3,
    #[default]
    R4,
}

impl FhirVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            FhirVersion::Stu3 => "stu3",
            FhirVersion::R4 => "r4",
        }
    }

    /// Published release number.
    pub fn release(&self) -> &'static str {
        match self {
            FhirVersion::Stu3 => "3.0.2",
            FhirVersion::R4 => "4.0.1",
        }
    }

    /// Code system of the `SUBSETTED` marker tag.
    pub fn subsetted_system(&self) -> &'static str {
        match self {
            FhirVersion::Stu3 => "http://hl7.org/fhir/v3/ObservationValue",
            FhirVersion::R4 => "http://terminology.hl7.org/CodeSystem/v3-ObservationValue",
        }
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FhirVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stu3" | "dstu3" | "3" | "3.0" | "3.0.1" | "3.0.2" => Ok(FhirVersion::Stu3),
            "r4" | "4" | "4.0" | "4.0.0" | "4.0.1" => Ok(FhirVersion::R4),
            _ => Err(Error::InvalidFhirVersion(s.to_string())),
        }
    }
}
