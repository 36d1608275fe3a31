//! Built-in core definitions
//!
//! Hand-maintained layouts for the datatypes and resources the codec ships
//! with. Field order and summary/modifier flags follow the published
//! StructureDefinitions of each release.

use crate::catalog::{CatalogBuilder, StaticCatalog, TypeBuilder};
use crate::definition::Max;
use crate::version::FhirVersion;

const STU3_PRIMITIVES: &[&str] = &[
    "base64Binary",
    "boolean",
    "code",
    "date",
    "dateTime",
    "decimal",
    "id",
    "instant",
    "integer",
    "markdown",
    "oid",
    "positiveInt",
    "string",
    "time",
    "unsignedInt",
    "uri",
    "uuid",
    "xhtml",
];

const R4_PRIMITIVES: &[&str] = &["canonical", "url"];

/// Datatypes admitted by open choice fields (`Extension.value[x]`).
const OPEN_DATATYPES: &[&str] = &[
    "Address",
    "Annotation",
    "Attachment",
    "CodeableConcept",
    "Coding",
    "ContactPoint",
    "HumanName",
    "Identifier",
    "Meta",
    "Period",
    "Quantity",
    "Range",
    "Reference",
];

pub(crate) fn core(version: FhirVersion) -> StaticCatalog {
    let mut builder = CatalogBuilder::new(version);
    for name in primitives(version) {
        builder.primitive(name);
    }
    datatypes(&mut builder, version);
    resources(&mut builder, version);
    builder.build()
}

fn primitives(version: FhirVersion) -> Vec<&'static str> {
    let mut names = STU3_PRIMITIVES.to_vec();
    if version == FhirVersion::R4 {
        names.extend_from_slice(R4_PRIMITIVES);
    }
    names
}

/// Every primitive except `xhtml`, then the open datatypes.
fn open_types(version: FhirVersion) -> Vec<&'static str> {
    let mut types: Vec<&str> = primitives(version)
        .into_iter()
        .filter(|t| *t != "xhtml")
        .collect();
    types.extend_from_slice(OPEN_DATATYPES);
    types
}

fn datatypes(b: &mut CatalogBuilder, version: FhirVersion) {
    let r4 = version == FhirVersion::R4;
    let open = open_types(version);

    b.complex("Extension", |t| {
        t.one("url", "uri").required();
        t.choice("value", &open);
    });

    b.complex("Meta", |t| {
        t.one("versionId", "id").summary();
        t.one("lastUpdated", "instant").summary();
        if r4 {
            t.one("source", "uri").summary();
        }
        t.many("profile", if r4 { "canonical" } else { "uri" }).summary();
        t.many("security", "Coding").summary();
        t.many("tag", "Coding").summary();
    });

    b.complex("Narrative", |t| {
        t.one("status", "code").required();
        t.one("div", "xhtml").required();
    });

    b.complex("Coding", |t| {
        t.one("system", "uri").summary();
        t.one("version", "string").summary();
        t.one("code", "code").summary();
        t.one("display", "string").summary();
        t.one("userSelected", "boolean").summary();
    });

    b.complex("CodeableConcept", |t| {
        t.many("coding", "Coding").summary();
        t.one("text", "string").summary();
    });

    b.complex("Identifier", |t| {
        t.one("use", "code").modifier();
        t.one("type", "CodeableConcept").summary();
        t.one("system", "uri").summary();
        t.one("value", "string").summary();
        t.one("period", "Period").summary();
        t.one("assigner", "Reference").summary();
    });

    b.complex("HumanName", |t| {
        t.one("use", "code").modifier();
        t.one("text", "string").summary();
        t.one("family", "string").summary();
        t.many("given", "string").summary();
        t.many("prefix", "string").summary();
        t.many("suffix", "string").summary();
        t.one("period", "Period").summary();
    });

    b.complex("Address", |t| {
        t.one("use", "code").modifier();
        t.one("type", "code").summary();
        t.one("text", "string").summary();
        t.many("line", "string").summary();
        t.one("city", "string").summary();
        t.one("district", "string").summary();
        t.one("state", "string").summary();
        t.one("postalCode", "string").summary();
        t.one("country", "string").summary();
        t.one("period", "Period").summary();
    });

    b.complex("ContactPoint", |t| {
        t.one("system", "code").summary();
        t.one("value", "string").summary();
        t.one("use", "code").modifier();
        t.one("rank", "positiveInt").summary();
        t.one("period", "Period").summary();
    });

    b.complex("Period", |t| {
        t.one("start", "dateTime").summary();
        t.one("end", "dateTime").summary();
    });

    b.complex("Quantity", |t| {
        t.one("value", "decimal").summary();
        t.one("comparator", "code").modifier();
        t.one("unit", "string").summary();
        t.one("system", "uri").summary();
        t.one("code", "code").summary();
    });

    b.complex("Range", |t| {
        t.one("low", "Quantity").summary();
        t.one("high", "Quantity").summary();
    });

    b.complex("Reference", |t| {
        t.one("reference", "string").summary();
        if r4 {
            t.one("type", "uri").summary();
        }
        t.one("identifier", "Identifier").summary();
        t.one("display", "string").summary();
    });

    b.complex("Attachment", |t| {
        t.one("contentType", "code").summary();
        t.one("language", "code").summary();
        t.one("data", "base64Binary");
        t.one("url", if r4 { "url" } else { "uri" }).summary();
        t.one("size", "unsignedInt").summary();
        t.one("hash", "base64Binary").summary();
        t.one("title", "string").summary();
        t.one("creation", "dateTime").summary();
    });

    b.complex("Annotation", |t| {
        t.choice("author", &["Reference", "string"]).summary();
        t.one("time", "dateTime").summary();
        t.one("text", if r4 { "markdown" } else { "string" }).required();
    });
}

fn resources(b: &mut CatalogBuilder, version: FhirVersion) {
    let r4 = version == FhirVersion::R4;
    let open = open_types(version);

    b.domain_resource("Patient", |t| {
        t.many("identifier", "Identifier").summary();
        t.one("active", "boolean").modifier();
        t.many("name", "HumanName").summary();
        t.many("telecom", "ContactPoint").summary();
        t.one("gender", "code").summary();
        t.one("birthDate", "date").summary();
        t.choice("deceased", &["boolean", "dateTime"]).modifier();
        t.many("address", "Address").summary();
        t.one("maritalStatus", "CodeableConcept");
        t.choice("multipleBirth", &["boolean", "integer"]);
        t.many("photo", "Attachment");
        t.backbone("contact", Max::Many, |c| {
            c.many("relationship", "CodeableConcept");
            c.one("name", "HumanName");
            c.many("telecom", "ContactPoint");
            c.one("address", "Address");
            c.one("gender", "code");
            c.one("organization", "Reference");
            c.one("period", "Period");
        });
        t.backbone("communication", Max::Many, |c| {
            c.one("language", "CodeableConcept").required();
            c.one("preferred", "boolean");
        });
        t.many("generalPractitioner", "Reference");
        t.one("managingOrganization", "Reference").summary();
        t.backbone("link", Max::Many, |l| {
            l.one("other", "Reference").summary().required();
            l.one("type", "code").summary().required();
        })
        .modifier();
    });

    b.domain_resource("Observation", |t| {
        t.many("identifier", "Identifier").summary();
        t.many("basedOn", "Reference").summary();
        if t.version() == FhirVersion::R4 {
            t.many("partOf", "Reference").summary();
        }
        t.one("status", "code").modifier().required();
        t.many("category", "CodeableConcept");
        t.one("code", "CodeableConcept").summary().required();
        t.one("subject", "Reference").summary();
        if r4 {
            t.many("focus", "Reference").summary();
            t.one("encounter", "Reference").summary();
            t.choice("effective", &["dateTime", "Period", "instant"])
                .summary();
        } else {
            t.one("context", "Reference");
            t.choice("effective", &["dateTime", "Period"]).summary();
        }
        t.one("issued", "instant").summary();
        t.many("performer", "Reference").summary();
        observation_value(t);
        t.one("dataAbsentReason", "CodeableConcept");
        if r4 {
            t.many("interpretation", "CodeableConcept");
            t.many("note", "Annotation");
        } else {
            t.one("interpretation", "CodeableConcept");
            t.one("comment", "string");
        }
        t.one("bodySite", "CodeableConcept");
        t.one("method", "CodeableConcept");
        t.one("specimen", "Reference");
        t.one("device", "Reference");
        t.backbone("referenceRange", Max::Many, |r| {
            r.one("low", "Quantity");
            r.one("high", "Quantity");
            r.one("type", "CodeableConcept");
            r.many("appliesTo", "CodeableConcept");
            r.one("age", "Range");
            r.one("text", "string");
        });
        if r4 {
            t.many("hasMember", "Reference").summary();
            t.many("derivedFrom", "Reference").summary();
        } else {
            t.backbone("related", Max::Many, |r| {
                r.one("type", "code");
                r.one("target", "Reference").required();
            });
        }
        t.backbone("component", Max::Many, |c| {
            c.one("code", "CodeableConcept").summary().required();
            observation_value(c);
            c.one("dataAbsentReason", "CodeableConcept");
            if c.version() == FhirVersion::R4 {
                c.many("interpretation", "CodeableConcept");
            } else {
                c.one("interpretation", "CodeableConcept");
            }
            c.many("referenceRange", "Observation.referenceRange");
        })
        .summary();
    });

    b.domain_resource("Condition", |t| {
        t.many("identifier", "Identifier").summary();
        let status_type = if r4 { "CodeableConcept" } else { "code" };
        t.one("clinicalStatus", status_type).modifier();
        t.one("verificationStatus", status_type).modifier();
        t.many("category", "CodeableConcept");
        t.one("severity", "CodeableConcept");
        t.one("code", "CodeableConcept").summary();
        t.many("bodySite", "CodeableConcept").summary();
        t.one("subject", "Reference").summary().required();
        if r4 {
            t.one("encounter", "Reference").summary();
        } else {
            t.one("context", "Reference").summary();
        }
        t.choice("onset", &["dateTime", "Period", "Range", "string"])
            .summary();
        if r4 {
            t.choice("abatement", &["dateTime", "Period", "Range", "string"]);
            t.one("recordedDate", "dateTime").summary();
            t.one("recorder", "Reference").summary();
            t.one("asserter", "Reference").summary();
        } else {
            t.choice(
                "abatement",
                &["dateTime", "Period", "Range", "string", "boolean"],
            );
            t.one("assertedDate", "dateTime").summary();
            t.one("asserter", "Reference").summary();
        }
        t.backbone("evidence", Max::Many, |e| {
            e.many("code", "CodeableConcept").summary();
            e.many("detail", "Reference").summary();
        });
        t.many("note", "Annotation");
    });

    b.domain_resource("DiagnosticReport", |t| {
        t.many("identifier", "Identifier").summary();
        t.many("basedOn", "Reference");
        t.one("status", "code").modifier().required();
        if r4 {
            t.many("category", "CodeableConcept").summary();
        } else {
            t.one("category", "CodeableConcept").summary();
        }
        t.one("code", "CodeableConcept").summary().required();
        t.one("subject", "Reference").summary();
        t.one(if r4 { "encounter" } else { "context" }, "Reference")
            .summary();
        t.choice("effective", &["dateTime", "Period"]).summary();
        t.one("issued", "instant").summary();
        if r4 {
            t.many("performer", "Reference").summary();
            t.many("resultsInterpreter", "Reference").summary();
        } else {
            t.backbone("performer", Max::Many, |p| {
                p.one("role", "CodeableConcept").summary();
                p.one("actor", "Reference").summary().required();
            })
            .summary();
        }
        t.many("specimen", "Reference");
        t.many("result", "Reference");
        t.many("imagingStudy", "Reference");
        t.backbone(if r4 { "media" } else { "image" }, Max::Many, |m| {
            m.one("comment", "string");
            m.one("link", "Reference").summary().required();
        })
        .summary();
        t.one("conclusion", "string");
        t.many(
            if r4 { "conclusionCode" } else { "codedDiagnosis" },
            "CodeableConcept",
        );
        t.many("presentedForm", "Attachment");
    });

    b.resource("Bundle", |t| {
        t.one("identifier", "Identifier").summary();
        t.one("type", "code").summary().required();
        if t.version() == FhirVersion::R4 {
            t.one("timestamp", "instant").summary();
        }
        t.one("total", "unsignedInt").summary();
        t.backbone("link", Max::Many, |l| {
            l.one("relation", "string").summary().required();
            l.one("url", "uri").summary().required();
        })
        .summary();
        t.backbone("entry", Max::Many, |e| {
            e.many("link", "Bundle.link").summary();
            e.one("fullUrl", "uri").summary();
            e.one("resource", "Resource").summary();
            e.backbone("search", Max::One, |s| {
                s.one("mode", "code").summary();
                s.one("score", "decimal").summary();
            })
            .summary();
            e.backbone("request", Max::One, |r| {
                r.one("method", "code").summary().required();
                r.one("url", "uri").summary().required();
                r.one("ifNoneMatch", "string").summary();
                r.one("ifModifiedSince", "instant").summary();
                r.one("ifMatch", "string").summary();
                r.one("ifNoneExist", "string").summary();
            })
            .summary();
            e.backbone("response", Max::One, |r| {
                r.one("status", "string").summary().required();
                r.one("location", "uri").summary();
                r.one("etag", "string").summary();
                r.one("lastModified", "instant").summary();
                r.one("outcome", "Resource").summary();
            })
            .summary();
        })
        .summary();
    });

    b.resource("Binary", |t| {
        t.one("contentType", "code").summary().required();
        t.one("securityContext", "Reference").summary();
        if t.version() == FhirVersion::R4 {
            t.one("data", "base64Binary");
        } else {
            t.one("content", "base64Binary").required();
        }
    });

    b.resource("Parameters", |t| {
        t.backbone("parameter", Max::Many, |p| {
            p.one("name", "string").summary().required();
            p.choice("value", &open).summary();
            p.one("resource", "Resource").summary();
            p.many("part", "Parameters.parameter").summary();
        })
        .summary();
    });

    b.domain_resource("Organization", |t| {
        t.many("identifier", "Identifier").summary();
        t.one("active", "boolean").modifier();
        t.many("type", "CodeableConcept").summary();
        t.one("name", "string").summary();
        t.many("alias", "string");
        t.many("telecom", "ContactPoint");
        t.many("address", "Address");
        t.one("partOf", "Reference").summary();
        t.backbone("contact", Max::Many, |c| {
            c.one("purpose", "CodeableConcept");
            c.one("name", "HumanName");
            c.many("telecom", "ContactPoint");
            c.one("address", "Address");
        });
        t.many("endpoint", "Reference");
    });

    b.domain_resource("Practitioner", |t| {
        t.many("identifier", "Identifier").summary();
        t.one("active", "boolean").summary();
        t.many("name", "HumanName").summary();
        t.many("telecom", "ContactPoint").summary();
        t.many("address", "Address").summary();
        t.one("gender", "code").summary();
        t.one("birthDate", "date").summary();
        t.many("photo", "Attachment");
        t.backbone("qualification", Max::Many, |q| {
            q.many("identifier", "Identifier");
            q.one("code", "CodeableConcept").required();
            q.one("period", "Period");
            q.one("issuer", "Reference");
        });
        t.many("communication", "CodeableConcept");
    });

    b.domain_resource("Medication", |t| {
        if t.version() == FhirVersion::R4 {
            t.many("identifier", "Identifier").summary();
        }
        t.one("code", "CodeableConcept").summary();
        t.one("status", "code").modifier();
        if t.version() == FhirVersion::Stu3 {
            t.one("isBrand", "boolean").summary();
            t.one("isOverTheCounter", "boolean").summary();
        }
        t.one("manufacturer", "Reference").summary();
        t.one("form", "CodeableConcept");
        t.backbone("ingredient", Max::Many, |i| {
            i.choice("item", &["CodeableConcept", "Reference"]).required();
            i.one("isActive", "boolean");
        });
        if t.version() == FhirVersion::R4 {
            t.backbone("batch", Max::One, |b| {
                b.one("lotNumber", "string");
                b.one("expirationDate", "dateTime");
            });
        }
    });
}

fn observation_value(t: &mut TypeBuilder<'_>) {
    let types: &[&str] = match t.version() {
        FhirVersion::R4 => &[
            "Quantity",
            "CodeableConcept",
            "string",
            "boolean",
            "integer",
            "Range",
            "time",
            "dateTime",
            "Period",
        ],
        FhirVersion::Stu3 => &[
            "Quantity",
            "CodeableConcept",
            "string",
            "boolean",
            "Range",
            "Attachment",
            "time",
            "dateTime",
            "Period",
        ],
    };
    t.choice("value", types).summary();
}
