//! Encoder and decoder configuration

use ferrum_models::Resource;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Produces narrative XHTML for resources that carry none.
pub trait NarrativeGenerator: Send + Sync {
    /// The `div` content, or `None` to leave the resource without narrative.
    fn generate(&self, resource: &Resource) -> Option<String>;
}

impl<F> NarrativeGenerator for F
where
    F: Fn(&Resource) -> Option<String> + Send + Sync,
{
    fn generate(&self, resource: &Resource) -> Option<String> {
        self(resource)
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Indented output
    pub pretty: bool,
    /// Drop `text` from every resource and mark the output as subsetted
    pub suppress_narrative: bool,
    /// Leave out the root resource's `id`
    pub omit_resource_id: bool,
    /// Emit only summary elements
    pub summary: bool,
    /// Re-emit comments captured while decoding
    pub preserve_comments: bool,
    /// Allow-list of element paths (`Patient.name`, `*.meta`)
    pub include: Vec<String>,
    /// Deny-list of element paths
    pub exclude: Vec<String>,
    #[serde(skip)]
    pub narrative_generator: Option<Arc<dyn NarrativeGenerator>>,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_suppress_narrative(mut self, suppress: bool) -> Self {
        self.suppress_narrative = suppress;
        self
    }

    pub fn with_omit_resource_id(mut self, omit: bool) -> Self {
        self.omit_resource_id = omit;
        self
    }

    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_preserve_comments(mut self, preserve: bool) -> Self {
        self.preserve_comments = preserve;
        self
    }

    pub fn with_include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_exclude<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_narrative_generator(mut self, generator: impl NarrativeGenerator + 'static) -> Self {
        self.narrative_generator = Some(Arc::new(generator));
        self
    }
}

impl fmt::Debug for EncodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("pretty", &self.pretty)
            .field("suppress_narrative", &self.suppress_narrative)
            .field("omit_resource_id", &self.omit_resource_id)
            .field("summary", &self.summary)
            .field("preserve_comments", &self.preserve_comments)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("narrative_generator", &self.narrative_generator.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Capture comments into the tree
    pub preserve_comments: bool,
    /// Fail on unknown elements instead of skipping them
    pub strict: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preserve_comments(mut self, preserve: bool) -> Self {
        self.preserve_comments = preserve;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
