use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use chartmatch::ObjectError;

pub const PARAMETERS_MARKER: &str = "### SECTION:PARAMETERS ###";
pub const VALUES_MARKER: &str = "### SECTION:VALUES ###";
pub const EXPECTED_MARKER: &str = "### SECTION:EXPECTED ###";
pub const UNEXPECTED_MARKER: &str = "### SECTION:UNEXPECTED ###";

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("no values section found in test file")]
    MissingValues,

    #[error("no expected or unexpected sections found in test file")]
    MissingAssertions,

    #[error("failed to parse parameters section: {0:?}")]
    InvalidParameters(serde_yaml::Error),

    #[error("failed to parse {section} section: {source}")]
    InvalidFragments {
        section: &'static str,
        source: ObjectError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Parameters,
    Values,
    Expected,
    Unexpected,
}

/// Raw section text split out of a test file.
///
/// Lines between a marker and the next marker (or end of input) belong to
/// that section; lines before the first marker are discarded. A repeated
/// marker appends to the section's already accumulated text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sections {
    pub parameters: String,
    pub values: String,
    pub expected: String,
    pub unexpected: String,
}

pub fn split_sections(text: &str) -> Result<Sections, SpecError> {
    let mut sections = Sections::default();
    let mut found: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        let marker = match line.trim_end() {
            PARAMETERS_MARKER => Some(Section::Parameters),
            VALUES_MARKER => Some(Section::Values),
            EXPECTED_MARKER => Some(Section::Expected),
            UNEXPECTED_MARKER => Some(Section::Unexpected),
            _ => None,
        };

        if let Some(section) = marker {
            if !found.contains(&section) {
                found.push(section);
            }
            current = Some(section);
            continue;
        }

        let target = match current {
            Some(Section::Parameters) => &mut sections.parameters,
            Some(Section::Values) => &mut sections.values,
            Some(Section::Expected) => &mut sections.expected,
            Some(Section::Unexpected) => &mut sections.unexpected,
            None => continue,
        };
        target.push_str(line);
        target.push('\n');
    }

    if !found.contains(&Section::Values) {
        return Err(SpecError::MissingValues);
    }
    if !found.contains(&Section::Expected) && !found.contains(&Section::Unexpected) {
        return Err(SpecError::MissingAssertions);
    }

    Ok(sections)
}

/// Test-level configuration from the PARAMETERS section. Unknown keys are
/// ignored; an empty or absent section decodes to the defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Params {
    pub skip_test: bool,
    pub release_name: Option<String>,
}

impl Params {
    pub fn parse(text: &str) -> Result<Params, SpecError> {
        if text.trim().is_empty() {
            return Ok(Params::default());
        }
        serde_yaml::from_str(text).map_err(SpecError::InvalidParameters)
    }
}

/// A fully decoded test specification.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    pub params: Params,
    /// Raw values text, forwarded verbatim to the rendering engine.
    pub values: String,
    pub expected: Vec<Value>,
    pub unexpected: Vec<Value>,
}

impl TestSpec {
    pub fn parse(text: &str) -> Result<TestSpec, SpecError> {
        let sections = split_sections(text)?;
        let params = Params::parse(&sections.parameters)?;
        let expected = chartmatch::parse_documents(&sections.expected).map_err(|source| {
            SpecError::InvalidFragments {
                section: "expected",
                source,
            }
        })?;
        let unexpected = chartmatch::parse_documents(&sections.unexpected).map_err(|source| {
            SpecError::InvalidFragments {
                section: "unexpected",
                source,
            }
        })?;

        debug!(
            expected = expected.len(),
            unexpected = unexpected.len(),
            "parsed test spec"
        );

        Ok(TestSpec {
            params,
            values: sections.values,
            expected,
            unexpected,
        })
    }
}
