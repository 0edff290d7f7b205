use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use chartmatch::{as_yaml, find_match, parse_documents, validate_object, MatchOutcome, ObjectError};

use crate::render::{RenderError, TemplateEngine, TmpFiles};
use crate::spec::{SpecError, TestSpec};

/// Well-known names of the transient files written during a run.
pub const VALUES_FILE: &str = "values.yaml";
pub const TEMPLATE_FILE: &str = "template.yaml";

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("failed to read test file: {0:?}")]
    ReadTestFile(io::Error),

    #[error("invalid test spec: {0}")]
    InvalidSpec(#[from] SpecError),

    #[error(transparent)]
    MalformedObject(#[from] ObjectError),

    #[error("helm template command failed: {0}")]
    RenderFailed(#[from] RenderError),

    #[error("failed to create temporary file: {0:?}")]
    TmpFileCreation(io::Error),

    #[error("no match found for {0} expected block(s)")]
    ExpectedNotFound(usize),

    #[error("match found for {0} unexpected block(s)")]
    UnexpectedFound(usize),
}

/// How a run ended without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// The test asked to be skipped. Distinct from success in reporting,
    /// identical in exit status.
    Skipped,
}

/// Everything a single run needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub test_file: PathBuf,
    pub retain_tmp_files: bool,
    /// Directory holding the transient values.yaml / template.yaml pair.
    pub tmp_dir: PathBuf,
}

impl RunConfig {
    pub fn new(test_file: PathBuf) -> RunConfig {
        RunConfig {
            test_file,
            retain_tmp_files: false,
            tmp_dir: env::temp_dir(),
        }
    }
}

/// Run a single template test end to end: parse the test file, render the
/// chart with its values, and assert the expected and unexpected blocks
/// against the rendered object set.
pub fn run_test(config: &RunConfig, engine: &dyn TemplateEngine) -> Result<Outcome, CheckError> {
    println!("Running test from file: {} ...", config.test_file.display());

    let text = fs::read_to_string(&config.test_file).map_err(CheckError::ReadTestFile)?;
    let spec = TestSpec::parse(&text)?;

    if spec.params.skip_test {
        println!("skipTest is set to true in PARAMETERS section. Skipping this test.");
        return Ok(Outcome::Skipped);
    }

    debug!("validating expected and unexpected blocks have required fields");
    for block in spec.expected.iter().chain(spec.unexpected.iter()) {
        validate_object(block)?;
    }

    let mut tmp_files = TmpFiles::new(config.tmp_dir.clone(), config.retain_tmp_files);
    let values_path = tmp_files
        .write(VALUES_FILE, &spec.values)
        .map_err(CheckError::TmpFileCreation)?;

    let release_name = release_name(config, &spec);
    info!("rendering template for release {}", release_name);
    let rendered = engine.render(&release_name, &values_path)?;
    tmp_files
        .write(TEMPLATE_FILE, &rendered)
        .map_err(CheckError::TmpFileCreation)?;

    let objects = parse_documents(&rendered)?;
    debug!("validating {} rendered objects", objects.len());
    for object in &objects {
        validate_object(object)?;
    }

    debug!("verifying that a match is found for each expected block");
    let mut missing_expected = 0;
    for block in &spec.expected {
        if find_match(&objects, block) != MatchOutcome::Satisfied {
            println!("No match found for expected block:");
            println!("{}", as_yaml(block));
            missing_expected += 1;
        }
    }

    debug!("verifying that a match is not found for any unexpected block");
    let mut found_unexpected = 0;
    for block in &spec.unexpected {
        match find_match(&objects, block) {
            MatchOutcome::Satisfied => {
                println!("Match found for unexpected block:");
                println!("{}", as_yaml(block));
                found_unexpected += 1;
            }
            MatchOutcome::NoCandidate => {
                // A triple that matches nothing passes trivially, which
                // usually means a typo in the test file
                warn!(
                    "no version/kind/name match found for unexpected block; ensure the correct apiVersion, kind, and metadata.name are set:\n{}",
                    as_yaml(block)
                );
            }
            MatchOutcome::NotSatisfied => {}
        }
    }

    if missing_expected > 0 || found_unexpected > 0 {
        print_rendered(&rendered);
        return Err(if missing_expected > 0 {
            CheckError::ExpectedNotFound(missing_expected)
        } else {
            CheckError::UnexpectedFound(found_unexpected)
        });
    }

    println!("Test passed!");
    Ok(Outcome::Passed)
}

/// Release name from the test parameters, falling back to the test file's
/// own name.
fn release_name(config: &RunConfig, spec: &TestSpec) -> String {
    if let Some(name) = &spec.params.release_name {
        return name.clone();
    }
    config
        .test_file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("template-test")
        .to_string()
}

fn print_rendered(rendered: &str) {
    println!("helm template output:");
    for line in rendered.lines() {
        println!("{}", line);
    }
}
