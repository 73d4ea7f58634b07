//! The `testcases.txt` format.
//!
//! ```text
//! --- Sample #1 Input ---
//! 3 4
//!
//! --- Sample #1 Output ---
//! 7
//!
//! ```
//!
//! Delimiters are not escaped: a content line that looks like a delimiter will
//! be read back as one.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use crate::sample::{Sample, SampleSet};

/// Fixed name of the testcase file in the working directory.
pub const TESTCASE_FILE: &str = "testcases.txt";

const MARKER_PREFIX: &str = "--- Sample";
const INPUT_SUFFIX: &str = "Input ---";
const OUTPUT_SUFFIX: &str = "Output ---";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no samples found")]
    Empty,
    #[error("sample #{0} has an output block but no input marker")]
    MissingInput(usize),
    #[error("sample #{0} has no output marker")]
    MissingOutput(usize),
}

pub fn input_marker(index: usize) -> String {
    format!("{MARKER_PREFIX} #{index} {INPUT_SUFFIX}")
}

pub fn output_marker(index: usize) -> String {
    format!("{MARKER_PREFIX} #{index} {OUTPUT_SUFFIX}")
}

pub fn serialize(samples: &SampleSet) -> String {
    let mut out = String::new();
    for (i, sample) in samples.numbered() {
        // writing into a String cannot fail
        let _ = write!(
            out,
            "{}\n{}\n\n{}\n{}\n\n",
            input_marker(i),
            sample.input,
            output_marker(i),
            sample.output
        );
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    None,
    Input,
    Output,
}

enum Line<'a> {
    InputMarker,
    OutputMarker,
    Text(&'a str),
}

impl<'a> Line<'a> {
    fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.starts_with(MARKER_PREFIX) {
            if trimmed.ends_with(INPUT_SUFFIX) {
                return Line::InputMarker;
            }
            if trimmed.ends_with(OUTPUT_SUFFIX) {
                return Line::OutputMarker;
            }
        }
        Line::Text(line)
    }
}

#[derive(Default)]
struct Pending<'a> {
    input: Vec<&'a str>,
    output: Vec<&'a str>,
    saw_input: bool,
    saw_output: bool,
}

impl<'a> Pending<'a> {
    fn is_started(&self) -> bool {
        self.saw_input || self.saw_output || !self.input.is_empty() || !self.output.is_empty()
    }

    fn finish(self, index: usize) -> Result<Sample, ParseError> {
        if !self.saw_input {
            return Err(ParseError::MissingInput(index));
        }
        if !self.saw_output {
            return Err(ParseError::MissingOutput(index));
        }
        Ok(Sample::new(join_block(self.input), join_block(self.output)))
    }
}

/// Joins block lines, dropping the trailing blank lines that separate blocks.
fn join_block(mut lines: Vec<&str>) -> String {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

pub fn deserialize(text: &str) -> Result<SampleSet, ParseError> {
    let mut samples = SampleSet::default();
    let mut mode = Mode::None;
    let mut pending = Pending::default();

    for line in text.lines() {
        match Line::classify(line) {
            Line::InputMarker => {
                if pending.is_started() {
                    let sample = std::mem::take(&mut pending).finish(samples.len() + 1)?;
                    samples.push(sample);
                }
                pending.saw_input = true;
                mode = Mode::Input;
            }
            Line::OutputMarker => {
                pending.saw_output = true;
                mode = Mode::Output;
            }
            Line::Text(text) => match mode {
                Mode::Input => pending.input.push(text),
                Mode::Output => pending.output.push(text),
                Mode::None => {}
            },
        }
    }
    if pending.is_started() {
        samples.push(pending.finish(samples.len() + 1)?);
    }

    if samples.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(samples)
}

pub fn write_file(path: impl AsRef<Path>, samples: &SampleSet) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, serialize(samples))
        .with_context(|| format!("could not write {}", path.display()))?;
    debug!(path = %path.display(), samples = samples.len(), "wrote testcase file");
    Ok(())
}

pub fn read_file(path: impl AsRef<Path>) -> Result<SampleSet> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let samples =
        deserialize(&text).with_context(|| format!("error parsing {}", path.display()))?;
    debug!(path = %path.display(), samples = samples.len(), "read testcase file");
    Ok(samples)
}
