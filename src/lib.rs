pub mod cli;
pub mod clipboard;
pub mod compile;
pub mod config;
pub mod dom;
pub mod extract;
pub mod fetch;
pub mod harness;
pub mod report;
pub mod sample;
pub mod template;
pub mod testcase;
pub mod typedefs;

pub use extract::{ExtractionError, SampleExtractor};
pub use harness::{run_tests, ExecutionError, TestOutcome, TestRun};
pub use sample::{Sample, SampleSet};
pub use testcase::{deserialize, serialize, ParseError};
