//! Runs a program once per sample and compares what it prints.

use std::borrow::Cow;
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;

use derive_builder::Builder;
use strum::Display;
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::sample::{Sample, SampleSet};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while talking to the program: {0}")]
    Io(#[from] io::Error),
    #[error("program exited with {status}")]
    Exit { status: ExitStatus, stderr: String },
    #[error("program timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Something that turns one sample input into program output.
pub trait Executor {
    fn execute(&self, input: &str) -> Result<ProcessOutput, ExecutionError>;
}

/// Spawns a fresh child process per call.
#[derive(Debug, Clone, Builder)]
pub struct ProcessExecutor {
    #[builder(setter(into))]
    program: PathBuf,
    #[builder(default)]
    args: Vec<OsString>,
    #[builder(default = "Some(DEFAULT_TIMEOUT)")]
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    fn spawn(&self) -> Result<Child, ExecutionError> {
        let mut command = Command::new(&self.program);
        group::isolate(&mut command);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecutionError::Launch {
                program: self.program.display().to_string(),
                source,
            })
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, ExecutionError> {
        let Some(limit) = self.timeout else {
            return Ok(child.wait()?);
        };
        match child.wait_timeout(limit)? {
            Some(status) => Ok(status),
            None => {
                warn!(pid = child.id(), ?limit, "killing program after timeout");
                let _ = child.kill();
                let _ = child.wait();
                Err(ExecutionError::Timeout(limit))
            }
        }
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, input: &str) -> Result<ProcessOutput, ExecutionError> {
        let mut child = self.spawn()?;
        let group = ProcessGroup::track(child.id());
        debug!(pid = child.id(), program = %self.program.display(), "spawned program");

        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "child pipes unavailable").into());
        };
        let input = with_trailing_newline(input);

        // pipes are drained while waiting so a chatty child never blocks on a full buffer
        thread::scope(|s| {
            let writer = s.spawn(move || match stdin.write_all(input.as_bytes()) {
                // the program may exit without reading all of its input
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            });
            let out = s.spawn(move || read_lossy(stdout));
            let err = s.spawn(move || read_lossy(stderr));

            let status = self.wait(&mut child);
            // leftover descendants would keep the pipes open
            drop(group);
            let written = join(writer);
            let stdout = join(out);
            let stderr = join(err);

            let status = status?;
            written?;
            let (stdout, stderr) = (stdout?, stderr?);
            if !status.success() {
                return Err(ExecutionError::Exit { status, stderr });
            }
            Ok(ProcessOutput { stdout, stderr })
        })
    }
}

/// Process groups of programs currently under test.
static RUNNING: Mutex<Vec<u32>> = Mutex::new(Vec::new());

/// Kills every program the harness is running, along with anything they
/// started. Called when `cfkit` itself is interrupted or terminated.
pub fn kill_running() {
    let running = match RUNNING.lock() {
        Ok(running) => running,
        Err(poisoned) => poisoned.into_inner(),
    };
    for &pgid in running.iter() {
        group::kill(pgid);
    }
}

/// A child leading its own process group. Dropping it kills the group.
struct ProcessGroup(u32);

impl ProcessGroup {
    fn track(pgid: u32) -> Self {
        if let Ok(mut running) = RUNNING.lock() {
            running.push(pgid);
        }
        Self(pgid)
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        group::kill(self.0);
        if let Ok(mut running) = RUNNING.lock() {
            running.retain(|&pgid| pgid != self.0);
        }
    }
}

#[cfg(unix)]
mod group {
    use std::os::unix::process::CommandExt;
    use std::process::Command;

    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    use tracing::{debug, warn};

    pub fn isolate(command: &mut Command) {
        command.process_group(0);
    }

    pub fn kill(pgid: u32) {
        let Ok(raw) = i32::try_from(pgid) else {
            return;
        };
        match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => debug!(pgid, "killed process group"),
            Err(Errno::ESRCH) => {}
            Err(e) => warn!(pgid, error = %e, "could not kill process group"),
        }
    }
}

#[cfg(not(unix))]
mod group {
    use std::process::Command;

    pub fn isolate(_command: &mut Command) {}

    pub fn kill(_pgid: u32) {}
}

fn with_trailing_newline(input: &str) -> Cow<'_, str> {
    if input.is_empty() || input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

fn read_lossy(mut pipe: impl Read) -> io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn join<T>(handle: ScopedJoinHandle<'_, io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .map_err(|_| io::Error::other("pipe thread panicked"))?
}

#[derive(Debug, Display)]
pub enum Verdict {
    #[strum(serialize = "OK")]
    Passed,
    #[strum(serialize = "FAIL")]
    Mismatch,
    #[strum(serialize = "ERROR")]
    Error(ExecutionError),
}

#[derive(Debug)]
pub struct TestOutcome {
    /// 1-based sample index.
    pub index: usize,
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub stderr: String,
    pub verdict: Verdict,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Passed)
    }

    pub fn error(&self) -> Option<&ExecutionError> {
        match &self.verdict {
            Verdict::Error(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct TestRun {
    pub outcomes: Vec<TestOutcome>,
    pub passed: usize,
    pub total: usize,
}

impl TestRun {
    pub fn new(outcomes: Vec<TestOutcome>) -> Self {
        let passed = outcomes.iter().filter(|o| o.passed()).count();
        Self {
            total: outcomes.len(),
            passed,
            outcomes,
        }
    }

    pub fn failed(&self) -> usize {
        self.total - self.passed
    }

    pub fn errors(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error().is_some()).count()
    }

    pub fn is_success(&self) -> bool {
        self.passed == self.total
    }
}

/// Outputs match when they are equal after trimming surrounding whitespace once,
/// globally. Inner whitespace and line structure must match exactly.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

pub fn evaluate<E: Executor + ?Sized>(index: usize, sample: &Sample, executor: &E) -> TestOutcome {
    let (actual, stderr, verdict) = match executor.execute(&sample.input) {
        Ok(output) => {
            let verdict = if outputs_match(&output.stdout, &sample.output) {
                Verdict::Passed
            } else {
                Verdict::Mismatch
            };
            (output.stdout, output.stderr, verdict)
        }
        Err(e) => {
            let stderr = match &e {
                ExecutionError::Exit { stderr, .. } => stderr.clone(),
                _ => String::new(),
            };
            (String::new(), stderr, Verdict::Error(e))
        }
    };
    debug!(index, verdict = %verdict, "evaluated sample");
    TestOutcome {
        index,
        input: sample.input.clone(),
        expected: sample.output.clone(),
        actual,
        stderr,
        verdict,
    }
}

/// Runs every sample in order. Per-sample failures never stop the run.
pub fn run_with<E: Executor + ?Sized>(samples: &SampleSet, executor: &E) -> TestRun {
    TestRun::new(
        samples
            .numbered()
            .map(|(index, sample)| evaluate(index, sample, executor))
            .collect(),
    )
}

pub fn run_tests(samples: &SampleSet, program: &Path, timeout: Option<Duration>) -> TestRun {
    run_with(samples, &ProcessExecutor::new(program, timeout))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Sums whitespace-separated integers; fails on the word `crash`.
    struct Adder {
        calls: RefCell<Vec<String>>,
    }

    impl Adder {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Executor for Adder {
        fn execute(&self, input: &str) -> Result<ProcessOutput, ExecutionError> {
            self.calls.borrow_mut().push(input.to_string());
            if input.contains("crash") {
                return Err(ExecutionError::Launch {
                    program: "adder".into(),
                    source: io::Error::new(io::ErrorKind::NotFound, "gone"),
                });
            }
            let sum: i64 = input
                .split_whitespace()
                .filter_map(|t| t.parse::<i64>().ok())
                .sum();
            Ok(ProcessOutput {
                stdout: format!("{sum}\n"),
                stderr: String::new(),
            })
        }
    }

    fn samples(pairs: &[(&str, &str)]) -> SampleSet {
        pairs.iter().map(|(i, o)| Sample::new(*i, *o)).collect()
    }

    #[test]
    fn trailing_newline_should_still_pass() {
        let run = run_with(&samples(&[("2 3", "5")]), &Adder::new());
        assert!(run.is_success());
        assert_eq!(run.outcomes[0].actual, "5\n");
    }

    #[test]
    fn comparison_trims_once_globally() {
        assert!(outputs_match("  1 2\n3\n\n", "1 2\n3"));
        assert!(!outputs_match("1  2", "1 2"));
        assert!(!outputs_match("1 \n2", "1\n2"));
    }

    #[test]
    fn errors_are_isolated_to_their_sample() {
        let adder = Adder::new();
        let run = run_with(&samples(&[("1 1", "2"), ("crash", "0"), ("4", "4")]), &adder);
        assert_eq!(run.total, 3);
        assert_eq!(run.passed, 2);
        assert_eq!(run.errors(), 1);
        assert!(!run.is_success());
        assert!(matches!(run.outcomes[1].verdict, Verdict::Error(_)));
        assert_eq!(adder.calls.borrow().len(), 3);
    }

    #[test]
    fn mismatch_is_not_an_execution_error() {
        let run = run_with(&samples(&[("1 1", "3")]), &Adder::new());
        let outcome = &run.outcomes[0];
        assert!(matches!(outcome.verdict, Verdict::Mismatch));
        assert!(outcome.error().is_none());
        assert_eq!(run.failed(), 1);
    }

    #[test]
    fn outcomes_keep_sample_order_and_index() {
        let adder = Adder::new();
        let set = samples(&[("1", "1"), ("2", "2"), ("3", "3")]);
        let run = run_with(&set, &adder);
        let indexes: Vec<usize> = run.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert_eq!(*adder.calls.borrow(), vec!["1", "2", "3"]);
    }

    #[test]
    fn verdict_labels() {
        assert_eq!(Verdict::Passed.to_string(), "OK");
        assert_eq!(Verdict::Mismatch.to_string(), "FAIL");
        assert_eq!(
            Verdict::Error(ExecutionError::Timeout(Duration::from_secs(1))).to_string(),
            "ERROR"
        );
    }

    #[test]
    fn input_gets_a_trailing_newline() {
        assert_eq!(with_trailing_newline("1 2"), "1 2\n");
        assert_eq!(with_trailing_newline("1 2\n"), "1 2\n");
        assert_eq!(with_trailing_newline(""), "");
    }

    #[cfg(unix)]
    #[test]
    fn kill_running_stops_programs_under_test() {
        use std::time::Instant;

        let executor = ProcessExecutorBuilder::default()
            .program("sh")
            .args(vec![OsString::from("-c"), OsString::from("sleep 30; echo late")])
            .timeout(None)
            .build()
            .unwrap();
        let started = Instant::now();
        let handle = thread::spawn(move || executor.execute(""));
        while RUNNING.lock().unwrap().is_empty() {
            assert!(started.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(10));
        }

        kill_running();
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(ExecutionError::Exit { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(RUNNING.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let executor = ProcessExecutor::new("./definitely-not-here-cfkit", None);
        let err = executor.execute("1").unwrap_err();
        assert!(matches!(err, ExecutionError::Launch { .. }));
    }
}
