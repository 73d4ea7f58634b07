use colored::Colorize;

use crate::harness::{TestOutcome, TestRun, Verdict};

pub fn render_human(run: &TestRun) -> String {
    let mut out = String::new();
    for outcome in &run.outcomes {
        render_outcome(&mut out, outcome);
    }
    let summary = format!(
        "Test summary: Passed {} out of {} tests.",
        run.passed, run.total
    );
    if run.is_success() {
        out.push_str(&format!("{} {}\n", "✔".green().bold(), summary.cyan().bold()));
    } else {
        out.push_str(&format!("{} {}\n", "✘".red().bold(), summary.cyan().bold()));
    }
    out
}

fn render_outcome(out: &mut String, outcome: &TestOutcome) {
    let header = format!("=== Test {} ===", outcome.index).bold();
    let label = outcome.verdict.to_string();
    match &outcome.verdict {
        Verdict::Passed => {
            out.push_str(&format!("{header} [{}]\n", label.green().bold()));
        }
        Verdict::Mismatch => {
            out.push_str(&format!("{header} [{}]\n", label.red().bold()));
            section(out, "Input:", &outcome.input);
            section(out, "Your output:", &outcome.actual);
            section(out, "Expected:", &outcome.expected);
            out.push('\n');
        }
        Verdict::Error(err) => {
            out.push_str(&format!("{header} [{}]\n", label.red().bold()));
            out.push_str(&format!("{} {}\n", "Execution error:".yellow(), err.to_string().red()));
            section(out, "Input:", &outcome.input);
            if !outcome.stderr.trim().is_empty() {
                section(out, "Stderr:", &outcome.stderr);
            }
            out.push('\n');
        }
    }
}

fn section(out: &mut String, title: &str, body: &str) {
    out.push_str(&format!("{}\n{}\n", title.yellow(), body.trim()));
}

pub fn print_human(run: &TestRun) {
    print!("{}", render_human(run));
}
