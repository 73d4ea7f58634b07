//! Command tree and subcommand implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use scraper::Html;
use tracing::info;

use crate::config::{self, Config};
use crate::extract::{Normalization, SampleExtractor};
use crate::fetch::{Fetcher, ProblemUrl};
use crate::sample::SampleSet;
use crate::testcase::{self, TESTCASE_FILE};
use crate::{clipboard, harness, report, typedefs};

#[derive(Debug, Parser)]
#[command(
    name = "cfkit",
    version,
    about = "Competitive programming workflow helper",
    long_about = "Fetches sample tests from Codeforces, scaffolds a source file from a template, \
                  compiles it, and checks the program against the samples."
)]
pub struct Cli {
    /// Directory holding config.yaml and template.cpp [default: ~/.config/cfkit]
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Show debug logs (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch sample tests from a problem URL into testcases.txt
    Fetch { url: String },
    /// Fetch samples and create the source file from the template
    Setup { url: String },
    /// Compile the source file
    Build {
        /// Suppress build output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Build if needed, then run the program interactively
    Run {
        /// Suppress build output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Build if needed, then check the program against testcases.txt
    Test {
        /// Suppress build output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Remove the executable and testcases.txt
    Clean,
    /// Copy the source file to the clipboard
    Copy,
    /// Copy the source file to the clipboard without unused typedefs
    CopyClean,
}

/// Everything a command needs, resolved once at startup.
pub struct Context {
    pub config: Config,
    pub config_dir: PathBuf,
}

impl Context {
    pub fn load(config_dir: Option<PathBuf>) -> Result<Self> {
        let config_dir = match config_dir {
            Some(dir) => dir,
            None => config::default_dir()?,
        };
        let config = Config::load(&config_dir)?;
        Ok(Self { config, config_dir })
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let ctx = Context::load(self.config_dir)?;
        match self.command {
            Command::Fetch { url } => fetch(&ctx, &url).await.map(|_| ()),
            Command::Setup { url } => setup(&ctx, &url).await,
            Command::Build { quiet } => build(&ctx, quiet),
            Command::Run { quiet } => run(&ctx, quiet),
            Command::Test { quiet } => test(&ctx, quiet),
            Command::Clean => clean(&ctx),
            Command::Copy => copy(&ctx, false),
            Command::CopyClean => copy(&ctx, true),
        }
    }
}

/// Returns the canonical problem URL.
pub async fn fetch(ctx: &Context, url: &str) -> Result<ProblemUrl> {
    let problem: ProblemUrl = url.parse().context("error parsing URL")?;
    println!("Fetching samples from: {}", problem.to_string().cyan());

    let body = Fetcher::new()?.fetch(&problem).await?;
    let document = Html::parse_document(&body);
    let samples = save_samples(&document, Path::new(TESTCASE_FILE), ctx.config.normalization)?;
    println!(
        "{}",
        format!("✔ Saved {} sample(s) to {TESTCASE_FILE}", samples.len()).green()
    );
    Ok(problem)
}

/// Extracts the samples of `document` and writes them to `path`. Nothing is
/// written when extraction fails.
pub fn save_samples(
    document: &Html,
    path: &Path,
    normalization: Normalization,
) -> Result<SampleSet> {
    let samples = SampleExtractor::with_normalization(normalization).extract_html(document)?;
    testcase::write_file(path, &samples)?;
    Ok(samples)
}

pub async fn setup(ctx: &Context, url: &str) -> Result<()> {
    let problem = fetch(ctx, url).await?;

    let source = Path::new(&ctx.config.source_name);
    if source.exists() {
        println!(
            "{} already exists, leaving it untouched.",
            source.display().to_string().yellow()
        );
        return Ok(());
    }
    let url = problem.to_string();
    let content = config::load_template(&ctx.config_dir, Some(&url))?;
    fs::write(source, content)
        .with_context(|| format!("failed to create {}", source.display()))?;
    println!("{}", format!("✔ Created template {}", source.display()).green());
    Ok(())
}

pub fn build(ctx: &Context, quiet: bool) -> Result<()> {
    let target = ctx.config.target();
    if !quiet {
        println!("Compiling {}...", target.source.display().to_string().cyan());
    }
    ctx.config.compiler().compile(&target)?;
    println!(
        "{}",
        format!("✔ Build successful! Executable: {}", ctx.config.executable_name).green()
    );
    Ok(())
}

/// Rebuilds when the executable is missing or older than the source.
fn ensure_built(ctx: &Context, quiet: bool) -> Result<()> {
    let target = ctx.config.target();
    let staleness = target.staleness()?;
    if !staleness.needs_build() {
        if !quiet {
            println!(
                "{}",
                format!("'{}' is up to date, skipping build.", ctx.config.executable_name).cyan()
            );
        }
        return Ok(());
    }
    if !quiet {
        println!(
            "{}",
            format!(
                "Executable '{}' is {staleness}. Building...",
                ctx.config.executable_name
            )
            .yellow()
        );
    }
    ctx.config
        .compiler()
        .compile(&target)
        .context("Build failed")?;
    if !quiet {
        println!("{}", "Build succeeded.".green());
    }
    Ok(())
}

pub fn run(ctx: &Context, quiet: bool) -> Result<()> {
    ensure_built(ctx, quiet)?;
    let target = ctx.config.target();
    println!(
        "{}",
        format!("Running '{}'...", ctx.config.executable_name).cyan()
    );
    let status = Process::new(&target.executable)
        .status()
        .with_context(|| format!("failed to start {}", target.executable.display()))?;
    if !status.success() {
        bail!("Program exited with error: {status}");
    }
    Ok(())
}

pub fn test(ctx: &Context, quiet: bool) -> Result<()> {
    ensure_built(ctx, quiet)?;
    let samples = testcase::read_file(TESTCASE_FILE)?;

    println!("{}", "Running tests...".cyan());
    let run = harness::run_tests(
        &samples,
        &ctx.config.target().executable,
        ctx.config.timeout(),
    );
    report::print_human(&run);
    info!(passed = run.passed, total = run.total, "test run finished");

    if !run.is_success() {
        bail!("{} of {} sample(s) failed", run.failed(), run.total);
    }
    Ok(())
}

pub fn clean(ctx: &Context) -> Result<()> {
    let executable = ctx.config.target().executable;
    for path in [executable.as_path(), Path::new(TESTCASE_FILE)] {
        if !path.exists() {
            println!("{} not found, nothing to clean.", path.display().to_string().yellow());
            continue;
        }
        fs::remove_file(path).with_context(|| format!("Error removing {}", path.display()))?;
        println!("{}", format!("✔ Removed {}", path.display()).green());
    }
    Ok(())
}

pub fn copy(ctx: &Context, clean_typedefs: bool) -> Result<()> {
    let source = &ctx.config.source_name;
    let content =
        fs::read_to_string(source).with_context(|| format!("Error reading {source}"))?;
    let content = if clean_typedefs {
        typedefs::clean_typedefs(&content)?
    } else {
        content
    };
    clipboard::copy(&content)?;
    println!("{}", "✔ Content copied to clipboard!".green());
    Ok(())
}
