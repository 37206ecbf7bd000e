//! flowpack: build Azkaban workflow projects and deploy them.
//!
//! # Usage
//!
//! ```text
//! flowpack (--project-dir <dir> | --definition <file> | --projects-root <dir>)
//!          (--local | --azkaban-alias <alias> | --azkaban-url <url>)
//!          [--global-props-file <file>] [--extra-props-file <file>]
//!          [--files-dir <dir>] [--build-version <v>] [--output-dir <dir>]
//!          [--fail-fast] [--user <name>] [--password <pw>] [-v]
//! ```

mod config;
mod summary;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};

use flowpack_deploy::{run_batch, BatchPolicy};
use flowpack_remote::Session;

use config::{Source, Target};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "flowpack",
    version,
    about = "Build Azkaban workflow projects from YAML and upload them",
    long_about = None,
)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["definition", "project_dir", "projects_root"]),
))]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["azkaban_alias", "azkaban_url", "local"]),
))]
struct Cli {
    /// Project definition file; only --files-dir is attached.
    #[arg(long, value_name = "FILE")]
    definition: Option<PathBuf>,

    /// Project directory containing project.yml; all its files are attached.
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Directory whose subdirectories are each a project.
    #[arg(long, value_name = "DIR")]
    projects_root: Option<PathBuf>,

    /// Remote alias from ~/.flowpack/remotes.yaml.
    #[arg(long, value_name = "ALIAS")]
    azkaban_alias: Option<String>,

    /// Azkaban server URL, optionally with the user name (https://user@host).
    #[arg(long, value_name = "URL")]
    azkaban_url: Option<String>,

    /// Build the archive without uploading it.
    #[arg(long)]
    local: bool,

    /// Properties shared by every project [default: <root>/global.yml].
    #[arg(long, value_name = "FILE")]
    global_props_file: Option<PathBuf>,

    /// Properties overriding the project's own.
    #[arg(long, value_name = "FILE")]
    extra_props_file: Option<PathBuf>,

    /// Extra directory attached to every archive.
    #[arg(long, value_name = "DIR")]
    files_dir: Option<PathBuf>,

    /// Version to stamp instead of the git revision.
    #[arg(long, value_name = "VERSION")]
    build_version: Option<String>,

    /// Where archives are written.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Stop at the first project that fails.
    #[arg(long)]
    fail_fast: bool,

    #[arg(long, env = "AZKABAN_USER")]
    user: Option<String>,

    /// Falls back to the alias's password variable, then $AZKABAN_PASSWORD.
    #[arg(long)]
    password: Option<String>,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::info!("flowpack version {}", env!("CARGO_PKG_VERSION"));

    let source = Source::from_args(cli.definition, cli.project_dir, cli.projects_root)?;
    let target = Target::from_args(cli.azkaban_alias, cli.azkaban_url, cli.local)?;

    let options = config::pipeline_options(
        &source,
        cli.global_props_file.as_deref(),
        cli.extra_props_file.as_deref(),
        cli.files_dir,
        cli.build_version.as_deref(),
        cli.output_dir,
    )?;
    let inputs = source.inputs()?;
    let session = target
        .connect(cli.user, cli.password)
        .context("failed to open Azkaban session")?;
    let session = session.as_ref().map(|s| s as &dyn Session);

    let policy = if cli.fail_fast {
        BatchPolicy::FailFast
    } else {
        BatchPolicy::ContinueOnError
    };
    let outcomes = run_batch(session, &inputs, &options, policy);
    summary::print(&outcomes);

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        bail!("{failed} of {} projects failed", inputs.len());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
