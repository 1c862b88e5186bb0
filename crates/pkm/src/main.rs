use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;

use crate::cli::{Cli, Command};
use crate::commands::ExitStatus;
use crate::context::Context;

mod cli;
mod commands;
mod context;
mod logging;
mod metadata_source;
mod resolve;

async fn inner() -> Result<ExitStatus> {
    let cli = Cli::parse();
    logging::setup(cli.verbose)?;

    let ctx = Context::discover(None, cli.verbose)?;
    let source_tree = cli.context.clone().unwrap_or_else(|| camino::Utf8PathBuf::from("."));

    // `--global-context` operates against one shared environment instead of the current
    // project's, the global (cross-project) context alternative to the default per-project one.
    let env_name = if cli.global_context { "global".to_string() } else { project_name(&source_tree) };

    match cli.command {
        Command::Build => commands::build(&ctx, &source_tree),
        Command::Install(args) => commands::install(&ctx, &env_name, &args.deps),
        Command::Remove(args) => commands::remove(&ctx, &env_name, &args.packages),
        Command::New(args) => commands::new(&args.template, &args.args),
        Command::Publish(args) => commands::publish(&source_tree, &args.user, &args.password),
        Command::Vbump(args) => commands::vbump(&source_tree, args.part),
        Command::Shell => commands::shell(&ctx, &env_name),
        Command::Show(args) => commands::show(
            &ctx,
            &env_name,
            args.target.map(|t| match t {
                cli::ShowTarget::Package { dep } => dep,
            }).as_deref(),
        ),
    }
}

/// The project name a command operates on: read from `pyproject.toml`'s `[project].name` when
/// present, falling back to the source tree's directory name (e.g. for `pkm new`'s target before
/// any `pyproject.toml` exists).
fn project_name(source_tree: &camino::Utf8Path) -> String {
    pkm_build::ProjectIdentity::from_source_tree(source_tree)
        .map(|identity| identity.name)
        .unwrap_or_else(|_| source_tree.file_name().unwrap_or("project").to_string())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match inner().await {
        Ok(status) => status.into(),
        Err(err) => {
            let mut causes = err.chain();
            eprintln!("{}: {}", "error".red().bold(), causes.next().expect("anyhow errors always have a first cause"));
            for cause in causes {
                eprintln!("  {}: {}", "caused by".red().bold(), cause);
            }
            ExitStatus::OperationFailure.into()
        }
    }
}
