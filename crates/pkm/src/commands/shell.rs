use std::env;
use std::process::Command;

use crate::context::Context;

use super::ExitStatus;

/// `pkm shell`: activates the project environment and spawns the user's `$SHELL` with the
/// environment's script directory prepended to `PATH`. Exits with the shell's own exit status
/// translated into the success/failure split this CLI's other commands use.
pub fn shell(ctx: &Context, project_name: &str) -> anyhow::Result<ExitStatus> {
    let env_root = ctx.zoo.env_root(pkm_venv::EnvironmentKind::Application, project_name);
    if !pkm_venv::canonical_interpreter_path(&env_root).is_file() {
        tracing::error!(project = project_name, "no environment found for this project; run `pkm install` first");
        return Ok(ExitStatus::UserError);
    }

    let scripts_dir = if cfg!(windows) { env_root.join("Scripts") } else { env_root.join("bin") };
    let path = env::var_os("PATH").unwrap_or_default();
    let mut entries: Vec<_> = env::split_paths(&path).collect();
    entries.insert(0, scripts_dir.into_std_path_buf());
    let new_path = env::join_paths(entries)?;

    let shell = env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
    tracing::info!(project = project_name, %shell, "spawning project shell");

    let status = Command::new(shell).env("PATH", new_path).env("VIRTUAL_ENV", env_root.as_str()).status()?;

    Ok(if status.success() { ExitStatus::Success } else { ExitStatus::OperationFailure })
}
