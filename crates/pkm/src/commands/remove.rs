use pkm_normalize::PackageName;

use crate::context::Context;

use super::ExitStatus;

/// `pkm remove <packages...>`: uninstalls each named package from the project environment.
/// Dropping the package from the project's `pyproject.toml` dependency table is a project-config
/// concern this workspace's crates don't own, so only the environment-level uninstall runs here.
pub fn remove(ctx: &Context, project_name: &str, packages: &[String]) -> anyhow::Result<ExitStatus> {
    let env_root = ctx.zoo.env_root(pkm_venv::EnvironmentKind::Application, project_name);
    if !env_root.is_dir() {
        tracing::error!(project = project_name, "no environment found for this project");
        return Ok(ExitStatus::UserError);
    }

    let interpreter_path = pkm_venv::canonical_interpreter_path(&env_root);
    let info = pkm_interpreter::query_interpreter(&interpreter_path)?;
    let python_tag = format!("python{}.{}", info.major, info.minor);
    let layout = if cfg!(windows) {
        pkm_distribution::EnvironmentLayout::windows(&env_root)
    } else {
        pkm_distribution::EnvironmentLayout::posix(&env_root, &python_tag)
    };
    let env = pkm_distribution::Environment {
        interpreter: interpreter_path,
        markers: info.marker_environment(),
        compatible_tags: info.compatible_tags,
        layout,
    };

    for raw in packages {
        let Ok(name) = PackageName::new(raw) else {
            tracing::error!(name = raw, "not a valid package name");
            return Ok(ExitStatus::UserError);
        };
        pkm_install::uninstall(&env, &name)?;
        tracing::info!(%name, "removed");
    }

    Ok(ExitStatus::Success)
}
