use pkm_normalize::PackageName;

use crate::context::Context;

use super::ExitStatus;

/// `pkm show [package <dep>]`: with no target, lists every package installed in the project
/// environment; with `package <dep>`, prints just that one's report.
pub fn show(ctx: &Context, project_name: &str, package: Option<&str>) -> anyhow::Result<ExitStatus> {
    let env_root = ctx.zoo.env_root(pkm_venv::EnvironmentKind::Application, project_name);
    if !pkm_venv::canonical_interpreter_path(&env_root).is_file() {
        tracing::error!(project = project_name, "no environment found for this project");
        return Ok(ExitStatus::UserError);
    }

    let info = pkm_interpreter::query_interpreter(&pkm_venv::canonical_interpreter_path(&env_root))?;
    let python_tag = format!("python{}.{}", info.major, info.minor);
    let layout = if cfg!(windows) {
        pkm_distribution::EnvironmentLayout::windows(&env_root)
    } else {
        pkm_distribution::EnvironmentLayout::posix(&env_root, &python_tag)
    };

    match package {
        None => {
            let packages = pkm_install::installed_packages(&layout.purelib)?;
            for package in packages {
                println!("{} {}", package.name, package.version);
            }
        }
        Some(dep) => {
            let Ok(name) = PackageName::new(dep) else {
                tracing::error!(name = dep, "not a valid package name");
                return Ok(ExitStatus::UserError);
            };
            match pkm_install::installed_package(&layout.purelib, &name)? {
                Some(package) => println!("{} {}\n{}", package.name, package.version, package.dist_info),
                None => {
                    tracing::error!(%name, "package is not installed");
                    return Ok(ExitStatus::UserError);
                }
            }
        }
    }

    Ok(ExitStatus::Success)
}
