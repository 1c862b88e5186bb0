use std::str::FromStr;

use camino::Utf8PathBuf;
use pkm_client::RegistryClient;
use pkm_distribution::{Environment, WheelFilename};
use pkm_install::{InstalledPackage, LinkMode};
use pkm_normalize::PackageName;
use pkm_pep508::Dependency;
use pkm_version::Version;
use url::Url;

use crate::context::Context;
use crate::resolve;

use super::ExitStatus;

/// `pkm install [deps...]`: resolves `deps` against the default index and installs every package
/// in the resulting build order into the project's application environment, end to end.
pub fn install(ctx: &Context, project_name: &str, deps: &[String]) -> anyhow::Result<ExitStatus> {
    let requirements: Result<Vec<Dependency>, _> = deps.iter().map(|raw| raw.parse()).collect();
    let Ok(requirements) = requirements else {
        tracing::error!("one or more dependency specifiers could not be parsed");
        return Ok(ExitStatus::UserError);
    };
    if requirements.is_empty() {
        tracing::warn!("no dependencies given and installing from an existing lockfile is not yet wired up");
        return Ok(ExitStatus::Success);
    }

    let Ok(root_name) = PackageName::new(project_name) else {
        tracing::error!(name = project_name, "project name is not a valid package name");
        return Ok(ExitStatus::UserError);
    };

    let python_spec = pkm_version::VersionSpecifier::any();
    let env = match ctx.zoo.create_application(project_name, project_name, &ctx.interpreters, &python_spec, |_| true) {
        Ok(env) => env,
        Err(err) => {
            tracing::error!(%err, "failed to materialize the project environment");
            return Ok(ExitStatus::OperationFailure);
        }
    };

    let resolution = match resolve::resolve(
        &ctx.index_url,
        env.compatible_tags.clone(),
        env.markers.clone(),
        root_name,
        requirements,
    ) {
        Ok(resolution) => resolution,
        Err(resolve::ResolveError::Unsolvable(_)) => return Ok(ExitStatus::Unsolvable),
        Err(err) => {
            tracing::error!(%err, "resolution failed");
            return Ok(ExitStatus::OperationFailure);
        }
    };

    for name in &resolution.build_order {
        let version = &resolution.decisions[name];
        match fetch_and_unpack(&ctx.index_url, &env, name, version) {
            Ok(installed) => tracing::info!(name = %installed.name, version = %installed.version, "installed"),
            Err(err) => {
                tracing::error!(%name, %version, %err, "install failed");
                return Ok(ExitStatus::OperationFailure);
            }
        }
    }

    Ok(ExitStatus::Success)
}

/// Downloads the wheel for `name`/`version` from the index and installs it into `env`. Shared
/// between the `install` command and `commands::build`'s `install_requirements` hook, since both
/// need the same "name+version decided by the solver" -> "wheel on disk in this environment" step.
pub(super) fn fetch_and_unpack(
    index_url: &Url,
    env: &Environment,
    name: &PackageName,
    version: &Version,
) -> anyhow::Result<InstalledPackage> {
    let bytes = tokio::task::block_in_place(|| {
        tokio::runtime::Handle::current().block_on(download_wheel_bytes(index_url, name, version))
    })?;

    let scratch = tempfile::tempdir()?;
    let scratch = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf())
        .map_err(|path| anyhow::anyhow!("temp dir path `{}` is not utf8", path.display()))?;
    let wheel_path = scratch.join(format!("{name}-{version}-py3-none-any.whl"));
    fs_err::write(&wheel_path, &bytes)?;

    Ok(pkm_install::install(&wheel_path, env, LinkMode::Hardlink)?)
}

async fn download_wheel_bytes(index_url: &Url, name: &PackageName, version: &Version) -> anyhow::Result<Vec<u8>> {
    let client = RegistryClient::new(index_url.clone());
    let files = client.package_files(name).await?;
    let file = files
        .iter()
        .find(|file| WheelFilename::from_str(&file.filename).is_ok_and(|wheel| &wheel.version == version))
        .ok_or_else(|| anyhow::anyhow!("no wheel found for {name} {version} on {index_url}"))?;

    let bytes = reqwest::get(file.url.clone()).await?.error_for_status()?.bytes().await?;
    Ok(bytes.to_vec())
}
