use camino::Utf8Path;
use pkm_build::{BuildError, ProjectIdentity, RequestedArtifact};
use pkm_version::VersionSpecifier;

use crate::context::Context;
use crate::resolve;

use super::ExitStatus;

/// `pkm build`: builds a wheel for the project rooted at `source_tree`.
pub fn build(ctx: &Context, source_tree: &Utf8Path) -> anyhow::Result<ExitStatus> {
    let identity = match ProjectIdentity::from_source_tree(source_tree) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::error!(%err, "failed to read project identity from pyproject.toml");
            return Ok(ExitStatus::UserError);
        }
    };
    let Ok(version) = pkm_version::Version::parse(&identity.version) else {
        tracing::error!(version = %identity.version, "project version is not a valid pkm version");
        return Ok(ExitStatus::UserError);
    };
    let Ok(name) = pkm_normalize::PackageName::new(&identity.name) else {
        tracing::error!(name = %identity.name, "project name is not a valid package name");
        return Ok(ExitStatus::UserError);
    };
    let descriptor = pkm_distribution::PackageDescriptor::new(name, version);

    let Some(base_interpreter) = pkm_interpreter::find_satisfying(&ctx.interpreters, &VersionSpecifier::any()) else {
        tracing::error!("no local python interpreter found to build with");
        return Ok(ExitStatus::OperationFailure);
    };

    let target_dir = source_tree.join("dist");
    let index_url = ctx.index_url.clone();

    let result = pkm_build::build(
        &descriptor,
        source_tree,
        &target_dir,
        &base_interpreter,
        RequestedArtifact::Wheel,
        |env, requirements| install_build_requirements(&index_url, env, requirements),
    );

    match result {
        Ok(artifact) => {
            tracing::info!(path = %artifact, "built wheel");
            Ok(ExitStatus::Success)
        }
        Err(err) => {
            tracing::error!(%err, "build failed");
            Ok(ExitStatus::OperationFailure)
        }
    }
}

/// Satisfies `pkm-build`'s injected `install_requirements` hook: resolves the build-time
/// requirements against the default index and installs every resulting wheel into the ephemeral
/// build environment (mirrors `puffin-build::resolve_and_install`, minus the pip shell-out it
/// documents as a placeholder for "the real resolver and installer" — which this workspace now
/// has).
fn install_build_requirements(
    index_url: &url::Url,
    env: &pkm_distribution::Environment,
    requirements: &[pkm_pep508::Dependency],
) -> Result<(), BuildError> {
    if requirements.is_empty() {
        return Ok(());
    }

    let root_name = pkm_normalize::PackageName::new("build-requirements").expect("static name is valid");
    let resolution = resolve::resolve(
        index_url,
        env.compatible_tags.clone(),
        env.markers.clone(),
        root_name,
        requirements.to_vec(),
    )
    .map_err(|err| BuildError::RequirementsInstall(err.to_string()))?;

    for name in &resolution.build_order {
        let version = &resolution.decisions[name];
        tracing::debug!(%name, %version, "installing build requirement");
        super::install::fetch_and_unpack(index_url, env, name, version)
            .map_err(|err| BuildError::RequirementsInstall(err.to_string()))?;
    }

    Ok(())
}
