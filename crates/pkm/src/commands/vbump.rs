use camino::Utf8Path;
use fs_err as fs;
use pkm_version::Version;
use toml_edit::DocumentMut;

use crate::cli::VersionPart;

use super::ExitStatus;

/// `pkm vbump [part]`: bumps `[project].version` in `pyproject.toml` in place, preserving every
/// other line of the file. Edited through `toml_edit` rather than round-tripping through
/// `toml`/serde so comments and formatting elsewhere in the file survive the rewrite.
pub fn vbump(source_tree: &Utf8Path, part: VersionPart) -> anyhow::Result<ExitStatus> {
    let path = source_tree.join("pyproject.toml");
    let contents = fs::read_to_string(&path)?;
    let mut doc = contents.parse::<DocumentMut>()?;

    let Some(current) = doc.get("project").and_then(|project| project.get("version")).and_then(|v| v.as_str())
    else {
        tracing::error!("`pyproject.toml` has no `[project].version` string to bump");
        return Ok(ExitStatus::UserError);
    };

    let Ok(current) = Version::parse(current) else {
        tracing::error!(version = current, "existing version is not a valid pkm version");
        return Ok(ExitStatus::UserError);
    };

    let bumped = bump(&current, part);

    doc["project"]["version"] = toml_edit::value(bumped.to_string());
    fs::write(&path, doc.to_string())?;

    tracing::info!(from = %current, to = %bumped, "version bumped");
    Ok(ExitStatus::Success)
}

/// Bumps one component of a release, re-parsing the result rather than mutating `version` in
/// place: [`pkm_version::StandardVersion`]'s fields are private by design (a `Version` is built
/// once from its canonical string and compared structurally from then on), so producing the next
/// version means formatting the bumped string and feeding it back through [`Version::parse`].
fn bump(version: &Version, part: VersionPart) -> Version {
    let standard = version.as_standard().expect("pyproject.toml versions are PEP 440 releases");
    let mut release: Vec<u64> = standard.release().to_vec();
    while release.len() < 3 {
        release.push(0);
    }

    let formatted = match part {
        VersionPart::Major => {
            release[0] += 1;
            release[1] = 0;
            release[2] = 0;
            format!("{}.{}.{}", release[0], release[1], release[2])
        }
        VersionPart::Minor => {
            release[1] += 1;
            release[2] = 0;
            format!("{}.{}.{}", release[0], release[1], release[2])
        }
        VersionPart::Patch => {
            release[2] += 1;
            format!("{}.{}.{}", release[0], release[1], release[2])
        }
        VersionPart::A => format!("{}.{}.{}a1", release[0], release[1], release[2]),
        VersionPart::B => format!("{}.{}.{}b1", release[0], release[1], release[2]),
        VersionPart::Rc => format!("{}.{}.{}rc1", release[0], release[1], release[2]),
    };

    Version::parse(&formatted).expect("formatted release is always well-formed")
}
