use camino::Utf8Path;

use super::ExitStatus;

/// `pkm publish <user> <password>`: uploads every built artifact under `dist/` to the package
/// index. The multipart upload body and index-specific auth flow are an external-interface
/// concern this workspace's crates don't implement; this only models the call shape a real
/// implementation would dispatch through.
pub fn publish(source_tree: &Utf8Path, user: &str, _password: &str) -> anyhow::Result<ExitStatus> {
    let dist = source_tree.join("dist");
    if !dist.is_dir() {
        tracing::error!("no `dist/` directory to publish; run `pkm build` first");
        return Ok(ExitStatus::UserError);
    }
    tracing::info!(user, "publishing is not implemented in this workspace");
    Ok(ExitStatus::UserError)
}
