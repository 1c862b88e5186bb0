use super::ExitStatus;

/// `pkm new <template> [args...]`: scaffolds a new project from a named template. Evaluating a
/// template (fetching it, rendering its files) is an external-interface concern this workspace's
/// crates don't implement; this only models the call shape a real implementation would dispatch
/// through.
pub fn new(template: &str, args: &[String]) -> anyhow::Result<ExitStatus> {
    tracing::info!(template, ?args, "scaffolding is not implemented in this workspace");
    Ok(ExitStatus::UserError)
}
