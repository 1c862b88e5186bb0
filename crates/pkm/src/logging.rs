use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use tracing_tree::time::Uptime;

/// Wires `tracing-tree` to stderr with a `-v` raised filter, using a target-scoped default level
/// with an env-override layered on top.
pub fn setup(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };

    let targets = Targets::new()
        .with_target("reqwest", LevelFilter::WARN)
        .with_target("tokio", LevelFilter::WARN)
        .with_default(default_level);

    let subscriber = Registry::default().with(
        tracing_tree::HierarchicalLayer::default()
            .with_targets(true)
            .with_writer(|| Box::new(std::io::stderr()))
            .with_timer(Uptime::default())
            .with_filter(EnvFilter::from_default_env())
            .with_filter(targets),
    );
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
