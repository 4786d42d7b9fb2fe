use indicatif::ProgressStyle;
use indicatif::style::TemplateError;

/// Progress bar used for the span covering a whole evaluation.
pub(crate) fn style_evaluation() -> Result<ProgressStyle, TemplateError> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
        .progress_chars("=>-"))
}

/// Installs a global `tracing` subscriber printing to stderr, with progress
/// bars for evaluations run with [`EvalConfig::progress`] set.
///
/// The filter is read from `RUST_LOG` and defaults to `info`.
///
/// [`EvalConfig::progress`]: crate::EvalConfig
#[cfg(feature = "logging")]
pub fn init_logging() -> anyhow::Result<()> {
    use anyhow::Context;
    use tracing_indicatif::IndicatifLayer;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let indicatif = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif.get_stderr_writer()))
        .with(indicatif)
        .try_init()
        .context("Couldn't install the tracing subscriber")?;

    Ok(())
}
