use crate::config::{Config, LogOutput};
use anyhow::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_stackdriver::CloudTraceConfiguration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,recipebook_services=debug,sqlx=warn";

/// `LOG_FILTER` wins over `RUST_LOG`; with neither set the crate logs at debug.
fn env_filter(log_filter: Option<&str>) -> anyhow::Result<EnvFilter> {
    match log_filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("LOG_FILTER {directives:?} is not a valid filter")),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Installs the global subscriber for `config.log_output()`.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let filter = env_filter(config.log_filter())?;

    match config.log_output() {
        LogOutput::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }
        LogOutput::Stackdriver { project_id } => {
            // Matched by the HeaderExtractor in `routes`
            opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_opentelemetry::layer())
                .with(tracing_stackdriver::layer().with_cloud_trace(CloudTraceConfiguration {
                    project_id: project_id.clone(),
                }))
                .try_init()?;
        }
    }

    tracing::debug!(
        environment = %config.environment(),
        output = ?config.log_output(),
        "Tracing initialized"
    );

    Ok(())
}
