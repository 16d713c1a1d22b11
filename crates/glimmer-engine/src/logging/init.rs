use std::sync::Once;

/// Default filter when neither `LoggingConfig` nor `RUST_LOG` specify one.
///
/// The GPU stack is chatty at info level (swapchain reconfigures, pipeline
/// cache churn, spirv/msl translation notes); those messages are benign and
/// are capped at warn so the harness's own diagnostics stay readable.
const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax
/// (e.g. "debug", "glimmer_engine=debug,wgpu_core=warn").
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
}

static INIT: Once = Once::new();

/// Initializes the global logger once; subsequent calls are ignored.
///
/// Intended usage is first thing in `main`. Precedence: explicit config,
/// then `RUST_LOG`, then [`DEFAULT_FILTER`].
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.parse_filters(DEFAULT_FILTER);
        }

        builder.init();

        log::debug!("logging initialized");
    });
}
