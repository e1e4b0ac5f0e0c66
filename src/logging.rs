use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "chat_library=info,chatlib=info";
const VERBOSE_LOG_FILTER: &str = "chat_library=debug,chatlib=debug";

/// Initializes tracing on stderr so stdout stays clean for command output.
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks between the info and
/// debug defaults.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .try_init();
}
