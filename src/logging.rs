use crate::constants::LOG_ENV;
use tracing_subscriber::EnvFilter;

/// Installs the process-wide log subscriber, writing to stderr.
///
/// `CRB_LOG` takes precedence over `verbose` when it holds a valid filter.
/// Calling this more than once keeps the first subscriber.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("crb=debug")
        } else {
            EnvFilter::new("crb=info")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .try_init();
}
