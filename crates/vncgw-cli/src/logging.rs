//! Tracing subscriber setup for the binary and the serve-mode hook.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset and `-vnc.verbose` is given.
const VERBOSE_FILTER: &str =
    "info,vncgw_core=debug,vncgw_runtime=debug,vncgw_axum=debug,vncgw_cli=debug,tower_http=debug";

/// Install a stderr `fmt` subscriber. `RUST_LOG` wins over `verbose`.
///
/// Does nothing if the host application already installed a subscriber.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_FILTER } else { "info" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
