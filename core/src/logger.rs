use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

/// Installs a global tracing subscriber honouring `RUST_LOG` on top of the
/// given default level. Statements the engine builds are logged at debug.
pub fn setup_logger(log_level: LevelFilter) {
    let filter = EnvFilter::from_default_env().add_directive(log_level.into());

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Logger has already been set up, continuing...");
    }
}

pub fn setup_info_logger() {
    setup_logger(LevelFilter::INFO);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_is_idempotent() {
        // the second call hits the already-installed branch instead of panicking
        setup_logger(LevelFilter::DEBUG);
        setup_logger(LevelFilter::INFO);
    }
}
