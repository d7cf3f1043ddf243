//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system with a default level filter
///
/// `level` is any `env_logger` filter string ("info", "audio_services=debug").
/// `RUST_LOG`, when set, takes precedence. Calling this more than once is
/// harmless; later calls are ignored.
pub fn init(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}
