//! Logging setup.

/// Initialize `env_logger` with an `info` default, overridable with `RUST_LOG`.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .format_timestamp_millis()
        .init();
}
