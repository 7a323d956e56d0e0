//! Инициализация логирования для бинарников

use tracing_subscriber::EnvFilter;

/// Фильтр берется из `RUST_LOG`, по умолчанию `info`
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
