//! Structured logging utilities for Tiramisu components.
//!
//! Provides consistent logging with component prefixes and structured fields.
//!
//! # Usage
//!
//! ```ignore
//! use tira_config::logging::*;
//!
//! log_session_info!("Incognito session started", capacity = 128);
//! log_shadow_debug!("Shadow copy complete", bytes = 4096usize);
//! ```

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const SESSION: &'static str = "SESSION";
    pub const SHADOW: &'static str = "SHADOW";
}

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse a config-file level string, defaulting to `Info`.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }
}

// === SESSION logging macros ===

#[macro_export]
macro_rules! log_session_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = "SESSION", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_session_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "SESSION", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_session_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "SESSION", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_session_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "SESSION", $($key = $value,)* $msg)
    };
}

// === SHADOW logging macros ===

#[macro_export]
macro_rules! log_shadow_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = "SHADOW", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_shadow_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "SHADOW", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_shadow_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "SHADOW", $($key = $value,)* $msg)
    };
}

/// Initialize logging with the given level filter.
/// Call this once at application startup.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_constants() {
        assert_eq!(Component::SESSION, "SESSION");
        assert_eq!(Component::SHADOW, "SHADOW");
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(LogLevel::from_str_or_default("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str_or_default("bogus"), LogLevel::Info);
    }
}
