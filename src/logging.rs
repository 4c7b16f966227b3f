/// Log verbosity, parsed from configuration or the command line.
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_log_level(&self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Install the global fmt subscriber at the given level.
pub fn setup_logger(level: &str) {
    tracing_subscriber::fmt()
        .with_max_level(LogLevel::from_str(level).to_log_level())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(
            LogLevel::from_str("loud").to_log_level(),
            tracing::Level::INFO
        );
        assert_eq!(
            LogLevel::from_str("error").to_log_level(),
            tracing::Level::ERROR
        );
    }
}
