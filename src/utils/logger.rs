use std::fmt::Display;
use std::io;
use std::sync::Mutex;

use slog::{error, o, Drain, Level, Logger};

use crate::utils::get_env;

/// Parses a level name such as `info` or `debug`, falling back to `Info`.
pub fn parse_level(name: &str) -> Level {
    name.trim().parse::<Level>().unwrap_or(Level::Info)
}

/// Returns the process logger: JSON records on stdout, filtered by `ADC_LOG_LEVEL`.
pub fn get_logger() -> Logger {
    let level = parse_level(&get_env("ADC_LOG_LEVEL", Some("info")));
    let drain = slog_json::Json::default(io::stdout()).fuse();
    let drain = Mutex::new(drain).fuse();
    let drain = drain.filter_level(level).fuse();
    Logger::root(drain, o!("app" => "adc-stream"))
}

pub fn error_context<E: Display>(logger: &Logger, context: &str, err: E) {
    error!(logger, "{}", context; "error" => err.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::Debug);
        assert_eq!(parse_level(" warn "), Level::Warning);
        assert_eq!(parse_level("nonsense"), Level::Info);
    }
}
