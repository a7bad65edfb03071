//! Logging setup and protocol message tracing.
//!
//! Subscriber setup goes through `tracing-subscriber` with an `EnvFilter`,
//! so `RUST_LOG` always wins over the configured level.

use std::fmt;

use tracing::Level;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Per-message payload dumps
    Trace,
    /// Decisions and decoded messages
    Debug,
    /// Lifecycle events (default)
    #[default]
    Info,
    /// Dropped input and timeouts
    Warn,
    /// Integrity faults
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

/// Installs the global subscriber at `level`.
///
/// Call once at startup; later calls are ignored.
pub fn init_logging(level: LogLevel) {
    init_logging_with_filter(&level.to_string());
}

/// Installs the global subscriber with a filter directive such as
/// `"info,tsxapp::steering=debug"`.
pub fn init_logging_with_filter(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .try_init();
}

/// Protocol direction for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Received from the RAN or the non-RT RIC
    Rx,
    /// Sent toward the RAN or the non-RT RIC
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => f.write_str("RX"),
            Direction::Tx => f.write_str("TX"),
        }
    }
}

/// Logs an encoded message at debug level, with its bytes at trace level.
pub fn log_protocol_message(protocol: &str, direction: Direction, msg_type: &str, data: &[u8]) {
    tracing::debug!(
        protocol,
        direction = %direction,
        msg_type,
        len = data.len(),
        "{} {} message",
        direction,
        protocol
    );
    tracing::trace!(protocol, hex = %HexDump(data), "{} payload", protocol);
}

/// Logs an E2 service model message.
pub fn log_e2_message(direction: Direction, msg_type: &str, data: &[u8]) {
    log_protocol_message("E2SM-MHO", direction, msg_type, data);
}

/// Logs an A1 policy payload.
pub fn log_a1_message(direction: Direction, msg_type: &str, data: &[u8]) {
    log_protocol_message("A1-P", direction, msg_type, data);
}

/// Lowercase hex rendering of a byte slice.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_roundtrip() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(HexDump(&[0x31, 0x68, 0x24]).to_string(), "316824");
        assert_eq!(HexDump(&[]).to_string(), "");
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(LogLevel::Debug);
        init_logging(LogLevel::Info);
        log_e2_message(Direction::Rx, "Indication", &[0x01, 0x02]);
    }
}
