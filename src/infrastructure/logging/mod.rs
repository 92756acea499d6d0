//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - pretty or JSON console output on stderr
//! - optional rolling JSON log files via tracing-appender
//! - `RUST_LOG` overrides the configured level

pub mod logger;

pub use logger::LoggerImpl;
