/// Severity of a message passed through [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warning,
    Error,
}

/// Host-supplied diagnostic sink. The source this core is modeled on gates
/// `LOG_ERROR`/`LOG_WARNING` printf macros behind a debug build; this crate
/// routes the same call sites through a trait the host supplies once, so the
/// core itself never prints or allocates a logging backend.
pub trait Logger {
    fn log(&mut self, level: LogLevel, message: &str);
}

/// Default logger used when the host doesn't care. Every call is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&mut self, _level: LogLevel, _message: &str) {}
}
