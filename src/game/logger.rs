//! Verbosity-gated logger for simulated trials
//!
//! Each trial owns its own logger, so nothing here is shared between worker
//! threads. Output goes to stdout, to an in-memory buffer, or both; tests use
//! the buffer to assert on what a trial did.

use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::ops::Deref;

/// Verbosity level for trial output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Silent - no output (default for batch simulation)
    #[default]
    Silent = 0,
    /// Minimal - only the trial outcome
    Minimal = 1,
    /// Normal - turns and key decisions
    Normal = 2,
    /// Verbose - every draw and mana payment
    Verbose = 3,
}

impl std::str::FromStr for VerbosityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityLevel::Silent),
            "minimal" | "1" => Ok(VerbosityLevel::Minimal),
            "normal" | "2" => Ok(VerbosityLevel::Normal),
            "verbose" | "3" => Ok(VerbosityLevel::Verbose),
            other => Err(format!("unknown verbosity '{other}'")),
        }
    }
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    /// Output only to stdout (default)
    #[default]
    Stdout,
    /// Capture only to in-memory buffer (no stdout)
    Memory,
    /// Both stdout and in-memory buffer
    Both,
}

/// A captured log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
    /// Optional category (e.g., "mulligan", "cast")
    pub category: Option<String>,
}

/// Read-only view of captured entries
pub struct LogGuard<'a> {
    guard: Ref<'a, Vec<LogEntry>>,
}

impl Deref for LogGuard<'_> {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Per-trial logger
pub struct TrialLogger {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
    /// Prepended to stdout lines so interleaved trials stay readable
    prefix: Option<String>,
    log_buffer: RefCell<Vec<LogEntry>>,
}

impl TrialLogger {
    /// Silent logger writing to stdout
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        TrialLogger {
            verbosity,
            output_mode: OutputMode::default(),
            prefix: None,
            log_buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Capture to the in-memory buffer only
    pub fn enable_capture(&mut self) {
        self.output_mode = OutputMode::Memory;
    }

    pub fn disable_capture(&mut self) {
        self.output_mode = OutputMode::Stdout;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    /// Captured entries
    pub fn logs(&self) -> LogGuard<'_> {
        LogGuard {
            guard: self.log_buffer.borrow(),
        }
    }

    /// Move the captured entries out, leaving the buffer empty
    pub fn take_logs(&mut self) -> Vec<LogEntry> {
        std::mem::take(self.log_buffer.get_mut())
    }

    pub fn clear_logs(&mut self) {
        self.log_buffer.get_mut().clear();
    }

    /// Print captured entries allowed by the verbosity, then clear the buffer
    pub fn flush_buffer(&mut self) {
        for entry in self.log_buffer.borrow().iter() {
            if entry.level <= self.verbosity {
                self.log_to_stdout(entry.level, &entry.message);
            }
        }
        self.clear_logs();
    }

    #[inline]
    fn log_to_stdout(&self, level: VerbosityLevel, message: &str) {
        let indent = if level == VerbosityLevel::Minimal { "" } else { "  " };
        match &self.prefix {
            Some(prefix) => println!("{prefix} {indent}{message}"),
            None => println!("{indent}{message}"),
        }
    }

    /// Would a message at `level` go anywhere?
    #[inline]
    pub fn enabled(&self, level: VerbosityLevel) -> bool {
        level != VerbosityLevel::Silent && (level <= self.verbosity || self.is_capturing())
    }

    fn emit(&self, level: VerbosityLevel, category: Option<&str>, message: &str) {
        if !self.enabled(level) {
            return;
        }
        if self.is_capturing() {
            self.log_buffer.borrow_mut().push(LogEntry {
                level,
                message: message.to_string(),
                category: category.map(str::to_string),
            });
        }
        let to_stdout = matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both);
        if to_stdout && level <= self.verbosity {
            self.log_to_stdout(level, message);
        }
    }

    #[inline]
    pub fn minimal(&self, message: &str) {
        self.emit(VerbosityLevel::Minimal, None, message);
    }

    #[inline]
    pub fn normal(&self, message: &str) {
        self.emit(VerbosityLevel::Normal, None, message);
    }

    #[inline]
    pub fn verbose(&self, message: &str) {
        self.emit(VerbosityLevel::Verbose, None, message);
    }

    /// Log a simulator decision at Normal level under a category
    #[inline]
    pub fn decision(&self, category: &str, message: &str) {
        self.emit(VerbosityLevel::Normal, Some(category), message);
    }
}

impl Default for TrialLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TrialLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("log_count", &self.log_buffer.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_creation() {
        let logger = TrialLogger::new();
        assert_eq!(logger.verbosity(), VerbosityLevel::Silent);
        assert!(!logger.enabled(VerbosityLevel::Normal));
    }

    #[test]
    fn test_log_capture() {
        let mut logger = TrialLogger::with_verbosity(VerbosityLevel::Normal);
        logger.enable_capture();

        logger.normal("test message");
        logger.minimal("minimal message");
        logger.decision("cast", "casts Shock");

        let logs = logger.logs();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "test message");
        assert_eq!(logs[1].level, VerbosityLevel::Minimal);
        assert_eq!(logs[2].category.as_deref(), Some("cast"));
    }

    #[test]
    fn test_capture_ignores_verbosity() {
        let mut logger = TrialLogger::with_verbosity(VerbosityLevel::Silent);
        logger.enable_capture();
        logger.verbose("detail");
        assert_eq!(logger.logs().len(), 1);
    }

    #[test]
    fn test_take_and_flush() {
        let mut logger = TrialLogger::with_verbosity(VerbosityLevel::Minimal);
        logger.set_output_mode(OutputMode::Memory);
        logger.normal("message 1");
        logger.normal("message 2");

        let taken = logger.take_logs();
        assert_eq!(taken.len(), 2);
        assert!(logger.logs().is_empty());

        logger.normal("message 3");
        logger.flush_buffer();
        assert!(logger.logs().is_empty());
    }

    #[test]
    fn test_disable_capture() {
        let mut logger = TrialLogger::new();
        logger.enable_capture();
        assert!(logger.is_capturing());

        logger.disable_capture();
        assert!(!logger.is_capturing());
    }

    #[test]
    fn test_verbosity_from_str() {
        assert_eq!("verbose".parse::<VerbosityLevel>().unwrap(), VerbosityLevel::Verbose);
        assert_eq!("1".parse::<VerbosityLevel>().unwrap(), VerbosityLevel::Minimal);
        assert!("loud".parse::<VerbosityLevel>().is_err());
    }
}
