//! Goldfish trials: per-trial state, turn structure, mana and mulligans

/// Log a formatted decision at normal verbosity
///
/// Formatting is skipped entirely unless the logger would keep the line, and
/// compiled out without the `verbose-logging` feature.
macro_rules! log_if_verbose {
    ($state:expr, $category:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            if $state.logger.enabled($crate::game::VerbosityLevel::Normal) {
                $state.logger.decision($category, &format!($($arg)*));
            }
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$state; // Suppress unused variable warning
        }
    };
}

pub mod goldfish;
pub mod logger;
pub mod mana_tracker;
pub mod mulligan;
pub mod phase;
pub mod state;

pub use goldfish::{GoldfishConfig, GoldfishSimulator, TrialEnd, TrialOutcome};
pub use logger::{LogEntry, LogGuard, OutputMode, TrialLogger, VerbosityLevel};
pub use mana_tracker::{ManaSource, ManaTracker};
pub use mulligan::{resolve_opening_hand, MulliganPolicy, MulliganResult};
pub use phase::{TrialPhase, TurnStructure};
pub use state::{GameState, Permanent};
