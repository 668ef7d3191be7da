//! Diagnostic logging for elfscope.
//!
//! Three output levels controlled by CLI flags, all written to stderr:
//! - **Quiet** (`-q`): errors only
//! - **Default** (no flag): warnings and errors
//! - **Verbose** (`-v`): everything, including per-stage decode logs and timings

use std::io::Write;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet = 0,
    Default = 1,
    Verbose = 2,
}

impl Verbosity {
    /// Pick the level from the `-q`/`-v` flags.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Default
        }
    }

    /// Maximum `log` level shown at this verbosity.
    pub fn filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Error,
            Self::Default => LevelFilter::Warn,
            Self::Verbose => LevelFilter::Trace,
        }
    }
}

/// `log` backend writing `elfscope: <level>: <message>` lines to stderr.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let level = record.level().as_str().to_ascii_lowercase();
            let _ = writeln!(std::io::stderr().lock(), "elfscope: {level}: {}", record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

/// Install the stderr logger for the current process.
///
/// # Errors
///
/// Fails if another logger was already installed.
pub fn init(quiet: bool, verbose: bool) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(Verbosity::from_flags(quiet, verbose).filter());
    Ok(())
}

/// RAII timer that logs elapsed duration on drop at debug level.
///
/// ```ignore
/// let _t = Timer::start("parse");
/// // ... work ...
/// // logs "parse: 42ms" on drop
/// ```
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Begin timing a labeled operation.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::debug!("{}: {:.1?}", self.label, self.start.elapsed());
    }
}
