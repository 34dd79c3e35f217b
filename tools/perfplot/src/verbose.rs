//! Console logging for report runs.
//!
//! Three output levels controlled by CLI flags:
//! - **Quiet** (`-q`): warnings, errors and the final summary only
//! - **Default** (no flag): one line per stage and per written artifact
//! - **Verbose** (`-v`): stage timings, decoded shapes, bundle checksums
//!
//! The level is the only process-wide state; report configuration is always
//! passed explicitly.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

/// Output verbosity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// `-q`
    Quiet = 0,
    /// No flag.
    Default = 1,
    /// `-v`
    Verbose = 2,
}

static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Default as u8);

/// Initialize the verbosity level for the current process.
pub fn init(quiet: bool, verbose: bool) {
    let level = if quiet {
        Verbosity::Quiet
    } else if verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Default
    };
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Returns the current verbosity level.
pub fn verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Default,
    }
}

/// Returns `true` if verbose mode is active.
pub fn is_verbose() -> bool {
    verbosity() == Verbosity::Verbose
}

/// Returns `true` if quiet mode is active.
pub fn is_quiet() -> bool {
    verbosity() == Verbosity::Quiet
}

/// Print a message only when verbose mode is enabled.
macro_rules! vprintln {
    ($($arg:tt)*) => {
        if $crate::verbose::is_verbose() {
            println!($($arg)*);
        }
    };
}

pub(crate) use vprintln;

/// Print a message at default verbosity and above (suppressed in quiet mode).
macro_rules! dprintln {
    ($($arg:tt)*) => {
        if !$crate::verbose::is_quiet() {
            println!($($arg)*);
        }
    };
}

pub(crate) use dprintln;

/// Print a warning to stderr regardless of verbosity.
macro_rules! wprintln {
    ($($arg:tt)*) => {
        eprintln!("warning: {}", format_args!($($arg)*));
    };
}

pub(crate) use wprintln;

/// Stage timer that reports its elapsed time on drop in verbose mode.
///
/// ```ignore
/// let _t = Timer::start(format!("decoding {}", path.display()));
/// // prints "  decoding perf.log: 3.1ms" on drop
/// ```
pub struct Timer {
    label: Cow<'static, str>,
    start: Instant,
}

impl Timer {
    /// Begin timing a labeled stage.
    pub fn start(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if is_verbose() {
            println!("  {}: {:.1?}", self.label, self.start.elapsed());
        }
    }
}
