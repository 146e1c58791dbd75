//! Logging setup: env_logger behind the `log` facade, routed through
//! indicatif when progress bars are on screen.

use indicatif::MultiProgress;

/// Level label padded to five columns, with ANSI color when requested.
fn level_label(level: log::Level, color: bool) -> String {
    let (label, ansi) = match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    };
    if color {
        format!("{ansi}{label}\x1b[0m")
    } else {
        label.to_string()
    }
}

/// Default filter when `RUST_LOG` is unset.
fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Logger that prints through indicatif MultiProgress so log lines do not
/// tear the drug progress bar.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.matches(record) {
            let line = format!("[{}] {}", level_label(record.level(), true), record.args());
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initialize logging.
///
/// With `multi` set (TTY), records go through [`IndicatifLogger`] with
/// colored labels; otherwise plain `[LEVEL] message` lines for log capture.
/// A second call is a no-op.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_level(quiet, debug));

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env).build();
        let max_level = logger.filter();
        if log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone()))).is_ok() {
            log::set_max_level(max_level);
        }
    } else {
        let _ = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(buf, "[{}] {}", level_label(record.level(), false), record.args())
            })
            .try_init();
    }
}
