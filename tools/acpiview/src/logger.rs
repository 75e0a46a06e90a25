use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log` backend writing `[LEVEL] target: message` lines to stderr.
pub struct StderrLogger {
    max_level: LevelFilter,
    colour: bool,
}

impl StderrLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter, colour: bool) -> Self {
        Self { max_level, colour }
    }

    /// Call this once, before any table is processed.
    #[allow(clippy::missing_errors_doc)]
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }

    /// Verbosity from the number of `-v` flags; warnings are always shown.
    #[must_use]
    pub const fn level_for(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();
        if self.colour {
            let label = match level {
                Level::Error => level.as_str().red(),
                Level::Warn => level.as_str().yellow(),
                Level::Info => level.as_str().green(),
                Level::Debug | Level::Trace => level.as_str().dimmed(),
            };
            eprintln!("[{label}] {}: {}", record.target(), record.args());
        } else {
            eprintln!("[{level}] {}: {}", record.target(), record.args());
        }
    }

    fn flush(&self) {
        // eprintln! is unbuffered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_flag_raises_the_level() {
        assert_eq!(StderrLogger::level_for(0), LevelFilter::Warn);
        assert_eq!(StderrLogger::level_for(1), LevelFilter::Info);
        assert_eq!(StderrLogger::level_for(2), LevelFilter::Debug);
        assert_eq!(StderrLogger::level_for(7), LevelFilter::Trace);
    }

    #[test]
    fn filters_above_max_level() {
        let logger = StderrLogger::new(LevelFilter::Info, false);
        let debug = Metadata::builder().level(Level::Debug).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));
    }
}
