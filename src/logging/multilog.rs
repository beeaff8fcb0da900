use log::{LevelFilter, Log, Metadata, Record};

/// Caps the verbosity of every log whose target starts with `prefix`.
struct TargetFilter {
    prefix: String,
    max_level: LevelFilter,
}

impl TargetFilter {
    fn drops(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(&self.prefix) && metadata.level() > self.max_level
    }
}

/// Fans every record out to a list of loggers.
pub struct MultiLogger {
    loggers: Vec<Box<dyn Log>>,
    max_level: LevelFilter,
    filters: Vec<TargetFilter>,
}

impl Default for MultiLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiLogger {
    pub fn new() -> Self {
        Self {
            loggers: Vec::new(),
            max_level: LevelFilter::Trace,
            filters: Vec::new(),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn Log>) -> Self {
        self.add_logger(logger);
        self
    }

    /// Sets the global max level installed by `init`.
    pub fn with_max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    /// Drops the logs of targets starting with `target` that are more verbose
    /// than `max_level`, for all loggers.
    pub fn with_global_filter(mut self, target: impl Into<String>, max_level: LevelFilter) -> Self {
        self.filters.push(TargetFilter {
            prefix: target.into(),
            max_level,
        });
        self
    }

    pub fn add_logger(&mut self, logger: Box<dyn Log>) {
        self.loggers.push(logger);
    }

    /// Installs the multi logger as the global logger.
    pub fn init(self) -> Result<(), log::SetLoggerError> {
        log::set_max_level(self.max_level);
        log::set_boxed_logger(Box::new(self))
    }

    fn should_drop(&self, metadata: &Metadata) -> bool {
        self.filters.iter().any(|filter| filter.drops(metadata))
    }
}

impl Log for MultiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        !self.should_drop(metadata) && self.loggers.iter().any(|l| l.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        if self.should_drop(record.metadata()) {
            return;
        }

        for logger in self.loggers.iter().filter(|l| l.enabled(record.metadata())) {
            logger.log(record);
        }
    }

    fn flush(&self) {
        self.loggers.iter().for_each(|l| l.flush());
    }
}
